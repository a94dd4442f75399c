//! Carrier-level routes: batch scan, dashboard, flagged listing and reports

use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use triage_core::dashboard::DashboardStats;
use triage_core::listing::{FlaggedQuery, Page, SortKey};
use triage_core::model::{SafetyCategory, Violation};
use triage_core::report::{generate_report, Report, ReportFormat};
use triage_core::{Category, ScanOptions, ScanSummary};
use uuid::Uuid;

pub async fn scan_carrier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(options): Query<ScanOptions>,
) -> Result<Json<ScanSummary>, ApiError> {
    info!(carrier_id = %id, force = options.force, "Scan requested");
    let summary = state.orchestrator.scan_carrier(id, options).await?;
    Ok(Json(summary))
}

pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(state.orchestrator.dashboard(id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct FlaggedParams {
    pub category: Option<Category>,
    #[serde(alias = "violationCategory", alias = "safetyCategory")]
    pub safety_category: Option<SafetyCategory>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
    #[serde(alias = "sortBy")]
    pub sort_by: Option<String>,
}

impl FlaggedParams {
    pub fn into_query(self) -> Result<FlaggedQuery, ApiError> {
        let defaults = FlaggedQuery::default();
        let sort_by = match self.sort_by.as_deref() {
            Some(s) => s.parse::<SortKey>().map_err(ApiError::BadRequest)?,
            None => defaults.sort_by,
        };
        Ok(FlaggedQuery {
            category: self.category,
            safety_category: self.safety_category,
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
            sort_by,
        })
    }
}

pub async fn list_flagged(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<FlaggedParams>,
) -> Result<Json<Page<Violation>>, ApiError> {
    let query = params.into_query()?;
    Ok(Json(state.orchestrator.list_flagged(id, &query).await?))
}

#[derive(Deserialize)]
pub struct ReportQuery {
    pub format: Option<String>,
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub carrier_id: Uuid,
    pub format: String,
    pub content: String,
}

/// Rendered dashboard, Markdown unless `?format=json`
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportResponse>, ApiError> {
    let format: ReportFormat = query.format.as_deref().unwrap_or("markdown").parse()?;
    let stats = state.orchestrator.dashboard(id).await?;
    let content = generate_report(&Report::Dashboard(&stats), format)?;

    Ok(Json(ReportResponse {
        carrier_id: id,
        format: format.to_string(),
        content,
    }))
}
