//! Single-violation routes

use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::info;
use triage_core::ScanResult;
use uuid::Uuid;

/// Re-run the full pipeline for one violation, ignoring freshness
pub async fn rescan_violation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScanResult>, ApiError> {
    let result = state.orchestrator.rescan_violation(id).await?;
    info!(
        violation_id = %id,
        category = %result.category,
        priority = result.priority_score,
        "Violation rescanned"
    );
    Ok(Json(result))
}
