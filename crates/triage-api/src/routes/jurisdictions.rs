//! Jurisdiction profile routes (admin view)

use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use triage_core::{CoreError, JurisdictionProfile};

pub async fn list_profiles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<JurisdictionProfile>>, ApiError> {
    Ok(Json(state.orchestrator.profiles().list_profiles().await?))
}

/// Stored profile, seeded on first access
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<JurisdictionProfile>, ApiError> {
    let profile = state
        .orchestrator
        .profiles()
        .get_or_seed(&code)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("jurisdiction {}", code)))?;
    Ok(Json(profile))
}
