//! Challenge outcome feedback

use crate::error::ApiError;
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;
use triage_core::model::ChallengeType;

#[derive(Debug, Deserialize)]
pub struct OutcomeRequest {
    pub jurisdiction: String,
    #[serde(default, alias = "challengeType")]
    pub challenge_type: Option<ChallengeType>,
    pub accepted: bool,
}

/// Queue an outcome for the learner. Always 202 once the body is valid;
/// learning failures are logged by the learner, never returned here.
pub async fn record_outcome(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OutcomeRequest>,
) -> Result<StatusCode, ApiError> {
    if request.jurisdiction.trim().is_empty() {
        return Err(ApiError::BadRequest("jurisdiction is required".to_string()));
    }

    state
        .outcomes
        .record(&request.jurisdiction, request.challenge_type, request.accepted);
    Ok(StatusCode::ACCEPTED)
}
