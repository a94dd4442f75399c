//! API routes

pub mod carriers;
pub mod jurisdictions;
pub mod outcomes;
pub mod violations;

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use triage_core::TriagePolicy;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
pub struct ConfigResponse {
    pub version: String,
    pub policy: TriagePolicy,
    pub learner_queue_size: usize,
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        policy: state.orchestrator.policy().clone(),
        learner_queue_size: state.config.learner_queue_size,
    })
}
