//! Violation Triage API Server

mod db;
mod error;
mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use db::PgStore;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use triage_core::{OutcomeLearner, OutcomeReporter, ScanOrchestrator, TriagePolicy};

/// Application state shared across handlers
pub struct AppState {
    pub orchestrator: ScanOrchestrator<PgStore, PgStore>,
    pub outcomes: OutcomeReporter,
    pub config: AppConfig,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub learner_queue_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/violation_triage".to_string()),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            learner_queue_size: std::env::var("LEARNER_QUEUE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1024),
        }
    }
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(routes::health_check))

        // Carriers
        .route("/api/carriers/:id/scan", post(routes::carriers::scan_carrier))
        .route("/api/carriers/:id/dashboard", get(routes::carriers::get_dashboard))
        .route("/api/carriers/:id/flagged", get(routes::carriers::list_flagged))
        .route("/api/carriers/:id/report", get(routes::carriers::get_report))

        // Violations
        .route("/api/violations/:id/rescan", post(routes::violations::rescan_violation))

        // Outcome feedback
        .route("/api/outcomes", post(routes::outcomes::record_outcome))

        // Jurisdictions
        .route("/api/jurisdictions", get(routes::jurisdictions::list_profiles))
        .route("/api/jurisdictions/:code", get(routes::jurisdictions::get_profile))

        // Admin
        .route("/api/admin/config", get(routes::get_config))

        // CORS
        .layer(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any))

        // Tracing
        .layer(TraceLayer::new_for_http())

        // State
        .with_state(state)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::default();
    let policy = TriagePolicy::from_env()?;
    info!(scan_version = policy.scan_version, batch_size = policy.batch_size, "Triage policy loaded");

    // Connect to database
    let db = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations").run(&db).await?;

    info!("Database migrations complete");

    let store = Arc::new(PgStore::new(db));
    let orchestrator = ScanOrchestrator::new(store.clone(), store, policy);

    // Outcome learner runs until the last reporter is dropped
    let (outcomes, learner) = OutcomeLearner::spawn(orchestrator.profiles().clone(), config.learner_queue_size);

    let addr = config.bind_addr.clone();
    let state = Arc::new(AppState {
        orchestrator,
        outcomes,
        config,
    });
    let app = router(state.clone());

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Close the queue so the learner drains what is left
    drop(state);
    match learner.await {
        Ok(processed) => info!(processed, "Outcome learner finished"),
        Err(e) => error!(error = %e, "Outcome learner task failed"),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "triage_api=debug,triage_core=info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Violation Triage API Server");

    if let Err(e) = run().await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
