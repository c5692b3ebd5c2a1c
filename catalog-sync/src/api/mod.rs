//! API routes

pub mod health;
pub mod sync;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the service router
pub fn create_router(state: AppState) -> Router {
    let sync = Router::new()
        .route("/api/sync/trigger", post(sync::trigger_sync))
        .route("/api/sync/jobs/{job_id}", get(sync::get_job))
        .route(
            "/api/sync/integrations/{merchant_scope_id}",
            get(sync::get_integration),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .merge(sync)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
