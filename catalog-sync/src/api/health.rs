//! Health check endpoint

use axum::Json;
use axum::extract::State;
use shared::sync::JobState;

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "catalog-sync",
        "version": env!("CARGO_PKG_VERSION"),
        "jobs": {
            "queued": state.registry.count_in(JobState::Queued),
            "running": state.registry.count_in(JobState::Running),
        },
        "mirror_enabled": state.stores.mirror.is_some(),
    }))
}
