//! Sync API
//!
//! - `POST /api/sync/trigger`: queue a catalog sync, 202 immediately
//! - `GET /api/sync/jobs/{job_id}`: job status
//! - `GET /api/sync/integrations/{merchant_scope_id}`: ledger record

use axum::Json;
use axum::extract::{Path, State};
use http::StatusCode;
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::IntegrationView;
use shared::sync::{JobStatus, JobTrigger, SyncAccepted, SyncTriggerRequest};
use uuid::Uuid;

use crate::error::ServiceResult;
use crate::state::AppState;

pub const ACCEPTED_MESSAGE: &str = "Catalog sync started. Processing in background.";

/// Queue a sync for one merchant scope
///
/// Credentials in the body are used when both are present; otherwise the
/// stored integration must exist and be enabled.
pub async fn trigger_sync(
    State(state): State<AppState>,
    Json(req): Json<SyncTriggerRequest>,
) -> ServiceResult<(StatusCode, Json<ApiResponse<SyncAccepted>>)> {
    let status = state.queue.submit(req, JobTrigger::Manual).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success_with_message(
            ACCEPTED_MESSAGE,
            SyncAccepted {
                job_id: status.job_id,
                merchant_scope_id: status.merchant_scope_id,
            },
        )),
    ))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ApiResponse<JobStatus>>, AppError> {
    let status = state.registry.get(&job_id).ok_or_else(|| {
        AppError::new(ErrorCode::SyncJobNotFound).with_detail("job_id", job_id.to_string())
    })?;
    Ok(Json(ApiResponse::success(status)))
}

pub async fn get_integration(
    State(state): State<AppState>,
    Path(merchant_scope_id): Path<String>,
) -> ServiceResult<Json<ApiResponse<IntegrationView>>> {
    let record = state
        .stores
        .ledger
        .get_integration(&merchant_scope_id)
        .await?
        .ok_or_else(|| {
            AppError::new(ErrorCode::IntegrationNotFound)
                .with_detail("merchant_scope_id", merchant_scope_id.clone())
        })?;
    Ok(Json(ApiResponse::success(record.into())))
}
