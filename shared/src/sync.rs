//! Sync job protocol types
//!
//! Request/response bodies for the trigger endpoint and the job status
//! published by the sync workers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorCode;

/// Body of `POST /api/sync/trigger`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTriggerRequest {
    pub merchant_scope_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_credential: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

/// Payload of the 202 response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncAccepted {
    pub job_id: Uuid,
    pub merchant_scope_id: String,
}

/// What caused a job to be enqueued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobTrigger {
    Manual,
    Scheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_finished(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// Counters for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub items_fetched: usize,
    pub pages_fetched: u32,
    /// The page ceiling was hit before the source ran out of pages
    pub truncated: bool,
    pub models_total: usize,
    /// Every item of the group was already mapped
    pub models_skipped: usize,
    pub models_created: usize,
    pub models_updated: usize,
    /// Base-model tokens abandoned this run
    pub failed_models: Vec<String>,
    pub variants_created: usize,
    pub variants_updated: usize,
    pub mappings_created: usize,
    pub mirror_delivered: usize,
    /// Left in the outbox for the relay
    pub mirror_pending: usize,
    /// Mirror disabled or no linked identity
    pub mirror_skipped: usize,
    /// Neither delivered nor queued
    pub mirror_failed: usize,
    /// Shutdown stopped the run between batches
    pub interrupted: bool,
    pub started_at: i64,
    pub finished_at: i64,
}

/// Observable state of one sync job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: Uuid,
    pub merchant_scope_id: String,
    pub trigger: JobTrigger,
    pub state: JobState,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RunReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

impl JobStatus {
    pub fn queued(job_id: Uuid, merchant_scope_id: impl Into<String>, trigger: JobTrigger, now: i64) -> Self {
        Self {
            job_id,
            merchant_scope_id: merchant_scope_id.into(),
            trigger,
            state: JobState::Queued,
            created_at: now,
            started_at: None,
            finished_at: None,
            report: None,
            error: None,
            error_code: None,
        }
    }
}
