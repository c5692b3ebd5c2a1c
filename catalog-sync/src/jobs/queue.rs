//! Job queue - validates triggers and hands jobs to the workers

use std::sync::Arc;

use inventory_client::SourceCredentials;
use shared::error::{AppError, ErrorCode};
use shared::now_millis;
use shared::sync::{JobStatus, JobTrigger, SyncTriggerRequest};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::registry::JobRegistry;
use crate::db::LedgerStore;
use crate::error::ServiceError;
use crate::pipeline::SyncRequest;

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Queue entry consumed by a worker
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub job_id: Uuid,
    pub request: SyncRequest,
}

pub struct JobQueue {
    tx: mpsc::Sender<SyncJob>,
    registry: Arc<JobRegistry>,
    ledger: Arc<dyn LedgerStore>,
}

impl JobQueue {
    pub fn new(
        capacity: usize,
        registry: Arc<JobRegistry>,
        ledger: Arc<dyn LedgerStore>,
    ) -> (Self, mpsc::Receiver<SyncJob>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                registry,
                ledger,
            },
            rx,
        )
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Resolve credentials, register a `queued` job and enqueue it
    pub async fn submit(
        &self,
        trigger: SyncTriggerRequest,
        kind: JobTrigger,
    ) -> Result<JobStatus, ServiceError> {
        let request = self.resolve(trigger).await?;
        let status = JobStatus::queued(
            Uuid::new_v4(),
            request.merchant_scope_id.clone(),
            kind,
            now_millis(),
        );
        let job_id = status.job_id;
        self.registry.register(status.clone());

        let job = SyncJob { job_id, request };
        if let Err(e) = self.tx.try_send(job) {
            self.registry.remove(&job_id);
            let err = match e {
                mpsc::error::TrySendError::Full(_) => AppError::new(ErrorCode::SyncQueueFull),
                mpsc::error::TrySendError::Closed(_) => {
                    AppError::busy("Sync workers are shutting down")
                }
            };
            tracing::warn!(merchant_scope_id = %status.merchant_scope_id, "{}", err.message);
            return Err(err.into());
        }

        tracing::info!(
            job_id = %job_id,
            merchant_scope_id = %status.merchant_scope_id,
            trigger = ?kind,
            "Sync job queued"
        );
        Ok(status)
    }

    /// Credentials from the trigger when complete, else from the stored
    /// integration
    async fn resolve(&self, trigger: SyncTriggerRequest) -> Result<SyncRequest, ServiceError> {
        let merchant_scope_id = trigger.merchant_scope_id.trim().to_string();
        if merchant_scope_id.is_empty() {
            return Err(AppError::required("merchant_scope_id").into());
        }

        let supplied = (
            non_empty(trigger.access_credential),
            non_empty(trigger.organization_id),
        );
        if let (Some(access_credential), Some(organization_id)) = supplied {
            return Ok(SyncRequest {
                merchant_scope_id,
                credentials: SourceCredentials {
                    organization_id,
                    access_credential,
                },
            });
        }

        let record = self
            .ledger
            .get_integration(&merchant_scope_id)
            .await?
            .ok_or_else(|| {
                AppError::new(ErrorCode::IntegrationNotFound)
                    .with_detail("merchant_scope_id", merchant_scope_id.clone())
            })?;

        if !record.enabled {
            return Err(AppError::new(ErrorCode::IntegrationDisabled)
                .with_detail("merchant_scope_id", merchant_scope_id)
                .into());
        }
        if record.access_credential.is_empty() || record.organization_id.is_empty() {
            return Err(AppError::new(ErrorCode::CredentialsMissing)
                .with_detail("merchant_scope_id", merchant_scope_id)
                .into());
        }

        Ok(SyncRequest {
            merchant_scope_id,
            credentials: SourceCredentials {
                organization_id: record.organization_id,
                access_credential: record.access_credential,
            },
        })
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use shared::models::IntegrationRecord;
    use shared::sync::JobState;

    fn queue(store: &Arc<MemoryStore>, capacity: usize) -> (JobQueue, mpsc::Receiver<SyncJob>) {
        JobQueue::new(capacity, Arc::new(JobRegistry::default()), store.clone())
    }

    fn trigger(scope: &str, creds: bool) -> SyncTriggerRequest {
        SyncTriggerRequest {
            merchant_scope_id: scope.into(),
            access_credential: creds.then(|| "token".to_string()),
            organization_id: creds.then(|| "org-1".to_string()),
        }
    }

    fn app_code(err: ServiceError) -> ErrorCode {
        match err {
            ServiceError::App(e) => e.code,
            ServiceError::Db(e) => panic!("unexpected db error: {e}"),
        }
    }

    #[tokio::test]
    async fn test_submit_with_credentials() {
        let store = Arc::new(MemoryStore::new());
        let (queue, mut rx) = queue(&store, 4);

        let status = queue.submit(trigger("shop", true), JobTrigger::Manual).await.unwrap();
        assert_eq!(status.state, JobState::Queued);

        let job = rx.recv().await.unwrap();
        assert_eq!(job.job_id, status.job_id);
        assert_eq!(job.request.credentials.organization_id, "org-1");
        assert!(queue.registry().get(&status.job_id).is_some());
    }

    #[tokio::test]
    async fn test_submit_falls_back_to_stored_integration() {
        let store = Arc::new(MemoryStore::new());
        store.put_integration(IntegrationRecord {
            merchant_scope_id: "shop".into(),
            organization_id: "org-9".into(),
            access_credential: "stored".into(),
            enabled: true,
            last_sync_at: None,
            updated_at: 0,
        });
        let (queue, mut rx) = queue(&store, 4);

        queue.submit(trigger("shop", false), JobTrigger::Scheduled).await.unwrap();
        let job = rx.recv().await.unwrap();
        assert_eq!(job.request.credentials.organization_id, "org-9");
        assert_eq!(job.request.credentials.access_credential, "stored");
    }

    #[tokio::test]
    async fn test_rejections() {
        let store = Arc::new(MemoryStore::new());
        let (queue, _rx) = queue(&store, 4);

        let err = queue.submit(trigger("  ", true), JobTrigger::Manual).await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::RequiredField);

        let err = queue.submit(trigger("shop", false), JobTrigger::Manual).await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::IntegrationNotFound);

        store.put_integration(IntegrationRecord {
            merchant_scope_id: "shop".into(),
            organization_id: "org".into(),
            access_credential: "t".into(),
            enabled: false,
            last_sync_at: None,
            updated_at: 0,
        });
        let err = queue.submit(trigger("shop", false), JobTrigger::Manual).await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::IntegrationDisabled);
    }

    #[tokio::test]
    async fn test_full_queue_is_busy() {
        let store = Arc::new(MemoryStore::new());
        let (queue, _rx) = queue(&store, 1);

        queue.submit(trigger("a", true), JobTrigger::Manual).await.unwrap();
        let err = queue.submit(trigger("b", true), JobTrigger::Manual).await.unwrap_err();

        assert_eq!(app_code(err), ErrorCode::SyncQueueFull);
        assert!(!queue.registry().has_active("b"));
    }
}
