//! Sync worker - consumes the job queue
//!
//! Workers share one receiver. Each job holds its scope lock for the whole
//! run, and a panicking run only fails its own job. Shutdown also ends the
//! wait for a scope lock held by another run.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use shared::now_millis;
use shared::sync::JobState;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use super::locks::ScopeLocks;
use super::queue::SyncJob;
use super::registry::JobRegistry;
use crate::pipeline::SyncPipeline;

pub struct SyncWorker {
    id: usize,
    rx: Arc<Mutex<mpsc::Receiver<SyncJob>>>,
    pipeline: Arc<SyncPipeline>,
    registry: Arc<JobRegistry>,
    locks: Arc<ScopeLocks>,
}

impl SyncWorker {
    pub fn new(
        id: usize,
        rx: Arc<Mutex<mpsc::Receiver<SyncJob>>>,
        pipeline: Arc<SyncPipeline>,
        registry: Arc<JobRegistry>,
        locks: Arc<ScopeLocks>,
    ) -> Self {
        Self {
            id,
            rx,
            pipeline,
            registry,
            locks,
        }
    }

    /// Consume jobs until shutdown or until the queue closes
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(worker = self.id, "Sync worker started");

        loop {
            let job = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                job = async { self.rx.lock().await.recv().await } => job,
            };
            let Some(job) = job else {
                break;
            };
            self.process(job, &shutdown).await;
        }

        tracing::info!(worker = self.id, "Sync worker stopped");
    }

    async fn process(&self, job: SyncJob, shutdown: &CancellationToken) {
        let SyncJob { job_id, request } = job;
        let scope = request.merchant_scope_id.clone();

        let _guard = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                tracing::info!(
                    worker = self.id,
                    job_id = %job_id,
                    merchant_scope_id = %scope,
                    "Shutdown while waiting for scope lock, job left queued"
                );
                return;
            }
            guard = self.locks.acquire(&scope) => guard,
        };
        self.registry.update(&job_id, |s| {
            s.state = JobState::Running;
            s.started_at = Some(now_millis());
        });
        tracing::info!(worker = self.id, job_id = %job_id, merchant_scope_id = %scope, "Sync job running");

        let result = AssertUnwindSafe(self.pipeline.run(&request, shutdown))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(report)) => {
                tracing::info!(job_id = %job_id, merchant_scope_id = %scope, "Sync job succeeded");
                self.registry.update(&job_id, |s| {
                    s.state = JobState::Succeeded;
                    s.finished_at = Some(now_millis());
                    s.report = Some(report);
                });
            }
            Ok(Err(e)) => {
                tracing::error!(job_id = %job_id, merchant_scope_id = %scope, error = %e, "Sync job failed");
                let code = e.code();
                self.registry.update(&job_id, |s| {
                    s.state = JobState::Failed;
                    s.finished_at = Some(now_millis());
                    s.error = Some(e.to_string());
                    s.error_code = Some(code);
                });
            }
            Err(panic_info) => {
                let panic_msg: String = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                tracing::error!(
                    job_id = %job_id,
                    merchant_scope_id = %scope,
                    panic = %panic_msg,
                    "Sync job panicked"
                );
                self.registry.update(&job_id, |s| {
                    s.state = JobState::Failed;
                    s.finished_at = Some(now_millis());
                    s.error = Some(format!("Sync job panicked: {panic_msg}"));
                    s.error_code = Some(shared::error::ErrorCode::InternalError);
                });
            }
        }
    }
}
