//! Periodic scheduler - enqueues a sync for every enabled integration

use std::sync::Arc;
use std::time::Duration;

use shared::sync::{JobTrigger, SyncTriggerRequest};
use tokio_util::sync::CancellationToken;

use super::queue::JobQueue;
use crate::db::LedgerStore;

pub struct PeriodicScheduler {
    queue: Arc<JobQueue>,
    ledger: Arc<dyn LedgerStore>,
    interval: Duration,
}

impl PeriodicScheduler {
    pub fn new(queue: Arc<JobQueue>, ledger: Arc<dyn LedgerStore>, interval: Duration) -> Self {
        Self {
            queue,
            ledger,
            interval,
        }
    }

    /// Submit one scheduled job per enabled scope that has none pending.
    /// Returns how many were queued.
    pub async fn tick(&self) -> usize {
        let integrations = match self.ledger.list_enabled().await {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list enabled integrations");
                return 0;
            }
        };

        let mut queued = 0;
        for integration in integrations {
            let scope = integration.merchant_scope_id;
            if self.queue.registry().has_active(&scope) {
                tracing::debug!(merchant_scope_id = %scope, "Sync already pending, skipping");
                continue;
            }
            let trigger = SyncTriggerRequest {
                merchant_scope_id: scope.clone(),
                access_credential: None,
                organization_id: None,
            };
            match self.queue.submit(trigger, JobTrigger::Scheduled).await {
                Ok(_) => queued += 1,
                Err(e) => {
                    let err: shared::error::AppError = e.into();
                    tracing::warn!(merchant_scope_id = %scope, error = %err, "Failed to schedule sync");
                }
            }
        }
        queued
    }

    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // the first tick fires immediately; wait a full interval after startup
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Periodic sync scheduler shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    let queued = self.tick().await;
                    tracing::info!(queued, "Scheduled sync pass");
                }
            }
        }
    }
}
