//! Batch scheduler - paces reconciliation through fixed-size batches
//!
//! Groups inside a batch run one at a time; the pause between batches is the
//! only pacing. Batches carry no transactional meaning.

use std::time::Duration;

use shared::now_millis;
use shared::sync::RunReport;
use tokio_util::sync::CancellationToken;

use super::grouper::ModelGroup;
use super::mirror::{MirrorOutcome, MirrorWriter};
use super::reconciler::{ReconcileOutcome, Reconciler};

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_millis(1000);

pub struct BatchScheduler {
    batch_size: usize,
    pause: Duration,
}

impl BatchScheduler {
    pub fn new(batch_size: usize, pause: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            pause,
        }
    }

    /// Run every group, filling in the report's model/variant/mirror
    /// counters. Returns `false` when shutdown stopped the run early.
    pub async fn run(
        &self,
        groups: &[ModelGroup],
        reconciler: &Reconciler,
        writer: &MirrorWriter,
        report: &mut RunReport,
        shutdown: &CancellationToken,
    ) -> bool {
        let batches: Vec<&[ModelGroup]> = groups.chunks(self.batch_size).collect();
        let total = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            if shutdown.is_cancelled() {
                tracing::warn!(batch = index + 1, total, "Shutdown requested, stopping between batches");
                return false;
            }

            for group in batch {
                self.process_group(group, reconciler, writer, report).await;
            }

            tracing::debug!(batch = index + 1, total, "Batch complete");

            if index + 1 < total {
                tokio::select! {
                    _ = tokio::time::sleep(self.pause) => {}
                    _ = shutdown.cancelled() => {
                        tracing::warn!(batch = index + 1, total, "Shutdown requested, stopping between batches");
                        return false;
                    }
                }
            }
        }
        true
    }

    async fn process_group(
        &self,
        group: &ModelGroup,
        reconciler: &Reconciler,
        writer: &MirrorWriter,
        report: &mut RunReport,
    ) {
        let now = now_millis();
        match reconciler.reconcile(group, now).await {
            Ok(ReconcileOutcome::Skipped) => report.models_skipped += 1,
            Ok(ReconcileOutcome::Reconciled {
                product,
                variants,
                stats,
            }) => {
                if stats.model_created {
                    report.models_created += 1;
                } else {
                    report.models_updated += 1;
                }
                report.variants_created += stats.variants_created;
                report.variants_updated += stats.variants_updated;
                report.mappings_created += stats.mappings_created;

                match writer.write(&product, &variants, now).await {
                    MirrorOutcome::Delivered => report.mirror_delivered += 1,
                    MirrorOutcome::Pending => report.mirror_pending += 1,
                    MirrorOutcome::Skipped => report.mirror_skipped += 1,
                    MirrorOutcome::Failed => report.mirror_failed += 1,
                }
            }
            Err(e) => {
                tracing::error!(
                    base_model = %group.base_model,
                    items = group.items.len(),
                    error = %e,
                    "Failed to reconcile model, abandoning it for this run"
                );
                report.failed_models.push(group.base_model.clone());
            }
        }
    }
}
