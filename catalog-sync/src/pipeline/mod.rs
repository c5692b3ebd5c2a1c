//! Catalog sync pipeline
//!
//! ```text
//! Pager -> ModelGrouper -> BatchScheduler -> [Reconciler -> MirrorWriter] -> SyncRunLedger
//! ```
//!
//! Stages run strictly in sequence within one run. A fetch failure aborts
//! the run before anything is written; everything after fetching degrades
//! per model instead of failing the run.

pub mod grouper;
pub mod ledger;
pub mod mirror;
pub mod reconciler;
pub mod scheduler;
pub mod sku;

use std::time::Duration;

use inventory_client::{ClientError, Pager, SourceCredentials};
use shared::error::ErrorCode;
use shared::now_millis;
use shared::sync::RunReport;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::db::{BoxError, Stores};

pub use grouper::{GroupedItem, ModelGroup, group_items};
pub use ledger::SyncRunLedger;
pub use mirror::{MirrorOutcome, MirrorRelay, MirrorWriter};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use scheduler::BatchScheduler;
pub use sku::{ParsedItem, parse_item, parse_sku};

/// Run-fatal errors
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Inventory fetch failed: {0}")]
    Fetch(#[from] ClientError),

    #[error("Failed to load external mappings: {0}")]
    MappingSnapshot(BoxError),
}

impl SyncError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SyncError::Fetch(ClientError::DeadlineExceeded(_)) => ErrorCode::SourceDeadlineExceeded,
            SyncError::Fetch(e) if e.is_unauthorized() => ErrorCode::CredentialsRejected,
            SyncError::Fetch(_) => ErrorCode::SourceFetchFailed,
            SyncError::MappingSnapshot(_) => ErrorCode::DatabaseError,
        }
    }
}

/// One merchant scope to sync
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub merchant_scope_id: String,
    pub credentials: SourceCredentials,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub batch_pause: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: scheduler::DEFAULT_BATCH_SIZE,
            batch_pause: scheduler::DEFAULT_BATCH_PAUSE,
        }
    }
}

pub struct SyncPipeline {
    pager: Pager,
    stores: Stores,
    scheduler: BatchScheduler,
    ledger: SyncRunLedger,
}

impl SyncPipeline {
    pub fn new(pager: Pager, stores: Stores, config: PipelineConfig) -> Self {
        Self {
            pager,
            scheduler: BatchScheduler::new(config.batch_size, config.batch_pause),
            ledger: SyncRunLedger::new(stores.ledger.clone()),
            stores,
        }
    }

    /// Run one full sync for a scope
    pub async fn run(
        &self,
        request: &SyncRequest,
        shutdown: &CancellationToken,
    ) -> Result<RunReport, SyncError> {
        let scope = request.merchant_scope_id.as_str();
        let mut report = RunReport {
            started_at: now_millis(),
            ..Default::default()
        };

        tracing::info!(merchant_scope_id = %scope, "Catalog sync started");

        let paged = self.pager.fetch_all(&request.credentials).await.map_err(|e| {
            tracing::error!(merchant_scope_id = %scope, error = %e, "Inventory fetch failed, aborting run");
            SyncError::Fetch(e)
        })?;
        report.items_fetched = paged.items.len();
        report.pages_fetched = paged.pages;
        report.truncated = paged.truncated;

        let groups = group_items(paged.items);
        report.models_total = groups.len();

        let mapped = self
            .stores
            .mappings
            .mapped_item_ids(scope)
            .await
            .map_err(SyncError::MappingSnapshot)?;

        tracing::info!(
            merchant_scope_id = %scope,
            items = report.items_fetched,
            pages = report.pages_fetched,
            models = report.models_total,
            already_mapped = mapped.len(),
            "Catalog fetched and grouped"
        );

        let reconciler = Reconciler::new(
            self.stores.catalog.clone(),
            self.stores.mappings.clone(),
            scope,
            mapped,
        );
        let writer = MirrorWriter::new(
            self.stores.outbox.clone(),
            self.stores.mirror.clone(),
            self.stores.mirror_locks.clone(),
        );

        let completed = self
            .scheduler
            .run(&groups, &reconciler, &writer, &mut report, shutdown)
            .await;
        report.interrupted = !completed;

        report.finished_at = now_millis();
        self.ledger
            .record(scope, &request.credentials, report.finished_at)
            .await;

        tracing::info!(
            merchant_scope_id = %scope,
            created = report.models_created,
            updated = report.models_updated,
            skipped = report.models_skipped,
            failed = report.failed_models.len(),
            truncated = report.truncated,
            interrupted = report.interrupted,
            elapsed_ms = report.finished_at - report.started_at,
            "Catalog sync finished"
        );

        Ok(report)
    }
}
