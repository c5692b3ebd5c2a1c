//! Sync run ledger - per-scope record of the last finished run

use std::sync::Arc;

use inventory_client::SourceCredentials;
use shared::models::SyncRunRecord;

use crate::db::LedgerStore;

pub struct SyncRunLedger {
    store: Arc<dyn LedgerStore>,
}

impl SyncRunLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Stamp last-sync-time, enable the integration and keep the credentials
    /// for scheduled runs. Failures are logged, never returned.
    pub async fn record(
        &self,
        merchant_scope_id: &str,
        credentials: &SourceCredentials,
        finished_at: i64,
    ) -> bool {
        let run = SyncRunRecord {
            merchant_scope_id: merchant_scope_id.to_string(),
            organization_id: credentials.organization_id.clone(),
            access_credential: credentials.access_credential.clone(),
            finished_at,
        };
        match self.store.record_run(&run).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    merchant_scope_id = %merchant_scope_id,
                    error = %e,
                    "Failed to record sync run"
                );
                false
            }
        }
    }
}
