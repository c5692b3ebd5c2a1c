//! Integration (sync ledger) Model

use serde::{Deserialize, Serialize};

/// Per-scope integration record, upserted once per finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationRecord {
    pub merchant_scope_id: String,
    pub organization_id: String,
    /// Never returned over the API, see [`IntegrationView`]
    pub access_credential: String,
    pub enabled: bool,
    pub last_sync_at: Option<i64>,
    pub updated_at: i64,
}

/// What a finished run writes to the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRunRecord {
    pub merchant_scope_id: String,
    pub organization_id: String,
    pub access_credential: String,
    pub finished_at: i64,
}

/// Integration record without the credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationView {
    pub merchant_scope_id: String,
    pub organization_id: String,
    pub enabled: bool,
    pub last_sync_at: Option<i64>,
    pub updated_at: i64,
}

impl From<IntegrationRecord> for IntegrationView {
    fn from(r: IntegrationRecord) -> Self {
        Self {
            merchant_scope_id: r.merchant_scope_id,
            organization_id: r.organization_id,
            enabled: r.enabled,
            last_sync_at: r.last_sync_at,
            updated_at: r.updated_at,
        }
    }
}
