//! Persistence layer
//!
//! Store traits consumed by the pipeline, with a PostgreSQL implementation
//! ([`PgStore`]) and an in-process one ([`MemoryStore`]) for development and
//! tests. Errors are boxed at this layer; the API bridges them through
//! [`crate::error::ServiceError`].

pub mod memory;
pub mod mirror_http;
pub mod postgres;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    ExternalMapping, IntegrationRecord, MirrorDocument, MirrorEvent, ProductModel, SyncRunRecord,
    Variant, VariantAttributes,
};

use crate::jobs::ScopeLocks;

pub use memory::{MemoryMirror, MemoryStore};
pub use mirror_http::HttpMirrorStore;
pub use postgres::PgStore;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Creation values for a product. Aggregates are not part of the draft:
/// a new product starts empty and only [`CatalogStore::refresh_aggregates`]
/// writes stock, schema and the active flag.
#[derive(Debug, Clone)]
pub struct ModelDraft {
    pub merchant_scope_id: String,
    pub base_model: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub base_price: Decimal,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelUpsert {
    pub product_id: i64,
    /// Stored base price (set once at creation)
    pub base_price: Decimal,
    pub created: bool,
}

#[derive(Debug, Clone)]
pub struct VariantDraft {
    pub external_item_id: String,
    pub sku: Option<String>,
    pub stock: i64,
    pub price_delta: Decimal,
    pub attributes: VariantAttributes,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantUpsert {
    pub variant_id: i64,
    pub created: bool,
    /// Parent before this upsert, when the variant moved to another product
    pub previous_product_id: Option<i64>,
}

/// Primary relational catalog
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert-if-absent keyed by (scope, base model); an existing product
    /// only has `updated_at` touched
    async fn upsert_model(&self, draft: &ModelDraft, now: i64) -> Result<ModelUpsert, BoxError>;

    /// Insert-or-update keyed by (scope, external item id); re-parents the
    /// variant to `product_id`
    async fn upsert_variant(
        &self,
        merchant_scope_id: &str,
        product_id: i64,
        draft: &VariantDraft,
        now: i64,
    ) -> Result<VariantUpsert, BoxError>;

    /// Recompute aggregate stock, schema and active flag from stored variants
    async fn refresh_aggregates(
        &self,
        product_id: i64,
        now: i64,
    ) -> Result<(ProductModel, Vec<Variant>), BoxError>;
}

/// External id correlation
#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn mapped_item_ids(&self, merchant_scope_id: &str) -> Result<HashSet<String>, BoxError>;

    /// Insert-if-absent. `false` when a mapping already existed.
    async fn claim(&self, mapping: &ExternalMapping) -> Result<bool, BoxError>;
}

/// Per-scope integration record
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn record_run(&self, run: &SyncRunRecord) -> Result<(), BoxError>;

    async fn get_integration(
        &self,
        merchant_scope_id: &str,
    ) -> Result<Option<IntegrationRecord>, BoxError>;

    async fn list_enabled(&self) -> Result<Vec<IntegrationRecord>, BoxError>;
}

/// Mirror identities and the durable outbox
#[async_trait]
pub trait MirrorOutbox: Send + Sync {
    /// Owner identity of the merchant in the mirror, if linked
    async fn mirror_owner(&self, merchant_scope_id: &str) -> Result<Option<String>, BoxError>;

    /// Record a fresh pending event for the document. The outbox holds at
    /// most one row per (owner, document): any earlier row, delivered or
    /// not, is replaced and its id stops existing.
    async fn enqueue(
        &self,
        owner_id: &str,
        document: &MirrorDocument,
        now: i64,
    ) -> Result<i64, BoxError>;

    /// Undelivered events with fewer than `max_attempts` attempts, oldest first
    async fn pending(&self, limit: i64, max_attempts: i32) -> Result<Vec<MirrorEvent>, BoxError>;

    /// Whether the event still exists undelivered, i.e. has not been
    /// superseded or delivered since it was loaded
    async fn is_pending(&self, event_id: i64) -> Result<bool, BoxError>;

    async fn mark_delivered(&self, event_id: i64, now: i64) -> Result<(), BoxError>;

    async fn mark_failed(&self, event_id: i64, error: &str) -> Result<(), BoxError>;
}

/// Secondary denormalized read store
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Overwrite the document keyed by `document.doc_id`
    async fn put_document(&self, owner_id: &str, document: &MirrorDocument)
    -> Result<(), BoxError>;
}

/// Store handles shared by the pipeline, workers and API
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub mappings: Arc<dyn MappingStore>,
    pub ledger: Arc<dyn LedgerStore>,
    pub outbox: Arc<dyn MirrorOutbox>,
    /// `None` when no mirror is configured
    pub mirror: Option<Arc<dyn MirrorStore>>,
    /// Per-document locks shared by the mirror writer and relay
    pub mirror_locks: Arc<ScopeLocks>,
}

impl Stores {
    pub fn postgres(store: PgStore, mirror: Option<Arc<dyn MirrorStore>>) -> Self {
        let store = Arc::new(store);
        Self {
            catalog: store.clone(),
            mappings: store.clone(),
            ledger: store.clone(),
            outbox: store,
            mirror,
            mirror_locks: Arc::new(ScopeLocks::new()),
        }
    }

    pub fn memory(store: Arc<MemoryStore>, mirror: Option<Arc<dyn MirrorStore>>) -> Self {
        Self {
            catalog: store.clone(),
            mappings: store.clone(),
            ledger: store.clone(),
            outbox: store,
            mirror,
            mirror_locks: Arc::new(ScopeLocks::new()),
        }
    }
}
