//! End-to-end pipeline runs against the in-memory stores

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use catalog_sync::db::{
    BoxError, CatalogStore, LedgerStore, MemoryMirror, MemoryStore, ModelDraft, ModelUpsert,
    Stores, VariantDraft, VariantUpsert,
};
use catalog_sync::pipeline::{PipelineConfig, SyncError, SyncPipeline, SyncRequest};
use inventory_client::{
    ClientError, ClientResult, FetchedPage, InventoryApi, Pager, PagerConfig, SourceCredentials,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use shared::error::ErrorCode;
use shared::models::{ExternalItem, ProductModel, Variant, mirror_doc_id};
use tokio_util::sync::CancellationToken;

const SCOPE: &str = "shop-1";

/// Serves a fixed catalog split into pages; optionally fails every call
struct FakeInventory {
    pages: Vec<Vec<ExternalItem>>,
    fail_status: Option<u16>,
    calls: Mutex<Vec<u32>>,
}

impl FakeInventory {
    fn new(pages: Vec<Vec<ExternalItem>>) -> Arc<Self> {
        Arc::new(Self {
            pages,
            fail_status: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            pages: Vec::new(),
            fail_status: Some(status),
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl InventoryApi for FakeInventory {
    async fn fetch_page(
        &self,
        _credentials: &SourceCredentials,
        page: u32,
        _per_page: u32,
    ) -> ClientResult<FetchedPage> {
        self.calls.lock().push(page);
        if let Some(status) = self.fail_status {
            return Err(ClientError::Status {
                status,
                body: "rejected".to_string(),
            });
        }
        let index = (page - 1) as usize;
        let items = self.pages.get(index).cloned().unwrap_or_default();
        Ok(FetchedPage {
            returned: items.len(),
            has_more_page: index + 1 < self.pages.len(),
            items,
        })
    }
}

/// Delegates to a memory store but refuses one base model or one item
struct FailingCatalog {
    inner: Arc<MemoryStore>,
    fail_base: Option<&'static str>,
    fail_item: Option<&'static str>,
}

impl FailingCatalog {
    fn model(inner: Arc<MemoryStore>, base: &'static str) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_base: Some(base),
            fail_item: None,
        })
    }

    fn item(inner: Arc<MemoryStore>, item_id: &'static str) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_base: None,
            fail_item: Some(item_id),
        })
    }
}

#[async_trait]
impl CatalogStore for FailingCatalog {
    async fn upsert_model(&self, draft: &ModelDraft, now: i64) -> Result<ModelUpsert, BoxError> {
        if self.fail_base == Some(draft.base_model.as_str()) {
            return Err("constraint violation".into());
        }
        self.inner.upsert_model(draft, now).await
    }

    async fn upsert_variant(
        &self,
        merchant_scope_id: &str,
        product_id: i64,
        draft: &VariantDraft,
        now: i64,
    ) -> Result<VariantUpsert, BoxError> {
        if self.fail_item == Some(draft.external_item_id.as_str()) {
            return Err("constraint violation".into());
        }
        self.inner
            .upsert_variant(merchant_scope_id, product_id, draft, now)
            .await
    }

    async fn refresh_aggregates(
        &self,
        product_id: i64,
        now: i64,
    ) -> Result<(ProductModel, Vec<Variant>), BoxError> {
        self.inner.refresh_aggregates(product_id, now).await
    }
}

fn request() -> SyncRequest {
    SyncRequest {
        merchant_scope_id: SCOPE.to_string(),
        credentials: SourceCredentials {
            organization_id: "org-1".to_string(),
            access_credential: "token-1".to_string(),
        },
    }
}

fn pipeline(api: Arc<dyn InventoryApi>, stores: Stores) -> SyncPipeline {
    SyncPipeline::new(
        Pager::new(api, PagerConfig::default()),
        stores,
        PipelineConfig {
            batch_size: 5,
            batch_pause: Duration::ZERO,
        },
    )
}

fn item(id: &str, sku: &str, rate: i64, stock: i64) -> ExternalItem {
    ExternalItem::new(id)
        .with_sku(sku)
        .with_rate(Decimal::new(rate, 2))
        .with_stock(stock)
}

fn catalog() -> Vec<ExternalItem> {
    vec![
        item("1", "A-RED/S", 1000, 3),
        item("2", "A-BLUE/M", 1200, 4),
        item("3", "B-RED/S", 500, 1),
        item("4", "C-GREEN/L", 800, 0),
    ]
}

#[tokio::test]
async fn test_first_run_builds_hierarchy() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(
        FakeInventory::new(vec![catalog()]),
        Stores::memory(store.clone(), None),
    );

    let report = pipeline
        .run(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.items_fetched, 4);
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.models_total, 3);
    assert_eq!(report.models_created, 3);
    assert_eq!(report.variants_created, 4);
    assert_eq!(report.mappings_created, 4);
    assert_eq!(report.mirror_skipped, 3);
    assert!(report.failed_models.is_empty());
    assert!(!report.interrupted);

    let a = store.product_by_model(SCOPE, "A").unwrap();
    assert_eq!(a.aggregate_stock, 7);
    assert_eq!(a.base_price, Decimal::new(1000, 2));
    assert_eq!(a.category, "General");
    assert!(a.attribute_schema["COLOR"].contains("RED"));
    assert!(a.attribute_schema["COLOR"].contains("BLUE"));

    let variants = store.variants_of(a.id);
    let blue = variants.iter().find(|v| v.external_item_id == "2").unwrap();
    assert_eq!(blue.price_delta, Decimal::new(200, 2));

    let integration = store.get_integration(SCOPE).await.unwrap().unwrap();
    assert!(integration.enabled);
    assert_eq!(integration.organization_id, "org-1");
    assert_eq!(integration.last_sync_at, Some(report.finished_at));
}

#[tokio::test]
async fn test_second_run_creates_no_rows() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(
        FakeInventory::new(vec![catalog()]),
        Stores::memory(store.clone(), None),
    );

    pipeline
        .run(&request(), &CancellationToken::new())
        .await
        .unwrap();
    let after_first = store.row_counts();

    let report = pipeline
        .run(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(store.row_counts(), after_first);
    assert_eq!(report.models_skipped, 3);
    assert_eq!(report.models_created, 0);
    assert_eq!(report.variants_created, 0);
    assert_eq!(report.mappings_created, 0);
}

#[tokio::test]
async fn test_failed_model_does_not_stop_others() {
    let store = Arc::new(MemoryStore::new());
    let mut stores = Stores::memory(store.clone(), None);
    stores.catalog = FailingCatalog::model(store.clone(), "B");

    let report = pipeline(FakeInventory::new(vec![catalog()]), stores)
        .run(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.failed_models, vec!["B".to_string()]);
    assert_eq!(report.models_created, 2);
    assert!(store.product_by_model(SCOPE, "A").is_some());
    assert!(store.product_by_model(SCOPE, "B").is_none());
    assert!(store.product_by_model(SCOPE, "C").is_some());

    let mapped: Vec<String> = store
        .mappings(SCOPE)
        .into_iter()
        .map(|m| m.external_item_id)
        .collect();
    assert_eq!(mapped, vec!["1", "2", "4"]);

    // the abandoned model is picked up by the next healthy run
    let report = pipeline(
        FakeInventory::new(vec![catalog()]),
        Stores::memory(store.clone(), None),
    )
    .run(&request(), &CancellationToken::new())
    .await
    .unwrap();
    assert_eq!(report.models_created, 1);
    assert_eq!(report.models_skipped, 2);
    assert!(store.product_by_model(SCOPE, "B").is_some());
}

#[tokio::test]
async fn test_failed_variant_keeps_aggregates_consistent() {
    let store = Arc::new(MemoryStore::new());
    let mut stores = Stores::memory(store.clone(), None);
    stores.catalog = FailingCatalog::item(store.clone(), "3");
    let items = vec![
        item("1", "A-NB/M", 1000, 3),
        item("2", "A-NB/L", 1000, 0),
        item("3", "A-RD/M", 1000, 7),
    ];

    let report = pipeline(FakeInventory::new(vec![items.clone()]), stores)
        .run(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.failed_models, vec!["A".to_string()]);
    let a = store.product_by_model(SCOPE, "A").unwrap();
    let variants = store.variants_of(a.id);
    assert_eq!(variants.len(), 2);
    assert_eq!(a.aggregate_stock, variants.iter().map(|v| v.stock).sum::<i64>());
    assert_eq!(a.aggregate_stock, 3);
    let colors: Vec<_> = a.attribute_schema["COLOR"].iter().cloned().collect();
    assert_eq!(colors, vec!["NB"]);
    assert!(store.mappings(SCOPE).is_empty());

    // once the item goes through, the whole group lands
    let report = pipeline(
        FakeInventory::new(vec![items]),
        Stores::memory(store.clone(), None),
    )
    .run(&request(), &CancellationToken::new())
    .await
    .unwrap();
    assert!(report.failed_models.is_empty());
    let a = store.product_by_model(SCOPE, "A").unwrap();
    assert_eq!(a.aggregate_stock, 10);
    assert_eq!(store.variants_of(a.id).len(), 3);
    assert_eq!(store.mappings(SCOPE).len(), 3);
}

#[tokio::test]
async fn test_drains_every_page() {
    let items: Vec<ExternalItem> = (0..350)
        .map(|i| item(&i.to_string(), &format!("M{}-C{}/S", i / 10, i % 10), 100, 1))
        .collect();
    let pages = vec![items[..200].to_vec(), items[200..].to_vec()];
    let api = FakeInventory::new(pages);
    let store = Arc::new(MemoryStore::new());

    let report = pipeline(api.clone(), Stores::memory(store.clone(), None))
        .run(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(*api.calls.lock(), vec![1, 2]);
    assert_eq!(report.items_fetched, 350);
    assert_eq!(report.pages_fetched, 2);
    assert!(!report.truncated);
    assert_eq!(report.models_total, 35);
    assert_eq!(store.row_counts(), (35, 350, 350));
}

#[tokio::test]
async fn test_fetch_failure_writes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let result = pipeline(
        FakeInventory::failing(401),
        Stores::memory(store.clone(), None),
    )
    .run(&request(), &CancellationToken::new())
    .await;

    let err = result.unwrap_err();
    assert!(matches!(err, SyncError::Fetch(_)));
    assert_eq!(err.code(), ErrorCode::CredentialsRejected);
    assert_eq!(store.row_counts(), (0, 0, 0));
    assert!(store.get_integration(SCOPE).await.unwrap().is_none());
}

#[tokio::test]
async fn test_shutdown_before_first_batch_interrupts_run() {
    let store = Arc::new(MemoryStore::new());
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let report = pipeline(
        FakeInventory::new(vec![catalog()]),
        Stores::memory(store.clone(), None),
    )
    .run(&request(), &shutdown)
    .await
    .unwrap();

    assert!(report.interrupted);
    assert_eq!(report.models_created, 0);
    assert_eq!(store.row_counts(), (0, 0, 0));
}

#[tokio::test]
async fn test_projects_models_into_mirror() {
    let store = Arc::new(MemoryStore::new());
    store.link_mirror_owner(SCOPE, "owner-1");
    let mirror = Arc::new(MemoryMirror::new());

    let report = pipeline(
        FakeInventory::new(vec![catalog()]),
        Stores::memory(store.clone(), Some(mirror.clone())),
    )
    .run(&request(), &CancellationToken::new())
    .await
    .unwrap();

    assert_eq!(report.mirror_delivered, 3);
    assert_eq!(mirror.document_count(), 3);

    let a = store.product_by_model(SCOPE, "A").unwrap();
    let doc = mirror.document("owner-1", &mirror_doc_id(a.id)).unwrap();
    assert_eq!(doc.aggregate_stock, 7);
    assert_eq!(doc.variants.len(), 2);
    assert!(store.outbox_events().iter().all(|e| e.delivered_at.is_some()));
}

#[tokio::test]
async fn test_unavailable_mirror_leaves_events_pending() {
    let store = Arc::new(MemoryStore::new());
    store.link_mirror_owner(SCOPE, "owner-1");
    let mirror = Arc::new(MemoryMirror::new());
    mirror.set_failing(true);

    let report = pipeline(
        FakeInventory::new(vec![catalog()]),
        Stores::memory(store.clone(), Some(mirror.clone())),
    )
    .run(&request(), &CancellationToken::new())
    .await
    .unwrap();

    assert_eq!(report.mirror_pending, 3);
    assert_eq!(report.models_created, 3);
    let events = store.outbox_events();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.delivered_at.is_none() && e.attempts == 1));
}
