//! In-process stores
//!
//! Same semantics as the PostgreSQL stores, behind one `parking_lot` mutex.
//! Used by `STORE_BACKEND=memory` and throughout the tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::models::{
    AttributeSchema, ExternalMapping, IntegrationRecord, MirrorDocument, MirrorEvent, ProductModel, SyncRunRecord,
    Variant, aggregate_variants, mirror_doc_id,
};

use super::{
    BoxError, CatalogStore, LedgerStore, MappingStore, MirrorOutbox, MirrorStore, ModelDraft,
    ModelUpsert, VariantDraft, VariantUpsert,
};

type ScopedKey = (String, String);

#[derive(Default)]
struct Inner {
    next_id: i64,
    products: BTreeMap<i64, ProductModel>,
    product_keys: HashMap<ScopedKey, i64>,
    variants: BTreeMap<i64, Variant>,
    variant_keys: HashMap<ScopedKey, i64>,
    mappings: HashMap<ScopedKey, ExternalMapping>,
    integrations: BTreeMap<String, IntegrationRecord>,
    identities: HashMap<String, String>,
    outbox: BTreeMap<i64, MirrorEvent>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a merchant scope to its owner identity in the mirror
    pub fn link_mirror_owner(&self, merchant_scope_id: &str, owner_id: &str) {
        self.inner
            .lock()
            .identities
            .insert(merchant_scope_id.to_string(), owner_id.to_string());
    }

    /// Seed or overwrite an integration record
    pub fn put_integration(&self, record: IntegrationRecord) {
        self.inner
            .lock()
            .integrations
            .insert(record.merchant_scope_id.clone(), record);
    }

    pub fn products(&self, merchant_scope_id: &str) -> Vec<ProductModel> {
        self.inner
            .lock()
            .products
            .values()
            .filter(|p| p.merchant_scope_id == merchant_scope_id)
            .cloned()
            .collect()
    }

    pub fn product_by_model(&self, merchant_scope_id: &str, base_model: &str) -> Option<ProductModel> {
        let inner = self.inner.lock();
        let id = inner
            .product_keys
            .get(&(merchant_scope_id.to_string(), base_model.to_string()))?;
        inner.products.get(id).cloned()
    }

    pub fn variants_of(&self, product_id: i64) -> Vec<Variant> {
        self.inner
            .lock()
            .variants
            .values()
            .filter(|v| v.product_id == product_id)
            .cloned()
            .collect()
    }

    pub fn mappings(&self, merchant_scope_id: &str) -> Vec<ExternalMapping> {
        let mut out: Vec<_> = self
            .inner
            .lock()
            .mappings
            .values()
            .filter(|m| m.merchant_scope_id == merchant_scope_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.external_item_id.cmp(&b.external_item_id));
        out
    }

    pub fn outbox_events(&self) -> Vec<MirrorEvent> {
        self.inner.lock().outbox.values().cloned().collect()
    }

    /// (products, variants, mappings) row counts across all scopes
    pub fn row_counts(&self) -> (usize, usize, usize) {
        let inner = self.inner.lock();
        (inner.products.len(), inner.variants.len(), inner.mappings.len())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn upsert_model(&self, draft: &ModelDraft, now: i64) -> Result<ModelUpsert, BoxError> {
        let mut inner = self.inner.lock();
        let key = (draft.merchant_scope_id.clone(), draft.base_model.clone());

        if let Some(id) = inner.product_keys.get(&key).copied()
            && let Some(product) = inner.products.get_mut(&id)
        {
            product.updated_at = now;
            return Ok(ModelUpsert {
                product_id: id,
                base_price: product.base_price,
                created: false,
            });
        }

        let id = inner.next_id();
        inner.products.insert(
            id,
            ProductModel {
                id,
                merchant_scope_id: draft.merchant_scope_id.clone(),
                base_model: draft.base_model.clone(),
                title: draft.title.clone(),
                description: draft.description.clone(),
                category: draft.category.clone(),
                base_price: draft.base_price,
                aggregate_stock: 0,
                attribute_schema: AttributeSchema::new(),
                images: draft.images.clone(),
                is_active: false,
                created_at: now,
                updated_at: now,
            },
        );
        inner.product_keys.insert(key, id);

        Ok(ModelUpsert {
            product_id: id,
            base_price: draft.base_price,
            created: true,
        })
    }

    async fn upsert_variant(
        &self,
        merchant_scope_id: &str,
        product_id: i64,
        draft: &VariantDraft,
        now: i64,
    ) -> Result<VariantUpsert, BoxError> {
        let mut inner = self.inner.lock();
        if !inner.products.contains_key(&product_id) {
            return Err(format!("product {product_id} does not exist").into());
        }
        let key = (merchant_scope_id.to_string(), draft.external_item_id.clone());

        if let Some(id) = inner.variant_keys.get(&key).copied()
            && let Some(variant) = inner.variants.get_mut(&id)
        {
            let previous = variant.product_id;
            variant.product_id = product_id;
            variant.sku = draft.sku.clone();
            variant.stock = draft.stock;
            variant.price_delta = draft.price_delta;
            variant.attributes = draft.attributes.clone();
            variant.is_active = draft.is_active;
            variant.updated_at = now;
            return Ok(VariantUpsert {
                variant_id: id,
                created: false,
                previous_product_id: (previous != product_id).then_some(previous),
            });
        }

        let id = inner.next_id();
        inner.variants.insert(
            id,
            Variant {
                id,
                product_id,
                merchant_scope_id: merchant_scope_id.to_string(),
                external_item_id: draft.external_item_id.clone(),
                sku: draft.sku.clone(),
                stock: draft.stock,
                price_delta: draft.price_delta,
                attributes: draft.attributes.clone(),
                is_active: draft.is_active,
                created_at: now,
                updated_at: now,
            },
        );
        inner.variant_keys.insert(key, id);

        Ok(VariantUpsert {
            variant_id: id,
            created: true,
            previous_product_id: None,
        })
    }

    async fn refresh_aggregates(
        &self,
        product_id: i64,
        now: i64,
    ) -> Result<(ProductModel, Vec<Variant>), BoxError> {
        let mut inner = self.inner.lock();
        let variants: Vec<Variant> = inner
            .variants
            .values()
            .filter(|v| v.product_id == product_id)
            .cloned()
            .collect();

        let (stock, schema) = aggregate_variants(&variants);
        let is_active = variants.iter().any(|v| v.is_active);

        let product = inner
            .products
            .get_mut(&product_id)
            .ok_or_else(|| format!("product {product_id} does not exist"))?;
        product.aggregate_stock = stock;
        product.attribute_schema = schema;
        product.is_active = is_active;
        product.updated_at = now;

        Ok((product.clone(), variants))
    }
}

#[async_trait]
impl MappingStore for MemoryStore {
    async fn mapped_item_ids(&self, merchant_scope_id: &str) -> Result<HashSet<String>, BoxError> {
        Ok(self
            .inner
            .lock()
            .mappings
            .keys()
            .filter(|(scope, _)| scope == merchant_scope_id)
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn claim(&self, mapping: &ExternalMapping) -> Result<bool, BoxError> {
        let mut inner = self.inner.lock();
        let key = (
            mapping.merchant_scope_id.clone(),
            mapping.external_item_id.clone(),
        );
        if inner.mappings.contains_key(&key) {
            return Ok(false);
        }
        inner.mappings.insert(key, mapping.clone());
        Ok(true)
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn record_run(&self, run: &SyncRunRecord) -> Result<(), BoxError> {
        self.inner.lock().integrations.insert(
            run.merchant_scope_id.clone(),
            IntegrationRecord {
                merchant_scope_id: run.merchant_scope_id.clone(),
                organization_id: run.organization_id.clone(),
                access_credential: run.access_credential.clone(),
                enabled: true,
                last_sync_at: Some(run.finished_at),
                updated_at: run.finished_at,
            },
        );
        Ok(())
    }

    async fn get_integration(
        &self,
        merchant_scope_id: &str,
    ) -> Result<Option<IntegrationRecord>, BoxError> {
        Ok(self.inner.lock().integrations.get(merchant_scope_id).cloned())
    }

    async fn list_enabled(&self) -> Result<Vec<IntegrationRecord>, BoxError> {
        Ok(self
            .inner
            .lock()
            .integrations
            .values()
            .filter(|r| r.enabled)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MirrorOutbox for MemoryStore {
    async fn mirror_owner(&self, merchant_scope_id: &str) -> Result<Option<String>, BoxError> {
        Ok(self.inner.lock().identities.get(merchant_scope_id).cloned())
    }

    async fn enqueue(
        &self,
        owner_id: &str,
        document: &MirrorDocument,
        now: i64,
    ) -> Result<i64, BoxError> {
        let doc_id = mirror_doc_id(document.product_id);
        let mut inner = self.inner.lock();
        inner
            .outbox
            .retain(|_, e| !(e.owner_id == owner_id && e.doc_id == doc_id));

        let id = inner.next_id();
        inner.outbox.insert(
            id,
            MirrorEvent {
                id,
                owner_id: owner_id.to_string(),
                doc_id,
                document: document.clone(),
                attempts: 0,
                last_error: None,
                created_at: now,
                delivered_at: None,
            },
        );
        Ok(id)
    }

    async fn pending(&self, limit: i64, max_attempts: i32) -> Result<Vec<MirrorEvent>, BoxError> {
        Ok(self
            .inner
            .lock()
            .outbox
            .values()
            .filter(|e| e.delivered_at.is_none() && e.attempts < max_attempts)
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn is_pending(&self, event_id: i64) -> Result<bool, BoxError> {
        Ok(self
            .inner
            .lock()
            .outbox
            .get(&event_id)
            .is_some_and(|e| e.delivered_at.is_none()))
    }

    async fn mark_delivered(&self, event_id: i64, now: i64) -> Result<(), BoxError> {
        if let Some(event) = self.inner.lock().outbox.get_mut(&event_id) {
            event.attempts += 1;
            event.delivered_at = Some(now);
        }
        Ok(())
    }

    async fn mark_failed(&self, event_id: i64, error: &str) -> Result<(), BoxError> {
        if let Some(event) = self.inner.lock().outbox.get_mut(&event_id) {
            event.attempts += 1;
            event.last_error = Some(error.to_string());
        }
        Ok(())
    }
}

/// In-process mirror; can be switched to failing to exercise the outbox
#[derive(Default)]
pub struct MemoryMirror {
    documents: Mutex<HashMap<ScopedKey, MirrorDocument>>,
    failing: AtomicBool,
    puts: AtomicUsize,
}

impl MemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn document(&self, owner_id: &str, doc_id: &str) -> Option<MirrorDocument> {
        self.documents
            .lock()
            .get(&(owner_id.to_string(), doc_id.to_string()))
            .cloned()
    }

    pub fn document_count(&self) -> usize {
        self.documents.lock().len()
    }

    /// Attempted writes, failed ones included
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MirrorStore for MemoryMirror {
    async fn put_document(
        &self,
        owner_id: &str,
        document: &MirrorDocument,
    ) -> Result<(), BoxError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err("mirror unavailable".into());
        }
        self.documents.lock().insert(
            (owner_id.to_string(), document.doc_id.clone()),
            document.clone(),
        );
        Ok(())
    }
}
