//! PostgreSQL stores
//!
//! Upserts use `ON CONFLICT` on the natural keys so concurrent runs for the
//! same scope update instead of duplicating. `(xmax = 0)` in `RETURNING`
//! distinguishes an insert from a conflict update.

use std::collections::HashSet;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    AttributeSchema, ExternalMapping, IntegrationRecord, MirrorDocument, MirrorEvent,
    ProductModel, SyncRunRecord, Variant, VariantAttributes, aggregate_variants, mirror_doc_id,
};
use sqlx::PgPool;
use sqlx::types::Json;

use super::{
    BoxError, CatalogStore, LedgerStore, MappingStore, MirrorOutbox, ModelDraft, ModelUpsert,
    VariantDraft, VariantUpsert,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run embedded migrations
    pub async fn connect(database_url: &str) -> Result<Self, BoxError> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ── Row types ──

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    merchant_scope_id: String,
    base_model: String,
    title: String,
    description: String,
    category: String,
    base_price: Decimal,
    aggregate_stock: i64,
    attribute_schema: Json<AttributeSchema>,
    images: Vec<String>,
    is_active: bool,
    created_at: i64,
    updated_at: i64,
}

impl From<ProductRow> for ProductModel {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id,
            merchant_scope_id: r.merchant_scope_id,
            base_model: r.base_model,
            title: r.title,
            description: r.description,
            category: r.category,
            base_price: r.base_price,
            aggregate_stock: r.aggregate_stock,
            attribute_schema: r.attribute_schema.0,
            images: r.images,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct VariantRow {
    id: i64,
    product_id: i64,
    merchant_scope_id: String,
    external_item_id: String,
    sku: Option<String>,
    stock: i64,
    price_delta: Decimal,
    attributes: Json<VariantAttributes>,
    is_active: bool,
    created_at: i64,
    updated_at: i64,
}

impl From<VariantRow> for Variant {
    fn from(r: VariantRow) -> Self {
        Self {
            id: r.id,
            product_id: r.product_id,
            merchant_scope_id: r.merchant_scope_id,
            external_item_id: r.external_item_id,
            sku: r.sku,
            stock: r.stock,
            price_delta: r.price_delta,
            attributes: r.attributes.0,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct IntegrationRow {
    merchant_scope_id: String,
    organization_id: String,
    access_credential: String,
    enabled: bool,
    last_sync_at: Option<i64>,
    updated_at: i64,
}

impl From<IntegrationRow> for IntegrationRecord {
    fn from(r: IntegrationRow) -> Self {
        Self {
            merchant_scope_id: r.merchant_scope_id,
            organization_id: r.organization_id,
            access_credential: r.access_credential,
            enabled: r.enabled,
            last_sync_at: r.last_sync_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OutboxRow {
    id: i64,
    owner_id: String,
    doc_id: String,
    document: Json<MirrorDocument>,
    attempts: i32,
    last_error: Option<String>,
    created_at: i64,
    delivered_at: Option<i64>,
}

impl From<OutboxRow> for MirrorEvent {
    fn from(r: OutboxRow) -> Self {
        Self {
            id: r.id,
            owner_id: r.owner_id,
            doc_id: r.doc_id,
            document: r.document.0,
            attempts: r.attempts,
            last_error: r.last_error,
            created_at: r.created_at,
            delivered_at: r.delivered_at,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, merchant_scope_id, base_model, title, description, category, \
     base_price, aggregate_stock, attribute_schema, images, is_active, created_at, updated_at";

const VARIANT_COLUMNS: &str = "id, product_id, merchant_scope_id, external_item_id, sku, stock, \
     price_delta, attributes, is_active, created_at, updated_at";

// ── Catalog ──

#[async_trait]
impl CatalogStore for PgStore {
    async fn upsert_model(&self, draft: &ModelDraft, now: i64) -> Result<ModelUpsert, BoxError> {
        let row: (i64, Decimal, bool) = sqlx::query_as(
            r#"
            INSERT INTO catalog_products (
                merchant_scope_id, base_model, title, description, category, base_price,
                aggregate_stock, attribute_schema, images, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, 0, '{}'::jsonb, $7, FALSE, $8, $8)
            ON CONFLICT (merchant_scope_id, base_model) DO UPDATE SET
                updated_at = EXCLUDED.updated_at
            RETURNING id, base_price, (xmax = 0) AS created
            "#,
        )
        .bind(&draft.merchant_scope_id)
        .bind(&draft.base_model)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.category)
        .bind(draft.base_price)
        .bind(&draft.images)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(ModelUpsert {
            product_id: row.0,
            base_price: row.1,
            created: row.2,
        })
    }

    async fn upsert_variant(
        &self,
        merchant_scope_id: &str,
        product_id: i64,
        draft: &VariantDraft,
        now: i64,
    ) -> Result<VariantUpsert, BoxError> {
        // `prev` reads the pre-statement snapshot, i.e. the old parent
        let row: (i64, bool, Option<i64>) = sqlx::query_as(
            r#"
            WITH prev AS (
                SELECT product_id FROM catalog_variants
                WHERE merchant_scope_id = $2 AND external_item_id = $3
            )
            INSERT INTO catalog_variants (
                product_id, merchant_scope_id, external_item_id, sku, stock, price_delta,
                attributes, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            ON CONFLICT (merchant_scope_id, external_item_id) DO UPDATE SET
                product_id = EXCLUDED.product_id,
                sku = EXCLUDED.sku,
                stock = EXCLUDED.stock,
                price_delta = EXCLUDED.price_delta,
                attributes = EXCLUDED.attributes,
                is_active = EXCLUDED.is_active,
                updated_at = EXCLUDED.updated_at
            RETURNING id, (xmax = 0) AS created, (SELECT product_id FROM prev)
            "#,
        )
        .bind(product_id)
        .bind(merchant_scope_id)
        .bind(&draft.external_item_id)
        .bind(&draft.sku)
        .bind(draft.stock)
        .bind(draft.price_delta)
        .bind(Json(&draft.attributes))
        .bind(draft.is_active)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(VariantUpsert {
            variant_id: row.0,
            created: row.1,
            previous_product_id: row.2.filter(|prev| *prev != product_id),
        })
    }

    async fn refresh_aggregates(
        &self,
        product_id: i64,
        now: i64,
    ) -> Result<(ProductModel, Vec<Variant>), BoxError> {
        let mut tx = self.pool.begin().await?;

        // Lock the parent row so concurrent refreshes serialize
        sqlx::query("SELECT id FROM catalog_products WHERE id = $1 FOR UPDATE")
            .bind(product_id)
            .fetch_one(&mut *tx)
            .await?;

        let variants: Vec<Variant> = sqlx::query_as::<_, VariantRow>(&format!(
            "SELECT {VARIANT_COLUMNS} FROM catalog_variants WHERE product_id = $1 ORDER BY id"
        ))
        .bind(product_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(Variant::from)
        .collect();

        let (stock, schema) = aggregate_variants(&variants);
        let is_active = variants.iter().any(|v| v.is_active);

        let product: ProductModel = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE catalog_products
            SET aggregate_stock = $2, attribute_schema = $3, is_active = $4, updated_at = $5
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product_id)
        .bind(stock)
        .bind(Json(&schema))
        .bind(is_active)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?
        .into();

        tx.commit().await?;
        Ok((product, variants))
    }
}

// ── Mappings ──

#[async_trait]
impl MappingStore for PgStore {
    async fn mapped_item_ids(&self, merchant_scope_id: &str) -> Result<HashSet<String>, BoxError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT external_item_id FROM external_mappings WHERE merchant_scope_id = $1",
        )
        .bind(merchant_scope_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn claim(&self, mapping: &ExternalMapping) -> Result<bool, BoxError> {
        let result = sqlx::query(
            r#"
            INSERT INTO external_mappings (merchant_scope_id, external_item_id, product_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (merchant_scope_id, external_item_id) DO NOTHING
            "#,
        )
        .bind(&mapping.merchant_scope_id)
        .bind(&mapping.external_item_id)
        .bind(mapping.product_id)
        .bind(mapping.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// ── Ledger ──

#[async_trait]
impl LedgerStore for PgStore {
    async fn record_run(&self, run: &SyncRunRecord) -> Result<(), BoxError> {
        sqlx::query(
            r#"
            INSERT INTO sync_integrations (
                merchant_scope_id, organization_id, access_credential, enabled, last_sync_at, updated_at
            )
            VALUES ($1, $2, $3, TRUE, $4, $4)
            ON CONFLICT (merchant_scope_id) DO UPDATE SET
                organization_id = EXCLUDED.organization_id,
                access_credential = EXCLUDED.access_credential,
                enabled = TRUE,
                last_sync_at = EXCLUDED.last_sync_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&run.merchant_scope_id)
        .bind(&run.organization_id)
        .bind(&run.access_credential)
        .bind(run.finished_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_integration(
        &self,
        merchant_scope_id: &str,
    ) -> Result<Option<IntegrationRecord>, BoxError> {
        let row: Option<IntegrationRow> = sqlx::query_as(
            r#"
            SELECT merchant_scope_id, organization_id, access_credential, enabled, last_sync_at, updated_at
            FROM sync_integrations WHERE merchant_scope_id = $1
            "#,
        )
        .bind(merchant_scope_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_enabled(&self) -> Result<Vec<IntegrationRecord>, BoxError> {
        let rows: Vec<IntegrationRow> = sqlx::query_as(
            r#"
            SELECT merchant_scope_id, organization_id, access_credential, enabled, last_sync_at, updated_at
            FROM sync_integrations WHERE enabled = TRUE ORDER BY merchant_scope_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// ── Mirror outbox ──

#[async_trait]
impl MirrorOutbox for PgStore {
    async fn mirror_owner(&self, merchant_scope_id: &str) -> Result<Option<String>, BoxError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT owner_id FROM merchant_mirror_identities WHERE merchant_scope_id = $1",
        )
        .bind(merchant_scope_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(owner,)| owner))
    }

    async fn enqueue(
        &self,
        owner_id: &str,
        document: &MirrorDocument,
        now: i64,
    ) -> Result<i64, BoxError> {
        let doc_id = mirror_doc_id(document.product_id);

        // A fresh id on conflict makes the replaced event's id disappear
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO mirror_outbox (owner_id, doc_id, document, attempts, created_at)
            VALUES ($1, $2, $3, 0, $4)
            ON CONFLICT (owner_id, doc_id) DO UPDATE SET
                id = DEFAULT,
                document = EXCLUDED.document,
                attempts = 0,
                last_error = NULL,
                created_at = EXCLUDED.created_at,
                delivered_at = NULL
            RETURNING id
            "#,
        )
        .bind(owner_id)
        .bind(&doc_id)
        .bind(Json(document))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn pending(&self, limit: i64, max_attempts: i32) -> Result<Vec<MirrorEvent>, BoxError> {
        let rows: Vec<OutboxRow> = sqlx::query_as(
            r#"
            SELECT id, owner_id, doc_id, document, attempts, last_error, created_at, delivered_at
            FROM mirror_outbox
            WHERE delivered_at IS NULL AND attempts < $1
            ORDER BY id
            LIMIT $2
            "#,
        )
        .bind(max_attempts)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn is_pending(&self, event_id: i64) -> Result<bool, BoxError> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM mirror_outbox WHERE id = $1 AND delivered_at IS NULL)",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    async fn mark_delivered(&self, event_id: i64, now: i64) -> Result<(), BoxError> {
        sqlx::query(
            "UPDATE mirror_outbox SET delivered_at = $2, attempts = attempts + 1 WHERE id = $1",
        )
        .bind(event_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_failed(&self, event_id: i64, error: &str) -> Result<(), BoxError> {
        sqlx::query(
            "UPDATE mirror_outbox SET attempts = attempts + 1, last_error = $2 WHERE id = $1",
        )
        .bind(event_id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
