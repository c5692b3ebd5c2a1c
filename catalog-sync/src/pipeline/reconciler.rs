//! Reconciler - creates or updates one parent product and its variants
//!
//! Per group:
//! 1. skip when every item is already mapped (snapshot taken once per run)
//! 2. insert the product by base model if absent; creation fields are never
//!    rewritten
//! 3. upsert each variant by external item id, re-parenting it and computing
//!    its price delta against the stored base price
//! 4. recompute aggregates from the stored variants
//! 5. claim a mapping for every item not yet mapped
//!
//! A store error in 2-4 abandons the group; mapping errors are only logged.
//! Aggregates are only ever derived from stored variants, so a group
//! abandoned halfway still gets step 4 for what was written.

use std::collections::HashSet;
use std::sync::Arc;

use shared::models::{DEFAULT_CATEGORY, ExternalMapping, ProductModel, Variant};

use super::grouper::ModelGroup;
use crate::db::{BoxError, CatalogStore, MappingStore, ModelDraft, VariantDraft};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub model_created: bool,
    pub variants_created: usize,
    pub variants_updated: usize,
    pub mappings_created: usize,
}

#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// All items already mapped
    Skipped,
    Reconciled {
        product: ProductModel,
        variants: Vec<Variant>,
        stats: ReconcileStats,
    },
}

pub struct Reconciler {
    catalog: Arc<dyn CatalogStore>,
    mappings: Arc<dyn MappingStore>,
    merchant_scope_id: String,
    /// Item ids mapped at run start
    mapped: HashSet<String>,
}

impl Reconciler {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        mappings: Arc<dyn MappingStore>,
        merchant_scope_id: impl Into<String>,
        mapped: HashSet<String>,
    ) -> Self {
        Self {
            catalog,
            mappings,
            merchant_scope_id: merchant_scope_id.into(),
            mapped,
        }
    }

    pub async fn reconcile(&self, group: &ModelGroup, now: i64) -> Result<ReconcileOutcome, BoxError> {
        if group
            .items
            .iter()
            .all(|g| self.mapped.contains(&g.item.item_id))
        {
            tracing::debug!(base_model = %group.base_model, "All items mapped, skipping model");
            return Ok(ReconcileOutcome::Skipped);
        }

        let draft = self.model_draft(group);
        let model = self.catalog.upsert_model(&draft, now).await?;
        let mut stats = ReconcileStats {
            model_created: model.created,
            ..Default::default()
        };

        let mut stale_parents: Vec<i64> = Vec::new();
        let mut failure: Option<BoxError> = None;
        for grouped in &group.items {
            let item = &grouped.item;
            let variant = VariantDraft {
                external_item_id: item.item_id.clone(),
                sku: item.sku.clone(),
                stock: item.stock_on_hand,
                price_delta: item.rate - model.base_price,
                attributes: grouped.parsed.attributes.clone(),
                is_active: item.is_active,
            };
            let upsert = match self
                .catalog
                .upsert_variant(&self.merchant_scope_id, model.product_id, &variant, now)
                .await
            {
                Ok(upsert) => upsert,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };

            if upsert.created {
                stats.variants_created += 1;
            } else {
                stats.variants_updated += 1;
            }
            if let Some(prev) = upsert.previous_product_id
                && !stale_parents.contains(&prev)
            {
                stale_parents.push(prev);
            }
        }

        // Variants moved here from another model leave its aggregates stale
        for prev in stale_parents {
            if let Err(e) = self.catalog.refresh_aggregates(prev, now).await {
                tracing::warn!(product_id = prev, error = %e, "Failed to refresh previous parent");
            }
        }

        if let Some(e) = failure {
            if let Err(refresh) = self.catalog.refresh_aggregates(model.product_id, now).await {
                tracing::warn!(
                    product_id = model.product_id,
                    error = %refresh,
                    "Failed to refresh aggregates of abandoned model"
                );
            }
            return Err(e);
        }

        let (product, variants) = self.catalog.refresh_aggregates(model.product_id, now).await?;

        for grouped in &group.items {
            let item_id = &grouped.item.item_id;
            if self.mapped.contains(item_id) {
                continue;
            }
            let mapping = ExternalMapping {
                merchant_scope_id: self.merchant_scope_id.clone(),
                external_item_id: item_id.clone(),
                product_id: product.id,
                created_at: now,
            };
            match self.mappings.claim(&mapping).await {
                Ok(true) => stats.mappings_created += 1,
                Ok(false) => {
                    tracing::debug!(item_id = %item_id, "Mapping already claimed by another run");
                }
                Err(e) => {
                    tracing::warn!(
                        item_id = %item_id,
                        base_model = %group.base_model,
                        error = %e,
                        "Failed to insert external mapping"
                    );
                }
            }
        }

        Ok(ReconcileOutcome::Reconciled {
            product,
            variants,
            stats,
        })
    }

    /// Creation values for the group's product
    fn model_draft(&self, group: &ModelGroup) -> ModelDraft {
        let first = group.items.first().map(|g| &g.item);

        let mut images: Vec<String> = Vec::new();
        for grouped in &group.items {
            for url in &grouped.item.image_refs {
                if !images.contains(url) {
                    images.push(url.clone());
                }
            }
        }

        ModelDraft {
            merchant_scope_id: self.merchant_scope_id.clone(),
            base_model: group.base_model.clone(),
            title: group.base_model.clone(),
            description: first
                .and_then(|i| i.description.clone())
                .unwrap_or_else(|| format!("{} with multiple variants", group.base_model)),
            category: first
                .and_then(|i| i.category.clone())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            base_price: first.map(|i| i.rate).unwrap_or_default(),
            images,
        }
    }
}
