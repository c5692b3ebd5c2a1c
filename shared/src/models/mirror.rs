//! Mirror Document Model
//!
//! Denormalized product snapshot written to the secondary read store.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::product::{AttributeSchema, ProductModel, Variant, VariantAttributes};

/// Stable per-product document id
pub fn mirror_doc_id(product_id: i64) -> String {
    format!("catalog_{product_id}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorVariant {
    pub external_item_id: String,
    pub sku: Option<String>,
    pub stock: i64,
    pub price: Decimal,
    pub attributes: VariantAttributes,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorDocument {
    pub doc_id: String,
    pub product_id: i64,
    pub merchant_scope_id: String,
    pub base_model: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub base_price: Decimal,
    pub aggregate_stock: i64,
    pub attribute_schema: AttributeSchema,
    pub images: Vec<String>,
    pub is_active: bool,
    pub variants: Vec<MirrorVariant>,
    pub updated_at: i64,
}

impl MirrorDocument {
    /// Flatten a model and its stored variants
    pub fn build(model: &ProductModel, variants: &[Variant]) -> Self {
        Self {
            doc_id: mirror_doc_id(model.id),
            product_id: model.id,
            merchant_scope_id: model.merchant_scope_id.clone(),
            base_model: model.base_model.clone(),
            title: model.title.clone(),
            description: model.description.clone(),
            category: model.category.clone(),
            base_price: model.base_price,
            aggregate_stock: model.aggregate_stock,
            attribute_schema: model.attribute_schema.clone(),
            images: model.images.clone(),
            is_active: model.is_active,
            variants: variants
                .iter()
                .map(|v| MirrorVariant {
                    external_item_id: v.external_item_id.clone(),
                    sku: v.sku.clone(),
                    stock: v.stock,
                    price: model.base_price + v.price_delta,
                    attributes: v.attributes.clone(),
                    is_active: v.is_active,
                })
                .collect(),
            updated_at: model.updated_at,
        }
    }
}

/// Outbox entry: one pending projection for one owner identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorEvent {
    pub id: i64,
    pub owner_id: String,
    pub doc_id: String,
    pub document: MirrorDocument,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub delivered_at: Option<i64>,
}
