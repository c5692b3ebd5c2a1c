//! Catalog Product Model

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Attribute name (upper-case, e.g. `COLOR`) to the set of observed values
pub type AttributeSchema = BTreeMap<String, BTreeSet<String>>;

/// Attribute name to the single value a variant carries
pub type VariantAttributes = BTreeMap<String, String>;

pub const DEFAULT_CATEGORY: &str = "General";

/// Reconciled parent product.
///
/// Identity within a merchant scope is the base-model token, never the
/// generated id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductModel {
    pub id: i64,
    pub merchant_scope_id: String,
    pub base_model: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub base_price: Decimal,
    /// Sum of variant stock
    pub aggregate_stock: i64,
    pub attribute_schema: AttributeSchema,
    pub images: Vec<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Child of exactly one [`ProductModel`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: i64,
    pub product_id: i64,
    pub merchant_scope_id: String,
    pub external_item_id: String,
    pub sku: Option<String>,
    pub stock: i64,
    /// Item rate minus the parent's base price
    pub price_delta: Decimal,
    pub attributes: VariantAttributes,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Merge a variant's attribute values into a schema
pub fn merge_schema(schema: &mut AttributeSchema, attributes: &VariantAttributes) {
    for (name, value) in attributes {
        schema
            .entry(name.clone())
            .or_default()
            .insert(value.clone());
    }
}

/// Recompute (aggregate stock, schema) from stored variants
pub fn aggregate_variants<'a>(variants: impl IntoIterator<Item = &'a Variant>) -> (i64, AttributeSchema) {
    let mut stock = 0i64;
    let mut schema = AttributeSchema::new();
    for v in variants {
        stock += v.stock;
        merge_schema(&mut schema, &v.attributes);
    }
    (stock, schema)
}
