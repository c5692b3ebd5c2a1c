//! External Item Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Named attribute pair supplied by the source (e.g. `Color` = `Navy`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedAttribute {
    pub name: String,
    pub value: String,
}

/// Flat SKU-level record pulled from the inventory system.
///
/// Immutable snapshot for the duration of one sync run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalItem {
    pub item_id: String,
    pub name: Option<String>,
    pub sku: Option<String>,
    /// Unit price
    pub rate: Decimal,
    pub stock_on_hand: i64,
    /// At most two pairs in practice
    pub attributes: Vec<NamedAttribute>,
    /// Absolute image URLs, first-seen order
    pub image_refs: Vec<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
}

impl ExternalItem {
    /// Minimal item, mostly useful when building fixtures
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            name: None,
            sku: None,
            rate: Decimal::ZERO,
            stock_on_hand: 0,
            attributes: Vec::new(),
            image_refs: Vec::new(),
            category: None,
            description: None,
            is_active: true,
        }
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn with_rate(mut self, rate: Decimal) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock_on_hand = stock;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(NamedAttribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}
