//! Wire types for the inventory `GET /items` endpoint
//!
//! The source is loose about numbers: `rate` and `stock_on_hand` arrive as
//! JSON numbers or numeric strings, and ids as either. Conversion into
//! [`ExternalItem`] normalizes all of that; unparseable numbers become zero.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use shared::models::{ExternalItem, NamedAttribute};

/// One page of `GET /items`
#[derive(Debug, Clone, Deserialize)]
pub struct ItemsPage {
    /// Application status, `0` on success
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub items: Vec<RawItem>,
    #[serde(default)]
    pub page_context: Option<PageContext>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageContext {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub has_more_page: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImageDocument {
    pub file_path: Option<String>,
    pub attachment_url: Option<String>,
    pub document_url: Option<String>,
}

impl RawImageDocument {
    fn url(&self) -> Option<&str> {
        [&self.file_path, &self.attachment_url, &self.document_url]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub item_id: Value,
    pub name: Option<String>,
    pub sku: Option<String>,
    #[serde(default)]
    pub rate: Value,
    #[serde(default)]
    pub stock_on_hand: Value,
    #[serde(default)]
    pub available_stock: Value,
    pub attribute_name1: Option<String>,
    pub attribute_option_name1: Option<String>,
    pub attribute_name2: Option<String>,
    pub attribute_option_name2: Option<String>,
    pub image_name: Option<String>,
    pub image_documents: Option<Vec<RawImageDocument>>,
    pub category_name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

impl RawItem {
    /// Normalize into the domain item.
    ///
    /// `base_url` and `organization_id` build the canonical item image URL.
    /// Returns `None` when the record carries no usable id.
    pub fn into_external(self, base_url: &str, organization_id: &str) -> Option<ExternalItem> {
        let item_id = lenient_string(&self.item_id)?;

        let stock_on_hand = if self.stock_on_hand.is_null() {
            lenient_i64(&self.available_stock)
        } else {
            lenient_i64(&self.stock_on_hand)
        };

        let attributes = [
            (self.attribute_name1, self.attribute_option_name1),
            (self.attribute_name2, self.attribute_option_name2),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            let name = non_empty(name)?;
            let value = non_empty(value)?;
            Some(NamedAttribute { name, value })
        })
        .collect();

        let mut image_refs: Vec<String> = Vec::new();
        for doc in self.image_documents.iter().flatten() {
            if let Some(url) = doc.url()
                && !image_refs.iter().any(|u| u == url)
            {
                image_refs.push(url.to_string());
            }
        }
        if self.image_name.as_deref().is_some_and(|n| !n.trim().is_empty()) {
            let url = format!(
                "{}/items/{}/image?organization_id={}",
                base_url.trim_end_matches('/'),
                item_id,
                organization_id
            );
            if !image_refs.contains(&url) {
                image_refs.push(url);
            }
        }

        let is_active = self
            .status
            .as_deref()
            .is_none_or(|s| s.eq_ignore_ascii_case("active"));

        Some(ExternalItem {
            item_id,
            name: non_empty(self.name),
            sku: non_empty(self.sku),
            rate: lenient_decimal(&self.rate),
            stock_on_hand,
            attributes,
            image_refs,
            category: non_empty(self.category_name),
            description: non_empty(self.description),
            is_active,
        })
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn lenient_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_decimal(v: &Value) -> Decimal {
    let parsed = match v {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok())),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    };
    parsed.unwrap_or(Decimal::ZERO)
}

fn lenient_i64(v: &Value) -> i64 {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://inventory.test/v1";

    fn parse(v: Value) -> ExternalItem {
        let raw: RawItem = serde_json::from_value(v).unwrap();
        raw.into_external(BASE, "org-1").unwrap()
    }

    #[test]
    fn test_numeric_strings_and_numbers() {
        let a = parse(json!({ "item_id": "1", "rate": "19.90", "stock_on_hand": "4" }));
        assert_eq!(a.rate, Decimal::from_str("19.90").unwrap());
        assert_eq!(a.stock_on_hand, 4);

        let b = parse(json!({ "item_id": 2, "rate": 5.5, "stock_on_hand": 3.0 }));
        assert_eq!(b.item_id, "2");
        assert_eq!(b.rate, Decimal::from_str("5.5").unwrap());
        assert_eq!(b.stock_on_hand, 3);
    }

    #[test]
    fn test_unparseable_numbers_become_zero() {
        let item = parse(json!({ "item_id": "1", "rate": "n/a", "stock_on_hand": null }));
        assert_eq!(item.rate, Decimal::ZERO);
        assert_eq!(item.stock_on_hand, 0);
    }

    #[test]
    fn test_available_stock_fallback() {
        let item = parse(json!({ "item_id": "1", "available_stock": 9 }));
        assert_eq!(item.stock_on_hand, 9);
    }

    #[test]
    fn test_missing_id_is_dropped() {
        let raw: RawItem = serde_json::from_value(json!({ "sku": "AS14" })).unwrap();
        assert!(raw.into_external(BASE, "org-1").is_none());
    }

    #[test]
    fn test_attributes_require_name_and_value() {
        let item = parse(json!({
            "item_id": "1",
            "attribute_name1": "Color",
            "attribute_option_name1": "Navy",
            "attribute_name2": "Size",
            "attribute_option_name2": ""
        }));
        assert_eq!(
            item.attributes,
            vec![NamedAttribute { name: "Color".into(), value: "Navy".into() }]
        );
    }

    #[test]
    fn test_image_references() {
        let item = parse(json!({
            "item_id": "77",
            "image_name": "front.jpg",
            "image_documents": [
                { "file_path": "", "attachment_url": "https://cdn.test/a.jpg" },
                { "document_url": "https://cdn.test/a.jpg" },
                { "document_url": "https://cdn.test/b.jpg" }
            ]
        }));
        assert_eq!(
            item.image_refs,
            vec![
                "https://cdn.test/a.jpg".to_string(),
                "https://cdn.test/b.jpg".to_string(),
                format!("{BASE}/items/77/image?organization_id=org-1"),
            ]
        );
    }

    #[test]
    fn test_status() {
        assert!(parse(json!({ "item_id": "1", "status": "active" })).is_active);
        assert!(!parse(json!({ "item_id": "1", "status": "inactive" })).is_active);
        assert!(parse(json!({ "item_id": "1" })).is_active);
    }

    #[test]
    fn test_page_shape() {
        let page: ItemsPage = serde_json::from_value(json!({
            "code": 0,
            "message": "success",
            "items": [{ "item_id": "1" }],
            "page_context": { "page": 1, "per_page": 200, "has_more_page": true }
        }))
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.page_context.unwrap().has_more_page);
    }
}
