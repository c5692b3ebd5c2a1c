//! SKU model parser
//!
//! ```text
//! sku       := base [ "-" remainder ]
//! remainder := color "/" size      -- exactly one "/" -> (color, size)
//!            | anything            -- no color/size extracted
//! ```
//!
//! The base model of an item is resolved by [`BASE_MODEL_RULES`], evaluated
//! in order; the first rule that yields a token wins.

use shared::models::{ExternalItem, VariantAttributes};

pub const COLOR: &str = "COLOR";
pub const SIZE: &str = "SIZE";

/// Parts of a SKU string, before any item-level fallback
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkuParts<'a> {
    /// Segment before the first `-`, or the whole SKU when there is none
    pub base: Option<&'a str>,
    pub has_dash: bool,
    pub color: Option<&'a str>,
    pub size: Option<&'a str>,
}

/// Split a SKU by the grammar above
pub fn parse_sku(sku: &str) -> SkuParts<'_> {
    let sku = sku.trim();
    match sku.split_once('-') {
        None => SkuParts {
            base: non_empty(sku),
            ..Default::default()
        },
        Some((base, remainder)) => {
            let (color, size) = match remainder.split('/').collect::<Vec<_>>().as_slice() {
                [color, size] => (non_empty(color), non_empty(size)),
                _ => (None, None),
            };
            SkuParts {
                base: non_empty(base),
                has_dash: true,
                color,
                size,
            }
        }
    }
}

/// Item with its resolved base model and variant attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedItem {
    pub base_model: String,
    pub color: Option<String>,
    pub size: Option<String>,
    /// COLOR/SIZE plus any extra source attributes, upper-cased names
    pub attributes: VariantAttributes,
}

type BaseModelRule = fn(&ExternalItem, &SkuParts<'_>) -> Option<String>;

/// Base model fallback table
pub const BASE_MODEL_RULES: [(&str, BaseModelRule); 4] = [
    ("sku_prefix", sku_prefix),
    ("name_prefix", name_prefix),
    ("bare_sku", bare_sku),
    ("synthetic", synthetic),
];

/// SKU has a `-` and a non-empty segment before it
fn sku_prefix(_: &ExternalItem, sku: &SkuParts<'_>) -> Option<String> {
    sku.has_dash.then_some(sku.base).flatten().map(str::to_string)
}

/// First `-` segment of the display name
fn name_prefix(item: &ExternalItem, _: &SkuParts<'_>) -> Option<String> {
    let name = item.name.as_deref()?;
    non_empty(name.split('-').next().unwrap_or(name)).map(str::to_string)
}

/// Dashless SKU as a whole
fn bare_sku(_: &ExternalItem, sku: &SkuParts<'_>) -> Option<String> {
    (!sku.has_dash).then_some(sku.base).flatten().map(str::to_string)
}

fn synthetic(item: &ExternalItem, _: &SkuParts<'_>) -> Option<String> {
    Some(format!("Item_{}", item.item_id))
}

/// Resolve base model, color, size and attributes for one item. Pure.
pub fn parse_item(item: &ExternalItem) -> ParsedItem {
    let sku = parse_sku(item.sku.as_deref().unwrap_or_default());

    let base_model = BASE_MODEL_RULES
        .iter()
        .find_map(|(_, rule)| rule(item, &sku))
        .unwrap_or_else(|| format!("Item_{}", item.item_id));

    let mut color = sku.color.map(str::to_string);
    let mut size = sku.size.map(str::to_string);
    let mut attributes = VariantAttributes::new();

    // Named source attributes take precedence over SKU-derived values
    for attr in &item.attributes {
        let name = attr.name.trim().to_uppercase();
        let value = attr.value.trim();
        if value.is_empty() {
            continue;
        }
        match name.as_str() {
            "COLOR" | "COLOUR" => color = Some(value.to_string()),
            "SIZE" => size = Some(value.to_string()),
            "" => {}
            _ => {
                attributes.insert(name, value.to_string());
            }
        }
    }

    if let Some(c) = &color {
        attributes.insert(COLOR.to_string(), c.clone());
    }
    if let Some(s) = &size {
        attributes.insert(SIZE.to_string(), s.clone());
    }

    ParsedItem {
        base_model,
        color,
        size,
        attributes,
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}
