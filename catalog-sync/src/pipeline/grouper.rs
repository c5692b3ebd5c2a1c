//! Model grouper - partitions flat items into parent-product candidates

use indexmap::IndexMap;
use shared::models::ExternalItem;

use super::sku::{ParsedItem, parse_item};

#[derive(Debug, Clone)]
pub struct GroupedItem {
    pub item: ExternalItem,
    pub parsed: ParsedItem,
}

/// Items sharing one base-model token, in first-seen order
#[derive(Debug, Clone)]
pub struct ModelGroup {
    pub base_model: String,
    pub items: Vec<GroupedItem>,
}

/// Group by base model, preserving first-seen order of tokens and of items
/// within a token
pub fn group_items(items: Vec<ExternalItem>) -> Vec<ModelGroup> {
    let mut groups: IndexMap<String, Vec<GroupedItem>> = IndexMap::new();
    for item in items {
        let parsed = parse_item(&item);
        groups
            .entry(parsed.base_model.clone())
            .or_default()
            .push(GroupedItem { item, parsed });
    }

    groups
        .into_iter()
        .map(|(base_model, items)| ModelGroup { base_model, items })
        .collect()
}
