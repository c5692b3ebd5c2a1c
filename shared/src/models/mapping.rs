//! External Mapping Model

use serde::{Deserialize, Serialize};

/// (merchant scope, external item id) → internal product id.
///
/// Append-only; never updated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalMapping {
    pub merchant_scope_id: String,
    pub external_item_id: String,
    pub product_id: i64,
    pub created_at: i64,
}
