//! Data models
//!
//! Shared between the inventory client and the sync service.
//! Internal ids are `i64` (PostgreSQL BIGSERIAL); external ids are the
//! source system's opaque strings. Timestamps are Unix millis.

pub mod external_item;
pub mod integration;
pub mod mapping;
pub mod mirror;
pub mod product;

// Re-exports
pub use external_item::*;
pub use integration::*;
pub use mapping::*;
pub use mirror::*;
pub use product::*;
