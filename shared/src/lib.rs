//! Shared types for the catalog sync workspace
//!
//! Domain models exchanged between the inventory client and the sync
//! service, the unified error system, and time utilities.

pub mod error;
pub mod models;
pub mod sync;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use util::now_millis;
