//! catalog-sync - merchant catalog synchronization service
//!
//! Pulls a merchant's flat SKU-level catalog from the inventory system,
//! rebuilds the parent/variant hierarchy from SKU conventions, reconciles it
//! against previously imported state and projects it into the relational
//! catalog and the read mirror. Runs as queued background jobs.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod logger;
pub mod pipeline;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use state::AppState;
