//! Inventory Client - pulls a merchant's item catalog from the external
//! inventory system
//!
//! - [`InventoryApi`]: one-page fetch abstraction, implemented over reqwest by
//!   [`ZohoInventoryClient`]
//! - [`Pager`]: drains every page into memory under a page ceiling, retry
//!   policy and whole-drain deadline

pub mod client;
pub mod error;
pub mod pager;
pub mod types;

pub use client::{FetchedPage, InventoryApi, SourceCredentials, ZohoInventoryClient};
pub use error::{ClientError, ClientResult};
pub use pager::{PagedItems, Pager, PagerConfig};
