//! Sync jobs
//!
//! trigger -> [`JobQueue::submit`] (job `queued`, 202 returned) ->
//! [`SyncWorker`] (scope lock, `running`) -> `succeeded` / `failed`,
//! observable through the [`JobRegistry`].

pub mod locks;
pub mod periodic;
pub mod queue;
pub mod registry;
pub mod worker;

pub use locks::ScopeLocks;
pub use periodic::PeriodicScheduler;
pub use queue::{JobQueue, SyncJob};
pub use registry::JobRegistry;
pub use worker::SyncWorker;
