//! Keyed async locks
//!
//! Workers key them by merchant scope to serialize runs for the same scope
//! inside this process; across processes the mapping insert-if-absent and the
//! unique variant key arbitrate. The mirror writer and relay key a separate
//! set by document.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct ScopeLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the key's lock; released when the guard drops
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(key.to_string()).or_default().clone();
        lock.lock_owned().await
    }

    pub fn is_locked(&self, key: &str) -> bool {
        self.locks.get(key).is_some_and(|l| l.try_lock().is_err())
    }
}
