//! Mirror projection
//!
//! [`MirrorWriter`] appends each reconciled product to the outbox and tries
//! to deliver it right away; [`MirrorRelay`] re-delivers whatever is left.
//! Neither ever fails a sync run.
//!
//! Both hold the document's lock from outbox to mirror, and the relay only
//! puts an event that is still pending under that lock, so an older
//! snapshot never lands after a newer one.

use std::sync::Arc;
use std::time::Duration;

use shared::models::{MirrorDocument, ProductModel, Variant};
use shared::now_millis;
use tokio_util::sync::CancellationToken;

use crate::db::{MirrorOutbox, MirrorStore};
use crate::jobs::ScopeLocks;

/// Outbox events loaded per relay pass
const RELAY_BATCH: i64 = 100;

fn document_key(owner_id: &str, doc_id: &str) -> String {
    format!("{owner_id}/{doc_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    Delivered,
    /// Left in the outbox for the relay
    Pending,
    /// Mirror disabled or merchant not linked
    Skipped,
    /// Neither delivered nor recorded in the outbox
    Failed,
}

pub struct MirrorWriter {
    outbox: Arc<dyn MirrorOutbox>,
    mirror: Option<Arc<dyn MirrorStore>>,
    locks: Arc<ScopeLocks>,
}

impl MirrorWriter {
    pub fn new(
        outbox: Arc<dyn MirrorOutbox>,
        mirror: Option<Arc<dyn MirrorStore>>,
        locks: Arc<ScopeLocks>,
    ) -> Self {
        Self {
            outbox,
            mirror,
            locks,
        }
    }

    pub async fn write(&self, product: &ProductModel, variants: &[Variant], now: i64) -> MirrorOutcome {
        let Some(mirror) = &self.mirror else {
            return MirrorOutcome::Skipped;
        };

        let owner_id = match self.outbox.mirror_owner(&product.merchant_scope_id).await {
            Ok(Some(owner)) => owner,
            Ok(None) => {
                tracing::debug!(
                    merchant_scope_id = %product.merchant_scope_id,
                    "No mirror identity linked, skipping projection"
                );
                return MirrorOutcome::Skipped;
            }
            Err(e) => {
                tracing::warn!(
                    merchant_scope_id = %product.merchant_scope_id,
                    error = %e,
                    "Failed to resolve mirror identity"
                );
                return MirrorOutcome::Failed;
            }
        };

        let document = MirrorDocument::build(product, variants);
        let _guard = self
            .locks
            .acquire(&document_key(&owner_id, &document.doc_id))
            .await;
        let event_id = match self.outbox.enqueue(&owner_id, &document, now).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(doc_id = %document.doc_id, error = %e, "Failed to append mirror outbox event");
                None
            }
        };

        match mirror.put_document(&owner_id, &document).await {
            Ok(()) => {
                if let Some(id) = event_id
                    && let Err(e) = self.outbox.mark_delivered(id, now_millis()).await
                {
                    tracing::warn!(event_id = id, error = %e, "Failed to mark mirror event delivered");
                }
                MirrorOutcome::Delivered
            }
            Err(e) => {
                tracing::warn!(
                    doc_id = %document.doc_id,
                    base_model = %product.base_model,
                    error = %e,
                    "Mirror write failed, left for relay"
                );
                match event_id {
                    Some(id) => {
                        if let Err(e2) = self.outbox.mark_failed(id, &e.to_string()).await {
                            tracing::warn!(event_id = id, error = %e2, "Failed to record mirror failure");
                        }
                        MirrorOutcome::Pending
                    }
                    None => MirrorOutcome::Failed,
                }
            }
        }
    }
}

/// Re-delivers undelivered outbox events
pub struct MirrorRelay {
    outbox: Arc<dyn MirrorOutbox>,
    mirror: Arc<dyn MirrorStore>,
    locks: Arc<ScopeLocks>,
    max_attempts: i32,
}

impl MirrorRelay {
    pub fn new(
        outbox: Arc<dyn MirrorOutbox>,
        mirror: Arc<dyn MirrorStore>,
        locks: Arc<ScopeLocks>,
        max_attempts: i32,
    ) -> Self {
        Self {
            outbox,
            mirror,
            locks,
            max_attempts,
        }
    }

    /// One pass over pending events; returns how many were delivered
    pub async fn relay_once(&self) -> usize {
        let events = match self.outbox.pending(RELAY_BATCH, self.max_attempts).await {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load pending mirror events");
                return 0;
            }
        };

        let mut delivered = 0;
        for event in events {
            let _guard = self
                .locks
                .acquire(&document_key(&event.owner_id, &event.doc_id))
                .await;
            match self.outbox.is_pending(event.id).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(
                        event_id = event.id,
                        doc_id = %event.doc_id,
                        "Mirror event superseded, skipping"
                    );
                    continue;
                }
                Err(e) => {
                    tracing::warn!(event_id = event.id, error = %e, "Failed to re-check mirror event");
                    continue;
                }
            }

            match self.mirror.put_document(&event.owner_id, &event.document).await {
                Ok(()) => {
                    delivered += 1;
                    if let Err(e) = self.outbox.mark_delivered(event.id, now_millis()).await {
                        tracing::warn!(event_id = event.id, error = %e, "Failed to mark mirror event delivered");
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        event_id = event.id,
                        attempts = event.attempts + 1,
                        error = %e,
                        "Mirror relay delivery failed"
                    );
                    if let Err(e2) = self.outbox.mark_failed(event.id, &e.to_string()).await {
                        tracing::warn!(event_id = event.id, error = %e2, "Failed to record mirror failure");
                    }
                }
            }
        }

        if delivered > 0 {
            tracing::info!(delivered, "Mirror relay delivered pending events");
        }
        delivered
    }

    /// Run until shutdown, one pass per `interval`
    pub async fn run(self, interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Mirror relay shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    self.relay_once().await;
                }
            }
        }
    }
}
