//! Application state

use std::sync::Arc;

use inventory_client::{InventoryApi, Pager, ZohoInventoryClient};
use tokio::sync::{Mutex, mpsc};

use crate::config::{Config, StoreBackend};
use crate::db::{BoxError, HttpMirrorStore, MemoryStore, MirrorStore, PgStore, Stores};
use crate::jobs::{JobQueue, JobRegistry, ScopeLocks, SyncJob};
use crate::pipeline::{PipelineConfig, SyncPipeline};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub queue: Arc<JobQueue>,
    pub registry: Arc<JobRegistry>,
    pub locks: Arc<ScopeLocks>,
    pub pipeline: Arc<SyncPipeline>,
    /// Receiver shared by all sync workers
    pub job_rx: Arc<Mutex<mpsc::Receiver<SyncJob>>>,
}

impl AppState {
    /// Build stores and clients from configuration
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let mirror: Option<Arc<dyn MirrorStore>> = match &config.mirror_url {
            Some(url) => {
                tracing::info!(mirror_url = %url, "Mirror store enabled");
                Some(Arc::new(HttpMirrorStore::new(
                    url,
                    config.mirror_api_key.clone(),
                    config.inventory_timeout,
                )?))
            }
            None => {
                tracing::info!("MIRROR_URL not set, mirror projection disabled");
                None
            }
        };

        let stores = match config.store_backend {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or("DATABASE_URL must be set")?;
                Stores::postgres(PgStore::connect(url).await?, mirror)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory stores, data is lost on restart");
                Stores::memory(Arc::new(MemoryStore::new()), mirror)
            }
        };

        let api: Arc<dyn InventoryApi> = Arc::new(ZohoInventoryClient::new(
            config.inventory_api_url.clone(),
            config.inventory_timeout,
        )?);

        Ok(Self::with_parts(config, stores, api))
    }

    /// Wire the job system around already-built stores and source client
    pub fn with_parts(config: &Config, stores: Stores, api: Arc<dyn InventoryApi>) -> Self {
        let pipeline = Arc::new(SyncPipeline::new(
            Pager::new(api, config.pager.clone()),
            stores.clone(),
            PipelineConfig {
                batch_size: config.batch_size,
                batch_pause: config.batch_pause,
            },
        ));

        let registry = Arc::new(JobRegistry::new(config.job_retention));
        let (queue, rx) = JobQueue::new(
            config.queue_capacity,
            registry.clone(),
            stores.ledger.clone(),
        );

        Self {
            stores,
            queue: Arc::new(queue),
            registry,
            locks: Arc::new(ScopeLocks::new()),
            pipeline,
            job_rx: Arc::new(Mutex::new(rx)),
        }
    }
}
