//! Service configuration

use std::str::FromStr;
use std::time::Duration;

use inventory_client::PagerConfig;

use crate::db::BoxError;

pub const DEFAULT_INVENTORY_API_URL: &str = "https://www.zohoapis.com/inventory/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    pub store_backend: StoreBackend,
    /// PostgreSQL connection URL (required for the postgres backend)
    pub database_url: Option<String>,
    pub inventory_api_url: String,
    /// Per-request timeout against the inventory API
    pub inventory_timeout: Duration,
    pub pager: PagerConfig,
    pub batch_size: usize,
    pub batch_pause: Duration,
    pub workers: usize,
    pub queue_capacity: usize,
    /// Scheduled sync interval; `None` disables the scheduler
    pub sync_interval: Option<Duration>,
    pub job_retention: usize,
    /// Mirror store base URL; `None` disables mirroring
    pub mirror_url: Option<String>,
    pub mirror_api_key: Option<String>,
    pub mirror_relay_interval: Duration,
    pub mirror_max_attempts: i32,
    pub log_level: String,
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any key lookup. Unparseable numbers fall back
    /// to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BoxError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let num = |name: &str, default: u64| -> u64 { parse_or(var(name), default) };

        let store_backend = match var("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(format!("STORE_BACKEND must be postgres or memory, got {other}").into());
            }
        };

        let database_url = var("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err("DATABASE_URL must be set".into());
        }

        let pager = PagerConfig {
            page_size: num("INVENTORY_PAGE_SIZE", 200) as u32,
            max_pages: num("INVENTORY_MAX_PAGES", 50) as u32,
            deadline: Duration::from_secs(num("FETCH_DEADLINE_SECS", 600)),
            max_retries: num("FETCH_MAX_RETRIES", 3) as u32,
            ..PagerConfig::default()
        };

        let sync_interval = match num("SYNC_INTERVAL_SECS", 0) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            http_port: parse_or(var("HTTP_PORT"), 8080),
            environment: var("ENVIRONMENT").unwrap_or_else(|| "development".into()),
            store_backend,
            database_url,
            inventory_api_url: var("INVENTORY_API_URL")
                .unwrap_or_else(|| DEFAULT_INVENTORY_API_URL.into()),
            inventory_timeout: Duration::from_secs(num("INVENTORY_TIMEOUT_SECS", 30)),
            pager,
            batch_size: num("SYNC_BATCH_SIZE", 5) as usize,
            batch_pause: Duration::from_millis(num("SYNC_BATCH_PAUSE_MS", 1000)),
            workers: num("SYNC_WORKERS", 2).max(1) as usize,
            queue_capacity: num("SYNC_QUEUE_CAPACITY", 64) as usize,
            sync_interval,
            job_retention: num("JOB_RETENTION", 1000) as usize,
            mirror_url: var("MIRROR_URL"),
            mirror_api_key: var("MIRROR_API_KEY"),
            mirror_relay_interval: Duration::from_secs(num("MIRROR_RELAY_INTERVAL_SECS", 30).max(1)),
            mirror_max_attempts: parse_or(var("MIRROR_MAX_ATTEMPTS"), 10),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: var("LOG_DIR"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}
