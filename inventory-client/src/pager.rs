//! Pager - drains every page of the source catalog into memory
//!
//! Termination: the source says there are no more pages, or a page came back
//! short (a short page ends the drain even if `has_more_page` is set), or the
//! page ceiling is reached (circuit breaker, reported as `truncated`).
//!
//! Transient failures are retried with exponential backoff; the whole drain,
//! retries included, is bounded by a deadline.

use std::sync::Arc;
use std::time::Duration;

use shared::models::ExternalItem;
use tokio::time::Instant;

use crate::client::{FetchedPage, InventoryApi, SourceCredentials};
use crate::error::{ClientError, ClientResult};

pub const DEFAULT_PAGE_SIZE: u32 = 200;
pub const DEFAULT_MAX_PAGES: u32 = 50;
pub const DEFAULT_DEADLINE_SECS: u64 = 600;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Initial retry delay
const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
/// Max retry delay
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct PagerConfig {
    pub page_size: u32,
    pub max_pages: u32,
    pub deadline: Duration,
    /// Attempts per page, including the first
    pub max_retries: u32,
    pub initial_retry_delay: Duration,
    pub max_retry_delay: Duration,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            deadline: Duration::from_secs(DEFAULT_DEADLINE_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            initial_retry_delay: INITIAL_RETRY_DELAY,
            max_retry_delay: MAX_RETRY_DELAY,
        }
    }
}

/// Result of a full drain
#[derive(Debug, Clone, Default)]
pub struct PagedItems {
    pub items: Vec<ExternalItem>,
    pub pages: u32,
    /// Stopped at the page ceiling while the source still had pages
    pub truncated: bool,
}

pub struct Pager {
    api: Arc<dyn InventoryApi>,
    config: PagerConfig,
}

impl Pager {
    pub fn new(api: Arc<dyn InventoryApi>, config: PagerConfig) -> Self {
        let config = PagerConfig {
            page_size: config.page_size.max(1),
            max_pages: config.max_pages.max(1),
            max_retries: config.max_retries.max(1),
            ..config
        };
        Self { api, config }
    }

    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    /// Fetch every item for one scope, in source order
    pub async fn fetch_all(&self, credentials: &SourceCredentials) -> ClientResult<PagedItems> {
        let deadline = Instant::now() + self.config.deadline;
        match tokio::time::timeout_at(deadline, self.drain(credentials)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    organization_id = %credentials.organization_id,
                    deadline_secs = self.config.deadline.as_secs(),
                    "Inventory fetch deadline exceeded"
                );
                Err(ClientError::DeadlineExceeded(self.config.deadline))
            }
        }
    }

    async fn drain(&self, credentials: &SourceCredentials) -> ClientResult<PagedItems> {
        let mut out = PagedItems::default();

        for page in 1..=self.config.max_pages {
            let fetched = self.fetch_with_retry(credentials, page).await?;
            out.pages = page;

            let full_page = fetched.returned >= self.config.page_size as usize;
            let more = fetched.has_more_page && full_page;

            tracing::debug!(
                page,
                returned = fetched.returned,
                has_more_page = fetched.has_more_page,
                "Fetched inventory page"
            );
            out.items.extend(fetched.items);

            if !more {
                return Ok(out);
            }
        }

        tracing::warn!(
            organization_id = %credentials.organization_id,
            max_pages = self.config.max_pages,
            items = out.items.len(),
            "Inventory page ceiling reached, catalog truncated"
        );
        out.truncated = true;
        Ok(out)
    }

    /// Fetch one page with exponential backoff retry
    async fn fetch_with_retry(
        &self,
        credentials: &SourceCredentials,
        page: u32,
    ) -> ClientResult<FetchedPage> {
        let max_retries = self.config.max_retries;
        let mut delay = self.config.initial_retry_delay;
        let mut attempt = 1;

        loop {
            match self
                .api
                .fetch_page(credentials, page, self.config.page_size)
                .await
            {
                Ok(fetched) => return Ok(fetched),
                Err(e) if e.is_transient() && attempt < max_retries => {
                    tracing::warn!(
                        page,
                        attempt,
                        max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Inventory fetch failed, retrying: {e}"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.config.max_retry_delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    enum Step {
        Page { count: usize, more: bool },
        Fail(u16),
        Hang,
    }

    /// Serves a script of pages; once exhausted repeats full pages with more=true
    struct ScriptedApi {
        steps: Mutex<VecDeque<Step>>,
        calls: Mutex<Vec<u32>>,
    }

    impl ScriptedApi {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<u32> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl InventoryApi for ScriptedApi {
        async fn fetch_page(
            &self,
            _credentials: &SourceCredentials,
            page: u32,
            per_page: u32,
        ) -> ClientResult<FetchedPage> {
            self.calls.lock().push(page);
            let step = self.steps.lock().pop_front().unwrap_or(Step::Page {
                count: per_page as usize,
                more: true,
            });
            match step {
                Step::Page { count, more } => Ok(FetchedPage {
                    items: (0..count)
                        .map(|i| ExternalItem::new(format!("p{page}-{i}")))
                        .collect(),
                    returned: count,
                    has_more_page: more,
                }),
                Step::Fail(status) => Err(ClientError::Status {
                    status,
                    body: "boom".into(),
                }),
                Step::Hang => std::future::pending().await,
            }
        }
    }

    fn creds() -> SourceCredentials {
        SourceCredentials {
            organization_id: "org-1".into(),
            access_credential: "token".into(),
        }
    }

    #[tokio::test]
    async fn test_short_page_stops_despite_flag() {
        let api = ScriptedApi::new(vec![
            Step::Page { count: 200, more: true },
            Step::Page { count: 150, more: true },
        ]);
        let pager = Pager::new(api.clone(), PagerConfig::default());

        let out = pager.fetch_all(&creds()).await.unwrap();
        assert_eq!(out.items.len(), 350);
        assert_eq!(out.pages, 2);
        assert!(!out.truncated);
        assert_eq!(api.calls(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_flag_false_stops_on_full_page() {
        let api = ScriptedApi::new(vec![Step::Page { count: 200, more: false }]);
        let pager = Pager::new(api.clone(), PagerConfig::default());

        let out = pager.fetch_all(&creds()).await.unwrap();
        assert_eq!(out.pages, 1);
        assert_eq!(api.calls(), vec![1]);
    }

    #[tokio::test]
    async fn test_page_ceiling_truncates() {
        let api = ScriptedApi::new(vec![]);
        let pager = Pager::new(
            api.clone(),
            PagerConfig {
                page_size: 10,
                max_pages: 3,
                ..Default::default()
            },
        );

        let out = pager.fetch_all(&creds()).await.unwrap();
        assert!(out.truncated);
        assert_eq!(out.pages, 3);
        assert_eq!(out.items.len(), 30);
        assert_eq!(api.calls(), vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried() {
        let api = ScriptedApi::new(vec![
            Step::Fail(503),
            Step::Fail(429),
            Step::Page { count: 5, more: false },
        ]);
        let pager = Pager::new(api.clone(), PagerConfig::default());

        let out = pager.fetch_all(&creds()).await.unwrap();
        assert_eq!(out.items.len(), 5);
        assert_eq!(api.calls(), vec![1, 1, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_is_fatal() {
        let api = ScriptedApi::new(vec![Step::Fail(500), Step::Fail(500), Step::Fail(500)]);
        let pager = Pager::new(api.clone(), PagerConfig::default());

        let err = pager.fetch_all(&creds()).await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 500, .. }));
        assert_eq!(api.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let api = ScriptedApi::new(vec![Step::Fail(401)]);
        let pager = Pager::new(api.clone(), PagerConfig::default());

        let err = pager.fetch_all(&creds()).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(api.calls(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded() {
        let api = ScriptedApi::new(vec![Step::Page { count: 200, more: true }, Step::Hang]);
        let pager = Pager::new(
            api.clone(),
            PagerConfig {
                deadline: Duration::from_secs(5),
                ..Default::default()
            },
        );

        let err = pager.fetch_all(&creds()).await.unwrap_err();
        assert!(matches!(err, ClientError::DeadlineExceeded(d) if d == Duration::from_secs(5)));
    }
}
