//! Inventory API client
//!
//! [`InventoryApi`] is the seam the pager (and tests) depend on;
//! [`ZohoInventoryClient`] is the production implementation over reqwest.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shared::models::ExternalItem;

use crate::error::{ClientError, ClientResult};
use crate::types::ItemsPage;

/// Credentials for one merchant scope in the source system
#[derive(Clone, PartialEq, Eq)]
pub struct SourceCredentials {
    pub organization_id: String,
    pub access_credential: String,
}

impl fmt::Debug for SourceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceCredentials")
            .field("organization_id", &self.organization_id)
            .field("access_credential", &"<redacted>")
            .finish()
    }
}

/// One fetched page, already normalized
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    pub items: Vec<ExternalItem>,
    /// Records the source returned, including ones dropped during
    /// normalization; used for the short-page check
    pub returned: usize,
    pub has_more_page: bool,
}

/// Fetch one page of the item catalog
#[async_trait]
pub trait InventoryApi: Send + Sync {
    async fn fetch_page(
        &self,
        credentials: &SourceCredentials,
        page: u32,
        per_page: u32,
    ) -> ClientResult<FetchedPage>;
}

/// Zoho Inventory `GET /items`
pub struct ZohoInventoryClient {
    client: Client,
    base_url: String,
}

impl ZohoInventoryClient {
    /// `base_url` e.g. `https://www.zohoapis.com/inventory/v1`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl InventoryApi for ZohoInventoryClient {
    async fn fetch_page(
        &self,
        credentials: &SourceCredentials,
        page: u32,
        per_page: u32,
    ) -> ClientResult<FetchedPage> {
        let url = format!("{}/items", self.base_url);
        let page_param = page.to_string();
        let per_page_param = per_page.to_string();

        let response = self
            .client
            .get(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Zoho-oauthtoken {}", credentials.access_credential),
            )
            .query(&[
                ("organization_id", credentials.organization_id.as_str()),
                ("page", page_param.as_str()),
                ("per_page", per_page_param.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: ItemsPage = serde_json::from_str(&body)?;

        if let Some(code) = parsed.code
            && code != 0
        {
            return Err(ClientError::Api {
                code,
                message: parsed.message.unwrap_or_default(),
            });
        }

        let returned = parsed.items.len();
        let has_more_page = parsed
            .page_context
            .as_ref()
            .is_some_and(|ctx| ctx.has_more_page);

        let mut items = Vec::with_capacity(returned);
        for raw in parsed.items {
            match raw.into_external(&self.base_url, &credentials.organization_id) {
                Some(item) => items.push(item),
                None => tracing::warn!(page, "Dropping inventory item without item_id"),
            }
        }

        Ok(FetchedPage {
            items,
            returned,
            has_more_page,
        })
    }
}
