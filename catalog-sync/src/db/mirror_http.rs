//! HTTP mirror store
//!
//! `PUT {base}/owners/{owner}/products/{doc_id}` with the JSON document; the
//! mirror treats it as a full overwrite.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shared::models::MirrorDocument;

use super::{BoxError, MirrorStore};

pub struct HttpMirrorStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpMirrorStore {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, BoxError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn document_url(&self, owner_id: &str, doc_id: &str) -> String {
        format!("{}/owners/{owner_id}/products/{doc_id}", self.base_url)
    }
}

#[async_trait]
impl MirrorStore for HttpMirrorStore {
    async fn put_document(
        &self,
        owner_id: &str,
        document: &MirrorDocument,
    ) -> Result<(), BoxError> {
        let url = self.document_url(owner_id, &document.doc_id);
        let mut request = self.client.put(&url).json(document);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Mirror write failed with status {status}: {body}").into());
        }
        Ok(())
    }
}
