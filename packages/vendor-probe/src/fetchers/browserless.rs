//! Browserless `/content` fetcher.

use async_trait::async_trait;
use tracing::debug;

use super::validate_url;
use crate::error::{FetchError, FetchResult};
use crate::security::SecretString;
use crate::traits::fetcher::PageFetcher;

/// Navigation timeout handed to the browser, in milliseconds.
const NAVIGATION_TIMEOUT_MS: u64 = 8_000;

pub struct BrowserlessFetcher {
    client: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
    navigation_timeout_ms: u64,
}

impl BrowserlessFetcher {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(SecretString::new),
            navigation_timeout_ms: NAVIGATION_TIMEOUT_MS,
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_navigation_timeout_ms(mut self, ms: u64) -> Self {
        self.navigation_timeout_ms = ms;
        self
    }

    fn request_body(&self, url: &str, blocked_resource_types: &[String]) -> serde_json::Value {
        serde_json::json!({
            "url": url,
            "rejectResourceTypes": blocked_resource_types,
            "gotoOptions": {
                "timeout": self.navigation_timeout_ms,
                "waitUntil": "domcontentloaded",
            },
        })
    }
}

#[async_trait]
impl PageFetcher for BrowserlessFetcher {
    fn name(&self) -> &str {
        "browserless"
    }

    async fn fetch(&self, url: &str, blocked_resource_types: &[String]) -> FetchResult<String> {
        validate_url(url)?;

        let endpoint = format!("{}/content", self.base_url);
        let mut request = self
            .client
            .post(&endpoint)
            .json(&self.request_body(url, blocked_resource_types));
        if let Some(token) = &self.token {
            request = request.query(&[("token", token.expose())]);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::from(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Browser {
                status: status.as_u16(),
                message,
            });
        }

        let html = response.text().await?;
        debug!(url, bytes = html.len(), fetcher = "browserless", "Fetched page");
        Ok(html)
    }
}
