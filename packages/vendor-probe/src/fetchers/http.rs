//! Plain HTTP fetcher (no JavaScript rendering).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use tracing::debug;

use super::validate_url;
use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::PageFetcher;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> FetchResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str, _blocked_resource_types: &[String]) -> FetchResult<String> {
        let parsed = validate_url(url)?;

        let response = self.client.get(parsed).send().await.map_err(|e| {
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
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response.text().await?;
        debug!(url, bytes = html.len(), fetcher = "http", "Fetched page");
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_non_http_urls_without_fetching() {
        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch("file:///etc/passwd", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }
}
