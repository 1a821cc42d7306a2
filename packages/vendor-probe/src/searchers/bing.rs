//! Bing Web Search v7.

use async_trait::async_trait;
use tracing::debug;

use super::{check_status, malformed};
use crate::error::{SearchError, SearchResult};
use crate::security::SecretString;
use crate::traits::searcher::{SearchProvider, SearchQuery};
use crate::types::link::Link;

const PROVIDER: &str = "Bing";
const ENDPOINT: &str = "https://api.bing.microsoft.com/v7.0/search";

// Bing uses GB where Google uses UK
const SUPPORTED_COUNTRIES: &[&str] = &["AU", "CA", "IN", "FR", "DE", "JP", "NZ", "GB", "US"];

pub struct BingSearch {
    api_key: SecretString,
    client: reqwest::Client,
}

impl BingSearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn market(country_code: &str) -> &str {
        match country_code {
            "UK" => "GB",
            other => other,
        }
    }
}

#[async_trait]
impl SearchProvider for BingSearch {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn search(&self, query: &SearchQuery) -> SearchResult<Vec<Link>> {
        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            web_pages: Option<WebPages>,
        }

        #[derive(serde::Deserialize)]
        struct WebPages {
            #[serde(default)]
            value: Vec<WebPage>,
        }

        #[derive(serde::Deserialize)]
        struct WebPage {
            name: String,
            url: String,
        }

        let cc = Self::market(&query.country_code);
        if !SUPPORTED_COUNTRIES.contains(&cc) {
            return Err(SearchError::UnsupportedCountry {
                provider: PROVIDER.to_string(),
                country_code: query.country_code.clone(),
            });
        }

        let count = query.limit.max(1).to_string();
        let response = self
            .client
            .get(ENDPOINT)
            .header("Ocp-Apim-Subscription-Key", self.api_key.expose())
            .query(&[
                ("q", query.text.as_str()),
                ("cc", cc),
                ("setLang", "en"),
                ("count", count.as_str()),
            ])
            .send()
            .await?;

        let response = check_status(PROVIDER, response).await?;
        let data: Response = response.json().await.map_err(|e| malformed(PROVIDER, e))?;
        let pages = data.web_pages.map(|w| w.value).unwrap_or_default();

        debug!(query = %query.text, count = pages.len(), "Bing search complete");

        Ok(pages
            .into_iter()
            .map(|page| Link::new(page.url, page.name, PROVIDER, query.text.as_str()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uk_maps_to_gb_market() {
        assert_eq!(BingSearch::market("UK"), "GB");
        assert_eq!(BingSearch::market("IN"), "IN");
    }
}
