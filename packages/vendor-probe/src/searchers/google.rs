//! Google Programmable Search (Custom Search JSON API).

use async_trait::async_trait;
use tracing::debug;

use super::{check_status, malformed};
use crate::error::{SearchError, SearchResult};
use crate::security::SecretString;
use crate::traits::searcher::{SearchProvider, SearchQuery};
use crate::types::link::Link;

const PROVIDER: &str = "Google";
const ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// The API returns at most 10 results per request.
const MAX_PER_REQUEST: usize = 10;

const SUPPORTED_COUNTRIES: &[&str] = &["AU", "CA", "IN", "FR", "DE", "JP", "NZ", "UK", "US"];

/// Google's `gl` value for an ISO country code. Google spells the United
/// Kingdom `UK`, so the ISO `GB` is mapped onto it.
fn geolocation(country_code: &str) -> Option<&'static str> {
    let code = match country_code {
        "GB" => "UK",
        other => other,
    };
    SUPPORTED_COUNTRIES.iter().copied().find(|c| *c == code)
}

pub struct GoogleSearch {
    api_key: SecretString,
    engine_id: String,
    client: reqwest::Client,
}

impl GoogleSearch {
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key),
            engine_id: engine_id.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl SearchProvider for GoogleSearch {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn search(&self, query: &SearchQuery) -> SearchResult<Vec<Link>> {
        #[derive(serde::Deserialize)]
        struct Response {
            #[serde(default)]
            items: Vec<Item>,
        }

        #[derive(serde::Deserialize)]
        struct Item {
            link: String,
            #[serde(default)]
            title: String,
        }

        let Some(gl) = geolocation(&query.country_code) else {
            return Err(SearchError::UnsupportedCountry {
                provider: PROVIDER.to_string(),
                country_code: query.country_code.clone(),
            });
        };

        let num = query.limit.clamp(1, MAX_PER_REQUEST).to_string();
        let response = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("key", self.api_key.expose()),
                ("cx", self.engine_id.as_str()),
                ("q", query.text.as_str()),
                ("gl", gl),
                ("lr", "lang_en"),
                ("num", num.as_str()),
            ])
            .send()
            .await?;

        let response = check_status(PROVIDER, response).await?;
        let data: Response = response.json().await.map_err(|e| malformed(PROVIDER, e))?;

        debug!(query = %query.text, count = data.items.len(), "Google search complete");

        Ok(data
            .items
            .into_iter()
            .map(|item| Link::new(item.link, item.title, PROVIDER, query.text.as_str()))
            .collect())
    }
}
