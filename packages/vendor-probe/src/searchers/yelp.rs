//! Yelp Fusion business search.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{check_status, malformed};
use crate::error::SearchResult;
use crate::security::SecretString;
use crate::traits::searcher::{ProviderKind, SearchProvider, SearchQuery};
use crate::types::link::{BusinessListing, Link};

const PROVIDER: &str = "Yelp";
const ENDPOINT: &str = "https://api.yelp.com/v3/businesses/search";

/// Yelp caps `limit` at 50.
const MAX_LIMIT: usize = 50;

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    businesses: Vec<Business>,
}

#[derive(Deserialize)]
struct Business {
    name: String,
    url: String,
    rating: Option<f32>,
    review_count: Option<u32>,
    coordinates: Option<Coordinates>,
    phone: Option<String>,
    location: Option<Location>,
}

#[derive(Deserialize)]
struct Location {
    #[serde(default)]
    display_address: Vec<String>,
}

#[derive(Deserialize)]
struct Coordinates {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

pub struct YelpSearch {
    api_key: SecretString,
    client: reqwest::Client,
}

impl YelpSearch {
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
}

#[async_trait]
impl SearchProvider for YelpSearch {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Business
    }

    async fn search(&self, query: &SearchQuery) -> SearchResult<Vec<Link>> {
        let limit = query.limit.clamp(1, MAX_LIMIT).to_string();
        let response = self
            .client
            .get(ENDPOINT)
            .bearer_auth(self.api_key.expose())
            .header("accept", "application/json")
            .query(&[
                ("term", query.text.as_str()),
                ("location", query.location.as_str()),
                ("limit", limit.as_str()),
                ("sort_by", "rating"),
            ])
            .send()
            .await?;

        let response = check_status(PROVIDER, response).await?;
        let data: Response = response.json().await.map_err(|e| malformed(PROVIDER, e))?;

        debug!(query = %query.text, count = data.businesses.len(), "Yelp search complete");

        Ok(to_links(data.businesses, &query.text))
    }
}

/// Business page URLs carry per-request tracking parameters; drop them so
/// the same business dedups across queries.
fn to_links(businesses: Vec<Business>, query_text: &str) -> Vec<Link> {
    businesses
        .into_iter()
        .map(|b| {
            let listing = BusinessListing {
                latitude: b.coordinates.as_ref().and_then(|c| c.latitude),
                longitude: b.coordinates.as_ref().and_then(|c| c.longitude),
                rating: b.rating,
                rating_count: b.review_count,
                phone: b.phone.filter(|p| !p.trim().is_empty()),
                address: b
                    .location
                    .map(|l| l.display_address.join(", "))
                    .filter(|a| !a.is_empty()),
            };
            let url = match Url::parse(&b.url) {
                Ok(mut url) => {
                    url.set_query(None);
                    url.to_string()
                }
                Err(_) => b.url,
            };
            Link::new(url, b.name, PROVIDER, query_text).with_listing(listing)
        })
        .collect()
}
