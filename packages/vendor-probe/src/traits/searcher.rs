//! Search provider trait.
//!
//! Each backend (web search engine, maps, reviews site) turns one query into
//! a list of [`Link`]s tagged with its own provider name. The federator
//! decides how provider lists are merged; providers never see each other.
//!
//! ```rust,ignore
//! let google = GoogleSearch::new(api_key, engine_id);
//! let query = SearchQuery::new("event chef kochi", "Kochi", "IN").with_limit(10);
//! let links = google.search(&query).await?;
//! ```

use async_trait::async_trait;

use crate::error::SearchResult;
use crate::types::link::Link;

/// Whether a provider returns web pages or business listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Web,
    Business,
}

/// One provider call.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    pub location: String,
    /// ISO 3166 alpha-2, upper case
    pub country_code: String,
    pub limit: usize,
}

impl SearchQuery {
    pub fn new(
        text: impl Into<String>,
        location: impl Into<String>,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            location: location.into(),
            country_code: country_code.into().to_uppercase(),
            limit: 10,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Stable provider name recorded in `Link::source_providers`.
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind {
        ProviderKind::Web
    }

    /// Run one query. Results are in provider order, unranked.
    async fn search(&self, query: &SearchQuery) -> SearchResult<Vec<Link>>;
}
