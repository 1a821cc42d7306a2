//! Configuration for the probe pipeline.
//!
//! One [`ProbeConfig`] is built at startup and shared by `Arc` with every
//! stage. Each stage reads only its own section.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, Result};

/// Where business-listing results go relative to web results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessPlacement {
    /// Listings first (deep-scrape mode)
    Prepend,
    #[default]
    Append,
}

/// Which contact signals admit a chunk to extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceMode {
    #[default]
    EmailOnly,
    EmailOrPhone,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default)]
    pub federation: FederationConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub segment: SegmentConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

impl ProbeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_federation(mut self, federation: FederationConfig) -> Self {
        self.federation = federation;
        self
    }

    pub fn with_harvest(mut self, harvest: HarvestConfig) -> Self {
        self.harvest = harvest;
        self
    }

    pub fn with_segment(mut self, segment: SegmentConfig) -> Self {
        self.segment = segment;
        self
    }

    pub fn with_extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = extraction;
        self
    }

    /// Reject settings that would make a stage loop or do nothing.
    pub fn validate(&self) -> Result<()> {
        let seg = &self.segment;
        for size in [seg.primary_chunk_size, seg.secondary_chunk_size] {
            if size == 0 {
                return Err(ProbeError::Config("chunk size must be positive".into()));
            }
            if seg.overlap >= size {
                return Err(ProbeError::Config(format!(
                    "overlap {} must be smaller than chunk size {}",
                    seg.overlap, size
                )));
            }
        }
        if self.extraction.batch_size == 0 {
            return Err(ProbeError::Config("batch size must be positive".into()));
        }
        if self.harvest.fetch_concurrency == 0 {
            return Err(ProbeError::Config("fetch concurrency must be positive".into()));
        }
        Ok(())
    }
}

/// Search federation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationConfig {
    /// Cap on unique web links after merging all queries. Default: 40.
    pub max_results: usize,

    /// Cap on business-listing links. Default: 25.
    pub max_business_results: usize,

    /// Results requested from each provider per query. Default: 10.
    pub per_query_limit: usize,

    /// Per-provider call timeout in milliseconds. Default: 5000.
    pub search_timeout_ms: u64,

    /// Links whose URL contains any of these are removed before ranking.
    #[serde(default)]
    pub denied_domains: Vec<String>,

    #[serde(default)]
    pub business_placement: BusinessPlacement,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            max_results: 40,
            max_business_results: 25,
            per_query_limit: 10,
            search_timeout_ms: 5_000,
            denied_domains: [
                "instagram",
                "facebook",
                "twitter",
                "youtube",
                "makemytrip",
                "linkedin",
                "justdial",
                "indeed",
                "reddit",
                "yelp",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            business_placement: BusinessPlacement::Append,
        }
    }
}

impl FederationConfig {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    pub fn with_per_query_limit(mut self, limit: usize) -> Self {
        self.per_query_limit = limit;
        self
    }

    pub fn with_search_timeout_ms(mut self, ms: u64) -> Self {
        self.search_timeout_ms = ms;
        self
    }

    pub fn with_denied_domains(mut self, domains: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.denied_domains = domains.into_iter().map(|d| d.into()).collect();
        self
    }

    pub fn with_business_placement(mut self, placement: BusinessPlacement) -> Self {
        self.business_placement = placement;
        self
    }

    pub fn is_denied(&self, url: &str) -> bool {
        let lowered = url.to_lowercase();
        self.denied_domains.iter().any(|d| lowered.contains(d.as_str()))
    }
}

/// Page harvesting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Concurrent fetches. Default: 16.
    pub fetch_concurrency: usize,

    /// Per-fetch timeout in milliseconds. Default: 8000.
    pub fetch_timeout_ms: u64,

    /// Resource types the renderer should not load.
    pub blocked_resource_types: Vec<String>,

    /// Cap on secondary contact links. Default: 25.
    pub max_secondary_links: usize,

    /// Anchor hrefs containing any of these become secondary links.
    pub contact_keywords: Vec<String>,

    /// Anchor hrefs containing any of these are pagination, also secondary.
    pub pagination_markers: Vec<String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: 16,
            fetch_timeout_ms: 8_000,
            blocked_resource_types: ["stylesheet", "script", "image", "font", "media"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_secondary_links: 25,
            contact_keywords: ["contact", "about", "reach-us", "get-in-touch", "enquiry"]
                .into_iter()
                .map(String::from)
                .collect(),
            pagination_markers: ["page=", "/page/"].into_iter().map(String::from).collect(),
        }
    }
}

impl HarvestConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn with_fetch_concurrency(mut self, n: usize) -> Self {
        self.fetch_concurrency = n;
        self
    }

    pub fn with_fetch_timeout_ms(mut self, ms: u64) -> Self {
        self.fetch_timeout_ms = ms;
        self
    }

    pub fn with_max_secondary_links(mut self, max: usize) -> Self {
        self.max_secondary_links = max;
        self
    }
}

/// Segmentation settings. Sizes are in tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Default: 610.
    pub primary_chunk_size: usize,

    /// Used for secondary contact pages. Default: 500.
    pub secondary_chunk_size: usize,

    /// Tokens shared by consecutive chunks. Default: 15.
    pub overlap: usize,

    #[serde(default)]
    pub relevance: RelevanceMode,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            primary_chunk_size: 610,
            secondary_chunk_size: 500,
            overlap: 15,
            relevance: RelevanceMode::EmailOnly,
        }
    }
}

impl SegmentConfig {
    pub fn with_primary_chunk_size(mut self, size: usize) -> Self {
        self.primary_chunk_size = size;
        self
    }

    pub fn with_secondary_chunk_size(mut self, size: usize) -> Self {
        self.secondary_chunk_size = size;
        self
    }

    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn with_relevance(mut self, mode: RelevanceMode) -> Self {
        self.relevance = mode;
        self
    }
}

/// Extraction fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Chunks per extraction call. Default: 4.
    pub batch_size: usize,

    /// Batches dispatched per request; the rest are dropped. Default: 8.
    pub max_calls: usize,

    /// Per-call timeout in milliseconds. Default: 11000.
    pub call_timeout_ms: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            max_calls: 8,
            call_timeout_ms: 11_000,
        }
    }
}

impl ExtractionConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_max_calls(mut self, max: usize) -> Self {
        self.max_calls = max;
        self
    }

    pub fn with_call_timeout_ms(mut self, ms: u64) -> Self {
        self.call_timeout_ms = ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment() {
        let config = ProbeConfig::default();
        assert_eq!(config.segment.primary_chunk_size, 610);
        assert_eq!(config.segment.secondary_chunk_size, 500);
        assert_eq!(config.segment.overlap, 15);
        assert_eq!(config.extraction.batch_size, 4);
        assert_eq!(config.extraction.max_calls, 8);
        assert_eq!(config.extraction.call_timeout(), Duration::from_secs(11));
        assert_eq!(config.harvest.fetch_timeout(), Duration::from_secs(8));
        assert_eq!(config.federation.search_timeout(), Duration::from_secs(5));
        assert_eq!(config.federation.max_results, 40);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlap_not_below_chunk_size_rejected() {
        let config = ProbeConfig::default()
            .with_segment(SegmentConfig::default().with_secondary_chunk_size(15));
        assert!(matches!(config.validate(), Err(ProbeError::Config(_))));
    }

    #[test]
    fn test_denied_domain_match() {
        let federation = FederationConfig::default();
        assert!(federation.is_denied("https://www.Instagram.com/chef"));
        assert!(!federation.is_denied("https://chefkochi.in"));
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: ProbeConfig =
            serde_json::from_str(r#"{"extraction": {"batch_size": 2, "max_calls": 3, "call_timeout_ms": 500}}"#)
                .unwrap();
        assert_eq!(config.extraction.batch_size, 2);
        assert_eq!(config.segment.primary_chunk_size, 610);
    }
}
