//! Goal-driven vendor discovery.
//!
//! Given a natural-language goal ("find an event chef") and a location, the
//! probe plans search queries, federates them across web and business
//! listing providers, fetches the resulting pages, cuts the cleaned text
//! into token-bounded chunks, and asks an extractor to pull vendor contact
//! details out of the chunks that carry a contact signal.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vendor_probe::{Probe, ProbeConfig, ProbeInput};
//! use vendor_probe::fetchers::HttpFetcher;
//! use vendor_probe::searchers::GoogleSearch;
//!
//! let ai = Arc::new(vendor_probe::ai::OpenAI::from_env()?);
//! let probe = Probe::builder(ProbeConfig::default())
//!     .generator(ai.clone())
//!     .extractor(ai)
//!     .fetcher(Arc::new(HttpFetcher::new()?))
//!     .provider(Arc::new(GoogleSearch::new(key, cx)))
//!     .build()?;
//!
//! let results = probe.run(ProbeInput::new("event chef", "Kochi", "IN")).await?;
//! ```
//!
//! [`Probe::run_stream`] yields partial result sets as extraction batches
//! complete, then one final set.
//!
//! # Modules
//!
//! - [`traits`] - Seams for search providers, page fetchers and the model
//! - [`types`] - Links, chunks, records, request state and configuration
//! - [`pipeline`] - Federation, harvesting, segmentation and extraction
//! - [`searchers`] - Google, Bing, Google Places and Yelp providers
//! - [`fetchers`] - Plain HTTP and headless-browser page fetchers
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod fetchers;
pub mod pipeline;
pub mod searchers;
pub mod security;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

pub use error::{ExtractError, FetchError, ProbeError, Result, SearchError};
pub use traits::{
    ai::{ContactExtractor, QueryGenerator},
    fetcher::PageFetcher,
    searcher::{ProviderKind, SearchProvider, SearchQuery},
};
pub use types::{
    chunk::{ChunkId, ContentChunk},
    config::{
        BusinessPlacement, ExtractionConfig, FederationConfig, HarvestConfig, ProbeConfig,
        RelevanceMode, SegmentConfig,
    },
    link::{BusinessListing, Link},
    outcome::Outcome,
    record::{Contacts, ExtractedRecord, VendorRecord},
    request::{PipelineRequest, QueryPlan},
    response::{ResultMeta, ResultSet, ResultStatus},
};

pub use pipeline::{
    clean_html, contains_contact, DeliveryMode, ExtractionCoordinator, Federator, Harvester,
    Probe, ProbeBuilder, ProbeInput, Seed, Segmenter, Tokenizer, WordTokenizer,
};

#[cfg(feature = "hf-tokenizers")]
pub use pipeline::HfTokenizer;

pub use testing::{MockExtractor, MockFetcher, MockQueryGenerator, MockSearchProvider};
