//! Testing utilities including mock implementations.
//!
//! These let applications (and this crate's own tests) run the whole probe
//! without network or model calls. Every mock is configured through
//! builder methods up front and counts its calls for assertions.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ExtractError, ExtractResult, FetchError, FetchResult, SearchError, SearchResult};
use crate::pipeline::segment::find_emails;
use crate::traits::{
    ai::{ContactExtractor, QueryGenerator},
    fetcher::PageFetcher,
    searcher::{ProviderKind, SearchProvider, SearchQuery},
};
use crate::types::{
    chunk::{ChunkId, ContentChunk},
    link::{BusinessListing, Link},
    record::{Contacts, ExtractedRecord},
    request::QueryPlan,
};

/// A mock search provider returning canned URLs per query text.
///
/// Titles are `"{url} via {provider}"` so tests can tell which provider a
/// merged link was first seen from.
pub struct MockSearchProvider {
    name: String,
    kind: ProviderKind,
    results: HashMap<String, Vec<String>>,
    listings: HashMap<String, BusinessListing>,
    failing: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockSearchProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ProviderKind::Web,
            results: HashMap::new(),
            listings: HashMap::new(),
            failing: false,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Mark as a business-listing provider.
    pub fn business(mut self) -> Self {
        self.kind = ProviderKind::Business;
        self
    }

    pub fn with_urls(mut self, query: &str, urls: &[&str]) -> Self {
        self.results
            .insert(query.to_string(), urls.iter().map(|u| u.to_string()).collect());
        self
    }

    /// Attach listing details to every link for `url`.
    pub fn with_listing(mut self, url: &str, listing: BusinessListing) -> Self {
        self.listings.insert(url.to_string(), listing);
        self
    }

    /// Every call returns an API error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn search(&self, query: &SearchQuery) -> SearchResult<Vec<Link>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing {
            return Err(SearchError::Api {
                provider: self.name.clone(),
                status: 500,
                message: "mock failure".to_string(),
            });
        }

        Ok(self
            .results
            .get(&query.text)
            .map(|urls| {
                urls.iter()
                    .map(|url| {
                        let link = Link::new(
                            url.as_str(),
                            format!("{url} via {}", self.name),
                            self.name.as_str(),
                            query.text.as_str(),
                        );
                        match self.listings.get(url) {
                            Some(listing) => link.with_listing(listing.clone()),
                            None => link,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// A mock page fetcher serving canned HTML.
///
/// Unknown URLs answer with HTTP 404. Tracks the peak number of concurrent
/// fetches so tests can assert the harvester's bound.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, String>,
    failures: HashSet<String>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// Fetching `url` fails with a network error.
    pub fn failing(mut self, url: impl Into<String>) -> Self {
        self.failures.insert(url.into());
        self
    }

    pub fn with_delay(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter even when the fetch is cancelled by a
/// timeout.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, url: &str, _blocked_resource_types: &[String]) -> FetchResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(self.in_flight.clone());

        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }

        if self.failures.contains(url) {
            return Err(FetchError::Network(format!("connection refused: {url}")));
        }

        self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

type ExtractFn = dyn Fn(&[ContentChunk]) -> Vec<ExtractedRecord> + Send + Sync;

/// A mock contact extractor.
///
/// Behaviour is a plain function of the batch. Failures and delays are
/// keyed by chunk id so they stay deterministic under concurrency: a batch
/// fails if it contains any failing chunk and waits for the longest delay of
/// its chunks.
pub struct MockExtractor {
    behaviour: Box<ExtractFn>,
    failing: HashSet<ChunkId>,
    delays: HashMap<ChunkId, Duration>,
    calls: AtomicUsize,
}

impl MockExtractor {
    pub fn new(
        behaviour: impl Fn(&[ContentChunk]) -> Vec<ExtractedRecord> + Send + Sync + 'static,
    ) -> Self {
        Self {
            behaviour: Box::new(behaviour),
            failing: HashSet::new(),
            delays: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// One record per email found in each chunk, named after the chunk's
    /// link title.
    pub fn from_emails() -> Self {
        Self::new(|batch| {
            batch
                .iter()
                .flat_map(|chunk| {
                    find_emails(&chunk.text)
                        .into_iter()
                        .map(|email| {
                            ExtractedRecord::new(
                                chunk.id,
                                chunk.source_link.title.clone(),
                                Contacts {
                                    email: email.to_string(),
                                    ..Default::default()
                                },
                            )
                        })
                        .collect::<Vec<_>>()
                })
                .collect()
        })
    }

    pub fn failing_on_chunk(mut self, id: ChunkId) -> Self {
        self.failing.insert(id);
        self
    }

    pub fn with_delay_on_chunk(mut self, id: ChunkId, delay: Duration) -> Self {
        self.delays.insert(id, delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContactExtractor for MockExtractor {
    async fn extract(
        &self,
        batch: &[ContentChunk],
        _goal: &str,
        _targets: &[String],
    ) -> ExtractResult<Vec<ExtractedRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = batch.iter().filter_map(|c| self.delays.get(&c.id)).max().copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if batch.iter().any(|c| self.failing.contains(&c.id)) {
            return Err(ExtractError::Api("mock failure".to_string()));
        }

        Ok((self.behaviour)(batch))
    }
}

/// A mock query generator returning a fixed plan.
pub struct MockQueryGenerator {
    plan: Option<QueryPlan>,
    calls: AtomicUsize,
}

impl MockQueryGenerator {
    pub fn new(plan: QueryPlan) -> Self {
        Self {
            plan: Some(plan),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails.
    pub fn failing() -> Self {
        Self {
            plan: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryGenerator for MockQueryGenerator {
    async fn generate(&self, _goal: &str, _location: &str) -> ExtractResult<QueryPlan> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.plan
            .clone()
            .ok_or_else(|| ExtractError::Api("mock generator failure".to_string()))
    }
}
