//! Probe runner - one goal, end to end.
//!
//! ```rust,ignore
//! let probe = Probe::builder(ProbeConfig::default())
//!     .generator(Arc::new(openai.clone()))
//!     .extractor(Arc::new(openai))
//!     .fetcher(Arc::new(BrowserlessFetcher::new(url, token)))
//!     .provider(Arc::new(GoogleSearch::new(key, cx)))
//!     .build()?;
//!
//! let set = probe.run(ProbeInput::new("event chef", "Kochi", "IN")).await?;
//!
//! let mut stream = probe.run_stream(ProbeInput::new("event chef", "Kochi", "IN"));
//! while let Some(set) = stream.next().await {
//!     println!("{} new", set?.count);
//! }
//! ```

use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use futures::Stream;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{ProbeError, Result};
use crate::pipeline::extract::{
    ChannelSink, DeliveryMode, ExtractionCoordinator, ExtractionSummary, Seed,
};
use crate::pipeline::federate::Federator;
use crate::pipeline::harvest::Harvester;
use crate::pipeline::segment::{Segmenter, Tokenizer};
use crate::traits::ai::{ContactExtractor, QueryGenerator};
use crate::traits::fetcher::PageFetcher;
use crate::traits::searcher::SearchProvider;
use crate::types::chunk::ContentChunk;
use crate::types::config::{BusinessPlacement, ProbeConfig};
use crate::types::link::Link;
use crate::types::outcome::Outcome;
use crate::types::record::VendorRecord;
use crate::types::request::PipelineRequest;
use crate::types::response::ResultSet;

/// Web queries used from a plan; extras are ignored.
const MAX_WEB_QUERIES: usize = 3;

/// Caller input for one probe.
#[derive(Debug, Clone)]
pub struct ProbeInput {
    pub prompt: String,
    pub location: String,
    pub country_code: String,
    /// Prepend business listings and follow contact links one hop
    pub deep_scrape: bool,
}

impl ProbeInput {
    pub fn new(
        prompt: impl Into<String>,
        location: impl Into<String>,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            location: location.into(),
            country_code: country_code.into(),
            deep_scrape: false,
        }
    }

    pub fn with_deep_scrape(mut self, deep: bool) -> Self {
        self.deep_scrape = deep;
        self
    }
}

/// Builder for [`Probe`].
pub struct ProbeBuilder {
    config: ProbeConfig,
    generator: Option<Arc<dyn QueryGenerator>>,
    extractor: Option<Arc<dyn ContactExtractor>>,
    fetcher: Option<Arc<dyn PageFetcher>>,
    tokenizer: Option<Arc<dyn Tokenizer>>,
    providers: Vec<Arc<dyn SearchProvider>>,
}

impl ProbeBuilder {
    pub fn generator(mut self, generator: Arc<dyn QueryGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn ContactExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn build(self) -> Result<Probe> {
        self.config.validate()?;
        let config = Arc::new(self.config);

        let generator = self
            .generator
            .ok_or_else(|| ProbeError::Config("query generator is required".into()))?;
        let extractor = self
            .extractor
            .ok_or_else(|| ProbeError::Config("contact extractor is required".into()))?;
        let fetcher = self
            .fetcher
            .ok_or_else(|| ProbeError::Config("page fetcher is required".into()))?;
        if self.providers.is_empty() {
            return Err(ProbeError::Config("at least one search provider is required".into()));
        }

        let federator = self
            .providers
            .into_iter()
            .fold(Federator::new(config.clone()), Federator::with_provider);

        let segmenter = match self.tokenizer {
            Some(tokenizer) => Segmenter::with_tokenizer(tokenizer, config.clone()),
            None => Segmenter::new(config.clone()),
        };

        Ok(Probe {
            generator,
            federator,
            harvester: Harvester::new(fetcher, config.clone()),
            segmenter,
            coordinator: ExtractionCoordinator::new(extractor, config.clone()),
            config,
        })
    }
}

/// Runs the full pipeline for one goal at a time. Cheap to share behind an
/// `Arc`; holds no per-request state.
pub struct Probe {
    generator: Arc<dyn QueryGenerator>,
    federator: Federator,
    harvester: Harvester,
    segmenter: Segmenter,
    coordinator: ExtractionCoordinator,
    config: Arc<ProbeConfig>,
}

enum Step {
    Batch(Vec<VendorRecord>),
    Done(Outcome<ExtractionSummary>),
}

impl Probe {
    pub fn builder(config: ProbeConfig) -> ProbeBuilder {
        ProbeBuilder {
            config,
            generator: None,
            extractor: None,
            fetcher: None,
            tokenizer: None,
            providers: Vec::new(),
        }
    }

    /// Run to completion and return every record in one set. Listing
    /// contacts come first.
    pub async fn run(&self, input: ProbeInput) -> Result<ResultSet> {
        let (mut request, chunks, seed) = self.prepare(input).await?;
        let plan = request.plan()?.clone();

        match self
            .coordinator
            .gather(&chunks, &seed, &request.prompt, &plan.targets)
            .await
        {
            Outcome::Success(records) => request.push_contacts(records),
            Outcome::Empty => {}
            Outcome::Failure(reason) => return Err(ProbeError::ExtractionFailed(reason)),
        }

        let results = request.take_contacts();
        info!(
            request_id = %request.id,
            results = results.len(),
            elapsed_seconds = request.elapsed_seconds(),
            "Probe complete"
        );
        Ok(ResultSet::assemble(&request, results, true))
    }

    /// Stream one partial set per completed extraction batch, then a final
    /// set with every record. When business listings carry contacts, they
    /// arrive as the first partial.
    ///
    /// Request-level failures are yielded as a single `Err` and end the
    /// stream.
    pub fn run_stream(
        &self,
        input: ProbeInput,
    ) -> Pin<Box<dyn Stream<Item = Result<ResultSet>> + Send + '_>> {
        Box::pin(stream! {
            let (mut request, chunks, seed) = match self.prepare(input).await {
                Ok(prepared) => prepared,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            let targets = match request.plan() {
                Ok(plan) => plan.targets.clone(),
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            let goal = request.prompt.clone();

            let (tx, mut rx) = mpsc::unbounded_channel();
            let mut sink = ChannelSink::new(tx);

            let outcome = {
                let run = self.coordinator.run_into(
                    &chunks,
                    &seed,
                    &goal,
                    &targets,
                    DeliveryMode::Streaming,
                    &mut sink,
                );
                tokio::pin!(run);

                loop {
                    let step = tokio::select! {
                        biased;
                        Some(records) = rx.recv() => Step::Batch(records),
                        outcome = &mut run => Step::Done(outcome),
                    };
                    match step {
                        Step::Batch(records) => {
                            request.push_contacts(records.clone());
                            yield Ok(ResultSet::assemble(&request, records, false));
                        }
                        Step::Done(outcome) => break outcome,
                    }
                }
            };

            while let Ok(records) = rx.try_recv() {
                request.push_contacts(records.clone());
                yield Ok(ResultSet::assemble(&request, records, false));
            }

            match outcome {
                Outcome::Failure(reason) => yield Err(ProbeError::ExtractionFailed(reason)),
                Outcome::Success(_) | Outcome::Empty => {
                    let results = request.take_contacts();
                    info!(
                        request_id = %request.id,
                        results = results.len(),
                        elapsed_seconds = request.elapsed_seconds(),
                        "Probe stream complete"
                    );
                    yield Ok(ResultSet::assemble(&request, results, true));
                }
            }
        })
    }

    /// Plan, federate, harvest and segment. Returns the request with its
    /// plan resolved, the admitted chunks and the listing seed.
    async fn prepare(
        &self,
        input: ProbeInput,
    ) -> Result<(PipelineRequest, Vec<ContentChunk>, Seed)> {
        let request = PipelineRequest::new(input.prompt, input.location, input.country_code)?;
        info!(
            request_id = %request.id,
            prompt = %request.prompt,
            location = %request.location,
            deep_scrape = input.deep_scrape,
            "Probe started"
        );

        let mut plan = self
            .generator
            .generate(&request.prompt, &request.location)
            .await
            .map_err(|e| ProbeError::QueryGeneration(e.to_string()))?;
        plan.web_queries.retain(|q| !q.trim().is_empty());
        plan.web_queries.truncate(MAX_WEB_QUERIES);
        if plan.web_queries.is_empty() && plan.business_query.is_none() {
            return Err(ProbeError::QueryGeneration("plan has no queries".into()));
        }
        debug!(request_id = %request.id, queries = ?plan.web_queries, targets = ?plan.targets, "Search plan resolved");
        request.set_plan(plan)?;
        let plan = request.plan()?;

        let placement = if input.deep_scrape {
            BusinessPlacement::Prepend
        } else {
            self.config.federation.business_placement
        };

        let links = self
            .federator
            .federate(plan, &request.location, &request.country_code, placement)
            .await;
        if links.is_empty() {
            return Err(ProbeError::NoSearchResults);
        }
        let listed: Vec<Link> = links
            .iter()
            .filter(|l| l.listing.as_ref().is_some_and(|x| x.has_contacts()))
            .cloned()
            .collect();

        let primary = self.harvester.harvest(links, &HashSet::new()).await;
        let segments = &self.config.segment;
        let mut report = self
            .segmenter
            .segment(&primary.pages, segments.primary_chunk_size, 0);

        if input.deep_scrape && !primary.secondary_links.is_empty() {
            let secondary = self
                .harvester
                .harvest(primary.secondary_links.clone(), &primary.seen_urls())
                .await;
            let extra = self.segmenter.segment(
                &secondary.pages,
                segments.secondary_chunk_size,
                report.next_id(),
            );
            report.chunks.extend(extra.chunks);
            report.unused.extend(extra.unused);
        }

        let seed = Seed::from_listings(&listed, report.next_id());
        if report.chunks.is_empty() && seed.is_empty() {
            return Err(ProbeError::NoContent);
        }

        info!(
            request_id = %request.id,
            chunks = report.chunks.len(),
            listing_records = seed.records.len(),
            unused_pages = report.unused.len(),
            "Content ready for extraction"
        );

        Ok((request, report.chunks, seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockExtractor, MockFetcher, MockQueryGenerator, MockSearchProvider};
    use crate::types::link::BusinessListing;
    use crate::types::request::QueryPlan;
    use futures::StreamExt;

    fn plan() -> QueryPlan {
        QueryPlan::new(vec!["event chef".into()], vec!["event chef kochi".into()])
    }

    fn builder(generator: MockQueryGenerator, fetcher: MockFetcher) -> ProbeBuilder {
        Probe::builder(ProbeConfig::default())
            .generator(Arc::new(generator))
            .extractor(Arc::new(MockExtractor::from_emails()))
            .fetcher(Arc::new(fetcher))
            .provider(Arc::new(MockSearchProvider::new("alpha").with_urls(
                "event chef kochi",
                &["https://anu.in", "https://biju.in"],
            )))
    }

    fn fetcher() -> MockFetcher {
        MockFetcher::new()
            .with_page(
                "https://anu.in",
                r#"<p>Anu Caterers anu@anu.in</p><a href="/contact">Contact</a>"#,
            )
            .with_page("https://biju.in", "<p>Biju events biju@biju.in</p>")
            .with_page("https://anu.in/contact", "<p>Bookings: bookings@anu.in</p>")
    }

    #[tokio::test]
    async fn test_run_returns_completed_set() {
        let probe = builder(MockQueryGenerator::new(plan()), fetcher()).build().unwrap();

        let set = probe.run(ProbeInput::new("event chef", "Kochi", "IN")).await.unwrap();

        assert!(!set.has_more);
        assert_eq!(set.count, 2);
        assert_eq!(set.count, set.results.len());
        assert_eq!(set.meta.queries, vec!["event chef kochi"]);
        let ranks: Vec<_> = set.results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_deep_scrape_follows_contact_links() {
        let probe = builder(MockQueryGenerator::new(plan()), fetcher()).build().unwrap();

        let set = probe
            .run(ProbeInput::new("event chef", "Kochi", "IN").with_deep_scrape(true))
            .await
            .unwrap();

        assert_eq!(set.count, 3);
        let child = set
            .results
            .iter()
            .find(|r| r.contacts.email == "bookings@anu.in")
            .unwrap();
        assert_eq!(child.base_url.as_deref(), Some("https://anu.in"));
    }

    #[tokio::test]
    async fn test_stream_yields_partials_then_final() {
        let probe = Probe::builder(
            ProbeConfig::default().with_extraction(
                crate::types::config::ExtractionConfig::default().with_batch_size(1),
            ),
        )
        .generator(Arc::new(MockQueryGenerator::new(plan())))
        .extractor(Arc::new(MockExtractor::from_emails()))
        .fetcher(Arc::new(fetcher()))
        .provider(Arc::new(MockSearchProvider::new("alpha").with_urls(
            "event chef kochi",
            &["https://anu.in", "https://biju.in"],
        )))
        .build()
        .unwrap();

        let sets: Vec<_> = probe
            .run_stream(ProbeInput::new("event chef", "Kochi", "IN"))
            .collect()
            .await;

        assert_eq!(sets.len(), 3);
        let sets: Vec<ResultSet> = sets.into_iter().map(|s| s.unwrap()).collect();
        assert!(sets[..2].iter().all(|s| s.has_more && s.count == 1));
        let last = &sets[2];
        assert!(!last.has_more);
        assert_eq!(last.count, 2);
        assert_eq!(last.id, sets[0].id);
    }

    fn with_listed_chef(builder: ProbeBuilder) -> ProbeBuilder {
        builder.provider(Arc::new(
            MockSearchProvider::new("maps")
                .business()
                .with_urls("chef near kochi", &["https://chefkochi.in"])
                .with_listing(
                    "https://chefkochi.in",
                    BusinessListing {
                        phone: Some("0484 235 1234".into()),
                        address: Some("MG Road, Kochi".into()),
                        rating: Some(4.7),
                        ..Default::default()
                    },
                ),
        ))
    }

    fn listing_fetcher() -> MockFetcher {
        fetcher().with_page("https://chefkochi.in", "<p>Chef Kochi. Wedding menus.</p>")
    }

    #[tokio::test]
    async fn test_listing_phone_reaches_results_without_site_email() {
        let generator = MockQueryGenerator::new(plan().with_business_query("chef near kochi"));
        let probe = with_listed_chef(builder(generator, listing_fetcher())).build().unwrap();

        let set = probe.run(ProbeInput::new("event chef", "Kochi", "IN")).await.unwrap();

        assert_eq!(set.count, 3);
        let listed = &set.results[0];
        assert_eq!(listed.rank, 1);
        assert_eq!(listed.url, "https://chefkochi.in");
        assert_eq!(listed.contacts.phone, "0484 235 1234");
        assert_eq!(listed.contacts.address, "MG Road, Kochi");
        assert!(listed.contacts.email.is_empty());
        assert!(listed.source_providers.contains("maps"));
    }

    #[tokio::test]
    async fn test_listing_contacts_stream_as_first_partial() {
        let generator = MockQueryGenerator::new(plan().with_business_query("chef near kochi"));
        let probe = with_listed_chef(builder(generator, listing_fetcher())).build().unwrap();

        let sets: Vec<ResultSet> = probe
            .run_stream(ProbeInput::new("event chef", "Kochi", "IN"))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .map(|s| s.unwrap())
            .collect();

        let first = &sets[0];
        assert!(first.has_more);
        assert_eq!(first.count, 1);
        assert_eq!(first.results[0].contacts.phone, "0484 235 1234");

        let last = sets.last().unwrap();
        assert!(!last.has_more);
        assert_eq!(last.count, 3);
    }

    #[tokio::test]
    async fn test_listing_contacts_alone_are_enough_content() {
        let generator = MockQueryGenerator::new(plan().with_business_query("chef near kochi"));
        let probe = with_listed_chef(builder(generator, MockFetcher::new())).build().unwrap();

        let set = probe.run(ProbeInput::new("event chef", "Kochi", "IN")).await.unwrap();

        assert_eq!(set.count, 1);
        assert_eq!(set.results[0].contacts.phone, "0484 235 1234");
    }

    #[tokio::test]
    async fn test_request_level_failures() {
        let probe = builder(MockQueryGenerator::failing(), fetcher()).build().unwrap();
        let err = probe
            .run(ProbeInput::new("event chef", "Kochi", "IN"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::QueryGeneration(_)));

        let probe = builder(MockQueryGenerator::new(plan()), fetcher()).build().unwrap();
        let err = probe.run(ProbeInput::new("", "Kochi", "IN")).await.unwrap_err();
        assert!(matches!(err, ProbeError::InvalidInput { field: "prompt" }));

        let no_hits = QueryPlan::new(vec!["chef".into()], vec!["nothing matches".into()]);
        let probe = builder(MockQueryGenerator::new(no_hits), fetcher()).build().unwrap();
        let err = probe
            .run(ProbeInput::new("event chef", "Kochi", "IN"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::NoSearchResults));

        let probe = builder(MockQueryGenerator::new(plan()), MockFetcher::new()).build().unwrap();
        let err = probe
            .run(ProbeInput::new("event chef", "Kochi", "IN"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::NoContent));
    }

    #[tokio::test]
    async fn test_stream_reports_failure_as_single_error() {
        let probe = builder(MockQueryGenerator::failing(), fetcher()).build().unwrap();
        let items: Vec<_> = probe
            .run_stream(ProbeInput::new("event chef", "Kochi", "IN"))
            .collect()
            .await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(ProbeError::QueryGeneration(_))));
    }

    #[test]
    fn test_build_requires_collaborators() {
        let result = Probe::builder(ProbeConfig::default()).build();
        assert!(matches!(result, Err(ProbeError::Config(_))));
    }
}
