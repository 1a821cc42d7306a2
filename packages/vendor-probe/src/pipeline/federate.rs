//! Search federation - fan queries out to providers and merge the answers.
//!
//! For each web query every web provider runs concurrently under its own
//! timeout. Provider lists are interleaved by position, then the per-query
//! lists are interleaved round-robin until `max_results` unique URLs are
//! collected. Business providers run as a separate concurrent task and are
//! placed before or after the web links.
//!
//! A provider that errors or times out contributes nothing; it never fails
//! the federation. If every provider fails the result is simply empty.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::error::SearchError;
use crate::traits::searcher::{ProviderKind, SearchProvider, SearchQuery};
use crate::types::config::{BusinessPlacement, FederationConfig, ProbeConfig};
use crate::types::link::{assign_ranks, Link};
use crate::types::request::QueryPlan;

/// Merges results from independent search providers into one ranked list.
pub struct Federator {
    web: Vec<Arc<dyn SearchProvider>>,
    business: Vec<Arc<dyn SearchProvider>>,
    config: Arc<ProbeConfig>,
}

impl Federator {
    pub fn new(config: Arc<ProbeConfig>) -> Self {
        Self {
            web: Vec::new(),
            business: Vec::new(),
            config,
        }
    }

    /// Register a provider. Web and business providers are routed by
    /// [`SearchProvider::kind`].
    pub fn with_provider(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        match provider.kind() {
            ProviderKind::Web => self.web.push(provider),
            ProviderKind::Business => self.business.push(provider),
        }
        self
    }

    fn settings(&self) -> &FederationConfig {
        &self.config.federation
    }

    /// Run the plan's queries and return deduplicated links with dense
    /// `id`/`rank`.
    pub async fn federate(
        &self,
        plan: &QueryPlan,
        location: &str,
        country_code: &str,
        placement: BusinessPlacement,
    ) -> Vec<Link> {
        let start = Instant::now();
        let settings = self.settings();

        let web_task = join_all(plan.web_queries.iter().map(|text| {
            let query = SearchQuery::new(text.as_str(), location, country_code)
                .with_limit(settings.per_query_limit);
            async move { self.search_web(&query).await }
        }));

        let business_task = async {
            match &plan.business_query {
                Some(text) if !self.business.is_empty() => {
                    let query = SearchQuery::new(text.as_str(), location, country_code)
                        .with_limit(settings.max_business_results);
                    self.search_business(&query).await
                }
                _ => Vec::new(),
            }
        };

        let (per_query, business) = tokio::join!(web_task, business_task);

        let web = round_robin(per_query, settings.max_results);

        let ordered = match placement {
            BusinessPlacement::Prepend => business.into_iter().chain(web),
            BusinessPlacement::Append => web.into_iter().chain(business),
        };

        let mut merged = IndexMap::new();
        for link in ordered {
            merge_into(&mut merged, link);
        }

        let mut links: Vec<Link> = merged.into_values().collect();
        assign_ranks(&mut links);

        info!(
            queries = plan.web_queries.len(),
            links = links.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Search federation complete"
        );

        links
    }

    /// All web providers for one query, interleaved by position.
    async fn search_web(&self, query: &SearchQuery) -> Vec<Link> {
        let lists = self.call_all(&self.web, query).await;
        let settings = self.settings();

        let lists = lists
            .into_iter()
            .map(|list| {
                list.into_iter()
                    .filter(|link| {
                        let denied = settings.is_denied(&link.url);
                        if denied {
                            debug!(url = %link.url, "Dropping denied domain");
                        }
                        !denied
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        interleave(lists)
    }

    async fn search_business(&self, query: &SearchQuery) -> Vec<Link> {
        let lists = self.call_all(&self.business, query).await;
        let mut links = interleave(lists);
        links.truncate(self.settings().max_business_results);
        links
    }

    /// Call every provider concurrently. Failed or timed-out providers
    /// yield an empty list.
    async fn call_all(
        &self,
        providers: &[Arc<dyn SearchProvider>],
        query: &SearchQuery,
    ) -> Vec<Vec<Link>> {
        let timeout = self.settings().search_timeout();

        let calls = providers.iter().map(|provider| async move {
            match search_within(provider.as_ref(), query, timeout).await {
                Ok(mut links) => {
                    links.truncate(query.limit);
                    debug!(
                        provider = provider.name(),
                        query = %query.text,
                        count = links.len(),
                        "Provider returned results"
                    );
                    links
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        query = %query.text,
                        error = %e,
                        "Search provider failed"
                    );
                    Vec::new()
                }
            }
        });

        join_all(calls).await
    }
}

/// One provider call bounded by `timeout`.
async fn search_within(
    provider: &dyn SearchProvider,
    query: &SearchQuery,
    timeout: Duration,
) -> Result<Vec<Link>, SearchError> {
    tokio::time::timeout(timeout, provider.search(query))
        .await
        .map_err(|_| SearchError::Timeout {
            provider: provider.name().to_string(),
        })?
}

/// Insert a link, unioning providers into an existing entry for the same
/// normalized URL.
fn merge_into(merged: &mut IndexMap<String, Link>, link: Link) {
    let key = link.dedup_key();
    match merged.get_mut(&key) {
        Some(existing) => existing.absorb(&link),
        None => {
            merged.insert(key, link);
        }
    }
}

/// Interleave lists by position (A1, B1, A2, B2, ...) and dedup.
pub(crate) fn interleave(lists: Vec<Vec<Link>>) -> Vec<Link> {
    let longest = lists.iter().map(Vec::len).max().unwrap_or(0);
    let mut iters: Vec<_> = lists.into_iter().map(Vec::into_iter).collect();
    let mut merged = IndexMap::new();

    for _ in 0..longest {
        for iter in iters.iter_mut() {
            if let Some(link) = iter.next() {
                merge_into(&mut merged, link);
            }
        }
    }

    merged.into_values().collect()
}

/// Round-robin across per-query lists, stopping at `cap` unique URLs.
pub(crate) fn round_robin(lists: Vec<Vec<Link>>, cap: usize) -> Vec<Link> {
    let mut iters: Vec<_> = lists.into_iter().map(Vec::into_iter).collect();
    let mut merged: IndexMap<String, Link> = IndexMap::new();

    'outer: loop {
        let mut progressed = false;
        for iter in iters.iter_mut() {
            let Some(link) = iter.next() else { continue };
            progressed = true;

            let key = link.dedup_key();
            if let Some(existing) = merged.get_mut(&key) {
                existing.absorb(&link);
            } else if merged.len() < cap {
                merged.insert(key, link);
            } else {
                break 'outer;
            }
        }
        if !progressed {
            break;
        }
    }

    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSearchProvider;
    use std::time::Duration;

    fn config(federation: FederationConfig) -> Arc<ProbeConfig> {
        Arc::new(ProbeConfig::default().with_federation(federation))
    }

    fn plan(queries: &[&str]) -> QueryPlan {
        QueryPlan::new(
            vec!["chef".into()],
            queries.iter().map(|q| q.to_string()).collect(),
        )
    }

    fn urls(links: &[Link]) -> Vec<&str> {
        links.iter().map(|l| l.url.as_str()).collect()
    }

    #[tokio::test]
    async fn test_interleaves_providers_by_position() {
        let federator = Federator::new(config(FederationConfig::default()))
            .with_provider(Arc::new(MockSearchProvider::new("alpha").with_urls(
                "q",
                &["https://a1.com", "https://a2.com", "https://a3.com"],
            )))
            .with_provider(Arc::new(
                MockSearchProvider::new("beta").with_urls("q", &["https://b1.com", "https://b2.com"]),
            ));

        let links = federator
            .federate(&plan(&["q"]), "Kochi", "IN", BusinessPlacement::Append)
            .await;

        assert_eq!(
            urls(&links),
            vec![
                "https://a1.com",
                "https://b1.com",
                "https://a2.com",
                "https://b2.com",
                "https://a3.com"
            ]
        );
        let ranks: Vec<_> = links.iter().map(|l| l.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_duplicate_urls_merge_providers() {
        let federator = Federator::new(config(FederationConfig::default()))
            .with_provider(Arc::new(
                MockSearchProvider::new("alpha").with_urls("q", &["https://shared.com/chef", "https://a2.com"]),
            ))
            .with_provider(Arc::new(
                MockSearchProvider::new("beta").with_urls("q", &["https://SHARED.com/chef/", "https://b2.com"]),
            ));

        let links = federator
            .federate(&plan(&["q"]), "Kochi", "IN", BusinessPlacement::Append)
            .await;

        assert_eq!(links.len(), 3);
        let shared = &links[0];
        assert_eq!(shared.url, "https://shared.com/chef");
        assert_eq!(shared.title, "https://shared.com/chef via alpha");
        let providers: Vec<_> = shared.source_providers.iter().map(String::as_str).collect();
        assert_eq!(providers, vec!["alpha", "beta"]);

        let mut keys: Vec<_> = links.iter().map(Link::dedup_key).collect();
        keys.dedup();
        assert_eq!(keys.len(), links.len());
    }

    #[tokio::test]
    async fn test_failed_and_slow_providers_are_isolated() {
        let federator = Federator::new(config(
            FederationConfig::default().with_search_timeout_ms(50),
        ))
        .with_provider(Arc::new(MockSearchProvider::new("broken").failing()))
        .with_provider(Arc::new(
            MockSearchProvider::new("slow")
                .with_urls("q", &["https://slow.com"])
                .with_delay(Duration::from_millis(500)),
        ))
        .with_provider(Arc::new(
            MockSearchProvider::new("ok").with_urls("q", &["https://ok1.com", "https://ok2.com"]),
        ));

        let links = federator
            .federate(&plan(&["q"]), "Kochi", "IN", BusinessPlacement::Append)
            .await;

        assert_eq!(urls(&links), vec!["https://ok1.com", "https://ok2.com"]);
    }

    #[tokio::test]
    async fn test_all_providers_failing_yields_empty() {
        let federator = Federator::new(config(FederationConfig::default()))
            .with_provider(Arc::new(MockSearchProvider::new("a").failing()))
            .with_provider(Arc::new(MockSearchProvider::new("b").failing()));

        let links = federator
            .federate(&plan(&["q1", "q2"]), "Kochi", "IN", BusinessPlacement::Append)
            .await;

        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn test_round_robin_across_queries_respects_cap() {
        let federator = Federator::new(config(FederationConfig::default().with_max_results(4)))
            .with_provider(Arc::new(
                MockSearchProvider::new("alpha")
                    .with_urls("q1", &["https://a1.com", "https://a2.com", "https://a3.com"])
                    .with_urls("q2", &["https://c1.com", "https://a1.com", "https://c3.com"]),
            ));

        let links = federator
            .federate(&plan(&["q1", "q2"]), "Kochi", "IN", BusinessPlacement::Append)
            .await;

        assert_eq!(
            urls(&links),
            vec!["https://a1.com", "https://c1.com", "https://a2.com", "https://a3.com"]
        );
    }

    #[tokio::test]
    async fn test_denied_domains_removed_before_ranking() {
        let federator = Federator::new(config(FederationConfig::default()))
            .with_provider(Arc::new(MockSearchProvider::new("alpha").with_urls(
                "q",
                &["https://www.instagram.com/chef", "https://chef.in"],
            )));

        let links = federator
            .federate(&plan(&["q"]), "Kochi", "IN", BusinessPlacement::Append)
            .await;

        assert_eq!(urls(&links), vec!["https://chef.in"]);
        assert_eq!(links[0].rank, 1);
    }

    #[tokio::test]
    async fn test_business_listings_placement() {
        let make = || {
            Federator::new(config(FederationConfig::default()))
                .with_provider(Arc::new(
                    MockSearchProvider::new("web").with_urls("chefs", &["https://web.com"]),
                ))
                .with_provider(Arc::new(
                    MockSearchProvider::new("maps")
                        .business()
                        .with_urls("chef near kochi", &["https://listing.com"]),
                ))
        };
        let plan = plan(&["chefs"]).with_business_query("chef near kochi");

        let prepended = make()
            .federate(&plan, "Kochi", "IN", BusinessPlacement::Prepend)
            .await;
        assert_eq!(urls(&prepended), vec!["https://listing.com", "https://web.com"]);

        let appended = make()
            .federate(&plan, "Kochi", "IN", BusinessPlacement::Append)
            .await;
        assert_eq!(urls(&appended), vec!["https://web.com", "https://listing.com"]);
        assert_eq!(appended[1].id, 1);
    }

    #[tokio::test]
    async fn test_slow_provider_reports_typed_timeout() {
        let slow = MockSearchProvider::new("slow")
            .with_urls("q", &["https://slow.com"])
            .with_delay(Duration::from_millis(300));
        let query = SearchQuery::new("q", "Kochi", "IN");

        let result = search_within(&slow, &query, Duration::from_millis(20)).await;
        match result {
            Err(SearchError::Timeout { provider }) => assert_eq!(provider, "slow"),
            other => panic!("expected timeout, got {other:?}"),
        }

        let links = search_within(&slow, &query, Duration::from_secs(2)).await.unwrap();
        assert_eq!(urls(&links), vec!["https://slow.com"]);
    }
}
