//! Content harvesting - fetch ranked links and clean them to text.
//!
//! Fetches run under a semaphore (`fetch_concurrency`) with a per-fetch
//! timeout. A failed page is recorded as [`PageStatus::Failed`] and the
//! batch carries on; nothing here returns an error.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::pipeline::clean::{clean_html, CleanedPage};
use crate::traits::fetcher::PageFetcher;
use crate::types::config::ProbeConfig;
use crate::types::link::{normalize_url, Link};

#[derive(Debug, Clone, PartialEq)]
pub enum PageStatus {
    Ok,
    Failed { reason: String },
}

/// One link after fetching and cleaning.
#[derive(Debug, Clone)]
pub struct HarvestedPage {
    pub link: Arc<Link>,
    pub status: PageStatus,
    /// Cleaned text; empty for failed pages
    pub text: String,
}

impl HarvestedPage {
    pub fn is_ok(&self) -> bool {
        self.status == PageStatus::Ok
    }
}

/// Pages in input order plus candidate contact pages to visit next.
#[derive(Debug, Clone, Default)]
pub struct HarvestReport {
    pub pages: Vec<HarvestedPage>,
    pub secondary_links: Vec<Link>,
}

impl HarvestReport {
    pub fn failed_count(&self) -> usize {
        self.pages.iter().filter(|p| !p.is_ok()).count()
    }

    /// Normalized URLs of every page in this report.
    pub fn seen_urls(&self) -> HashSet<String> {
        self.pages.iter().map(|p| p.link.dedup_key()).collect()
    }
}

pub struct Harvester {
    fetcher: Arc<dyn PageFetcher>,
    config: Arc<ProbeConfig>,
}

impl Harvester {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: Arc<ProbeConfig>) -> Self {
        Self { fetcher, config }
    }

    /// Fetch and clean `links`.
    ///
    /// Secondary links exclude anything in `already_seen` and anything being
    /// harvested in this call.
    pub async fn harvest(&self, links: Vec<Link>, already_seen: &HashSet<String>) -> HarvestReport {
        let start = Instant::now();
        let settings = &self.config.harvest;
        let semaphore = Arc::new(Semaphore::new(settings.fetch_concurrency));

        let tasks = links.into_iter().map(|link| {
            let semaphore = semaphore.clone();
            async move {
                let link = Arc::new(link);
                let result = match semaphore.acquire().await {
                    Ok(_permit) => self.fetch_one(&link).await,
                    Err(_) => Err("fetch pool closed".to_string()),
                };
                (link, result)
            }
        });

        let results = join_all(tasks).await;

        let mut seen: HashSet<String> = already_seen.clone();
        seen.extend(results.iter().map(|(link, _)| link.dedup_key()));

        let mut pages = Vec::with_capacity(results.len());
        let mut secondary_links = Vec::new();

        for (link, result) in results {
            match result {
                Ok(cleaned) => {
                    for url in cleaned.secondary_links {
                        if secondary_links.len() >= settings.max_secondary_links {
                            break;
                        }
                        if seen.insert(normalize_url(&url)) {
                            secondary_links.push(Link::secondary(url, &link));
                        }
                    }
                    pages.push(HarvestedPage {
                        link,
                        status: PageStatus::Ok,
                        text: cleaned.text,
                    });
                }
                Err(reason) => {
                    warn!(url = %link.url, reason = %reason, "Page fetch failed");
                    pages.push(HarvestedPage {
                        link,
                        status: PageStatus::Failed { reason },
                        text: String::new(),
                    });
                }
            }
        }

        let report = HarvestReport {
            pages,
            secondary_links,
        };

        info!(
            pages = report.pages.len(),
            failed = report.failed_count(),
            secondary = report.secondary_links.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Harvest complete"
        );

        report
    }

    async fn fetch_one(&self, link: &Link) -> Result<CleanedPage, String> {
        let settings = &self.config.harvest;
        let timeout = settings.fetch_timeout();

        debug!(url = %link.url, fetcher = self.fetcher.name(), "Fetching page");

        let html = match tokio::time::timeout(
            timeout,
            self.fetcher.fetch(&link.url, &settings.blocked_resource_types),
        )
        .await
        {
            Ok(Ok(html)) => html,
            Ok(Err(e)) => return Err(e.to_string()),
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: link.url.clone(),
                }
                .to_string())
            }
        };

        Ok(clean_html(&html, &link.url, settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use crate::types::config::HarvestConfig;
    use std::time::Duration;

    fn links(urls: &[&str]) -> Vec<Link> {
        let mut links: Vec<_> = urls
            .iter()
            .map(|u| Link::new(*u, *u, "mock", "q"))
            .collect();
        crate::types::link::assign_ranks(&mut links);
        links
    }

    fn harvester(fetcher: MockFetcher, harvest: HarvestConfig) -> Harvester {
        Harvester::new(
            Arc::new(fetcher),
            Arc::new(ProbeConfig::default().with_harvest(harvest)),
        )
    }

    #[tokio::test]
    async fn test_failures_are_isolated_and_order_kept() {
        let fetcher = MockFetcher::new()
            .with_page("https://a.com", "<p>alpha</p>")
            .failing("https://b.com")
            .with_page("https://c.com", "<p>gamma</p>")
            .with_delay("https://c.com", Duration::from_millis(300));

        let harvester = harvester(fetcher, HarvestConfig::default().with_fetch_timeout_ms(50));
        let report = harvester
            .harvest(links(&["https://a.com", "https://b.com", "https://c.com"]), &HashSet::new())
            .await;

        assert_eq!(report.pages.len(), 3);
        assert_eq!(report.pages[0].status, PageStatus::Ok);
        assert_eq!(report.pages[0].text, "alpha");
        assert!(matches!(report.pages[1].status, PageStatus::Failed { .. }));
        match &report.pages[2].status {
            PageStatus::Failed { reason } => {
                assert_eq!(reason, "timeout fetching: https://c.com")
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(report.failed_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let urls: Vec<String> = (0..6).map(|i| format!("https://site{i}.com")).collect();
        let mut fetcher = MockFetcher::new();
        for url in &urls {
            fetcher = fetcher
                .with_page(url, "<p>x</p>")
                .with_delay(url, Duration::from_millis(30));
        }
        let fetcher = Arc::new(fetcher);

        let harvester = Harvester::new(
            fetcher.clone(),
            Arc::new(
                ProbeConfig::default().with_harvest(HarvestConfig::default().with_fetch_concurrency(2)),
            ),
        );
        let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
        let report = harvester.harvest(links(&refs), &HashSet::new()).await;

        assert_eq!(report.failed_count(), 0);
        assert!(fetcher.max_in_flight() <= 2);
        assert_eq!(fetcher.calls(), 6);
    }

    #[tokio::test]
    async fn test_secondary_links_deduped_excluded_and_capped() {
        let fetcher = MockFetcher::new()
            .with_page(
                "https://a.com",
                r#"<div><a href="/contact">c</a><a href="https://b.com/">b</a><a href="/about">ab</a></div>"#,
            )
            .with_page(
                "https://b.com",
                r#"<div><a href="https://a.com/contact#form">c</a><a href="https://old.com/contact">o</a></div>"#,
            );

        let already_seen: HashSet<String> = [normalize_url("https://old.com/contact")].into();
        let harvester = harvester(fetcher, HarvestConfig::default().with_max_secondary_links(2));

        let report = harvester
            .harvest(links(&["https://a.com", "https://b.com"]), &already_seen)
            .await;

        let urls: Vec<_> = report.secondary_links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.com/contact", "https://a.com/about"]);
        assert_eq!(report.secondary_links[0].base_url.as_deref(), Some("https://a.com"));
        assert_eq!(report.secondary_links[0].rank, 1);
    }
}
