//! Page fetcher trait.
//!
//! A fetcher returns the rendered HTML of one page. Implementations are
//! shared read-only by every fetch task of a run, so they hold only a client
//! and endpoint configuration.

use async_trait::async_trait;

use crate::error::FetchResult;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch `url`, asking the renderer not to load `blocked_resource_types`
    /// (e.g. `"image"`, `"font"`). Fetchers without a renderer ignore the
    /// list.
    async fn fetch(&self, url: &str, blocked_resource_types: &[String]) -> FetchResult<String>;
}
