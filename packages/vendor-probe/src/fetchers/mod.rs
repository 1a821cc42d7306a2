//! Page fetcher implementations.
//!
//! - [`BrowserlessFetcher`] - rendered HTML via a Browserless `/content`
//!   endpoint, with resource-type blocking
//! - [`HttpFetcher`] - plain HTTP GET for static pages

mod browserless;
mod http;

pub use browserless::BrowserlessFetcher;
pub use http::HttpFetcher;

use crate::error::{FetchError, FetchResult};

/// Only absolute http(s) URLs are fetched.
fn validate_url(url: &str) -> FetchResult<url::Url> {
    let parsed = url::Url::parse(url).map_err(|_| FetchError::InvalidUrl {
        url: url.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(FetchError::InvalidUrl {
            url: url.to_string(),
        }),
    }
}
