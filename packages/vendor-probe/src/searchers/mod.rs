//! Reference search provider adapters.
//!
//! - [`GoogleSearch`] - Google Programmable Search (web)
//! - [`BingSearch`] - Bing Web Search (web)
//! - [`GooglePlaces`] - Google Places text search (business)
//! - [`YelpSearch`] - Yelp business search (business)

mod bing;
mod google;
mod google_places;
mod yelp;

pub use bing::BingSearch;
pub use google::GoogleSearch;
pub use google_places::GooglePlaces;
pub use yelp::YelpSearch;

use crate::error::{SearchError, SearchResult};

/// Turn a non-success response into [`SearchError::Api`].
async fn check_status(provider: &str, response: reqwest::Response) -> SearchResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(SearchError::Api {
        provider: provider.to_string(),
        status: status.as_u16(),
        message,
    })
}

fn malformed(provider: &str, err: reqwest::Error) -> SearchError {
    SearchError::Malformed {
        provider: provider.to_string(),
        message: err.to_string(),
    }
}
