//! Typed errors for the probe library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! Only [`ProbeError`] ever reaches the caller of a probe. The per-item
//! errors ([`SearchError`], [`FetchError`], [`ExtractError`]) are recovered
//! inside the stage that produced them.

use thiserror::Error;

/// Request-level errors surfaced to the caller of a probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A required input was missing or blank
    #[error("invalid input: {field} is required")]
    InvalidInput { field: &'static str },

    /// The query generator could not turn the goal into a search plan
    #[error("query generation failed: {0}")]
    QueryGeneration(String),

    /// Every search provider came back empty
    #[error("no search results for any query")]
    NoSearchResults,

    /// No harvested page yielded extractable content
    #[error("no web content extracted")]
    NoContent,

    /// Every extraction batch failed
    #[error("contact extraction failed: {0}")]
    ExtractionFailed(String),

    /// The search plan was read before it was resolved
    #[error("search plan read before it was resolved")]
    PlanNotResolved,

    /// The search plan was resolved twice
    #[error("search plan already resolved")]
    PlanAlreadyResolved,

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Errors from a single search provider call.
#[derive(Debug, Error)]
pub enum SearchError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("{provider} API error (status {status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    /// Provider does not serve this country
    #[error("{provider} does not support country code {country_code}")]
    UnsupportedCountry {
        provider: String,
        country_code: String,
    },

    /// Provider call exceeded its timeout
    #[error("{provider} timed out")]
    Timeout { provider: String },

    /// Response could not be decoded
    #[error("malformed {provider} response: {message}")]
    Malformed { provider: String, message: String },
}

/// Errors from fetching a single page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure (DNS, connect, TLS, body read)
    #[error("network error: {0}")]
    Network(String),

    /// Remote answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Rendering service error
    #[error("browser error (status {status}): {message}")]
    Browser { status: u16, message: String },

    /// Navigation exceeded the per-fetch timeout
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// Errors from one structured-extraction (or query generation) call.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Network-level failure
    #[error("network error: {0}")]
    Network(String),

    /// Model API returned an error
    #[error("model API error: {0}")]
    Api(String),

    /// The call exceeded its timeout
    #[error("extraction call timed out")]
    Timeout,

    /// Structured output could not be parsed
    #[error("malformed structured output: {0}")]
    Malformed(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ExtractError {
    fn from(err: serde_json::Error) -> Self {
        ExtractError::Malformed(err.to_string())
    }
}

/// Result type alias for probe operations.
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Result type alias for search provider calls.
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Result type alias for page fetches.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for extraction calls.
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;
