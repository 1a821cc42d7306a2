//! Application setup: probe wiring and the axum router.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use vendor_probe::ai::OpenAI;
use vendor_probe::fetchers::{BrowserlessFetcher, HttpFetcher};
use vendor_probe::searchers::{BingSearch, GooglePlaces, GoogleSearch, YelpSearch};
use vendor_probe::{HfTokenizer, PageFetcher, Probe};

use crate::config::Config;
use crate::server::routes::{health_handler, query_handler, stream_handler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub probe: Arc<Probe>,
}

/// Wire the probe from configuration.
///
/// Providers without credentials are skipped. Pages are fetched through
/// Browserless when `BROWSERLESS_URL` is set, otherwise with plain HTTP.
/// Chunks are sized with the `TOKENIZER_REPO` tokenizer when one is
/// configured, otherwise by words.
pub fn build_probe(config: &Config) -> Result<Probe> {
    let mut ai = OpenAI::new(config.openai_api_key.expose());
    if let Some(model) = &config.openai_model {
        ai = ai.with_model(model.as_str());
    }
    let ai = Arc::new(ai);

    let fetcher: Arc<dyn PageFetcher> = match &config.browserless_url {
        Some(url) => {
            tracing::info!(url = %url, "Fetching pages through Browserless");
            Arc::new(BrowserlessFetcher::new(
                url,
                config.browserless_token.as_ref().map(|t| t.expose()),
            ))
        }
        None => Arc::new(HttpFetcher::new().context("Failed to build HTTP fetcher")?),
    };

    let mut builder = Probe::builder(config.probe.clone())
        .generator(ai.clone())
        .extractor(ai)
        .fetcher(fetcher);

    if let Some(repo) = &config.tokenizer_repo {
        let tokenizer = HfTokenizer::from_pretrained(repo)
            .with_context(|| format!("Failed to load tokenizer {repo}"))?;
        tracing::info!(repo = %repo, "Chunking with HuggingFace tokenizer");
        builder = builder.tokenizer(Arc::new(tokenizer));
    }

    if let (Some(key), Some(cx)) = (&config.google_api_key, &config.google_search_engine_id) {
        builder = builder.provider(Arc::new(GoogleSearch::new(key.expose(), cx.as_str())));
    }
    if let Some(key) = &config.bing_api_key {
        builder = builder.provider(Arc::new(BingSearch::new(key.expose())));
    }
    if let Some(key) = &config.google_maps_api_key {
        builder = builder.provider(Arc::new(GooglePlaces::new(key.expose())));
    }
    if let Some(key) = &config.yelp_api_key {
        builder = builder.provider(Arc::new(YelpSearch::new(key.expose())));
    }

    builder.build().context("Failed to build probe")
}

/// Build the Axum application router
pub fn build_app(probe: Arc<Probe>) -> Router {
    let state = AppState { probe };

    // CORS configuration - allow any origin for development
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/q", post(query_handler))
        .route("/q/stream", post(stream_handler))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
