use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

use vendor_probe::security::SecretString;
use vendor_probe::{ExtractionConfig, FederationConfig, HarvestConfig, ProbeConfig, SegmentConfig};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub openai_api_key: SecretString,
    pub openai_model: Option<String>,
    pub google_api_key: Option<SecretString>,
    pub google_search_engine_id: Option<String>,
    pub bing_api_key: Option<SecretString>,
    pub google_maps_api_key: Option<SecretString>,
    pub yelp_api_key: Option<SecretString>,
    pub browserless_url: Option<String>,
    pub browserless_token: Option<SecretString>,
    /// HuggingFace hub repo whose tokenizer sizes chunks
    pub tokenizer_repo: Option<String>,
    pub probe: ProbeConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: parse_or("PORT", 8000)?,
            openai_api_key: env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set")?
                .into(),
            openai_model: env::var("OPENAI_MODEL").ok(),
            google_api_key: SecretString::from_env("GOOGLE_API_KEY"),
            google_search_engine_id: env::var("GOOGLE_SEARCH_ENGINE_ID").ok(),
            bing_api_key: SecretString::from_env("BING_API_KEY"),
            google_maps_api_key: SecretString::from_env("GOOGLE_MAPS_API_KEY"),
            yelp_api_key: SecretString::from_env("YELP_API_KEY"),
            browserless_url: env::var("BROWSERLESS_URL").ok(),
            browserless_token: SecretString::from_env("BROWSERLESS_TOKEN"),
            tokenizer_repo: env::var("TOKENIZER_REPO")
                .ok()
                .filter(|r| !r.trim().is_empty()),
            probe: probe_config()?,
        })
    }
}

/// Pipeline tuning. Unset variables keep the library defaults.
fn probe_config() -> Result<ProbeConfig> {
    let federation = FederationConfig::default();
    let harvest = HarvestConfig::default();
    let segment = SegmentConfig::default();
    let extraction = ExtractionConfig::default();

    Ok(ProbeConfig::new()
        .with_federation(
            federation
                .clone()
                .with_per_query_limit(parse_or("MAX_SITES_PER_QUERY", federation.per_query_limit)?),
        )
        .with_harvest(
            harvest
                .clone()
                .with_fetch_timeout_ms(parse_or("WEB_SCRAPING_TIMEOUT", harvest.fetch_timeout_ms)?),
        )
        .with_segment(
            segment
                .clone()
                .with_primary_chunk_size(parse_or("PRIMARY_CONTENT_SIZE", segment.primary_chunk_size)?)
                .with_secondary_chunk_size(parse_or(
                    "SECONDARY_CONTENT_SIZE",
                    segment.secondary_chunk_size,
                )?),
        )
        .with_extraction(
            extraction
                .clone()
                .with_batch_size(parse_or("CONTENT_PER_LLM_CALL", extraction.batch_size)?)
                .with_max_calls(parse_or("MAX_LLM_CALLS", extraction.max_calls)?),
        ))
}

fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a valid number")),
        Err(_) => Ok(default),
    }
}
