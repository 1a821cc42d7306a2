//! API keys for providers, the page renderer and the model.
//!
//! Every key is held in a [`SecretString`] so it stays out of `tracing`
//! fields and `Debug` output of the types that carry it.

use std::fmt;

use secrecy::ExposeSecret;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// A key or token that renders as `[REDACTED]`.
pub struct SecretString(secrecy::SecretString);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(secrecy::SecretString::from(value.into()))
    }

    /// Read `name` from the environment. Unset or blank values are `None`.
    pub fn from_env(name: &str) -> Option<Self> {
        std::env::var(name)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(Self::new)
    }

    /// Only call this at the point the key goes on the wire.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Key, model and endpoint for the planning/extraction model.
#[derive(Debug, Clone)]
pub struct ModelCredentials {
    pub api_key: SecretString,
    pub model: String,
    /// OpenAI-compatible gateway; the public API when unset
    pub base_url: Option<String>,
}

impl ModelCredentials {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn chat_completions_url(&self) -> String {
        let base = self
            .base_url
            .as_deref()
            .unwrap_or(OPENAI_BASE_URL)
            .trim_end_matches('/');
        format!("{base}/chat/completions")
    }
}
