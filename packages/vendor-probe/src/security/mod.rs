//! Credential handling for provider and model API keys.

mod credentials;

pub use credentials::{ModelCredentials, SecretString};
