//! Reference model implementations.
//!
//! [`OpenAI`] implements both
//! [`QueryGenerator`](crate::traits::ai::QueryGenerator) and
//! [`ContactExtractor`](crate::traits::ai::ContactExtractor).

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::OpenAI;
