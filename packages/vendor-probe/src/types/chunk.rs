//! Content chunks produced by the segmenter.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::link::Link;

/// Stable, dense chunk identifier.
///
/// Ids are assigned in creation order and are unique within one request.
/// The extractor echoes them back so records can be re-joined to their
/// source link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(pub usize);

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A token-bounded slice of cleaned page text.
#[derive(Debug, Clone)]
pub struct ContentChunk {
    pub id: ChunkId,

    /// Shared back-reference to the page this text came from
    pub source_link: Arc<Link>,

    pub text: String,

    /// True when the text carries an email (or phone, depending on mode)
    pub has_contact_signal: bool,
}

impl ContentChunk {
    pub fn new(id: ChunkId, source_link: Arc<Link>, text: impl Into<String>) -> Self {
        Self {
            id,
            source_link,
            text: text.into(),
            has_contact_signal: false,
        }
    }

    pub fn with_contact_signal(mut self, signal: bool) -> Self {
        self.has_contact_signal = signal;
        self
    }
}
