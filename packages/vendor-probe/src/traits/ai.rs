//! Model-backed collaborators: query planning and contact extraction.
//!
//! Both are narrow, single-purpose traits. Prompt wording is the
//! implementation's business; only the inputs and the structured outputs are
//! fixed here.

use async_trait::async_trait;

use crate::error::ExtractResult;
use crate::types::chunk::ContentChunk;
use crate::types::record::ExtractedRecord;
use crate::types::request::QueryPlan;

/// Turns a natural-language goal into search queries.
#[async_trait]
pub trait QueryGenerator: Send + Sync {
    async fn generate(&self, goal: &str, location: &str) -> ExtractResult<QueryPlan>;
}

/// Extracts vendor contact records from a batch of chunks.
///
/// Returned records must carry the `chunk_id` of the chunk they came from.
/// Records citing ids that match no dispatched chunk are dropped by the
/// aggregator.
#[async_trait]
pub trait ContactExtractor: Send + Sync {
    async fn extract(
        &self,
        batch: &[ContentChunk],
        goal: &str,
        targets: &[String],
    ) -> ExtractResult<Vec<ExtractedRecord>>;
}
