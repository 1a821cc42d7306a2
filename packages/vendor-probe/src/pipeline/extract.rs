//! Extraction coordinator - concurrent structured extraction over chunks.
//!
//! Chunks are grouped into batches of `batch_size`; at most `max_calls`
//! batches are dispatched and the rest are dropped. Every batch is one
//! extractor call under its own timeout. A failed, timed-out or malformed
//! call yields an empty batch; siblings are never cancelled and nothing is
//! retried.
//!
//! Records already known before extraction (business-listing contacts) can
//! be passed as a [`Seed`]. They go through the same aggregation core ahead
//! of every batch.
//!
//! Results flow through one aggregation core into a [`RecordSink`]:
//!
//! - [`DeliveryMode::Streaming`] absorbs batches in completion order
//! - [`DeliveryMode::GatherAll`] waits for all batches and absorbs them in
//!   submission order, so output is deterministic

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::ExtractError;
use crate::traits::ai::ContactExtractor;
use crate::types::chunk::{ChunkId, ContentChunk};
use crate::types::config::ProbeConfig;
use crate::types::link::Link;
use crate::types::outcome::Outcome;
use crate::types::record::{Contacts, ExtractedRecord, VendorRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Streaming,
    GatherAll,
}

/// Receives the fresh records of each completed batch.
///
/// Called once per dispatched batch, failed batches included (with no
/// records), plus once up front when the seed has records.
pub trait RecordSink: Send {
    fn accept(&mut self, records: Vec<VendorRecord>);
}

/// Buffers everything for gather-all callers.
#[derive(Debug, Default)]
pub struct BufferSink {
    records: Vec<VendorRecord>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_records(self) -> Vec<VendorRecord> {
        self.records
    }
}

impl RecordSink for BufferSink {
    fn accept(&mut self, records: Vec<VendorRecord>) {
        self.records.extend(records);
    }
}

/// Forwards each batch to a channel for streaming callers.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Vec<VendorRecord>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<Vec<VendorRecord>>) -> Self {
        Self { tx }
    }
}

impl RecordSink for ChannelSink {
    fn accept(&mut self, records: Vec<VendorRecord>) {
        if self.tx.send(records).is_err() {
            debug!("Record receiver dropped");
        }
    }
}

/// Joins extracted records back to their links, filters and dedups.
pub struct Aggregator {
    index: HashMap<ChunkId, Arc<Link>>,
    seen: HashSet<String>,
    next_rank: usize,
}

impl Aggregator {
    pub fn new<'a>(chunks: impl IntoIterator<Item = &'a ContentChunk>) -> Self {
        Self {
            index: chunks
                .into_iter()
                .map(|c| (c.id, c.source_link.clone()))
                .collect(),
            seen: HashSet::new(),
            next_rank: 1,
        }
    }

    /// Inflate, filter and rank one batch of records.
    ///
    /// Records with an unknown chunk id or with no contact details are
    /// dropped. A record whose contact identity was already seen is dropped
    /// (first one wins). Ranks continue across calls.
    pub fn absorb(&mut self, records: Vec<ExtractedRecord>) -> Vec<VendorRecord> {
        let mut fresh = Vec::new();

        for record in records {
            let Some(link) = self.index.get(&record.chunk_id) else {
                debug!(chunk_id = %record.chunk_id, "Dropping record with unknown chunk id");
                continue;
            };
            if record.contacts.is_empty() {
                continue;
            }
            if let Some(identity) = record.contacts.identity() {
                if !self.seen.insert(identity) {
                    continue;
                }
            }

            let mut inflated = VendorRecord::inflate(record, link);
            inflated.rank = self.next_rank;
            self.next_rank += 1;
            fresh.push(inflated);
        }

        fresh
    }

    pub fn total(&self) -> usize {
        self.next_rank - 1
    }
}

/// Records that need no extraction call, with the chunks they join to.
#[derive(Debug, Clone, Default)]
pub struct Seed {
    pub chunks: Vec<ContentChunk>,
    pub records: Vec<ExtractedRecord>,
}

impl Seed {
    /// One record per link whose business listing carries a phone or an
    /// address. Chunk ids start at `first_id`.
    pub fn from_listings<'a>(links: impl IntoIterator<Item = &'a Link>, first_id: usize) -> Self {
        let mut seed = Seed::default();

        for link in links {
            let Some(listing) = link.listing.as_ref().filter(|l| l.has_contacts()) else {
                continue;
            };
            let id = ChunkId(first_id + seed.chunks.len());
            let contacts = Contacts {
                email: String::new(),
                phone: listing.phone.clone().unwrap_or_default(),
                address: listing.address.clone().unwrap_or_default(),
            };

            let mut info = Vec::new();
            if let Some(rating) = listing.rating {
                info.push(format!("rated {rating}"));
            }
            if let Some(count) = listing.rating_count {
                info.push(format!("{count} reviews"));
            }

            seed.records.push(
                ExtractedRecord::new(id, link.title.clone(), contacts).with_info(info.join(", ")),
            );
            seed.chunks.push(ContentChunk::new(id, Arc::new(link.clone()), String::new()));
        }

        seed
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Counts from one coordinator run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub dispatched: usize,
    pub failed: usize,
    /// Batches over `max_calls` that were never sent
    pub dropped: usize,
    /// Seed records that survived aggregation
    pub seeded: usize,
    pub records: usize,
}

pub struct ExtractionCoordinator {
    extractor: Arc<dyn ContactExtractor>,
    config: Arc<ProbeConfig>,
}

impl ExtractionCoordinator {
    pub fn new(extractor: Arc<dyn ContactExtractor>, config: Arc<ProbeConfig>) -> Self {
        Self { extractor, config }
    }

    /// Gather-all convenience wrapper returning seed records first, then
    /// every extracted record in submission order.
    pub async fn gather(
        &self,
        chunks: &[ContentChunk],
        seed: &Seed,
        goal: &str,
        targets: &[String],
    ) -> Outcome<Vec<VendorRecord>> {
        let mut sink = BufferSink::new();
        self.run_into(chunks, seed, goal, targets, DeliveryMode::GatherAll, &mut sink)
            .await
            .map(|_| sink.into_records())
    }

    /// Run extraction over `chunks`, delivering records to `sink`.
    ///
    /// Seed records are absorbed and delivered before any batch is sent.
    /// The run only fails when every dispatched batch failed and the seed
    /// contributed nothing.
    pub async fn run_into<S: RecordSink>(
        &self,
        chunks: &[ContentChunk],
        seed: &Seed,
        goal: &str,
        targets: &[String],
        mode: DeliveryMode,
        sink: &mut S,
    ) -> Outcome<ExtractionSummary> {
        let settings = &self.config.extraction;
        let start = Instant::now();

        let batches: Vec<&[ContentChunk]> = chunks.chunks(settings.batch_size.max(1)).collect();
        let dispatched = batches.len().min(settings.max_calls);
        let dropped = batches.len() - dispatched;
        let batches = &batches[..dispatched];

        let mut aggregator =
            Aggregator::new(batches.iter().copied().flatten().chain(seed.chunks.iter()));

        let seeded = if seed.is_empty() {
            0
        } else {
            let records = aggregator.absorb(seed.records.clone());
            let seeded = records.len();
            debug!(seeded, offered = seed.records.len(), "Listing records absorbed");
            sink.accept(records);
            seeded
        };

        if batches.is_empty() {
            if seeded == 0 {
                return Outcome::Empty;
            }
            return Outcome::Success(ExtractionSummary {
                seeded,
                records: aggregator.total(),
                ..Default::default()
            });
        }

        if dropped > 0 {
            warn!(
                dropped_batches = dropped,
                max_calls = settings.max_calls,
                "Extraction batch budget exceeded, dropping remaining chunks"
            );
        }

        let timeout = settings.call_timeout();
        let extractor = self.extractor.as_ref();

        let calls = batches.iter().enumerate().map(|(index, batch)| async move {
            (index, extract_within(extractor, batch, goal, targets, timeout).await)
        });

        let mut failed = 0;
        let mut handle = |index: usize, result: Result<Vec<ExtractedRecord>, ExtractError>| {
            let records = match result {
                Ok(records) => {
                    debug!(batch = index, returned = records.len(), "Extraction batch complete");
                    records
                }
                Err(e) => {
                    warn!(batch = index, error = %e, "Extraction batch failed");
                    failed += 1;
                    Vec::new()
                }
            };
            sink.accept(aggregator.absorb(records));
        };

        match mode {
            DeliveryMode::Streaming => {
                let mut pending: FuturesUnordered<_> = calls.collect();
                while let Some((index, result)) = pending.next().await {
                    handle(index, result);
                }
            }
            DeliveryMode::GatherAll => {
                for (index, result) in join_all(calls).await {
                    handle(index, result);
                }
            }
        }

        let summary = ExtractionSummary {
            dispatched,
            failed,
            dropped,
            seeded,
            records: aggregator.total(),
        };

        info!(
            dispatched = summary.dispatched,
            failed = summary.failed,
            dropped = summary.dropped,
            seeded = summary.seeded,
            records = summary.records,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Extraction complete"
        );

        if summary.failed == summary.dispatched && summary.seeded == 0 {
            return Outcome::Failure(format!("all {} extraction batches failed", summary.failed));
        }
        Outcome::Success(summary)
    }
}

/// One extractor call bounded by `timeout`.
async fn extract_within(
    extractor: &dyn ContactExtractor,
    batch: &[ContentChunk],
    goal: &str,
    targets: &[String],
    timeout: Duration,
) -> Result<Vec<ExtractedRecord>, ExtractError> {
    tokio::time::timeout(timeout, extractor.extract(batch, goal, targets))
        .await
        .map_err(|_| ExtractError::Timeout)?
}
