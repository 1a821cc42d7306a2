//! The probe pipeline.
//!
//! goal → query plan → [`federate`] → [`harvest`] (+ [`clean`]) →
//! [`segment`] → [`extract`] → result set. [`probe`] wires the stages
//! together.

pub mod clean;
pub mod extract;
pub mod federate;
pub mod harvest;
pub mod probe;
pub mod segment;

pub use clean::{clean_html, CleanedPage};
pub use extract::{
    Aggregator, BufferSink, ChannelSink, DeliveryMode, ExtractionCoordinator, ExtractionSummary,
    RecordSink, Seed,
};
pub use federate::Federator;
pub use harvest::{HarvestReport, HarvestedPage, Harvester, PageStatus};
pub use probe::{Probe, ProbeBuilder, ProbeInput};
pub use segment::{contains_contact, SegmentReport, Segmenter, Tokenizer, WordTokenizer};

#[cfg(feature = "hf-tokenizers")]
pub use segment::HfTokenizer;
