//! Token-bounded segmentation and contact relevance filtering.
//!
//! Cleaned page text is split into overlapping windows of at most
//! `chunk_size` tokens. Only windows that carry a contact signal (an email,
//! or a phone number in [`RelevanceMode::EmailOrPhone`]) are turned into
//! [`ContentChunk`]s; pages that produce none are reported as unused.
//!
//! Segmentation is a pure function of text and config.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info};

use crate::pipeline::harvest::HarvestedPage;
use crate::types::chunk::{ChunkId, ContentChunk};
use crate::types::config::{ProbeConfig, RelevanceMode};
use crate::types::link::Link;

static RE_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

static RE_PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:\+\d{1,3}\s?)?(?:\(\d{1,4}\)|\d{1,4})[\s.-]?\d{3,9}[\s.-]?\d{4}\b|\b\d{10}\b",
    )
    .unwrap()
});

// Words, or single non-space symbols
static RE_WORD_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+|[^\w\s]").unwrap());

/// Reports the byte span of every token in `text`.
///
/// Spans must be in order, non-overlapping and on char boundaries.
pub trait Tokenizer: Send + Sync {
    fn token_spans(&self, text: &str) -> Vec<(usize, usize)>;
}

/// Deterministic word/punctuation tokenizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn token_spans(&self, text: &str) -> Vec<(usize, usize)> {
        RE_WORD_TOKEN
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .collect()
    }
}

/// HuggingFace tokenizer, from a local `tokenizer.json` or a hub repo.
#[cfg(feature = "hf-tokenizers")]
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
}

#[cfg(feature = "hf-tokenizers")]
impl HfTokenizer {
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| crate::error::ProbeError::Config(format!("tokenizer: {e}")))?;
        Ok(Self { inner })
    }

    /// Download (or reuse the cached copy of) `repo`'s tokenizer from the
    /// HuggingFace hub.
    pub fn from_pretrained(repo: &str) -> crate::error::Result<Self> {
        let inner = tokenizers::Tokenizer::from_pretrained(repo, None).map_err(|e| {
            crate::error::ProbeError::Config(format!("tokenizer {repo}: {e}"))
        })?;
        Ok(Self { inner })
    }
}

#[cfg(feature = "hf-tokenizers")]
impl Tokenizer for HfTokenizer {
    fn token_spans(&self, text: &str) -> Vec<(usize, usize)> {
        match self.inner.encode(text, false) {
            Ok(encoding) => encoding
                .get_offsets()
                .iter()
                .copied()
                .filter(|(start, end)| end > start)
                .collect(),
            Err(err) => {
                tracing::error!(error = %err, "Tokenizer failed to encode text");
                Vec::new()
            }
        }
    }
}

/// True when `text` carries a contact signal under `mode`.
pub fn contains_contact(text: &str, mode: RelevanceMode) -> bool {
    if RE_EMAIL.is_match(text) {
        return true;
    }
    match mode {
        RelevanceMode::EmailOnly => false,
        RelevanceMode::EmailOrPhone => RE_PHONE.is_match(text),
    }
}

/// Email addresses in `text`, in order of appearance.
pub fn find_emails(text: &str) -> Vec<&str> {
    RE_EMAIL.find_iter(text).map(|m| m.as_str()).collect()
}

/// Admitted chunks plus the pages that contributed none.
#[derive(Debug, Clone, Default)]
pub struct SegmentReport {
    pub chunks: Vec<ContentChunk>,
    pub unused: Vec<Arc<Link>>,
    /// Windows produced before relevance filtering
    pub windows: usize,
}

impl SegmentReport {
    /// Id the next segmentation pass should start from.
    pub fn next_id(&self) -> usize {
        self.chunks.last().map_or(0, |c| c.id.0 + 1)
    }
}

pub struct Segmenter {
    tokenizer: Arc<dyn Tokenizer>,
    config: Arc<ProbeConfig>,
}

impl Segmenter {
    pub fn new(config: Arc<ProbeConfig>) -> Self {
        Self::with_tokenizer(Arc::new(WordTokenizer), config)
    }

    pub fn with_tokenizer(tokenizer: Arc<dyn Tokenizer>, config: Arc<ProbeConfig>) -> Self {
        Self { tokenizer, config }
    }

    /// Split `text` into windows of at most `chunk_size` tokens, consecutive
    /// windows sharing `overlap` tokens.
    pub fn split(&self, text: &str, chunk_size: usize) -> Vec<String> {
        let chunk_size = chunk_size.max(1);
        let overlap = self.config.segment.overlap.min(chunk_size - 1);
        let step = chunk_size - overlap;

        let spans = self.tokenizer.token_spans(text);
        let mut windows = Vec::new();
        let mut start = 0;

        while start < spans.len() {
            let end = (start + chunk_size).min(spans.len());
            let (from, _) = spans[start];
            let (_, to) = spans[end - 1];
            windows.push(text[from..to].to_string());

            if end == spans.len() {
                break;
            }
            start += step;
        }

        windows
    }

    /// Segment successful pages, keeping only windows with a contact signal.
    ///
    /// Ids are dense starting at `first_id`, in page then window order.
    pub fn segment(&self, pages: &[HarvestedPage], chunk_size: usize, first_id: usize) -> SegmentReport {
        let mode = self.config.segment.relevance;
        let mut report = SegmentReport::default();
        let mut next_id = first_id;

        for page in pages.iter().filter(|p| p.is_ok()) {
            let windows = self.split(&page.text, chunk_size);
            report.windows += windows.len();

            let before = report.chunks.len();
            for window in windows {
                if !contains_contact(&window, mode) {
                    continue;
                }
                report.chunks.push(
                    ContentChunk::new(ChunkId(next_id), page.link.clone(), window)
                        .with_contact_signal(true),
                );
                next_id += 1;
            }

            if report.chunks.len() == before {
                debug!(url = %page.link.url, "No contact signal on page");
                report.unused.push(page.link.clone());
            }
        }

        info!(
            pages = pages.len(),
            windows = report.windows,
            admitted = report.chunks.len(),
            unused = report.unused.len(),
            "Segmentation complete"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::harvest::PageStatus;
    use crate::types::config::SegmentConfig;
    use proptest::prelude::*;

    fn segmenter(overlap: usize, mode: RelevanceMode) -> Segmenter {
        Segmenter::new(Arc::new(ProbeConfig::default().with_segment(
            SegmentConfig::default().with_overlap(overlap).with_relevance(mode),
        )))
    }

    fn page(url: &str, text: &str) -> HarvestedPage {
        HarvestedPage {
            link: Arc::new(Link::new(url, url, "mock", "q")),
            status: PageStatus::Ok,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_split_windows_overlap() {
        let seg = segmenter(2, RelevanceMode::EmailOnly);
        let windows = seg.split("a b c d e f g", 4);
        assert_eq!(windows, vec!["a b c d", "c d e f", "e f g"]);
    }

    #[test]
    fn test_split_short_text_single_window() {
        let seg = segmenter(15, RelevanceMode::EmailOnly);
        assert_eq!(seg.split("chef@kochi.in", 610), vec!["chef@kochi.in"]);
        assert!(seg.split("   ", 610).is_empty());
    }

    #[test]
    fn test_relevance_modes() {
        assert!(contains_contact("write to chef@kochi.in", RelevanceMode::EmailOnly));
        assert!(!contains_contact("call 9847012345", RelevanceMode::EmailOnly));
        assert!(contains_contact("call 9847012345", RelevanceMode::EmailOrPhone));
        assert!(contains_contact("call +1 415 555 2671", RelevanceMode::EmailOrPhone));
        assert!(!contains_contact("no contact here", RelevanceMode::EmailOrPhone));
    }

    #[test]
    fn test_segment_assigns_dense_ids_and_reports_unused() {
        let seg = segmenter(0, RelevanceMode::EmailOnly);
        let mut failed = page("https://down.com", "");
        failed.status = PageStatus::Failed {
            reason: "timeout".into(),
        };
        let pages = vec![
            page("https://a.com", "a@a.com x y z w b@b.com"),
            page("https://b.com", "nothing useful here"),
            failed,
            page("https://c.com", "write c@c.com"),
        ];

        let report = seg.segment(&pages, 8, 10);

        let ids: Vec<_> = report.chunks.iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![10, 11, 12]);
        assert_eq!(report.chunks[2].source_link.url, "https://c.com");
        assert!(report.chunks.iter().all(|c| c.has_contact_signal));
        let unused: Vec<_> = report.unused.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(unused, vec!["https://b.com"]);
        assert_eq!(report.next_id(), 13);
    }

    proptest! {
        #[test]
        fn prop_windows_bounded_and_overlap_below_size(
            words in proptest::collection::vec("[a-z]{1,8}", 0..200),
            size in 2usize..40,
            overlap in 0usize..15,
        ) {
            let text = words.join(" ");
            let seg = segmenter(overlap, RelevanceMode::EmailOnly);
            let tokenizer = WordTokenizer;
            let windows = seg.split(&text, size);

            for window in &windows {
                prop_assert!(tokenizer.token_spans(window).len() <= size);
            }

            let effective = overlap.min(size - 1);
            for pair in windows.windows(2) {
                let left: Vec<&str> = pair[0].split(' ').collect();
                let right: Vec<&str> = pair[1].split(' ').collect();
                let shared = left.len() - (size - effective);
                prop_assert!(shared < size);
                prop_assert_eq!(&left[left.len() - shared..], &right[..shared]);
            }
        }

        #[test]
        fn prop_segmentation_is_idempotent(
            words in proptest::collection::vec("[a-z]{1,6}|[a-z]{2,5}@[a-z]{2,5}\\.com", 0..120),
            size in 2usize..30,
        ) {
            let seg = segmenter(3, RelevanceMode::EmailOnly);
            let pages = vec![page("https://p.com", &words.join(" "))];

            let first = seg.segment(&pages, size, 0);
            let second = seg.segment(&pages, size, 0);

            let texts = |r: &SegmentReport| r.chunks.iter().map(|c| (c.id, c.text.clone())).collect::<Vec<_>>();
            prop_assert_eq!(texts(&first), texts(&second));
        }
    }

    #[cfg(feature = "hf-tokenizers")]
    const WORD_LEVEL_JSON: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"[UNK]": 0, "call": 1, "anu": 2},
            "unk_token": "[UNK]"
        }
    }"#;

    #[cfg(feature = "hf-tokenizers")]
    #[test]
    fn test_hf_tokenizer_spans_follow_offsets() {
        let tokenizer = HfTokenizer {
            inner: WORD_LEVEL_JSON.parse().unwrap(),
        };
        let text = "Call Anu at anu@kochi.in";

        let spans = tokenizer.token_spans(text);

        let tokens: Vec<&str> = spans.iter().map(|&(s, e)| &text[s..e]).collect();
        assert_eq!(tokens, vec!["Call", "Anu", "at", "anu", "@", "kochi", ".", "in"]);
        assert!(spans.windows(2).all(|w| w[0].1 <= w[1].0));

        let segmenter = Segmenter::with_tokenizer(
            Arc::new(tokenizer),
            Arc::new(ProbeConfig::default()),
        );
        let report = segmenter.segment(&[page("https://anu.in", text)], 600, 0);
        assert_eq!(report.chunks.len(), 1);
        assert_eq!(report.chunks[0].text, text);
    }
}
