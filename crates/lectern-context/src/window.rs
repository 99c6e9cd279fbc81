//! Greedy chunking of an ordered page window.

use lectern_core::{estimate_tokens, CHARS_PER_TOKEN};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Separator between pages (and between paragraphs of a split page) inside a
/// chunk's text.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// One budget-sized slice of the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextChunk {
    /// The chunk's text, pages joined by [`PAGE_SEPARATOR`].
    pub text: String,
    /// Approximate token count of `text`.
    pub estimated_tokens: u64,
    /// Index of the first source page in the chunk (0-based).
    pub first_page: usize,
    /// Index of the last source page in the chunk (0-based, inclusive).
    pub last_page: usize,
    /// True when an oversized paragraph was cut to fit the budget; the tail
    /// of that paragraph is lost.
    pub truncated: bool,
}

/// An ordered, bounded window of document pages.
///
/// This is the slice of the book the reader currently has open, in page
/// order; chunking never reorders or interleaves pages.
#[derive(Debug, Clone, Default)]
pub struct ContextWindow {
    pages: Vec<String>,
}

impl ContextWindow {
    /// Build a window from pages in reading order.
    #[must_use]
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages }
    }

    /// The window's pages.
    #[must_use]
    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    /// Split the window into chunks that each fit `token_budget`.
    ///
    /// Whole pages are accumulated greedily; a page that alone exceeds the
    /// budget is split along paragraph boundaries by the same greedy rule,
    /// and a single oversized paragraph is hard-truncated to the budget's
    /// character equivalent (lossy, logged at warn level, flagged on the
    /// chunk). Only the truncation case can push a chunk's estimate past the
    /// budget, and then only through multi-byte characters.
    ///
    /// A zero budget fits nothing and yields no chunks.
    #[must_use]
    pub fn chunks(&self, token_budget: u64) -> Vec<ContextChunk> {
        if token_budget == 0 {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut current: Option<Builder> = None;

        for (index, page) in self.pages.iter().enumerate() {
            if estimate_tokens(page) > token_budget {
                // The page cannot share a chunk with anything; close the
                // running chunk and split the page on its own.
                if let Some(builder) = current.take() {
                    chunks.push(builder.finish());
                }
                chunks.extend(split_page(index, page, token_budget));
                continue;
            }

            let fits = current
                .as_ref()
                .is_some_and(|builder| builder.fits_with(page, token_budget));
            if fits {
                if let Some(builder) = current.as_mut() {
                    builder.push(index, page.clone());
                }
            } else {
                if let Some(builder) = current.take() {
                    chunks.push(builder.finish());
                }
                current = Some(Builder::start(index, page.clone()));
            }
        }

        if let Some(builder) = current {
            chunks.push(builder.finish());
        }
        chunks
    }

    /// The default policy generation features use: the first chunk only.
    ///
    /// Earlier pages of a reading window are assumed to carry the
    /// highest-value context (character introductions and the like). Known
    /// limitation, preserved deliberately: when the most relevant content
    /// sits later in the window, it is never selected.
    #[must_use]
    pub fn first_chunk(&self, token_budget: u64) -> Option<ContextChunk> {
        self.chunks(token_budget).into_iter().next()
    }
}

/// Accumulates pieces (whole pages, or paragraphs of one page) for a chunk.
struct Builder {
    first_page: usize,
    last_page: usize,
    pieces: Vec<String>,
    truncated: bool,
}

impl Builder {
    fn start(index: usize, piece: String) -> Self {
        Self {
            first_page: index,
            last_page: index,
            pieces: vec![piece],
            truncated: false,
        }
    }

    /// Whether appending `piece` keeps the joined text inside the budget.
    fn fits_with(&self, piece: &str, token_budget: u64) -> bool {
        let joined_len: usize = self.pieces.iter().map(String::len).sum::<usize>()
            + self.pieces.len() * PAGE_SEPARATOR.len()
            + piece.len();
        estimate_len(joined_len) <= token_budget
    }

    fn push(&mut self, index: usize, piece: String) {
        self.last_page = index;
        self.pieces.push(piece);
    }

    fn finish(self) -> ContextChunk {
        let text = self.pieces.join(PAGE_SEPARATOR);
        let estimated_tokens = estimate_tokens(&text);
        ContextChunk {
            text,
            estimated_tokens,
            first_page: self.first_page,
            last_page: self.last_page,
            truncated: self.truncated,
        }
    }
}

/// Token estimate for a byte length, matching [`estimate_tokens`].
fn estimate_len(len: usize) -> u64 {
    (len as f64 / CHARS_PER_TOKEN).ceil() as u64
}

/// Split one oversized page along paragraph boundaries.
fn split_page(index: usize, page: &str, token_budget: u64) -> Vec<ContextChunk> {
    let mut chunks = Vec::new();
    let mut current: Option<Builder> = None;

    for paragraph in page.split(PAGE_SEPARATOR) {
        if estimate_tokens(paragraph) > token_budget {
            if let Some(builder) = current.take() {
                chunks.push(builder.finish());
            }
            chunks.push(truncate_paragraph(index, paragraph, token_budget));
            continue;
        }

        let fits = current
            .as_ref()
            .is_some_and(|builder| builder.fits_with(paragraph, token_budget));
        if fits {
            if let Some(builder) = current.as_mut() {
                builder.push(index, paragraph.to_string());
            }
        } else {
            if let Some(builder) = current.take() {
                chunks.push(builder.finish());
            }
            current = Some(Builder::start(index, paragraph.to_string()));
        }
    }

    if let Some(builder) = current {
        chunks.push(builder.finish());
    }
    chunks
}

/// Hard-truncate a paragraph to the budget's character equivalent.
fn truncate_paragraph(index: usize, paragraph: &str, token_budget: u64) -> ContextChunk {
    let keep_chars = (token_budget as f64 * CHARS_PER_TOKEN) as usize;
    let text: String = paragraph.chars().take(keep_chars).collect();
    warn!(
        page = index,
        paragraph_chars = paragraph.chars().count(),
        kept_chars = keep_chars,
        token_budget,
        "oversized paragraph hard-truncated; estimation degraded"
    );
    let estimated_tokens = estimate_tokens(&text);
    ContextChunk {
        text,
        estimated_tokens,
        first_page: index,
        last_page: index,
        truncated: true,
    }
}
