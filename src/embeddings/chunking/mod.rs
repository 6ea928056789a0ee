
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extractor::{ExtractedDocument, PageText};

/// Configuration for passage chunking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Hard upper bound on chunk length in chars.
    pub max_chars: usize,
    /// Lower edge of the window searched for a sentence boundary. Only the
    /// final chunk of a page may be shorter than this.
    pub min_chars: usize,
    /// Chars of the previous chunk repeated at the start of the next one.
    pub overlap_chars: usize,
    /// Prefer cutting after `.`, `!` or `?` inside the boundary window
    /// before falling back to a hard cut at `max_chars`.
    pub sentence_boundary_splitting: bool,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_chars: 1400,
            min_chars: 300,
            overlap_chars: 200,
            sentence_boundary_splitting: true,
        }
    }
}

/// A bounded passage of one source page, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    pub doc_id: String,
    pub file_name: String,
    /// 1-based page number in the source document.
    pub page_number: u32,
    /// 1-based ordinal of this chunk within its page.
    pub chunk_no: u32,
    /// Byte span within the cleaned page text.
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Chunk every extracted page of a document, in page order.
///
/// Chunking is a pure function of the text and the configuration, so
/// rebuilding from the same corpus yields an identical chunk sequence.
#[inline]
pub fn chunk_document(document: &ExtractedDocument, config: &ChunkingConfig) -> Vec<DocumentChunk> {
    let chunks: Vec<DocumentChunk> = document
        .pages
        .iter()
        .flat_map(|page| chunk_page(&document.doc_id, &document.file_name, page, config))
        .collect();

    debug!(
        "Chunked '{}' into {} chunks across {} pages",
        document.doc_id,
        chunks.len(),
        document.pages.len()
    );

    chunks
}

/// Chunk a single page into bounded, overlapping passages.
#[inline]
pub fn chunk_page(
    doc_id: &str,
    file_name: &str,
    page: &PageText,
    config: &ChunkingConfig,
) -> Vec<DocumentChunk> {
    chunk_spans(&page.text, config)
        .into_iter()
        .enumerate()
        .filter_map(|(i, (start, end))| {
            let text = page.text.get(start..end)?;
            Some(DocumentChunk {
                doc_id: doc_id.to_string(),
                file_name: file_name.to_string(),
                page_number: page.page_number,
                chunk_no: (i + 1) as u32,
                start,
                end,
                text: text.to_string(),
            })
        })
        .collect()
}

/// Compute the chunk byte spans covering `text` left to right.
///
/// Consecutive spans overlap by `overlap_chars`; every span except the last
/// ends either after a sentence terminator inside the boundary window or at
/// the hard `max_chars` cut.
pub(crate) fn chunk_spans(text: &str, config: &ChunkingConfig) -> Vec<(usize, usize)> {
    let len = text.len();
    if text.trim().is_empty() {
        return Vec::new();
    }
    if len <= config.max_chars {
        return vec![(0, len)];
    }

    let mut spans = Vec::new();
    let mut start = 0;

    while start < len {
        let hard_end = floor_char_boundary(text, (start + config.max_chars).min(len));
        let end = if hard_end < len && config.sentence_boundary_splitting {
            sentence_cut(text, start, hard_end, config.min_chars).unwrap_or(hard_end)
        } else {
            hard_end
        };

        spans.push((start, end));
        if end >= len {
            break;
        }

        let mut next = floor_char_boundary(text, end.saturating_sub(config.overlap_chars));
        if next <= start {
            // Overlap would stall the cursor; drop it for this step.
            next = end;
        }
        start = next;
    }

    spans
}

/// Find the last sentence terminator inside `[start + min_chars, hard_end]`
/// and return the cut position just after it.
fn sentence_cut(text: &str, start: usize, hard_end: usize, min_chars: usize) -> Option<usize> {
    let floor = start + min_chars;
    let window = text.get(start..hard_end)?;

    let mut cut = None;
    for (i, c) in window.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            let candidate = start + i + c.len_utf8();
            if candidate >= floor && candidate <= hard_end {
                cut = Some(candidate);
            }
        }
    }
    cut
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
