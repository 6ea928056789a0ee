// Text extraction module
// Pulls per-page plain text out of the source PDFs


use std::path::Path;
use std::sync::LazyLock;

use fancy_regex::Regex;
use pdf_oxide::PdfDocument;
use pdf_oxide::converters::ConversionOptions;
use tracing::{debug, warn};

use crate::{Result, SchemeError};

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Extracted text of a single PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-based page number in the source document.
    pub page_number: u32,
    pub text: String,
}

/// One fully extracted source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Stable source identifier, the PDF file stem.
    pub doc_id: String,
    pub file_name: String,
    pub page_count: u32,
    /// Pages with extractable text, in document order.
    pub pages: Vec<PageText>,
    /// Per-page problems that degraded, rather than aborted, extraction.
    pub warnings: Vec<String>,
}

/// Extract the text of one PDF document.
///
/// Pages that fail to convert degrade to a recorded warning; a document with
/// no extractable text at all is an extraction failure.
#[inline]
pub fn extract_document(path: &Path) -> Result<ExtractedDocument> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let doc_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.clone());

    debug!("Extracting text from {}", path.display());

    let path_str = path.to_string_lossy();
    let mut document = PdfDocument::open(path_str.as_ref()).map_err(|e| SchemeError::Extraction {
        document: doc_id.clone(),
        reason: format!("failed to open PDF: {}", e),
    })?;

    let page_count = document.page_count().map_err(|e| SchemeError::Extraction {
        document: doc_id.clone(),
        reason: format!("failed to read page count: {}", e),
    })?;

    let options = conversion_options();
    let mut pages = Vec::new();
    let mut warnings = Vec::new();

    for page_index in 0..page_count {
        match document.to_markdown(page_index, &options) {
            Ok(raw) => {
                let text = clean_text(&raw);
                if !text.is_empty() {
                    pages.push(PageText {
                        page_number: (page_index + 1) as u32,
                        text,
                    });
                }
            }
            Err(e) => {
                let message = format!("page {}: {}", page_index + 1, e);
                warn!("Partial extraction of '{}': {}", doc_id, message);
                warnings.push(message);
            }
        }
    }

    if pages.is_empty() {
        return Err(SchemeError::Extraction {
            document: doc_id,
            reason: "no extractable text".to_string(),
        });
    }

    debug!(
        "Extracted {} of {} pages from '{}' ({} warnings)",
        pages.len(),
        page_count,
        doc_id,
        warnings.len()
    );

    Ok(ExtractedDocument {
        doc_id,
        file_name,
        page_count: page_count as u32,
        pages,
        warnings,
    })
}

fn conversion_options() -> ConversionOptions {
    ConversionOptions {
        include_images: false,
        ..ConversionOptions::default()
    }
}

/// Collapse runs of whitespace and strip control characters so that chunking
/// and rebuilds are byte-stable.
#[inline]
pub fn clean_text(raw: &str) -> String {
    let without_nul: String = raw.chars().filter(|c| *c != '\0').collect();
    WHITESPACE
        .replace_all(&without_nul, " ")
        .trim()
        .to_string()
}
