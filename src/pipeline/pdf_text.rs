//! Plain-text extraction from PDF bytes via lopdf.
//!
//! Parsing and content-stream decoding are CPU-bound and synchronous, so the
//! async entry point moves the work onto the blocking pool with
//! `tokio::task::spawn_blocking`.
//!
//! Pages are visited in page-number order and their text is concatenated
//! with no separator. A page that yields no text (a scan, a blank
//! separator page) contributes nothing; a page whose content cannot be
//! decoded fails the whole document so a partial text never reaches the model.

use crate::error::ExtractError;
use lopdf::Document;
use tracing::{debug, info};

/// Text of a whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentText {
    /// Concatenated text of every page.
    pub text: String,
    /// Number of pages in the document.
    pub page_count: usize,
    /// 1-indexed pages that produced no text.
    pub empty_pages: Vec<u32>,
}

/// Extract the text of every page.
///
/// `source_name` is only used in log lines and errors.
pub async fn extract_text(bytes: Vec<u8>, source_name: &str) -> Result<DocumentText, ExtractError> {
    let name = source_name.to_string();
    tokio::task::spawn_blocking(move || extract_text_blocking(&bytes, &name))
        .await
        .map_err(|e| ExtractError::Internal(format!("Text extraction task panicked: {}", e)))?
}

/// Blocking implementation of text extraction.
pub fn extract_text_blocking(bytes: &[u8], source_name: &str) -> Result<DocumentText, ExtractError> {
    let document = Document::load_mem(bytes).map_err(|e| ExtractError::CorruptPdf {
        source_name: source_name.to_string(),
        detail: e.to_string(),
    })?;

    let pages = document.get_pages();
    let page_count = pages.len();
    info!("PDF loaded: {} pages", page_count);

    let mut text = String::new();
    let mut empty_pages = Vec::new();

    for &page_num in pages.keys() {
        let page_text = document
            .extract_text(&[page_num])
            .map_err(|e| ExtractError::CorruptPdf {
                source_name: source_name.to_string(),
                detail: format!("page {}: {}", page_num, e),
            })?;

        if page_text.trim().is_empty() {
            debug!("Page {} has no extractable text", page_num);
            empty_pages.push(page_num);
        }
        text.push_str(&page_text);
    }

    if !empty_pages.is_empty() {
        debug!(
            "{} of {} pages in '{}' produced no text",
            empty_pages.len(),
            page_count,
            source_name
        );
    }
    debug!("Extracted {} characters of text", text.chars().count());

    Ok(DocumentText {
        text,
        page_count,
        empty_pages,
    })
}
