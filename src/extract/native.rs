//! Native text layer extraction for PDFs that have one.
//!
//! No OCR is involved; caching stays with the orchestrator.

use std::path::Path;

use super::classify::{extract_page_text, page_count};
use super::error::ExtractError;

/// Page separator in assembled documents.
pub(crate) const PAGE_SEPARATOR: &str = "\n\n";

/// Extract the embedded text layer page-by-page and join pages with a
/// blank line. A page that fails to extract is skipped with a warning;
/// an unreadable page count fails the document, since guessing one would
/// truncate everything past the guess and the cache would keep it.
pub fn extract_native_text(path: &Path) -> Result<String, ExtractError> {
    let pages = page_count(path).ok_or_else(|| {
        ExtractError::Classification(format!("cannot read page count of {}", path.display()))
    })?;
    let mut texts: Vec<String> = Vec::with_capacity(pages as usize);

    for page in 1..=pages {
        match extract_page_text(path, page) {
            Ok(text) => texts.push(text.trim_end().to_string()),
            Err(ExtractError::ToolNotFound(tool)) => {
                // Without pdftotext no page can succeed
                return Err(ExtractError::ToolNotFound(tool));
            }
            Err(e) => {
                tracing::warn!(
                    "Native text extraction failed for page {} of {}: {}",
                    page,
                    path.display(),
                    e
                );
            }
        }
    }

    Ok(texts.join(PAGE_SEPARATOR))
}
