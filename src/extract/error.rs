//! Document-level extraction errors.

use thiserror::Error;

/// Errors that end processing for one document.
///
/// Page-level failures never surface here; they are contained in the
/// scheduler as per-page outcomes.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Extension has no registered loader and no OCR route.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The document could not be opened or probed at all.
    #[error("cannot classify document: {0}")]
    Classification(String),

    /// A required external tool is not installed.
    #[error("external tool not found: {0}")]
    ToolNotFound(String),

    /// A structured-format loader failed.
    #[error("loader failed: {0}")]
    Loader(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
