//! Format classification.
//!
//! Decides, per document, which extraction route applies: native-text
//! PDF, scanned PDF, raster image, or structured text. The PDF decision
//! is a bounded heuristic probe of the leading pages' text layer; any
//! probe failure classifies as scanned, because unnecessary OCR is
//! preferred over silently skipped content.

use std::io::Read;
use std::path::Path;
use std::process::Command;

use super::error::ExtractError;
use super::loaders::LoaderRegistry;

/// Extraction route for a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// PDF with an embedded text layer.
    NativeTextPdf,
    /// PDF without usable text; needs rasterization and OCR.
    ScannedPdf,
    /// Raster image; needs OCR directly.
    Image,
    /// Format handled by a registered loader.
    StructuredText,
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Classify a document by content sniff, extension, and text-layer probe.
pub fn classify(
    path: &Path,
    registry: &LoaderRegistry,
    probe_pages: u32,
) -> Result<DocumentKind, ExtractError> {
    if !path.is_file() {
        return Err(ExtractError::Classification(format!(
            "not a readable file: {}",
            path.display()
        )));
    }

    // Prefer magic bytes over the filename for binary formats; files
    // scraped from the wild are frequently misnamed.
    let ext = sniff_extension(path)
        .or_else(|| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
        })
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => {
            if is_scanned_pdf(path, probe_pages) {
                Ok(DocumentKind::ScannedPdf)
            } else {
                Ok(DocumentKind::NativeTextPdf)
            }
        }
        e if IMAGE_EXTENSIONS.contains(&e) => Ok(DocumentKind::Image),
        e if registry.supports(e) => Ok(DocumentKind::StructuredText),
        e => Err(ExtractError::UnsupportedFormat(if e.is_empty() {
            path.display().to_string()
        } else {
            e.to_string()
        })),
    }
}

/// Detect a canonical extension from the file's magic bytes.
fn sniff_extension(path: &Path) -> Option<String> {
    let mut file = std::fs::File::open(path).ok()?;
    let mut buffer = [0u8; 8192];
    let read = file.read(&mut buffer).ok()?;
    if read == 0 {
        return None;
    }
    let kind = infer::get(&buffer[..read])?;
    match kind.extension() {
        // Only trust the sniff for formats we route on; docx/epub sniff
        // as zip, and text formats don't sniff at all.
        ext @ ("pdf" | "png" | "jpg") => Some(ext.to_string()),
        _ => None,
    }
}

/// Probe the leading pages for a native text layer.
///
/// True when every probed page is whitespace-only or unreadable. The
/// window is bounded: dense text on page `probe_pages + 1` of an
/// otherwise blank document still classifies as scanned.
pub fn is_scanned_pdf(path: &Path, probe_pages: u32) -> bool {
    let pages = page_count(path).unwrap_or(u32::MAX);
    probe_is_scanned(|page| extract_page_text(path, page), pages, probe_pages)
}

/// Probe logic over an arbitrary page-text source.
pub(crate) fn probe_is_scanned<F>(page_text: F, pages: u32, probe_pages: u32) -> bool
where
    F: Fn(u32) -> Result<String, ExtractError>,
{
    let window = probe_pages.min(pages).max(1);
    for page in 1..=window {
        match page_text(page) {
            Ok(text) if !text.trim().is_empty() => return false,
            Ok(_) => {}
            Err(e) => {
                // Corrupt or unparseable: assume OCR is needed
                tracing::debug!("Text-layer probe failed on page {}: {}", page, e);
                return true;
            }
        }
    }
    true
}

/// Page count of a PDF via pdfinfo.
pub fn page_count(path: &Path) -> Option<u32> {
    let output = Command::new("pdfinfo").arg(path).output().ok()?;
    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        if line.starts_with("Pages:") {
            return line.split_whitespace().nth(1).and_then(|s| s.parse().ok());
        }
    }
    None
}

/// Extract the native text layer of a single PDF page.
pub(crate) fn extract_page_text(path: &Path, page: u32) -> Result<String, ExtractError> {
    let page_str = page.to_string();
    let output = Command::new("pdftotext")
        .args(["-layout", "-enc", "UTF-8", "-f", &page_str, "-l", &page_str])
        .arg(path)
        .arg("-") // stdout
        .output();

    match output {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ExtractError::Classification(format!(
                    "pdftotext failed on page {}: {}",
                    page,
                    stderr.trim()
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ExtractError::ToolNotFound(
            "pdftotext (install poppler-utils)".to_string(),
        )),
        Err(e) => Err(ExtractError::Io(e)),
    }
}
