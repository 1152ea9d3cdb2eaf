//! Page rasterization for OCR.
//!
//! Each page is rendered independently to a grayscale PNG so pages can
//! be handed to workers with no shared state. A page that fails to
//! rasterize fails alone; the document continues.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::error::ExtractError;

/// Renders single PDF pages to grayscale raster images.
#[derive(Debug, Clone, Copy)]
pub struct Rasterizer {
    dpi: u32,
}

impl Rasterizer {
    pub fn new(dpi: u32) -> Self {
        Self { dpi }
    }

    /// Render one page into `out_dir` and return the image path.
    pub fn rasterize_page(
        &self,
        pdf_path: &Path,
        page: u32,
        out_dir: &Path,
    ) -> Result<PathBuf, ExtractError> {
        let page_str = page.to_string();
        let dpi_str = self.dpi.to_string();
        let output_prefix = out_dir.join("page");

        let output = Command::new("pdftoppm")
            .args(["-png", "-gray", "-r", &dpi_str, "-f", &page_str, "-l", &page_str])
            .arg(pdf_path)
            .arg(&output_prefix)
            .output();

        match output {
            Ok(out) if out.status.success() => {
                find_page_image(out_dir, page).ok_or_else(|| {
                    ExtractError::Loader(format!("no image generated for page {}", page))
                })
            }
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                Err(ExtractError::Loader(format!(
                    "pdftoppm failed on page {}: {}",
                    page,
                    stderr.trim()
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ExtractError::ToolNotFound(
                "pdftoppm (install poppler-utils)".to_string(),
            )),
            Err(e) => Err(ExtractError::Io(e)),
        }
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new(150)
    }
}

/// Find the image file for a specific page number.
///
/// pdftoppm pads the page number to the document's digit count:
/// page-01.png, page-001.png, and so on.
fn find_page_image(dir: &Path, page: u32) -> Option<PathBuf> {
    for digits in [1, 2, 3, 4] {
        let filename = format!("page-{:0width$}.png", page, width = digits);
        let path = dir.join(&filename);
        if path.exists() {
            return Some(path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_page_image_padding() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("page-007.png"), b"img").unwrap();
        let found = find_page_image(dir.path(), 7).unwrap();
        assert!(found.ends_with("page-007.png"));
    }

    #[test]
    fn test_find_page_image_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(find_page_image(dir.path(), 3).is_none());
    }
}
