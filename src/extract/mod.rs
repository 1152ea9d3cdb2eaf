//! Document text extraction.
//!
//! Turns source documents into plain-text artifacts:
//! - PDFs with a native text layer are read page-by-page via pdftotext
//! - scanned PDFs are rasterized per page (pdftoppm) and recognized with
//!   OCR across a bounded worker pool with per-page timeouts
//! - raster images go straight to OCR
//! - structured text formats (txt, docx, epub) go through a pluggable
//!   loader registry
//!
//! Artifacts are cached as `{stem}_ocr.md` files; a cache hit skips all
//! downstream work.

mod cache;
mod classify;
mod engine;
mod error;
mod loaders;
mod native;
mod pipeline;
mod raster;
mod scheduler;

pub use cache::ArtifactCache;
pub use classify::{classify, page_count, DocumentKind};
pub use engine::{gpu_available, select_device, Device, OcrEngine, OcrError, TesseractEngine};
pub use error::ExtractError;
pub use loaders::{DocumentLoader, LoaderRegistry};
pub use native::extract_native_text;
pub use pipeline::{collect_files, ExtractSummary, Extractor, ExtractorOptions};
pub use raster::Rasterizer;
pub use scheduler::{
    merge_results, pool_size, run_pages, PageOutcome, PageResult, PageTask, SchedulerOptions,
};
