//! Extraction orchestration.
//!
//! Per document: cache lookup, classification, dispatch to the native or
//! OCR route, artifact write-through. Page failures degrade to partial
//! text; only a document that cannot be classified at all fails, and a
//! failed document never aborts the rest of a batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::cache::ArtifactCache;
use super::classify::{classify, page_count, DocumentKind};
use super::engine::{OcrEngine, TesseractEngine};
use super::error::ExtractError;
use super::loaders::LoaderRegistry;
use super::native::extract_native_text;
use super::raster::Rasterizer;
use super::scheduler::{merge_results, run_pages, PageTask, SchedulerOptions};
use crate::config::OcrSettings;
use crate::utils::remove_dir_with_retry;

/// Orchestrator tuning, derived from [`OcrSettings`].
#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    pub probe_pages: u32,
    pub dpi: u32,
    pub scheduler: SchedulerOptions,
}

impl From<&OcrSettings> for ExtractorOptions {
    fn from(settings: &OcrSettings) -> Self {
        Self {
            probe_pages: settings.probe_pages,
            dpi: settings.dpi,
            scheduler: SchedulerOptions {
                page_timeout: Duration::from_secs(settings.page_timeout_secs),
                force_cpu: settings.force_cpu,
                max_workers: settings.max_workers,
                gpu_workers: settings.gpu_workers,
            },
        }
    }
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            probe_pages: 3,
            dpi: 150,
            scheduler: SchedulerOptions::default(),
        }
    }
}

/// Outcome of a batch extraction run.
#[derive(Debug, Default)]
pub struct ExtractSummary {
    pub extracted: usize,
    pub cached: usize,
    pub failed: usize,
    pub unsupported: usize,
}

/// Top-level document text extractor.
pub struct Extractor {
    registry: LoaderRegistry,
    engine: Arc<dyn OcrEngine>,
    cache: ArtifactCache,
    rasterizer: Rasterizer,
    options: ExtractorOptions,
}

impl Extractor {
    /// Extractor with the Tesseract engine and built-in loaders.
    pub fn new(output_dir: &Path, settings: &OcrSettings) -> Result<Self, ExtractError> {
        let engine = Arc::new(TesseractEngine::new(settings.languages.clone()));
        Self::with_engine(output_dir, engine, ExtractorOptions::from(settings))
    }

    /// Extractor with a caller-provided engine (tests, alternate backends).
    pub fn with_engine(
        output_dir: &Path,
        engine: Arc<dyn OcrEngine>,
        options: ExtractorOptions,
    ) -> Result<Self, ExtractError> {
        Ok(Self {
            registry: LoaderRegistry::builtin(),
            engine,
            cache: ArtifactCache::new(output_dir)?,
            rasterizer: Rasterizer::new(options.dpi),
            options,
        })
    }

    /// Replace the loader registry (adds or overrides formats).
    pub fn with_registry(mut self, registry: LoaderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Extract one document to text, writing through the artifact cache.
    ///
    /// A cache hit returns the existing artifact without touching the
    /// classifier, rasterizer, or OCR engine.
    pub async fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let stem = source_stem(path)?;

        if let Some(text) = self.cache.lookup(&stem)? {
            tracing::info!("Skipping {} (artifact exists)", path.display());
            return Ok(text);
        }

        let kind = classify(path, &self.registry, self.options.probe_pages)?;
        tracing::info!("Classified {} as {:?}", path.display(), kind);

        let text = match kind {
            DocumentKind::NativeTextPdf => extract_native_text(path)?,
            DocumentKind::ScannedPdf => self.ocr_pdf(path).await?,
            DocumentKind::Image => self.ocr_image(path).await?,
            DocumentKind::StructuredText => self.registry.load(path)?,
        };

        self.cache.store(&stem, &text)?;
        Ok(text)
    }

    /// Rasterize every page, schedule OCR, and merge in page order.
    ///
    /// The scratch directory is removed on every outcome; abandoned
    /// timed-out workers can still hold rasters, so removal uses bounded
    /// retries instead of the temp-dir guard's single silent attempt.
    async fn ocr_pdf(&self, path: &Path) -> Result<String, ExtractError> {
        let pages = page_count(path).ok_or_else(|| {
            ExtractError::Classification(format!("cannot read page count of {}", path.display()))
        })?;

        let scratch = tempfile::TempDir::new()?;
        let outcome = self.ocr_pages(path, pages, scratch.path()).await;

        let scratch_dir = scratch.keep();
        if let Err(e) = remove_dir_with_retry(&scratch_dir, 5, Duration::from_millis(200)) {
            tracing::warn!("Scratch cleanup incomplete: {}", e);
        }

        outcome
    }

    async fn ocr_pages(
        &self,
        path: &Path,
        pages: u32,
        scratch: &Path,
    ) -> Result<String, ExtractError> {
        let mut tasks = Vec::with_capacity(pages as usize);
        let mut raster_failures = 0usize;
        for page in 1..=pages {
            let page_dir = scratch.join(format!("p{}", page));
            std::fs::create_dir_all(&page_dir)?;
            match self.rasterizer.rasterize_page(path, page, &page_dir) {
                Ok(image) => tasks.push(PageTask { index: page, image }),
                Err(ExtractError::ToolNotFound(tool)) => {
                    // No page can rasterize without the tool
                    return Err(ExtractError::ToolNotFound(tool));
                }
                Err(e) => {
                    // Page-level failure: the document continues with a gap
                    raster_failures += 1;
                    tracing::warn!(
                        "Rasterization failed for page {} of {}: {}",
                        page,
                        path.display(),
                        e
                    );
                }
            }
        }

        tracing::info!(
            "Running OCR on {} pages of {} ({} rasterization failures)",
            tasks.len(),
            path.display(),
            raster_failures
        );
        let results = run_pages(self.engine.clone(), tasks, &self.options.scheduler).await;
        Ok(merge_results(&results))
    }

    /// OCR a standalone raster image through the same scheduler path so
    /// timeout and fallback behavior match PDF pages.
    async fn ocr_image(&self, path: &Path) -> Result<String, ExtractError> {
        let task = PageTask {
            index: 1,
            image: path.to_path_buf(),
        };
        let results = run_pages(self.engine.clone(), vec![task], &self.options.scheduler).await;
        Ok(merge_results(&results))
    }

    /// Extract every supported document under a directory.
    ///
    /// Document-level failures are logged and counted; the batch always
    /// runs to completion.
    pub async fn extract_all(&self, input_dir: &Path) -> Result<ExtractSummary, ExtractError> {
        let files = collect_files(input_dir, None)?;
        let mut summary = ExtractSummary::default();

        for file in files {
            let stem = match source_stem(&file) {
                Ok(stem) => stem,
                Err(_) => continue,
            };
            let had_artifact = self.cache.lookup(&stem)?.is_some();

            match self.extract(&file).await {
                Ok(_) if had_artifact => summary.cached += 1,
                Ok(_) => summary.extracted += 1,
                Err(ExtractError::UnsupportedFormat(ext)) => {
                    tracing::debug!("Skipping unsupported format {} ({})", file.display(), ext);
                    summary.unsupported += 1;
                }
                Err(e) => {
                    tracing::error!("Extraction failed for {}: {}", file.display(), e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}

/// Cache key for a source document: its file stem.
fn source_stem(path: &Path) -> Result<String, ExtractError> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| {
            ExtractError::Classification(format!("no usable file name: {}", path.display()))
        })
}

/// Collect files under a directory recursively, optionally filtered by
/// extension (lowercase, without the dot).
pub fn collect_files(
    dir: &Path,
    extensions: Option<&[&str]>,
) -> Result<Vec<PathBuf>, ExtractError> {
    let mut files = Vec::new();
    collect_into(dir, extensions, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_into(
    dir: &Path,
    extensions: Option<&[&str]>,
    files: &mut Vec<PathBuf>,
) -> Result<(), ExtractError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_into(&path, extensions, files)?;
        } else if let Some(wanted) = extensions {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
                .unwrap_or_default();
            if wanted.contains(&ext.as_str()) {
                files.push(path);
            }
        } else {
            files.push(path);
        }
    }
    Ok(())
}
