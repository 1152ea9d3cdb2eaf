//! Extraction artifact cache.
//!
//! One plain UTF-8 artifact per source stem at
//! `{output_dir}/{stem}_ocr.md`. Existence of the file is authoritative:
//! a hit short-circuits classification, rasterization, and OCR entirely,
//! which is the primary cost control in the pipeline. Writes are
//! all-or-nothing; a crash mid-computation leaves no partial artifact.

use std::io::Write;
use std::path::PathBuf;

use super::error::ExtractError;

/// Artifact file extension. Fixed for the lifetime of a deployment,
/// since cache hits are path-existence checks.
const ARTIFACT_SUFFIX: &str = "_ocr.md";

/// Path-keyed cache of extraction artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    output_dir: PathBuf,
}

impl ArtifactCache {
    /// Open (and create if needed) the cache directory.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, ExtractError> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    /// Deterministic artifact path for a source stem.
    pub fn artifact_path(&self, stem: &str) -> PathBuf {
        self.output_dir.join(format!("{}{}", stem, ARTIFACT_SUFFIX))
    }

    /// Return the artifact's content if it exists.
    ///
    /// Present/absent is the whole contract; there is no partial-cache
    /// state and no sentinel value conflated with real output.
    pub fn lookup(&self, stem: &str) -> Result<Option<String>, ExtractError> {
        let path = self.artifact_path(stem);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        tracing::debug!("Cache hit for {} at {}", stem, path.display());
        Ok(Some(text))
    }

    /// Persist an artifact atomically: write to a temp file in the same
    /// directory, then rename over the final path.
    pub fn store(&self, stem: &str, text: &str) -> Result<PathBuf, ExtractError> {
        let path = self.artifact_path(stem);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.output_dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.persist(&path)
            .map_err(|e| ExtractError::Io(e.error))?;
        tracing::info!("Artifact written: {}", path.display());
        Ok(path)
    }

    /// Return the cached artifact or compute, persist, and return it.
    pub fn get_or_compute<F>(&self, stem: &str, compute: F) -> Result<String, ExtractError>
    where
        F: FnOnce() -> Result<String, ExtractError>,
    {
        if let Some(text) = self.lookup(stem)? {
            return Ok(text);
        }
        let text = compute()?;
        self.store(stem, &text)?;
        Ok(text)
    }
}
