//! Configuration management for Mindex.
//!
//! Settings come from a TOML file (`mindex.toml` next to the data, or
//! `~/.config/mindex/config.toml`), with defaults for everything so the
//! tool works with no config at all. The LLM section additionally honors
//! environment variable overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::llm::LlmConfig;

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Data directory layout.
    #[serde(default)]
    pub paths: PathSettings,
    /// OCR extraction tuning.
    #[serde(default)]
    pub ocr: OcrSettings,
    /// Chunking parameters for ingestion.
    #[serde(default)]
    pub chunking: ChunkSettings,
    /// LLM endpoint configuration.
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Directory layout for inputs, extraction artifacts, and the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Directory scanned for source documents.
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    /// Directory where extraction artifacts (`{stem}_ocr.md`) are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Directory holding the persisted vector store.
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
    /// JSONL file accumulating chunks between extraction and embedding.
    #[serde(default = "default_chunks_file")]
    pub chunks_file: PathBuf,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("data/input")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/output")
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("data/store")
}

fn default_chunks_file() -> PathBuf {
    PathBuf::from("data/chunks/chunks.jsonl")
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            store_dir: default_store_dir(),
            chunks_file: default_chunks_file(),
        }
    }
}

impl PathSettings {
    /// Expand `~` and environment variables in all configured paths.
    pub fn expanded(&self) -> Self {
        Self {
            input_dir: expand_path(&self.input_dir),
            output_dir: expand_path(&self.output_dir),
            store_dir: expand_path(&self.store_dir),
            chunks_file: expand_path(&self.chunks_file),
        }
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match shellexpand::full(&s) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}

/// OCR extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrSettings {
    /// Recognition languages as ISO codes, in priority order.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    /// Rasterization resolution for scanned pages.
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// How many leading pages to probe for a native text layer.
    #[serde(default = "default_probe_pages")]
    pub probe_pages: u32,
    /// Hard wall-clock bound per page, in seconds.
    #[serde(default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,
    /// Worker cap when recognition runs on CPU.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Worker cap when recognition runs on GPU (memory contention).
    #[serde(default = "default_gpu_workers")]
    pub gpu_workers: usize,
    /// Force CPU recognition even when a GPU is available.
    #[serde(default)]
    pub force_cpu: bool,
}

fn default_languages() -> Vec<String> {
    vec!["por".to_string(), "eng".to_string()]
}

fn default_dpi() -> u32 {
    150
}

fn default_probe_pages() -> u32 {
    3
}

fn default_page_timeout_secs() -> u64 {
    120
}

fn default_max_workers() -> usize {
    8
}

fn default_gpu_workers() -> usize {
    2
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            dpi: default_dpi(),
            probe_pages: default_probe_pages(),
            page_timeout_secs: default_page_timeout_secs(),
            max_workers: default_max_workers(),
            gpu_workers: default_gpu_workers(),
            force_cpu: false,
        }
    }
}

/// Chunking settings for the ingestion step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSettings {
    /// Maximum chunk size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Overlap between consecutive chunks, in characters.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    800
}

fn default_chunk_overlap() -> usize {
    100
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Load settings from an explicit path, or from the first config file
/// found in the standard locations, or defaults if none exists.
pub fn load_settings(explicit: Option<&Path>) -> anyhow::Result<Settings> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read config {}: {}", path.display(), e))?;
        let mut settings: Settings = toml::from_str(&content)?;
        settings.paths = settings.paths.expanded();
        return Ok(settings);
    }

    for candidate in candidate_config_paths() {
        if candidate.exists() {
            tracing::debug!("Loading config from {}", candidate.display());
            let content = std::fs::read_to_string(&candidate)?;
            let mut settings: Settings = toml::from_str(&content)?;
            settings.paths = settings.paths.expanded();
            return Ok(settings);
        }
    }

    Ok(Settings::default())
}

/// Config file locations, in lookup order.
fn candidate_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("mindex.toml")];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("mindex").join("config.toml"));
    }
    paths
}
