//! Vector store boundary.
//!
//! The embedding model and index are collaborators behind a small trait:
//! `add` with exact-text dedup and `query_with_score` over ranked
//! matches. The in-crate reference implementation keeps everything in
//! memory with JSONL persistence; a real deployment can swap in an
//! external index behind the same trait.

mod memory;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryVectorStore;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store data malformed: {0}")]
    Malformed(String),
}

/// A stored chunk as returned from a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub content: String,
    pub metadata: serde_json::Value,
}

/// Text index with similarity search.
pub trait VectorStore: Send + Sync {
    /// Add texts with their metadata, skipping texts already present
    /// (exact-content match). Returns how many were actually added.
    fn add(
        &mut self,
        texts: Vec<String>,
        metadatas: Vec<serde_json::Value>,
    ) -> Result<usize, StoreError>;

    /// Top-k matches for a query, best first, with similarity scores.
    fn query_with_score(
        &self,
        text: &str,
        k: usize,
    ) -> Result<Vec<(StoredChunk, f32)>, StoreError>;

    /// Number of stored chunks.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
