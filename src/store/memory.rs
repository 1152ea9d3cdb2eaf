//! Reference vector store: term-frequency cosine over an in-memory
//! index, persisted as JSONL.
//!
//! Deliberately simple: scoring quality is a collaborator concern, not
//! something this crate owns. Dedup keys are sha256 of the exact chunk
//! text.

use std::collections::{HashMap, HashSet};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::{StoreError, StoredChunk, VectorStore};

/// Sparse term-frequency vector.
type TermVector = HashMap<String, f32>;

struct Entry {
    chunk: StoredChunk,
    vector: TermVector,
    norm: f32,
}

/// In-memory store with JSONL persistence.
pub struct MemoryVectorStore {
    entries: Vec<Entry>,
    seen: HashSet<String>,
    path: Option<PathBuf>,
}

impl MemoryVectorStore {
    /// Volatile store (tests, one-shot runs).
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            seen: HashSet::new(),
            path: None,
        }
    }

    /// Store backed by `{dir}/store.jsonl`, loading existing entries.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("store.jsonl");
        let mut store = Self::new();
        store.path = Some(path.clone());

        if path.exists() {
            let file = std::fs::File::open(&path)?;
            for line in std::io::BufReader::new(file).lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let chunk: StoredChunk = serde_json::from_str(&line)
                    .map_err(|e| StoreError::Malformed(e.to_string()))?;
                store.insert(chunk);
            }
            tracing::debug!("Loaded {} chunks from {}", store.entries.len(), path.display());
        }

        Ok(store)
    }

    fn insert(&mut self, chunk: StoredChunk) -> bool {
        let key = content_key(&chunk.content);
        if !self.seen.insert(key) {
            return false;
        }
        let vector = term_vector(&chunk.content);
        let norm = vector_norm(&vector);
        self.entries.push(Entry {
            chunk,
            vector,
            norm,
        });
        true
    }

    fn append_to_disk(&self, chunks: &[&StoredChunk]) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        for chunk in chunks {
            let line = serde_json::to_string(chunk)
                .map_err(|e| StoreError::Malformed(e.to_string()))?;
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorStore for MemoryVectorStore {
    fn add(
        &mut self,
        texts: Vec<String>,
        metadatas: Vec<serde_json::Value>,
    ) -> Result<usize, StoreError> {
        let mut metadatas = metadatas.into_iter();
        let mut added_indices = Vec::new();

        for text in texts {
            let metadata = metadatas.next().unwrap_or(serde_json::Value::Null);
            let chunk = StoredChunk {
                content: text,
                metadata,
            };
            if self.insert(chunk) {
                added_indices.push(self.entries.len() - 1);
            }
        }

        let new_chunks: Vec<&StoredChunk> =
            added_indices.iter().map(|&i| &self.entries[i].chunk).collect();
        self.append_to_disk(&new_chunks)?;

        Ok(added_indices.len())
    }

    fn query_with_score(
        &self,
        text: &str,
        k: usize,
    ) -> Result<Vec<(StoredChunk, f32)>, StoreError> {
        let query = term_vector(text);
        let query_norm = vector_norm(&query);
        if query_norm == 0.0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine(&query, query_norm, &entry.vector, entry.norm)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| (self.entries[i].chunk.clone(), score))
            .collect())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Dedup key: sha256 of the exact text.
fn content_key(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Lowercased alphanumeric term frequencies.
fn term_vector(text: &str) -> TermVector {
    let mut vector = TermVector::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        *vector.entry(word.to_lowercase()).or_insert(0.0) += 1.0;
    }
    vector
}

fn vector_norm(vector: &TermVector) -> f32 {
    vector.values().map(|v| v * v).sum::<f32>().sqrt()
}

fn cosine(a: &TermVector, a_norm: f32, b: &TermVector, b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a
        .iter()
        .filter_map(|(term, weight)| b.get(term).map(|other| weight * other))
        .sum();
    dot / (a_norm * b_norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(source: &str) -> serde_json::Value {
        serde_json::json!({ "source_file": source })
    }

    #[test]
    fn test_add_and_query() {
        let mut store = MemoryVectorStore::new();
        let added = store
            .add(
                vec![
                    "the cat sat on the mat".to_string(),
                    "stock markets fell sharply today".to_string(),
                ],
                vec![meta("a"), meta("b")],
            )
            .unwrap();
        assert_eq!(added, 2);

        let results = store.query_with_score("cat on a mat", 1).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].0.content.contains("cat"));
        assert!(results[0].1 > 0.0);
    }

    #[test]
    fn test_exact_text_dedup() {
        let mut store = MemoryVectorStore::new();
        store
            .add(vec!["same chunk".to_string()], vec![meta("a")])
            .unwrap();
        let added = store
            .add(vec!["same chunk".to_string()], vec![meta("b")])
            .unwrap();
        assert_eq!(added, 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_top_k_ordering() {
        let mut store = MemoryVectorStore::new();
        store
            .add(
                vec![
                    "rust borrow checker ownership".to_string(),
                    "rust ownership model explained in depth".to_string(),
                    "gardening tips for spring".to_string(),
                ],
                vec![meta("a"), meta("b"), meta("c")],
            )
            .unwrap();

        let results = store.query_with_score("rust ownership", 2).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].1 >= results[1].1);
        assert!(results.iter().all(|(c, _)| c.content.contains("rust")));
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let mut store = MemoryVectorStore::new();
        store
            .add(vec!["something".to_string()], vec![meta("a")])
            .unwrap();
        assert!(store.query_with_score("   ", 5).unwrap().is_empty());
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let mut store = MemoryVectorStore::open(dir.path()).unwrap();
            store
                .add(vec!["persisted chunk of text".to_string()], vec![meta("a")])
                .unwrap();
        }
        let store = MemoryVectorStore::open(dir.path()).unwrap();
        assert_eq!(store.len(), 1);
        let results = store.query_with_score("persisted chunk", 1).unwrap();
        assert_eq!(results[0].0.content, "persisted chunk of text");
    }
}
