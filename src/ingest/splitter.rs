//! Recursive character text splitting.
//!
//! Splits extracted text into overlapping chunks, preferring natural cut
//! points (headings, paragraphs, sentences) and only falling back to a
//! hard character window when no separator helps. Chunks accumulate in a
//! JSONL file keyed by source so re-ingesting a corpus skips sources
//! that already produced chunks.

use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Cut points tried in order, from strongest to weakest.
const SEPARATORS: &[&str] = &["\n### ", "\n## ", "\n# ", "\n\n", ". ", " "];

/// Where a chunk came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_file: String,
    pub chunk_index: usize,
}

/// One chunk of text with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Recursive character splitter with overlap.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size / 2),
        }
    }

    /// Split text into chunks of at most `chunk_size` characters (plus
    /// up to `overlap` carried from the previous chunk).
    pub fn split(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        self.split_recursive(text, 0, &mut pieces);
        self.merge_with_overlap(pieces)
    }

    /// Break text into pieces no larger than `chunk_size`, trying each
    /// separator in turn and recursing into oversized fragments.
    fn split_recursive<'a>(&self, text: &'a str, sep_index: usize, out: &mut Vec<&'a str>) {
        if text.chars().count() <= self.chunk_size {
            if !text.trim().is_empty() {
                out.push(text);
            }
            return;
        }

        if sep_index >= SEPARATORS.len() {
            // No separator left: hard window at char boundaries
            let mut rest = text;
            while rest.chars().count() > self.chunk_size {
                let cut = char_boundary(rest, self.chunk_size);
                out.push(&rest[..cut]);
                rest = &rest[cut..];
            }
            if !rest.trim().is_empty() {
                out.push(rest);
            }
            return;
        }

        let separator = SEPARATORS[sep_index];
        let parts: Vec<&str> = text.split_inclusive(separator).collect();
        if parts.len() <= 1 {
            self.split_recursive(text, sep_index + 1, out);
            return;
        }

        for part in parts {
            if part.chars().count() > self.chunk_size {
                self.split_recursive(part, sep_index + 1, out);
            } else if !part.trim().is_empty() {
                out.push(part);
            }
        }
    }

    /// Greedily pack pieces into chunks, seeding each continuation chunk
    /// with the tail of the previous one for context.
    fn merge_with_overlap(&self, pieces: Vec<&str>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_chars = 0usize;

        for piece in pieces {
            let piece_chars = piece.chars().count();
            if current_chars > 0 && current_chars + piece_chars > self.chunk_size {
                let tail = overlap_tail(&current, self.overlap);
                chunks.push(std::mem::take(&mut current));
                current = tail;
                current_chars = current.chars().count();
            }
            current.push_str(piece);
            current_chars += piece_chars;
        }

        if !current.trim().is_empty() {
            chunks.push(current);
        }

        chunks
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(800, 100)
    }
}

/// Last `overlap` characters of a chunk, at a char boundary.
fn overlap_tail(text: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }
    let total = text.chars().count();
    if total <= overlap {
        return text.to_string();
    }
    text.chars().skip(total - overlap).collect()
}

/// Byte index of the `chars`-th character boundary.
fn char_boundary(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Chunk one extracted document.
pub fn chunk_document(splitter: &TextSplitter, text: &str, source_file: &str) -> Vec<Chunk> {
    splitter
        .split(text)
        .into_iter()
        .enumerate()
        .map(|(i, content)| Chunk {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            metadata: ChunkMetadata {
                source_file: source_file.to_string(),
                chunk_index: i,
            },
        })
        .collect()
}

/// Sources that already have chunks in the JSONL file.
///
/// Malformed lines are skipped rather than failing the whole load.
pub fn load_processed_sources(path: &Path) -> std::io::Result<HashSet<String>> {
    let mut sources = HashSet::new();
    if !path.exists() {
        return Ok(sources);
    }

    let file = std::fs::File::open(path)?;
    for line in std::io::BufReader::new(file).lines() {
        let line = line?;
        if let Ok(chunk) = serde_json::from_str::<Chunk>(&line) {
            sources.insert(chunk.metadata.source_file);
        }
    }
    Ok(sources)
}

/// Append chunks to the JSONL file, preserving existing entries.
pub fn write_chunks_jsonl(path: &Path, chunks: &[Chunk]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    for chunk in chunks {
        let line = serde_json::to_string(chunk)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(file, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let splitter = TextSplitter::default();
        let chunks = splitter.split("just a short note");
        assert_eq!(chunks, vec!["just a short note"]);
    }

    #[test]
    fn test_chunks_respect_size_bound() {
        let splitter = TextSplitter::new(100, 20);
        let text = "word ".repeat(200);
        let chunks = splitter.split(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                chunk.chars().count() <= 120,
                "chunk exceeds size+overlap: {} chars",
                chunk.chars().count()
            );
        }
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let splitter = TextSplitter::new(60, 0);
        let text = "First paragraph with some words here.\n\nSecond paragraph with more words here.";
        let chunks = splitter.split(text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("First paragraph"));
        assert!(chunks[1].starts_with("Second paragraph"));
    }

    #[test]
    fn test_overlap_carries_context() {
        let splitter = TextSplitter::new(50, 15);
        let text = "Sentence number one is here. Sentence number two is here. Sentence number three is here.";
        let chunks = splitter.split(text);
        assert!(chunks.len() >= 2);
        // The second chunk starts with the tail of the first
        let tail: String = chunks[0].chars().rev().take(5).collect::<Vec<_>>().into_iter().rev().collect();
        assert!(chunks[1].contains(tail.trim()));
    }

    #[test]
    fn test_unsplittable_run_hard_windows() {
        let splitter = TextSplitter::new(50, 0);
        let text = "x".repeat(180);
        let chunks = splitter.split(&text);
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.chars().count() <= 50));
    }

    #[test]
    fn test_chunk_document_metadata() {
        let splitter = TextSplitter::new(50, 0);
        let text = "Alpha paragraph here.\n\nBeta paragraph here.\n\nGamma paragraph here.";
        let chunks = chunk_document(&splitter, text, "report_ocr.md");
        assert!(!chunks.is_empty());
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.source_file, "report_ocr.md");
            assert_eq!(chunk.metadata.chunk_index, i);
            assert!(!chunk.id.is_empty());
        }
    }

    #[test]
    fn test_jsonl_round_trip_and_skip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("chunks.jsonl");
        let splitter = TextSplitter::default();

        let first = chunk_document(&splitter, "some document text", "a_ocr.md");
        write_chunks_jsonl(&path, &first).unwrap();
        let second = chunk_document(&splitter, "other document text", "b_ocr.md");
        write_chunks_jsonl(&path, &second).unwrap();

        let processed = load_processed_sources(&path).unwrap();
        assert!(processed.contains("a_ocr.md"));
        assert!(processed.contains("b_ocr.md"));
        assert_eq!(processed.len(), 2);
    }
}
