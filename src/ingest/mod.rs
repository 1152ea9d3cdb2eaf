//! Chunking and chunk persistence between extraction and embedding.

mod splitter;

pub use splitter::{
    chunk_document, load_processed_sources, write_chunks_jsonl, Chunk, ChunkMetadata, TextSplitter,
};
