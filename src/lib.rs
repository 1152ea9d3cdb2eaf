//! Mindex - personal document ingestion and research system.
//!
//! Ingests heterogeneous documents (PDFs, images, plain text, office
//! formats), extracts machine-readable text (native text layer or OCR),
//! chunks and embeds it, and answers questions over the corpus via
//! retrieval-augmented generation.

pub mod cli;
pub mod config;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod rag;
pub mod store;
pub mod utils;
