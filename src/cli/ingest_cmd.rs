//! `mindex ingest` - chunk extraction artifacts and index them.

use crate::config::Settings;
use crate::extract::collect_files;
use crate::ingest::{chunk_document, load_processed_sources, write_chunks_jsonl, TextSplitter};
use crate::store::{MemoryVectorStore, VectorStore};

pub fn run(settings: &Settings, force: bool) -> anyhow::Result<()> {
    let splitter = TextSplitter::new(
        settings.chunking.chunk_size,
        settings.chunking.chunk_overlap,
    );
    let chunks_file = &settings.paths.chunks_file;
    let processed = if force {
        Default::default()
    } else {
        load_processed_sources(chunks_file)?
    };

    let artifacts = collect_files(&settings.paths.output_dir, Some(&["md"]))?;
    if artifacts.is_empty() {
        println!(
            "  {} No artifacts under {} (run `mindex extract` first)",
            console::style("!").yellow(),
            settings.paths.output_dir.display()
        );
        return Ok(());
    }

    let mut store = MemoryVectorStore::open(&settings.paths.store_dir)?;
    let mut new_chunks = 0usize;
    let mut skipped = 0usize;

    for artifact in artifacts {
        let name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if processed.contains(&name) {
            tracing::debug!("Skipping already chunked source: {}", name);
            skipped += 1;
            continue;
        }

        let text = std::fs::read_to_string(&artifact)?;
        let chunks = chunk_document(&splitter, &text, &name);
        if chunks.is_empty() {
            continue;
        }

        write_chunks_jsonl(chunks_file, &chunks)?;

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let metadatas: Vec<serde_json::Value> = chunks
            .iter()
            .map(|c| serde_json::json!({
                "source_file": c.metadata.source_file,
                "chunk_index": c.metadata.chunk_index,
            }))
            .collect();
        let added = store.add(texts, metadatas)?;

        println!(
            "  {} {}: {} chunks ({} new in store)",
            console::style("✓").green(),
            name,
            chunks.len(),
            added
        );
        new_chunks += added;
    }

    println!(
        "  {} Ingest complete: {} new chunks, {} sources skipped, {} total in store",
        console::style("✓").green(),
        new_chunks,
        skipped,
        store.len()
    );

    Ok(())
}
