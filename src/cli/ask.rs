//! `mindex ask` - retrieval-augmented question answering.

use crate::config::Settings;
use crate::llm::OllamaClient;
use crate::rag::RagPipeline;
use crate::store::{MemoryVectorStore, VectorStore};

pub async fn run(
    settings: &Settings,
    question: &str,
    top_k: usize,
    max_tokens: u32,
) -> anyhow::Result<()> {
    if question.trim().is_empty() {
        anyhow::bail!("no question given");
    }

    let store = MemoryVectorStore::open(&settings.paths.store_dir)?;
    if store.is_empty() {
        println!(
            "  {} The store is empty (run `mindex extract` and `mindex ingest` first)",
            console::style("!").yellow()
        );
        return Ok(());
    }

    let model = OllamaClient::new(settings.llm.clone())?;
    let pipeline = RagPipeline::new(store, model);

    println!("  {} {}", console::style("?").cyan(), question);
    let answer = pipeline.answer(question, top_k, max_tokens).await;
    println!("\n{}", answer);

    Ok(())
}
