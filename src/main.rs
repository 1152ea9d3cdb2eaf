//! Mindex - personal document ingestion and research system.
//!
//! A tool for extracting text from mixed document collections and
//! answering questions over them with retrieval-augmented generation.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if mindex::cli::is_verbose() {
        "mindex=info"
    } else {
        "mindex=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Run CLI
    mindex::cli::run().await
}
