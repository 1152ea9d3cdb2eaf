//! `mindex status` - external tool and service checks.

use crate::config::Settings;
use crate::extract::gpu_available;
use crate::llm::OllamaClient;

/// External binaries the extraction pipeline shells out to.
const REQUIRED_TOOLS: &[(&str, &str)] = &[
    ("pdftotext", "poppler-utils"),
    ("pdfinfo", "poppler-utils"),
    ("pdftoppm", "poppler-utils"),
    ("tesseract", "tesseract-ocr"),
];

pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    println!("External tools:");
    for (tool, package) in REQUIRED_TOOLS {
        if which::which(tool).is_ok() {
            println!("  {} {}", console::style("✓").green(), tool);
        } else {
            println!(
                "  {} {} missing (install {})",
                console::style("✗").red(),
                tool,
                package
            );
        }
    }

    println!("\nDevices:");
    if gpu_available() {
        println!("  {} GPU available (pool capped at {})", console::style("✓").green(), settings.ocr.gpu_workers);
    } else {
        println!(
            "  {} no GPU, CPU pool capped at {}",
            console::style("-").dim(),
            settings.ocr.max_workers
        );
    }

    println!("\nLLM endpoint ({}):", settings.llm.endpoint);
    let client = OllamaClient::new(settings.llm.clone())?;
    if client.is_available().await {
        println!(
            "  {} reachable, model {}",
            console::style("✓").green(),
            settings.llm.model
        );
    } else if !settings.llm.enabled {
        println!("  {} disabled by configuration", console::style("-").dim());
    } else {
        println!("  {} unreachable", console::style("✗").red());
    }

    Ok(())
}
