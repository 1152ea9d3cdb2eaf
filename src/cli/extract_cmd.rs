//! `mindex extract` - text extraction over one file or a directory.

use std::path::Path;

use crate::config::Settings;
use crate::extract::Extractor;

pub async fn run(settings: &Settings, path: Option<&Path>) -> anyhow::Result<()> {
    let extractor = Extractor::new(&settings.paths.output_dir, &settings.ocr)?;
    let target = path.unwrap_or(&settings.paths.input_dir);

    if target.is_file() {
        println!(
            "  {} Extracting: {}",
            console::style("→").cyan(),
            target.display()
        );
        let text = extractor.extract(target).await?;
        println!(
            "  {} {} characters -> {}",
            console::style("✓").green(),
            text.chars().count(),
            extractor
                .cache()
                .artifact_path(&stem_of(target))
                .display()
        );
        return Ok(());
    }

    if !target.is_dir() {
        anyhow::bail!("no such file or directory: {}", target.display());
    }

    println!(
        "  {} Extracting documents under {}",
        console::style("→").cyan(),
        target.display()
    );
    let summary = extractor.extract_all(target).await?;
    println!(
        "  {} extracted {}, cached {}, unsupported {}, failed {}",
        console::style("✓").green(),
        summary.extracted,
        summary.cached,
        summary.unsupported,
        summary.failed
    );

    Ok(())
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
