//! Ingest command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use graphwright_core::GraphwrightConfig;
use graphwright_core::docs::format_docs;

use crate::config;

/// Execute the ingest command.
///
/// Crawls the configured documentation site and rewrites the cache file.
/// With `dry_run` the documents are printed and nothing is written.
pub async fn execute(config: &GraphwrightConfig, dry_run: bool) -> Result<()> {
    let ingestor = config::docs_ingestor(config)?;
    eprintln!("{} {}", "Crawling".cyan(), ingestor.root());

    if dry_run {
        let docs = ingestor.crawl().await.context("Failed to crawl documentation")?;
        println!("{}", format_docs(&docs));
        eprintln!("{} {} documents", "✓ Crawled".green(), docs.len());
        return Ok(());
    }

    let path = config.docs_path();
    let docs = ingestor.ingest(&path).await.context("Failed to ingest documentation")?;
    println!("{} {} documents to {}", "✓ Saved".green(), docs.len(), path.display());
    Ok(())
}
