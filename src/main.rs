//! CLI entry point for the harvester tool.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use harvester_core::{
    BoundedDownloader, Crawler, DedupIndex, HarvestConfig, HttpClient, RunCounters, SearchClient,
};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout is reserved for --json
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let working_dir = std::env::current_dir().context("cannot determine working directory")?;
    let config = args.to_config(&working_dir);
    config.validate()?;

    let summary = run(&config).await?;

    info!("Downloaded: {} in {:?}", summary.saved, elapsed_display(summary.elapsed_ms));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}

async fn run(config: &HarvestConfig) -> Result<harvester_core::CrawlSummary> {
    prepare_output_dir(&config.images_dir).await?;

    tokio::fs::create_dir_all(&config.cache_dir)
        .await
        .with_context(|| format!("cannot create cache directory {}", config.cache_dir.display()))?;

    let started = Instant::now();
    let index = DedupIndex::build(&config.cache_dir).await?;
    info!(
        entries = index.len(),
        elapsed_ms = started.elapsed().as_millis(),
        cache_dir = %config.cache_dir.display(),
        "dedup index built"
    );

    let source = SearchClient::new(&config.base_url, &config.query)?;
    info!(url = %source.search_url(), start_page = config.start_page, "searching");

    let counters = Arc::new(RunCounters::new(config.target_count));
    let downloader = BoundedDownloader::new(
        config.concurrency,
        config.item_timeout,
        Arc::new(HttpClient::new()),
        counters,
    )?;

    let crawler = Crawler::new(&source, &index, &downloader, config.crawl_options());
    Ok(crawler.run().await?)
}

/// Creates the output directory if needed and refuses to reuse a non-empty one.
async fn prepare_output_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("cannot create output directory {}", dir.display()))?;

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("cannot read output directory {}", dir.display()))?;
    if entries.next_entry().await?.is_some() {
        bail!(
            "Output directory is not empty: {}\n  \
             Move its contents into the cache directory or choose another --images-dir",
            dir.display()
        );
    }
    Ok(())
}

fn elapsed_display(elapsed_ms: u128) -> std::time::Duration {
    std::time::Duration::from_millis(u64::try_from(elapsed_ms).unwrap_or(u64::MAX))
}
