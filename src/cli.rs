//! CLI argument definitions using clap derive macros.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use harvester_core::HarvestConfig;

/// Save new images from a remote image search.
///
/// Harvester walks the result pages for a query, skips every image already
/// present in the cache directory and downloads the rest until the requested
/// count has been saved.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Number of new images to save
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub count: u64,

    /// Search query
    #[arg(short = 'q', long, value_parser = parse_query)]
    pub query: String,

    /// Delay between page requests in milliseconds (max 600000)
    #[arg(short = 'd', long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(0..=600_000))]
    pub delay: u64,

    /// First result page to request
    #[arg(short = 'p', long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Output directory, must be empty [default: ./images/result]
    #[arg(long)]
    pub images_dir: Option<PathBuf>,

    /// Directory of previously saved images to skip [default: ./images/cache]
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Maximum concurrent downloads (1-100)
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub downloads: u8,

    /// Per-image download timeout in seconds (1-3600)
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: u64,

    /// Stop after this many pages even if the count was not reached
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_pages: Option<u32>,

    /// Search endpoint the query is appended to
    #[arg(long, default_value = harvester_core::search::DEFAULT_SEARCH_BASE_URL)]
    pub base_url: String,

    /// Print the final summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long)]
    pub quiet: bool,
}

impl Args {
    /// Converts parsed options into a library configuration, resolving
    /// directory defaults against `working_dir`.
    pub fn to_config(&self, working_dir: &Path) -> HarvestConfig {
        let target_count = usize::try_from(self.count).unwrap_or(usize::MAX);
        let mut config = HarvestConfig::new(target_count, self.query.clone(), working_dir);
        config.page_delay = Duration::from_millis(self.delay);
        config.start_page = self.page;
        if let Some(dir) = &self.images_dir {
            config.images_dir = working_dir.join(dir);
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = working_dir.join(dir);
        }
        config.concurrency = usize::from(self.downloads);
        config.item_timeout = Duration::from_secs(self.timeout);
        config.max_pages = self.max_pages;
        config.base_url.clone_from(&self.base_url);
        config
    }
}

fn parse_query(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        return Err("query must not be empty".to_string());
    }
    Ok(value.to_string())
}
