//! Command-line interface definitions.
//!
//! Every flag is optional and overrides the matching key of the YAML config
//! file (see [`crate::config::CrawlConfig`]).

use clap::Parser;
use std::path::PathBuf;

use crate::config::FetcherKind;

/// Crawl a paginated news listing and export the articles published inside
/// a date window.
///
/// # Examples
///
/// ```sh
/// # Stock run with the built-in defaults
/// listing_crawler
///
/// # Narrow the page range and the window
/// listing_crawler --start-page 13818 --end-page 13830 --from 2025-01-01 --to 2025-06-30
///
/// # Use a config file and the headless browser
/// listing_crawler -c crawl.yaml --fetcher browser
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, env = "LISTING_CRAWLER_CONFIG")]
    pub config: Option<PathBuf>,

    /// First listing page index to visit
    #[arg(long)]
    pub start_page: Option<u32>,

    /// Last listing page index to visit (inclusive)
    #[arg(long)]
    pub end_page: Option<u32>,

    /// Window start, `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`
    #[arg(long)]
    pub from: Option<String>,

    /// Window end (inclusive), `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`
    #[arg(long)]
    pub to: Option<String>,

    /// CSV file to write the final table to
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write a checkpoint table every N pages
    #[arg(long)]
    pub checkpoint_every: Option<u32>,

    /// Directory for checkpoint tables
    #[arg(long)]
    pub checkpoint_dir: Option<PathBuf>,

    /// How listing pages are fetched
    #[arg(long, value_enum)]
    pub fetcher: Option<FetcherKind>,

    /// User-Agent header sent with every request
    #[arg(long, env = "LISTING_CRAWLER_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Extra attempts for transient fetch failures (0 disables retries)
    #[arg(long)]
    pub fetch_retries: Option<usize>,
}
