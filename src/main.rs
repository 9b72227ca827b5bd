//! # Listing Crawler
//!
//! Walks the numbered pages of a news listing (hotnewhiphop by default),
//! keeps every article published inside a date window and writes the result
//! as a deduplicated CSV table.
//!
//! ## Usage
//!
//! ```sh
//! listing_crawler --start-page 13818 --end-page 13918 --from 2024-01-01 --to 2025-12-31
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: one page at a time over HTTP or a headless browser,
//!    with retries for transient failures
//! 2. **Extraction**: title, link and timestamp for every article entry
//! 3. **Classification**: each timestamp is placed before, inside or after
//!    the window
//! 4. **Control**: streak heuristics decide when the listing is exhausted;
//!    checkpoints are written along the way
//! 5. **Output**: the collected articles are deduplicated, sorted newest
//!    first and written as CSV

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod classify;
mod cli;
mod config;
mod crawler;
mod error;
mod evaluate;
mod fetch;
mod models;
mod outputs;
mod scrapers;
mod utils;

use cli::Cli;
use config::CrawlConfig;
use crawler::{CrawlReport, Crawler, StopReason};
use evaluate::PageEvaluator;
use fetch::{Fetcher, RetryFetch};
use models::ArticleRecord;
use outputs::table;
use scrapers::ListingExtractor;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Configuration ----
    let config = CrawlConfig::load(args.config.as_deref())?.with_overrides(&args);
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }
    let window = config.window()?;

    // Fail now rather than at the first checkpoint
    let output_dir = config
        .output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let checkpoint_dir = config.checkpoint_dir();
    for dir in [output_dir, checkpoint_dir.as_path()] {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir.display(),
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    // ---- Collaborators ----
    let extractor = ListingExtractor::new(&config.selectors, config.site_root_url()?)?;
    let evaluator = PageEvaluator::new(extractor, window, config.source_site, &config.site_root);
    let fetcher = RetryFetch::new(
        Fetcher::from_config(&config).await?,
        config.fetch_retries,
        Duration::from_millis(config.retry_base_delay_ms),
    );

    info!("==== Starting crawl ====");
    info!(
        from = %window.start(),
        to = %window.end(),
        start_page = config.start_page,
        end_page = config.end_page,
        listing = %config.listing_url,
        fetcher = ?config.fetcher,
        "Crawl parameters"
    );

    let crawler = Crawler::new(fetcher, evaluator, &config);
    let outcome = crawler.run().await;
    crawler.into_fetcher().into_inner().shutdown().await;

    let report = match outcome {
        Ok(report) => report,
        Err(aborted) => {
            error!(
                page = aborted.page,
                collected = aborted.collected.len(),
                error = %aborted,
                "Checkpoint failed; dumping collected articles to stdout"
            );
            dump_records(&aborted.collected)?;
            return Err(aborted.into());
        }
    };

    info!(
        reason = %report.stop_reason,
        pages_visited = report.pages_visited,
        pages_failed = report.pages_failed,
        first_page = report.first_page,
        last_page = report.last_page,
        collected = report.collected.len(),
        "Crawl finished"
    );

    // ---- Output ----
    match table::write_final(&report.collected, &config.output) {
        Ok(Some(aggregate)) => {
            info!("==== Done ====");
            info!(
                total = aggregate.total,
                unique = aggregate.unique(),
                duplicates_removed = aggregate.duplicates_removed,
                earliest = ?aggregate.min_date,
                latest = ?aggregate.max_date,
                output = %config.output.display(),
                "Saved articles"
            );
        }
        Ok(None) => diagnose_empty(&report, &config),
        Err(e) => {
            error!(error = %e, "Failed to write result table; dumping collected articles to stdout");
            dump_records(&report.collected)?;
            return Err(e.into());
        }
    }

    let elapsed = start_time.elapsed();
    info!(elapsed_secs = elapsed.as_secs_f64(), "Total execution time");
    Ok(())
}

/// Print records as pretty JSON so a failed export loses nothing.
fn dump_records(records: &[ArticleRecord]) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(records)?);
    Ok(())
}

fn diagnose_empty(report: &CrawlReport, config: &CrawlConfig) {
    warn!(
        pages_visited = report.pages_visited,
        pages_failed = report.pages_failed,
        stop = %report.stop_reason,
        "No articles found in the date window"
    );
    warn!(
        from = %config.from,
        to = %config.to,
        "Possible cause: no articles were published in this window"
    );
    warn!(
        title = %config.selectors.title,
        timestamp = %config.selectors.timestamp,
        "Possible cause: the site structure changed and the selectors no longer match"
    );
    if report.pages_failed > 0 {
        warn!(
            failed = report.pages_failed,
            "Possible cause: network problems; some pages could not be loaded"
        );
    }
    if report.stop_reason == StopReason::EndOfSite && report.pages_visited == config.stop.empty_streak {
        warn!(
            start_page = config.start_page,
            "Possible cause: the page range is wrong; every page from the start was empty"
        );
    } else {
        warn!(
            start_page = config.start_page,
            end_page = config.end_page,
            "Possible cause: the page range does not cover the window"
        );
    }
}
