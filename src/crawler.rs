//! Bounded crawl over a paginated listing.
//!
//! The page-index space has no natural end, so the crawl stops on whichever
//! of these happens first:
//!
//! | Reason | Trigger (defaults) |
//! |--------|--------------------|
//! | [`StopReason::PastDateWindow`] | 5 pages in a row each holding an article older than the window |
//! | [`StopReason::EndOfSite`] | 10 pages without a single candidate |
//! | [`StopReason::RangeExhausted`] | the configured end page was processed |
//!
//! Pages are fetched strictly one after another, each at most once, with a
//! random pause between them.

use rand::{Rng, rng};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::{CrawlConfig, StopRules};
use crate::error::CrawlAborted;
use crate::evaluate::PageEvaluator;
use crate::fetch::{ListingUrl, PageFetcher};
use crate::models::{ArticleRecord, PageResult};
use crate::outputs::table::TableExporter;

/// Why a crawl ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    PastDateWindow,
    EndOfSite,
    RangeExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::PastDateWindow => write!(f, "listing has moved past the date window"),
            StopReason::EndOfSite => write!(f, "listing has run out of articles"),
            StopReason::RangeExhausted => write!(f, "end page reached"),
        }
    }
}

/// Running counters for one crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlState {
    pub current_page: u32,
    /// Pages in a row without any candidate. Reset by a page that keeps an article.
    pub consecutive_empty_pages: u32,
    /// Pages in a row holding at least one article older than the window.
    pub consecutive_old_streak: u32,
    pub collected: Vec<ArticleRecord>,
    pub pages_visited: u32,
    pub pages_failed: u32,
}

impl CrawlState {
    pub fn new(start_page: u32) -> Self {
        CrawlState {
            current_page: start_page,
            ..Default::default()
        }
    }

    /// Fold one page into the counters. Returns how many articles it kept.
    pub fn absorb(&mut self, page: PageResult) -> usize {
        self.pages_visited += 1;
        if page.failure.is_some() {
            self.pages_failed += 1;
        }

        let kept = page.articles.len();
        if kept > 0 {
            self.collected.extend(page.articles);
            self.consecutive_empty_pages = 0;
        } else if page.is_empty {
            self.consecutive_empty_pages += 1;
        }

        if page.has_older_than_range {
            self.consecutive_old_streak += 1;
        } else {
            self.consecutive_old_streak = 0;
        }
        kept
    }

    /// Checked after every page, in precedence order.
    pub fn stop_reason(&self, rules: &StopRules, end_page: u32) -> Option<StopReason> {
        if self.consecutive_old_streak >= rules.old_streak {
            Some(StopReason::PastDateWindow)
        } else if self.consecutive_empty_pages >= rules.empty_streak {
            Some(StopReason::EndOfSite)
        } else if self.current_page >= end_page {
            Some(StopReason::RangeExhausted)
        } else {
            None
        }
    }
}

/// What a finished crawl hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub stop_reason: StopReason,
    /// Every kept article in crawl order, duplicates included.
    pub collected: Vec<ArticleRecord>,
    pub pages_visited: u32,
    pub pages_failed: u32,
    pub first_page: u32,
    pub last_page: u32,
}

/// Drives a [`PageFetcher`] across the listing.
pub struct Crawler<F> {
    fetcher: F,
    evaluator: PageEvaluator,
    listing: ListingUrl,
    start_page: u32,
    end_page: u32,
    stop: StopRules,
    checkpoint_every: u32,
    exporter: TableExporter,
    delay: (Duration, Duration),
}

impl<F> fmt::Debug for Crawler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crawler")
            .field("listing", &self.listing)
            .field("start_page", &self.start_page)
            .field("end_page", &self.end_page)
            .field("stop", &self.stop)
            .field("checkpoint_every", &self.checkpoint_every)
            .finish()
    }
}

impl<F> Crawler<F>
where
    F: PageFetcher,
{
    /// `config` is expected to have passed [`CrawlConfig::validate`].
    pub fn new(fetcher: F, evaluator: PageEvaluator, config: &CrawlConfig) -> Self {
        Crawler {
            fetcher,
            evaluator,
            listing: config.listing(),
            start_page: config.start_page,
            end_page: config.end_page,
            stop: config.stop,
            checkpoint_every: config.checkpoint_every.max(1),
            exporter: TableExporter::new(config.checkpoint_dir()),
            delay: config.politeness_delay(),
        }
    }

    pub fn into_fetcher(self) -> F {
        self.fetcher
    }

    /// Crawl until a stop condition holds.
    ///
    /// Each page is fetched once, evaluated and folded into a fresh
    /// [`CrawlState`]. The stop rules run before any checkpoint or pause, so
    /// the terminating page gets neither.
    ///
    /// # Returns
    ///
    /// A [`CrawlReport`] with the stop reason, page counters and every kept
    /// article in crawl order.
    ///
    /// # Errors
    ///
    /// Only a failed checkpoint write ends the run early. The returned
    /// [`CrawlAborted`] carries everything collected so far.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let crawler = Crawler::new(fetcher, evaluator, &config);
    /// let report = crawler.run().await?;
    /// info!(reason = %report.stop_reason, kept = report.collected.len(), "done");
    /// ```
    #[instrument(level = "info", skip(self), fields(start = self.start_page, end = self.end_page))]
    pub async fn run(&self) -> Result<CrawlReport, CrawlAborted> {
        let mut state = CrawlState::new(self.start_page);

        let stop_reason = loop {
            let page = state.current_page;
            let url = self.listing.for_page(page);
            debug!(page, url = %url, "Scraping page");

            let fetched = self.fetcher.fetch(page).await;
            let result = self.evaluator.evaluate(&url, fetched);
            let found = result.candidates;
            let is_empty = result.is_empty;
            let has_old = result.has_older_than_range;
            let kept = state.absorb(result);

            info!(page, found, kept, total = state.collected.len(), "Page done");
            if is_empty {
                info!(page, streak = state.consecutive_empty_pages, "No articles on page");
            }
            if has_old {
                info!(
                    page,
                    streak = state.consecutive_old_streak,
                    "Page holds articles older than the window"
                );
            }

            if let Some(reason) = state.stop_reason(&self.stop, self.end_page) {
                self.log_stop(reason, &state);
                break reason;
            }

            if page % self.checkpoint_every == 0 && !state.collected.is_empty() {
                match self.exporter.write_checkpoint(page, &state.collected) {
                    Ok((path, unique)) => {
                        info!(page, path = %path.display(), unique, "Checkpoint saved");
                    }
                    Err(source) => {
                        return Err(CrawlAborted {
                            page,
                            source,
                            collected: state.collected,
                        });
                    }
                }
            }

            self.pause().await;
            state.current_page += 1;
        };

        Ok(CrawlReport {
            stop_reason,
            first_page: self.start_page,
            last_page: state.current_page,
            pages_visited: state.pages_visited,
            pages_failed: state.pages_failed,
            collected: state.collected,
        })
    }

    fn log_stop(&self, reason: StopReason, state: &CrawlState) {
        match reason {
            StopReason::PastDateWindow => warn!(
                page = state.current_page,
                streak = state.consecutive_old_streak,
                "==== Stopping: {reason} ===="
            ),
            StopReason::EndOfSite => warn!(
                page = state.current_page,
                streak = state.consecutive_empty_pages,
                "==== Stopping: {reason} ===="
            ),
            StopReason::RangeExhausted => {
                info!(page = state.current_page, "==== Stopping: {reason} ====")
            }
        }
    }

    async fn pause(&self) {
        let (min, max) = self.delay;
        if max.is_zero() {
            return;
        }
        let min_ms = u64::try_from(min.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        let ms = rng().random_range(min_ms..=max_ms);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
