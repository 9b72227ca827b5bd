//! Data models shared by the extractor, the evaluator and the exporter.
//!
//! - [`Candidate`]: raw triple pulled off a listing page, before any filtering
//! - [`ArticleRecord`]: a candidate that survived date filtering
//! - [`PageResult`]: everything the crawl controller needs to know about one page

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw article entry as found on a listing page.
///
/// Nothing here is validated yet: the href may be relative or missing and
/// the timestamp may not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Link text of the title element, whitespace-trimmed.
    pub title: String,
    /// Absolute article URL, or `None` if the element had no usable href.
    pub href: Option<String>,
    /// Timestamp attribute value exactly as it appears in the markup.
    pub raw_timestamp: Option<String>,
}

/// An article kept by the crawl.
///
/// Only built by the page evaluator, and only for timestamps inside the
/// configured window, so `published_at` always lies within it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Absolute URL; the deduplication key.
    pub url: String,
    pub title: String,
    /// Site root or listing page URL, depending on [`SourceSite`].
    pub source_site: String,
    pub published_at: NaiveDateTime,
    /// The timestamp as scraped. Exported verbatim.
    pub raw_date: String,
}

/// What to record as an article's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSite {
    /// The fixed site root, e.g. `https://www.hotnewhiphop.com`.
    #[default]
    SiteRoot,
    /// The listing page URL the article was found on.
    ListingPage,
}

/// Why a page produced no candidates even though the site may have had some.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFailure {
    Fetch(String),
    Extraction(String),
}

impl fmt::Display for PageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageFailure::Fetch(e) => write!(f, "fetch failed: {e}"),
            PageFailure::Extraction(e) => write!(f, "extraction failed: {e}"),
        }
    }
}

/// Outcome of evaluating one listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageResult {
    /// In-window articles from this page, in page order.
    pub articles: Vec<ArticleRecord>,
    /// The page had no candidate elements at all.
    pub is_empty: bool,
    /// At least one candidate is dated before the window starts.
    pub has_older_than_range: bool,
    /// Number of candidates the extractor produced.
    pub candidates: usize,
    pub failure: Option<PageFailure>,
}

impl PageResult {
    /// A page that yielded nothing, optionally because something went wrong.
    pub fn empty(failure: Option<PageFailure>) -> Self {
        PageResult {
            is_empty: true,
            failure,
            ..Default::default()
        }
    }
}
