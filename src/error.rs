//! Error types for each stage of a crawl.
//!
//! Only [`ConfigError`] and [`ExportError`] are ever fatal. The evaluator
//! turns a fetch failure into an empty page and an extraction failure into a
//! page that keeps nothing.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::ArticleRecord;

/// A listing page could not be retrieved.
///
/// The split between the two variants drives
/// [`RetryFetch`](crate::fetch::RetryFetch): only `Retryable` failures are
/// attempted again.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Timeouts, connection resets, 5xx and 429 answers.
    #[error("transient failure fetching {url}: {reason}")]
    Retryable { url: String, reason: String },
    /// Anything a second attempt would not fix (4xx, bad URL, ...).
    #[error("failed to fetch {url}: {reason}")]
    Permanent { url: String, reason: String },
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Retryable { .. })
    }

    /// Classify a reqwest failure.
    pub fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        let retryable = e.is_timeout()
            || e.is_connect()
            || e.status().is_some_and(|s| {
                s.is_server_error() || s == reqwest::StatusCode::TOO_MANY_REQUESTS
            });
        let url = url.to_string();
        let reason = e.to_string();
        if retryable {
            FetchError::Retryable { url, reason }
        } else {
            FetchError::Permanent { url, reason }
        }
    }
}

/// Title and timestamp sequences on a page disagree in length.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("found {titles} titles but {timestamps} timestamps; refusing to pair them by position")]
    Mismatch { titles: usize, timestamps: usize },
}

/// Writing a result table failed.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write table {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to flush table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Problems found while loading or validating the run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid date bound {0:?}: expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS")]
    Bound(String),
    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },
    #[error("invalid site root {0:?}")]
    SiteRoot(String),
    #[error("{0}")]
    Invalid(String),
}

/// A checkpoint could not be written, so the run stopped early.
///
/// Carries every record gathered up to that point so the caller can still
/// report or dump them.
#[derive(Debug, Error)]
#[error("crawl aborted at page {page}: {source}")]
pub struct CrawlAborted {
    pub page: u32,
    #[source]
    pub source: ExportError,
    pub collected: Vec<ArticleRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_flag() {
        let transient = FetchError::Retryable {
            url: "https://example.com/1".into(),
            reason: "timed out".into(),
        };
        let fatal = FetchError::Permanent {
            url: "https://example.com/1".into(),
            reason: "404 Not Found".into(),
        };
        assert!(transient.is_retryable());
        assert!(!fatal.is_retryable());
    }

    #[test]
    fn test_mismatch_message_names_both_counts() {
        let e = ExtractionError::Mismatch {
            titles: 20,
            timestamps: 19,
        };
        let msg = e.to_string();
        assert!(msg.contains("20 titles"));
        assert!(msg.contains("19 timestamps"));
    }
}
