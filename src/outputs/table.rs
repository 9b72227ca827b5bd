//! Result table: deduplication, ordering and CSV output.
//!
//! # Ordering
//!
//! Rows are sorted by publish date, newest first. Articles with the same
//! timestamp keep the order in which the crawl found them.
//!
//! # Columns
//!
//! | Column | Source |
//! |--------|--------|
//! | `Article URL` | absolute article URL |
//! | `Article Title` | link text |
//! | `Website Address` | site root or listing page |
//! | `Date` | timestamp exactly as scraped |

use chrono::NaiveDateTime;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::error::ExportError;
use crate::models::ArticleRecord;

const HEADERS: [&str; 4] = ["Article URL", "Article Title", "Website Address", "Date"];

/// One output row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(rename = "Article URL")]
    pub url: String,
    #[serde(rename = "Article Title")]
    pub title: String,
    #[serde(rename = "Website Address")]
    pub website: String,
    #[serde(rename = "Date")]
    pub date: String,
}

impl From<&ArticleRecord> for TableRow {
    fn from(a: &ArticleRecord) -> Self {
        TableRow {
            url: a.url.clone(),
            title: a.title.clone(),
            website: a.source_site.clone(),
            date: a.raw_date.clone(),
        }
    }
}

/// Deduplicated, ordered view over a set of collected articles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    /// Unique articles, newest first.
    pub articles: Vec<ArticleRecord>,
    /// Records handed in, duplicates included.
    pub total: usize,
    pub duplicates_removed: usize,
    pub min_date: Option<NaiveDateTime>,
    pub max_date: Option<NaiveDateTime>,
}

impl Aggregate {
    pub fn unique(&self) -> usize {
        self.articles.len()
    }
}

/// Collapse `records` by URL (first occurrence wins) and sort them.
///
/// # Arguments
///
/// * `records` - collected articles in crawl order, duplicates allowed
///
/// # Returns
///
/// An [`Aggregate`] holding the unique articles newest first, with the
/// duplicate count and the publish-date range. Feeding its `articles` back
/// in yields the same rows and zero duplicates.
///
/// # Example
///
/// ```ignore
/// let agg = aggregate(&collected);
/// assert_eq!(agg.total, agg.unique() + agg.duplicates_removed);
/// ```
pub fn aggregate(records: &[ArticleRecord]) -> Aggregate {
    let mut articles: Vec<ArticleRecord> = records
        .iter()
        .unique_by(|a| a.url.clone())
        .cloned()
        .collect();
    // Stable, so equal timestamps stay in crawl order.
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    let (min_date, max_date) = articles
        .iter()
        .map(|a| a.published_at)
        .minmax()
        .into_option()
        .unzip();

    Aggregate {
        total: records.len(),
        duplicates_removed: records.len() - articles.len(),
        articles,
        min_date,
        max_date,
    }
}

/// Write `aggregate` to `path` as CSV, replacing any existing file.
#[instrument(level = "info", skip(aggregate), fields(rows = aggregate.unique()))]
pub fn write_table(path: &Path, aggregate: &Aggregate) -> Result<(), ExportError> {
    let csv_err = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(csv_err)?;
    writer.write_record(HEADERS).map_err(csv_err)?;
    for article in &aggregate.articles {
        writer.serialize(TableRow::from(article)).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Write the end-of-run table. Nothing is written when `records` is empty.
pub fn write_final(records: &[ArticleRecord], path: &Path) -> Result<Option<Aggregate>, ExportError> {
    if records.is_empty() {
        return Ok(None);
    }
    let aggregate = aggregate(records);
    write_table(path, &aggregate)?;
    info!(path = %path.display(), unique = aggregate.unique(), "Wrote result table");
    Ok(Some(aggregate))
}

/// Writes periodic checkpoint tables into one directory.
#[derive(Debug, Clone)]
pub struct TableExporter {
    dir: PathBuf,
}

impl TableExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        TableExporter { dir: dir.into() }
    }

    pub fn checkpoint_path(&self, page: u32) -> PathBuf {
        self.dir.join(format!("backup_page_{page}.csv"))
    }

    /// Write a deduplicated snapshot of `records`, returning its path and
    /// row count. `records` itself is left untouched.
    pub fn write_checkpoint(
        &self,
        page: u32,
        records: &[ArticleRecord],
    ) -> Result<(PathBuf, usize), ExportError> {
        let path = self.checkpoint_path(page);
        let aggregate = aggregate(records);
        write_table(&path, &aggregate)?;
        Ok((path, aggregate.unique()))
    }
}

/// Read a table written by [`write_table`].
#[cfg(test)]
pub(crate) fn read_table(path: &Path) -> Vec<TableRow> {
    csv::Reader::from_path(path)
        .unwrap()
        .deserialize()
        .collect::<Result<Vec<TableRow>, _>>()
        .unwrap()
}
