//! Run configuration.
//!
//! Settings are read from an optional YAML file and then overridden by CLI
//! flags. Every field has a default, so an empty file (or no file at all)
//! reproduces the stock hotnewhiphop crawl.
//!
//! ```yaml
//! start_page: 13818
//! end_page: 13918
//! from: 2024-01-01
//! to: 2025-12-31
//! output: out/hotnewhiphop_articles.csv
//! fetcher: http
//! selectors:
//!   title: a.font-extrabold
//!   timestamp: time.client-timestamp
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::classify::{DateWindow, parse_bound};
use crate::cli::Cli;
use crate::error::ConfigError;
use crate::fetch::ListingUrl;
use crate::models::SourceSite;

/// Which collaborator retrieves listing pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FetcherKind {
    /// Plain HTTP GET.
    #[default]
    Http,
    /// Headless Chromium (requires the `browser` feature).
    Browser,
}

/// CSS selectors used to find articles on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// One node per article. When set, title and timestamp are looked up
    /// inside each item instead of being paired by position.
    pub item: Option<String>,
    pub title: String,
    pub timestamp: String,
    /// Attribute of the timestamp element carrying `YYYY-MM-DD HH:MM:SS`.
    pub timestamp_attr: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Selectors {
            item: None,
            title: "a.font-extrabold".to_string(),
            timestamp: "time.client-timestamp".to_string(),
            timestamp_attr: "data-date".to_string(),
        }
    }
}

/// Streak lengths that end a crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StopRules {
    /// Consecutive pages holding an article older than the window.
    pub old_streak: u32,
    /// Consecutive pages without a single candidate.
    pub empty_streak: u32,
}

impl Default for StopRules {
    fn default() -> Self {
        StopRules {
            old_streak: 5,
            empty_streak: 10,
        }
    }
}

/// Everything a run needs, fixed before the first page is fetched.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub site_root: String,
    /// Listing URL template; `{page}` is replaced by the page index.
    pub listing_url: String,
    pub start_page: u32,
    pub end_page: u32,
    pub from: String,
    pub to: String,
    pub output: PathBuf,
    pub checkpoint_every: u32,
    /// Defaults to the directory of `output`.
    pub checkpoint_dir: Option<PathBuf>,
    pub fetcher: FetcherKind,
    pub source_site: SourceSite,
    pub user_agent: String,
    pub headers: BTreeMap<String, String>,
    pub request_timeout_secs: u64,
    /// Page navigation timeout for the browser fetcher.
    pub navigation_timeout_secs: u64,
    /// Pause after navigation so client-side rendering can finish.
    pub browser_settle_ms: u64,
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    pub fetch_retries: usize,
    pub retry_base_delay_ms: u64,
    pub selectors: Selectors,
    pub stop: StopRules,
}

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

impl Default for CrawlConfig {
    fn default() -> Self {
        let headers = [
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
            ("Accept-Language", "en-US,en;q=0.5"),
            ("Connection", "keep-alive"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        CrawlConfig {
            site_root: "https://www.hotnewhiphop.com".to_string(),
            listing_url: "https://www.hotnewhiphop.com/articles/news/{page}".to_string(),
            start_page: 13818,
            end_page: 13918,
            from: "2024-01-01".to_string(),
            to: "2025-12-31".to_string(),
            output: PathBuf::from("hotnewhiphop_articles.csv"),
            checkpoint_every: 50,
            checkpoint_dir: None,
            fetcher: FetcherKind::Http,
            source_site: SourceSite::SiteRoot,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers,
            request_timeout_secs: 15,
            navigation_timeout_secs: 30,
            browser_settle_ms: 2000,
            delay_min_ms: 500,
            delay_max_ms: 1500,
            fetch_retries: 2,
            retry_base_delay_ms: 1000,
            selectors: Selectors::default(),
            stop: StopRules::default(),
        }
    }
}

impl CrawlConfig {
    /// Load the YAML file at `path`, or the defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            debug!("No config file given; using defaults");
            return Ok(CrawlConfig::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes to unit, not to an empty mapping.
        if text.trim().is_empty() {
            return Ok(CrawlConfig::default());
        }
        serde_yaml::from_str(text)
    }

    /// Apply CLI flags on top of the file values.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(p) = cli.start_page {
            self.start_page = p;
        }
        if let Some(p) = cli.end_page {
            self.end_page = p;
        }
        if let Some(d) = &cli.from {
            self.from = d.clone();
        }
        if let Some(d) = &cli.to {
            self.to = d.clone();
        }
        if let Some(o) = &cli.output {
            self.output = o.clone();
        }
        if let Some(n) = cli.checkpoint_every {
            self.checkpoint_every = n;
        }
        if let Some(d) = &cli.checkpoint_dir {
            self.checkpoint_dir = Some(d.clone());
        }
        if let Some(f) = cli.fetcher {
            self.fetcher = f;
        }
        if let Some(ua) = &cli.user_agent {
            self.user_agent = ua.clone();
        }
        if let Some(n) = cli.fetch_retries {
            self.fetch_retries = n;
        }
        self
    }

    /// Check every value that could otherwise fail halfway through a crawl.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_page > self.end_page {
            return Err(ConfigError::Invalid(format!(
                "start page {} is after end page {}",
                self.start_page, self.end_page
            )));
        }
        if self.checkpoint_every == 0 {
            return Err(ConfigError::Invalid(
                "checkpoint_every must be at least 1".to_string(),
            ));
        }
        if self.delay_min_ms > self.delay_max_ms {
            return Err(ConfigError::Invalid(format!(
                "delay_min_ms {} exceeds delay_max_ms {}",
                self.delay_min_ms, self.delay_max_ms
            )));
        }
        if self.stop.old_streak == 0 || self.stop.empty_streak == 0 {
            return Err(ConfigError::Invalid(
                "stop streak limits must be at least 1".to_string(),
            ));
        }
        if !self.listing_url.contains("{page}") {
            return Err(ConfigError::Invalid(format!(
                "listing_url {:?} has no {{page}} placeholder",
                self.listing_url
            )));
        }
        self.site_root_url()?;
        self.window()?;
        Ok(())
    }

    pub fn window(&self) -> Result<DateWindow, ConfigError> {
        DateWindow::new(parse_bound(&self.from)?, parse_bound(&self.to)?)
    }

    pub fn site_root_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.site_root).map_err(|_| ConfigError::SiteRoot(self.site_root.clone()))
    }

    pub fn listing(&self) -> ListingUrl {
        ListingUrl::new(self.listing_url.clone())
    }

    pub fn checkpoint_dir(&self) -> PathBuf {
        self.checkpoint_dir.clone().unwrap_or_else(|| {
            self.output
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }

    pub fn politeness_delay(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.delay_min_ms),
            Duration::from_millis(self.delay_max_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults_validate() {
        let config = CrawlConfig::default();
        config.validate().unwrap();
        assert_eq!(config.stop, StopRules { old_streak: 5, empty_streak: 10 });
        assert_eq!(config.checkpoint_every, 50);
        assert_eq!(
            config.listing().for_page(13818),
            "https://www.hotnewhiphop.com/articles/news/13818"
        );
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
start_page: 1
end_page: 20
fetcher: browser
source_site: listing_page
selectors:
  item: article.card
stop:
  old_streak: 3
"#;
        let config = CrawlConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.start_page, 1);
        assert_eq!(config.end_page, 20);
        assert_eq!(config.fetcher, FetcherKind::Browser);
        assert_eq!(config.source_site, SourceSite::ListingPage);
        assert_eq!(config.selectors.item.as_deref(), Some("article.card"));
        assert_eq!(config.selectors.title, "a.font-extrabold");
        assert_eq!(config.stop.old_streak, 3);
        assert_eq!(config.stop.empty_streak, 10);
        assert_eq!(config.delay_max_ms, 1500);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = CrawlConfig::from_yaml("  \n").unwrap();
        assert_eq!(config.start_page, CrawlConfig::default().start_page);
    }

    #[test]
    fn test_cli_overrides_file() {
        let cli = Cli::parse_from([
            "listing_crawler",
            "--start-page",
            "5",
            "--end-page",
            "9",
            "--from",
            "2025-01-01",
            "--output",
            "out/articles.csv",
            "--fetch-retries",
            "0",
        ]);
        let config = CrawlConfig::default().with_overrides(&cli);
        assert_eq!(config.start_page, 5);
        assert_eq!(config.end_page, 9);
        assert_eq!(config.from, "2025-01-01");
        assert_eq!(config.to, "2025-12-31");
        assert_eq!(config.fetch_retries, 0);
        assert_eq!(config.checkpoint_dir(), PathBuf::from("out"));
    }

    #[test]
    fn test_checkpoint_dir_for_bare_filename() {
        let config = CrawlConfig::default();
        assert_eq!(config.checkpoint_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = CrawlConfig::default();
        config.start_page = 10;
        config.end_page = 9;
        assert!(config.validate().is_err());

        let mut config = CrawlConfig::default();
        config.checkpoint_every = 0;
        assert!(config.validate().is_err());

        let mut config = CrawlConfig::default();
        config.listing_url = "https://example.com/news".to_string();
        assert!(config.validate().is_err());

        let mut config = CrawlConfig::default();
        config.from = "2026-01-01".to_string();
        assert!(config.validate().is_err());

        let mut config = CrawlConfig::default();
        config.to = "soon".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Bound(_))));

        let mut config = CrawlConfig::default();
        config.site_root = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::SiteRoot(_))));
    }
}
