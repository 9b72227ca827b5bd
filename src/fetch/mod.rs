//! Page fetch collaborators.
//!
//! The crawl controller only sees the [`PageFetcher`] trait. Which concrete
//! fetcher sits behind it is decided by the `fetcher` config key:
//!
//! | Kind | Type | Notes |
//! |------|------|-------|
//! | `http` | [`HttpFetcher`] | reqwest GET with browser-like headers |
//! | `browser` | `BrowserFetcher` | headless Chromium, needs the `browser` feature |
//!
//! Either one is wrapped in [`RetryFetch`] so that transient failures get a
//! few more attempts before the page is written off.

mod http;
mod retry;

#[cfg(feature = "browser")]
mod browser;

pub use http::HttpFetcher;
pub use retry::RetryFetch;

#[cfg(feature = "browser")]
pub use browser::BrowserFetcher;

use std::error::Error;
use std::time::Duration;
use tracing::info;

use crate::config::{CrawlConfig, FetcherKind};
use crate::error::FetchError;

/// Retrieves the raw content of one listing page.
pub trait PageFetcher {
    /// Fetch page `page`. Called at most once per page index by the crawler.
    async fn fetch(&self, page: u32) -> Result<String, FetchError>;
}

/// URL template for listing pages, e.g. `https://site/news/{page}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingUrl(String);

impl ListingUrl {
    pub fn new(template: impl Into<String>) -> Self {
        ListingUrl(template.into())
    }

    pub fn for_page(&self, page: u32) -> String {
        self.0.replace("{page}", &page.to_string())
    }
}

/// The fetcher selected by configuration.
#[derive(Debug)]
pub enum Fetcher {
    Http(HttpFetcher),
    #[cfg(feature = "browser")]
    Browser(BrowserFetcher),
}

impl Fetcher {
    pub async fn from_config(config: &CrawlConfig) -> Result<Self, Box<dyn Error>> {
        let listing = config.listing();
        match config.fetcher {
            FetcherKind::Http => {
                info!("Using HTTP fetcher");
                let timeout = Duration::from_secs(config.request_timeout_secs);
                let fetcher =
                    HttpFetcher::new(listing, &config.user_agent, &config.headers, timeout)?;
                Ok(Fetcher::Http(fetcher))
            }
            #[cfg(feature = "browser")]
            FetcherKind::Browser => {
                info!("Launching headless browser");
                let timeout = Duration::from_secs(config.navigation_timeout_secs);
                let settle = Duration::from_millis(config.browser_settle_ms);
                let fetcher =
                    BrowserFetcher::launch(listing, &config.user_agent, timeout, settle).await?;
                Ok(Fetcher::Browser(fetcher))
            }
            #[cfg(not(feature = "browser"))]
            FetcherKind::Browser => Err(Box::new(crate::error::ConfigError::Invalid(
                "fetcher `browser` requires building with `--features browser`".to_string(),
            ))),
        }
    }

    /// Release whatever the fetcher holds open.
    pub async fn shutdown(self) {
        match self {
            Fetcher::Http(_) => {}
            #[cfg(feature = "browser")]
            Fetcher::Browser(b) => b.shutdown().await,
        }
    }
}

impl PageFetcher for Fetcher {
    async fn fetch(&self, page: u32) -> Result<String, FetchError> {
        match self {
            Fetcher::Http(f) => f.fetch(page).await,
            #[cfg(feature = "browser")]
            Fetcher::Browser(f) => f.fetch(page).await,
        }
    }
}
