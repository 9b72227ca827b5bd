//! Headless Chromium fetcher, for listings that only render client-side.
//!
//! One browser and one tab are kept for the whole run. Every page is loaded
//! into that tab and read back once rendering has had time to settle.

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::error::Error;
use std::fmt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use super::{ListingUrl, PageFetcher};
use crate::error::FetchError;

pub struct BrowserFetcher {
    browser: Browser,
    tab: Page,
    handler: JoinHandle<()>,
    listing: ListingUrl,
    timeout: Duration,
    settle: Duration,
}

impl fmt::Debug for BrowserFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserFetcher")
            .field("listing", &self.listing)
            .field("timeout", &self.timeout)
            .field("settle", &self.settle)
            .finish()
    }
}

/// CDP errors carry no structured cause, so network trouble is spotted by
/// Chromium's `net::ERR_*` codes and timeouts by name.
fn classify(url: &str, reason: String) -> FetchError {
    let url = url.to_string();
    if reason.contains("net::ERR_") || reason.to_lowercase().contains("timeout") {
        FetchError::Retryable { url, reason }
    } else {
        FetchError::Permanent { url, reason }
    }
}

impl BrowserFetcher {
    #[instrument(level = "info", skip(user_agent))]
    pub async fn launch(
        listing: ListingUrl,
        user_agent: &str,
        timeout: Duration,
        settle: Duration,
    ) -> Result<Self, Box<dyn Error>> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(timeout)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .build()?;
        let (browser, mut handler) = Browser::launch(config).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let tab = browser.new_page("about:blank").await?;
        tab.set_user_agent(user_agent).await?;

        Ok(BrowserFetcher {
            browser,
            tab,
            handler,
            listing,
            timeout,
            settle,
        })
    }

    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Failed to close browser cleanly");
        }
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Failed waiting for browser exit");
        }
        self.handler.abort();
        debug!("Browser closed");
    }
}

impl PageFetcher for BrowserFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, page: u32) -> Result<String, FetchError> {
        let url = self.listing.for_page(page);

        match tokio::time::timeout(self.timeout, self.tab.goto(url.as_str())).await {
            Err(_) => {
                return Err(FetchError::Retryable {
                    url,
                    reason: format!("navigation timed out after {:?}", self.timeout),
                });
            }
            Ok(Err(e)) => return Err(classify(&url, e.to_string())),
            Ok(Ok(_)) => {}
        }

        tokio::time::sleep(self.settle).await;

        self.tab
            .content()
            .await
            .map_err(|e| classify(&url, e.to_string()))
    }
}
