//! Plain HTTP fetcher.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{ListingUrl, PageFetcher};
use crate::error::{ConfigError, FetchError};

/// Fetches listing pages with a single reqwest client.
///
/// Non-2xx answers are failures; see [`FetchError::from_reqwest`] for how
/// they are classified.
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    listing: ListingUrl,
}

impl HttpFetcher {
    pub fn new(
        listing: ListingUrl,
        user_agent: &str,
        headers: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ConfigError::Invalid(format!("header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ConfigError::Invalid(format!("header value {value:?}: {e}")))?;
            default_headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("cannot build HTTP client: {e}")))?;

        Ok(HttpFetcher { client, listing })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, page: u32) -> Result<String, FetchError> {
        let url = self.listing.for_page(page);
        debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| FetchError::from_reqwest(&url, e))?;
        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(&url, e))
    }
}
