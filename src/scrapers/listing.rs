//! Listing-page article extractor.
//!
//! A listing page shows a run of article cards, each with a title link and a
//! `<time>` element whose `data-date` attribute holds the publish timestamp:
//!
//! ```html
//! <a class="font-extrabold" href="/articles/123-some-story">Some story</a>
//! <time class="client-timestamp" data-date="2024-03-01 12:00:00">Mar 1</time>
//! ```
//!
//! With an `item` selector configured, both pieces are read from inside each
//! card. Without one, titles and timestamps are collected as two separate
//! sequences and paired by position, which is only done when their lengths
//! agree.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use crate::config::Selectors;
use crate::error::{ConfigError, ExtractionError};
use crate::models::Candidate;

/// Turns raw listing HTML into candidate triples.
#[derive(Debug)]
pub struct ListingExtractor {
    item: Option<Selector>,
    title: Selector,
    timestamp: Selector,
    timestamp_attr: String,
    site_root: Url,
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

impl ListingExtractor {
    pub fn new(selectors: &Selectors, site_root: Url) -> Result<Self, ConfigError> {
        Ok(ListingExtractor {
            item: selectors.item.as_deref().map(compile).transpose()?,
            title: compile(&selectors.title)?,
            timestamp: compile(&selectors.timestamp)?,
            timestamp_attr: selectors.timestamp_attr.clone(),
            site_root,
        })
    }

    /// Extract every candidate on the page, in document order.
    #[instrument(level = "debug", skip_all)]
    pub fn extract(&self, html: &str) -> Result<Vec<Candidate>, ExtractionError> {
        let document = Html::parse_document(html);
        match &self.item {
            Some(item) => Ok(self.extract_items(&document, item)),
            None => self.extract_positional(&document),
        }
    }

    fn extract_items(&self, document: &Html, item: &Selector) -> Vec<Candidate> {
        document
            .select(item)
            .filter_map(|card| {
                let link = card.select(&self.title).next()?;
                let raw_timestamp = card
                    .select(&self.timestamp)
                    .next()
                    .and_then(|t| self.timestamp_of(t));
                Some(self.candidate(link, raw_timestamp))
            })
            .collect()
    }

    fn extract_positional(&self, document: &Html) -> Result<Vec<Candidate>, ExtractionError> {
        let links: Vec<ElementRef> = document.select(&self.title).collect();
        let times: Vec<ElementRef> = document.select(&self.timestamp).collect();
        debug!(
            titles = links.len(),
            timestamps = times.len(),
            "Collected title and timestamp elements"
        );

        if links.len() != times.len() {
            return Err(ExtractionError::Mismatch {
                titles: links.len(),
                timestamps: times.len(),
            });
        }

        Ok(links
            .into_iter()
            .zip(times)
            .map(|(link, time)| self.candidate(link, self.timestamp_of(time)))
            .collect())
    }

    fn timestamp_of(&self, el: ElementRef) -> Option<String> {
        el.value()
            .attr(&self.timestamp_attr)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    }

    fn candidate(&self, link: ElementRef, raw_timestamp: Option<String>) -> Candidate {
        let title = link
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let href = link
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .and_then(|h| self.site_root.join(h).ok())
            .map(|u| u.to_string());
        Candidate {
            title,
            href,
            raw_timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extractor(item: Option<&str>) -> ListingExtractor {
        let selectors = Selectors {
            item: item.map(ToString::to_string),
            ..Selectors::default()
        };
        ListingExtractor::new(&selectors, Url::parse("https://www.hotnewhiphop.com").unwrap())
            .unwrap()
    }

    const POSITIONAL: &str = r#"
        <html><body>
          <div class="card">
            <a class="text-lg font-extrabold" href="/articles/1-first">  First <em>story</em> </a>
            <time class="client-timestamp" data-date="2024-03-01 12:00:00">Mar 1</time>
          </div>
          <div class="card">
            <a class="font-extrabold" href="https://www.hotnewhiphop.com/articles/2-second">Second</a>
            <time class="client-timestamp" data-date="2023-12-01 08:15:00">Dec 1</time>
          </div>
          <a class="nav" href="/articles/news/2">Next</a>
        </body></html>
    "#;

    #[test]
    fn test_positional_pairing() {
        let candidates = extractor(None).extract(POSITIONAL).unwrap();
        assert_eq!(
            candidates,
            vec![
                Candidate {
                    title: "First story".to_string(),
                    href: Some("https://www.hotnewhiphop.com/articles/1-first".to_string()),
                    raw_timestamp: Some("2024-03-01 12:00:00".to_string()),
                },
                Candidate {
                    title: "Second".to_string(),
                    href: Some("https://www.hotnewhiphop.com/articles/2-second".to_string()),
                    raw_timestamp: Some("2023-12-01 08:15:00".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_positional_mismatch_fails_loudly() {
        let html = r#"
            <a class="font-extrabold" href="/a">A</a>
            <a class="font-extrabold" href="/b">B</a>
            <time class="client-timestamp" data-date="2024-03-01 12:00:00"></time>
        "#;
        let err = extractor(None).extract(html).unwrap_err();
        assert_eq!(
            err,
            ExtractionError::Mismatch {
                titles: 2,
                timestamps: 1
            }
        );
    }

    #[test]
    fn test_item_mode_pairs_within_each_card() {
        // The second card has no timestamp; positional pairing would shift
        // the third card's date onto it.
        let html = r#"
            <article class="card">
              <a class="font-extrabold" href="/articles/1">One</a>
              <time class="client-timestamp" data-date="2024-05-01 00:00:00"></time>
            </article>
            <article class="card">
              <a class="font-extrabold" href="/articles/2">Two</a>
            </article>
            <article class="card">
              <a class="font-extrabold" href="/articles/3">Three</a>
              <time class="client-timestamp" data-date="2023-02-01 00:00:00"></time>
            </article>
            <article class="card"><p>sponsored</p></article>
        "#;
        let candidates = extractor(Some("article.card")).extract(html).unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[1].title, "Two");
        assert_eq!(candidates[1].raw_timestamp, None);
        assert_eq!(
            candidates[2].raw_timestamp.as_deref(),
            Some("2023-02-01 00:00:00")
        );
    }

    #[test]
    fn test_missing_href_and_date_attr() {
        let html = r#"
            <a class="font-extrabold">No link</a>
            <time class="client-timestamp"></time>
        "#;
        let candidates = extractor(None).extract(html).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].href, None);
        assert_eq!(candidates[0].raw_timestamp, None);
    }

    #[test]
    fn test_empty_page() {
        let candidates = extractor(None)
            .extract("<html><body><p>Nothing here</p></body></html>")
            .unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_bad_selector_is_config_error() {
        let selectors = Selectors {
            title: "a[".to_string(),
            ..Selectors::default()
        };
        let res = ListingExtractor::new(&selectors, Url::parse("https://example.com").unwrap());
        assert!(matches!(res, Err(ConfigError::Selector { .. })));
    }
}
