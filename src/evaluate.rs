//! Page evaluation: extraction plus date classification for one page.

use tracing::{debug, error, info, warn};

use crate::classify::{Classification, DateWindow};
use crate::error::{ExtractionError, FetchError};
use crate::models::{ArticleRecord, PageFailure, PageResult, SourceSite};
use crate::scrapers::ListingExtractor;
use crate::utils::truncate_for_log;

/// Turns one fetched (or failed) listing page into a [`PageResult`].
#[derive(Debug)]
pub struct PageEvaluator {
    extractor: ListingExtractor,
    window: DateWindow,
    source_site: SourceSite,
    site_root: String,
}

impl PageEvaluator {
    pub fn new(
        extractor: ListingExtractor,
        window: DateWindow,
        source_site: SourceSite,
        site_root: impl Into<String>,
    ) -> Self {
        PageEvaluator {
            extractor,
            window,
            source_site,
            site_root: site_root.into(),
        }
    }

    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    /// Evaluate the outcome of fetching `page_url`.
    ///
    /// # Arguments
    ///
    /// * `page_url` - URL the page was fetched from; recorded as the source
    ///   site when [`SourceSite::ListingPage`] is configured
    /// * `fetched` - page body, or the error the fetcher gave up with
    ///
    /// # Returns
    ///
    /// A [`PageResult`] with the in-window articles and the flags the crawl
    /// controller needs. Nothing is propagated:
    ///
    /// - a fetch failure becomes an empty page
    /// - a title/timestamp mismatch keeps no articles but still counts its
    ///   titles as candidates, so it does not look like the end of the listing
    pub fn evaluate(&self, page_url: &str, fetched: Result<String, FetchError>) -> PageResult {
        let html = match fetched {
            Ok(html) => html,
            Err(e) => {
                error!(url = %page_url, error = %e, "Failed to load page");
                return PageResult::empty(Some(PageFailure::Fetch(e.to_string())));
            }
        };

        let candidates = match self.extractor.extract(&html) {
            Ok(c) => c,
            Err(e) => {
                error!(url = %page_url, error = %e, "Listing markup did not line up");
                let ExtractionError::Mismatch { titles, .. } = e;
                return PageResult {
                    candidates: titles,
                    failure: Some(PageFailure::Extraction(e.to_string())),
                    ..Default::default()
                };
            }
        };

        info!(url = %page_url, found = candidates.len(), "Found article candidates");
        if candidates.is_empty() {
            return PageResult::empty(None);
        }

        let source_site = match self.source_site {
            SourceSite::SiteRoot => self.site_root.as_str(),
            SourceSite::ListingPage => page_url,
        };

        let mut result = PageResult {
            candidates: candidates.len(),
            ..Default::default()
        };

        for candidate in candidates {
            match self.window.classify(candidate.raw_timestamp.as_deref()) {
                Classification::InRange(published_at) => {
                    let Some(url) = candidate.href else {
                        warn!(title = %candidate.title, "In-range article has no link; skipping");
                        continue;
                    };
                    let raw_date = candidate.raw_timestamp.unwrap_or_default();
                    info!(
                        title = %truncate_for_log(&candidate.title, 60),
                        date = %published_at.date(),
                        "Kept article"
                    );
                    result.articles.push(ArticleRecord {
                        url,
                        title: candidate.title,
                        source_site: source_site.to_string(),
                        published_at,
                        raw_date,
                    });
                }
                Classification::BeforeRange(_) => result.has_older_than_range = true,
                Classification::AfterRange(t) => {
                    debug!(title = %candidate.title, date = %t, "Article newer than window");
                }
                Classification::Unparsable => {
                    debug!(
                        title = %candidate.title,
                        raw = ?candidate.raw_timestamp,
                        "Unparsable timestamp"
                    );
                }
            }
        }

        result
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::classify::parse_bound;
    use crate::config::Selectors;
    use url::Url;

    /// Listing markup with one positional title/timestamp pair per entry.
    pub(crate) fn listing_html(entries: &[(&str, &str)]) -> String {
        let mut html = String::from("<html><body>");
        for (title, date) in entries {
            let slug = title.to_lowercase().replace(' ', "-");
            html.push_str(&format!(
                r#"<div><a class="font-extrabold" href="/articles/{slug}">{title}</a>
                   <time class="client-timestamp" data-date="{date}">x</time></div>"#
            ));
        }
        html.push_str("</body></html>");
        html
    }

    pub(crate) fn evaluator(source_site: SourceSite) -> PageEvaluator {
        let root = Url::parse("https://www.hotnewhiphop.com").unwrap();
        let extractor = ListingExtractor::new(&Selectors::default(), root).unwrap();
        let window = DateWindow::new(
            parse_bound("2024-01-01").unwrap(),
            parse_bound("2025-12-31").unwrap(),
        )
        .unwrap();
        PageEvaluator::new(extractor, window, source_site, "https://www.hotnewhiphop.com")
    }

    const PAGE: &str = "https://www.hotnewhiphop.com/articles/news/3";

    #[test]
    fn test_mixed_page() {
        let html = listing_html(&[
            ("T1", "2024-03-01 12:00:00"),
            ("T2", "2023-12-01 08:00:00"),
            ("T3", "2026-03-01 08:00:00"),
            ("T4", "garbage"),
        ]);
        let result = evaluator(SourceSite::SiteRoot).evaluate(PAGE, Ok(html));

        assert!(!result.is_empty);
        assert!(result.has_older_than_range);
        assert_eq!(result.candidates, 4);
        assert_eq!(result.articles.len(), 1);
        let kept = &result.articles[0];
        assert_eq!(kept.title, "T1");
        assert_eq!(kept.url, "https://www.hotnewhiphop.com/articles/t1");
        assert_eq!(kept.source_site, "https://www.hotnewhiphop.com");
        assert_eq!(kept.raw_date, "2024-03-01 12:00:00");
    }

    #[test]
    fn test_listing_page_as_source() {
        let html = listing_html(&[("T1", "2024-03-01 12:00:00")]);
        let result = evaluator(SourceSite::ListingPage).evaluate(PAGE, Ok(html));
        assert_eq!(result.articles[0].source_site, PAGE);
    }

    #[test]
    fn test_structurally_empty_page() {
        let result = evaluator(SourceSite::SiteRoot)
            .evaluate(PAGE, Ok("<html><body></body></html>".to_string()));
        assert!(result.is_empty);
        assert!(!result.has_older_than_range);
        assert_eq!(result.failure, None);
    }

    #[test]
    fn test_only_future_and_unparsable_is_not_empty() {
        let html = listing_html(&[("T1", "2026-01-05 00:00:00"), ("T2", "not-a-date")]);
        let result = evaluator(SourceSite::SiteRoot).evaluate(PAGE, Ok(html));
        assert!(!result.is_empty);
        assert!(!result.has_older_than_range);
        assert!(result.articles.is_empty());
    }

    #[test]
    fn test_fetch_failure_is_empty_page() {
        let err = FetchError::Permanent {
            url: PAGE.into(),
            reason: "404".into(),
        };
        let result = evaluator(SourceSite::SiteRoot).evaluate(PAGE, Err(err));
        assert!(result.is_empty);
        assert!(matches!(result.failure, Some(PageFailure::Fetch(_))));
    }

    #[test]
    fn test_mismatch_keeps_nothing_but_is_not_empty() {
        let html = format!(
            r#"<a class="font-extrabold" href="/hero">Hero</a>{}"#,
            listing_html(&[("T1", "2024-03-01 12:00:00"), ("T2", "2024-03-02 12:00:00")])
        );
        let result = evaluator(SourceSite::SiteRoot).evaluate(PAGE, Ok(html));
        assert!(!result.is_empty);
        assert!(!result.has_older_than_range);
        assert_eq!(result.candidates, 3);
        assert!(result.articles.is_empty());
        assert!(matches!(result.failure, Some(PageFailure::Extraction(_))));
    }

    #[test]
    fn test_in_range_without_link_is_counted_not_kept() {
        let html = r#"<a class="font-extrabold">Orphan</a>
            <time class="client-timestamp" data-date="2024-05-05 05:05:05"></time>"#
            .to_string();
        let result = evaluator(SourceSite::SiteRoot).evaluate(PAGE, Ok(html));
        assert!(!result.is_empty);
        assert_eq!(result.candidates, 1);
        assert!(result.articles.is_empty());
    }

    #[test]
    fn test_kept_articles_inside_window() {
        let ev = evaluator(SourceSite::SiteRoot);
        let html = listing_html(&[
            ("A", "2024-01-01 00:00:00"),
            ("B", "2023-12-31 23:59:59"),
            ("C", "2025-12-31 00:00:00"),
            ("D", "2025-12-31 00:00:01"),
        ]);
        let result = ev.evaluate(PAGE, Ok(html));
        let titles: Vec<_> = result.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["A", "C"]);
        assert!(result.articles.iter().all(|a| ev.window().contains(a.published_at)));
    }
}
