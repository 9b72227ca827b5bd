//! Page content extraction.
//!
//! The listing extractor is the only scraper: every supported site is
//! described by CSS selectors in the config, not by code.

pub mod listing;

pub use listing::ListingExtractor;
