//! Timestamp parsing and date-window classification.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::ConfigError;

/// Format of the `data-date` attribute on listing pages.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Where a parsed timestamp falls relative to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    InRange(NaiveDateTime),
    BeforeRange(NaiveDateTime),
    AfterRange(NaiveDateTime),
    Unparsable,
}

/// Inclusive `[start, end]` range of publish timestamps to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl DateWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::Invalid(format!(
                "date window starts after it ends ({start} > {end})"
            )));
        }
        Ok(DateWindow { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t <= self.end
    }

    /// Classify a raw timestamp string. A missing string is unparsable.
    pub fn classify(&self, raw: Option<&str>) -> Classification {
        match raw.and_then(parse_timestamp) {
            Some(t) if self.contains(t) => Classification::InRange(t),
            Some(t) if t < self.start => Classification::BeforeRange(t),
            Some(t) => Classification::AfterRange(t),
            None => Classification::Unparsable,
        }
    }
}

/// Parse a `YYYY-MM-DD HH:MM:SS` timestamp.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).ok()
}

/// Parse a window bound. A bare date means midnight of that day.
pub fn parse_bound(raw: &str) -> Result<NaiveDateTime, ConfigError> {
    let raw = raw.trim();
    if let Some(t) = parse_timestamp(raw) {
        return Ok(t);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ConfigError::Bound(raw.to_string()))
}
