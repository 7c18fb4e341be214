//! Cutoff filtering of fetched release times.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, error};

use crate::model::{PackageRecord, ReleaseTimestamp};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid date format: {0}. Use ISO 8601 format (e.g., '2024-01-01')")]
    InvalidDate(String),
}

// `%#z` takes `+05:00`, `+0500` and `+05`
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn basic_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{4})(\d{2})(\d{2})([Tt ].+)?$").expect("basic date pattern is valid")
    })
}

fn hour_only() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2}[Tt ]\d{2})([Zz]|[+-]\d{2}(?::?\d{2})?)?$")
            .expect("hour-only pattern is valid")
    })
}

/// Rewrites the shorter ISO-8601 spellings into forms chrono formats accept:
/// `20240615` → `2024-06-15`, `2024-06-15T10` → `2024-06-15T10:00`, `Z` → `+00:00`.
fn normalize(text: &str) -> String {
    let text = basic_date().replace(text, "${1}-${2}-${3}${4}");
    let text = hour_only().replace(&text, "${1}:00${2}");

    match text.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{rest}+00:00"),
        None => text.to_string(),
    }
}

/// Parses an ISO-8601 date or date-time into a UTC instant.
///
/// A trailing `Z` means UTC; values without an offset are taken as UTC.
pub fn parse_instant(text: &str) -> Result<DateTime<Utc>, FilterError> {
    let text = text.trim();
    let normalized = normalize(text);

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| FilterError::InvalidDate(text.to_string()))
}

/// Keeps records published strictly after `cutoff_date`.
///
/// An unparseable cutoff is reported and yields no matches. Records holding a
/// sentinel or an unparseable timestamp are dropped.
pub fn filter_after(records: &[PackageRecord], cutoff_date: &str) -> Vec<PackageRecord> {
    let cutoff = match parse_instant(cutoff_date) {
        Ok(cutoff) => cutoff,
        Err(e) => {
            error!("{e}");
            return Vec::new();
        }
    };

    records
        .iter()
        .filter(|record| {
            let ReleaseTimestamp::Published(raw) = &record.release_date else {
                return false;
            };
            match parse_instant(raw) {
                Ok(released) => released > cutoff,
                Err(e) => {
                    debug!(package = record.name.as_str(), "Skipping record: {e}");
                    false
                }
            }
        })
        .cloned()
        .collect()
}
