//! Version handling for migration steps.
//!
//! This module parses the historical version encodings, applies the
//! correction table for known malformed historical values, and validates
//! versions before they are allowed into the migration registry.

mod types;

pub use types::{VersionError, VersionIdentifier, LEGACY_VERSIONS};

use chrono::{Duration, Local, NaiveDateTime};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Layout of the timestamp embedded in current-format versions.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

/// Default allowance for current-format timestamps ahead of the local clock.
pub const DEFAULT_FUTURE_TOLERANCE_SECS: i64 = 24 * 60 * 60;

/// Historical versions that were registered with the wrong encoding.
pub fn default_corrections() -> BTreeMap<String, String> {
    BTreeMap::from([("x18_10_10_01".to_string(), "x18.10.10.01".to_string())])
}

/// Compare two parsed versions.
pub fn compare_versions(a: &VersionIdentifier, b: &VersionIdentifier) -> Ordering {
    a.cmp(b)
}

/// Correction table plus registration-time validation settings.
#[derive(Debug, Clone)]
pub struct VersionRules {
    corrections: BTreeMap<String, String>,
    future_tolerance: Duration,
}

impl VersionRules {
    pub fn new(corrections: BTreeMap<String, String>, future_tolerance: Duration) -> Self {
        Self {
            corrections,
            future_tolerance,
        }
    }

    /// Map a raw version through the correction table.
    pub fn correct<'a>(&'a self, raw: &'a str) -> &'a str {
        self.corrections.get(raw).map(String::as_str).unwrap_or(raw)
    }

    /// Correct and parse a version string.
    pub fn parse(&self, raw: &str) -> Result<VersionIdentifier, VersionError> {
        VersionIdentifier::parse(self.correct(raw))
    }

    /// Parse a version for registration, rejecting current-format versions
    /// dated later than `now + future_tolerance`.
    pub fn validate_at(
        &self,
        raw: &str,
        now: NaiveDateTime,
    ) -> Result<VersionIdentifier, VersionError> {
        let version = self.parse(raw)?;

        if let Some(timestamp) = version.timestamp() {
            NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
                .map_err(|_| VersionError::InvalidTimestamp(raw.to_string()))?;

            // No bound when the limit lies past chrono's date range.
            if let Some(limit) = now.checked_add_signed(self.future_tolerance) {
                // Fixed-width digits, so string order is chronological order.
                let latest_allowed = limit.format(TIMESTAMP_FORMAT).to_string();
                if timestamp > latest_allowed.as_str() {
                    return Err(VersionError::FutureTimestamp {
                        version: raw.to_string(),
                        latest_allowed,
                    });
                }
            }
        }

        Ok(version)
    }

    /// [`validate_at`](Self::validate_at) against the local wall clock.
    pub fn validate(&self, raw: &str) -> Result<VersionIdentifier, VersionError> {
        self.validate_at(raw, Local::now().naive_local())
    }

    pub fn future_tolerance(&self) -> Duration {
        self.future_tolerance
    }
}

impl Default for VersionRules {
    fn default() -> Self {
        Self::new(
            default_corrections(),
            Duration::seconds(DEFAULT_FUTURE_TOLERANCE_SECS),
        )
    }
}
