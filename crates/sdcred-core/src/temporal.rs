//! # Temporal Types — UTC-Only Timestamps
//!
//! Defines `Timestamp`, a UTC-only timestamp truncated to seconds precision.
//! JWT NumericDate values (`iat`, `exp`) are whole seconds since the Unix
//! epoch, so all freshness comparisons in sdcred happen at that resolution.
//!
//! Serializes as RFC 3339 with a `Z` suffix (`2026-01-15T12:00:00Z`).

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a Unix epoch value (seconds), as carried in
    /// JWT NumericDate claims.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidTimestamp` if the value is outside
    /// chrono's representable range.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, ValidationError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidTimestamp(format!("invalid Unix timestamp: {secs}")))
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Offset this timestamp by a signed number of seconds, saturating at
    /// chrono's representable range.
    pub fn offset_secs(&self, secs: i64) -> Self {
        let shifted = chrono::Duration::try_seconds(secs)
            .and_then(|delta| self.0.checked_add_signed(delta));
        match shifted {
            Some(dt) => Self(dt),
            None if secs > 0 => Self::latest(),
            None => Self::earliest(),
        }
    }

    /// The latest representable timestamp.
    pub fn latest() -> Self {
        Self(truncate_to_seconds(DateTime::<Utc>::MAX_UTC))
    }

    /// The earliest representable timestamp.
    pub fn earliest() -> Self {
        Self(truncate_to_seconds(DateTime::<Utc>::MIN_UTC))
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// Truncate a `DateTime<Utc>` to seconds precision (discard nanoseconds).
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
