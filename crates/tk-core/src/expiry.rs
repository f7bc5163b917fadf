//! Absolute token expiration timestamps.

use crate::error::TkError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Expiration instant in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpiresAt(i64);

impl ExpiresAt {
    pub const fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// `now_ms + duration`, saturating.
    pub fn after(now_ms: i64, duration: Duration) -> Self {
        let delta = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        Self(now_ms.saturating_add(delta))
    }

    /// Signed milliseconds left until expiry; negative once expired.
    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        self.0.saturating_sub(now_ms)
    }

    /// Delay until expiry, clamped at zero.
    pub fn delay_from(&self, now_ms: i64) -> Duration {
        Duration::from_millis(self.remaining_ms(now_ms).max(0) as u64)
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.remaining_ms(now_ms) <= 0
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }
}

impl From<DateTime<Utc>> for ExpiresAt {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }
}

impl From<DateTime<FixedOffset>> for ExpiresAt {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self(dt.timestamp_millis())
    }
}

impl From<SystemTime> for ExpiresAt {
    fn from(t: SystemTime) -> Self {
        let ms = match t.duration_since(UNIX_EPOCH) {
            Ok(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
            Err(e) => -i64::try_from(e.duration().as_millis()).unwrap_or(i64::MAX),
        };
        Self(ms)
    }
}

impl From<i64> for ExpiresAt {
    fn from(ms: i64) -> Self {
        Self(ms)
    }
}

/// Accepts integer epoch milliseconds, an RFC 3339 timestamp, or an ISO
/// date-time / date without offset (read as UTC).
impl FromStr for ExpiresAt {
    type Err = TkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(ms) = s.parse::<i64>() {
            return Ok(Self(ms));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::from(dt));
        }
        if let Ok(naive) = s.parse::<NaiveDateTime>() {
            return Ok(Self::from(Utc.from_utc_datetime(&naive)));
        }
        s.parse::<NaiveDate>()
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Self::from(Utc.from_utc_datetime(&naive)))
            .ok_or_else(|| TkError::InvalidExpiry(s.to_string()))
    }
}

impl fmt::Display for ExpiresAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
