//! # Temporal Types: Unix-Second Timestamps
//!
//! Event `created_at` values are whole seconds since the Unix epoch. Integer
//! seconds hash identically on every platform, which keeps event ids stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch, UTC.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnixTimestamp(u64);

impl UnixTimestamp {
    /// Construct from raw seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Current UTC time, truncated to seconds. Pre-epoch clocks clamp to 0.
    pub fn now() -> Self {
        Self(u64::try_from(Utc::now().timestamp()).unwrap_or(0))
    }

    /// Raw seconds.
    pub const fn as_secs(&self) -> u64 {
        self.0
    }

    /// Move backwards by `secs`, saturating at the epoch.
    pub fn saturating_sub(self, secs: u64) -> Self {
        Self(self.0.saturating_sub(secs))
    }

    /// Convert to a `chrono` datetime for display.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.0)
            .ok()
            .and_then(|s| DateTime::from_timestamp(s, 0))
    }
}

impl From<u64> for UnixTimestamp {
    fn from(secs: u64) -> Self {
        Self(secs)
    }
}

impl std::fmt::Display for UnixTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            None => write!(f, "{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_after_2023() {
        assert!(UnixTimestamp::now().as_secs() > 1_700_000_000);
    }

    #[test]
    fn saturating_sub_clamps_at_epoch() {
        let t = UnixTimestamp::from_secs(10);
        assert_eq!(t.saturating_sub(3).as_secs(), 7);
        assert_eq!(t.saturating_sub(30).as_secs(), 0);
    }

    #[test]
    fn display_is_iso8601_utc() {
        let t = UnixTimestamp::from_secs(1_700_000_000);
        assert_eq!(t.to_string(), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn serializes_as_bare_integer() {
        let t = UnixTimestamp::from_secs(42);
        assert_eq!(serde_json::to_string(&t).unwrap(), "42");
        let back: UnixTimestamp = serde_json::from_str("42").unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn ordering_follows_seconds() {
        assert!(UnixTimestamp::from_secs(1) < UnixTimestamp::from_secs(2));
    }
}
