//! Gift-wrap policy configuration.
//!
//! Envelope timestamps are backdated by a random amount so that relays cannot
//! line up an envelope's `created_at` with the moment it was published. The
//! bound is a deployment policy, not a protocol constant.

use bazaar_core::UnixTimestamp;
use rand::Rng;

/// Default jitter bound: two days.
pub const DEFAULT_MAX_BACKDATE_SECS: u64 = 2 * 24 * 60 * 60;

/// Environment variable overriding [`WrapPolicy::max_backdate_secs`].
pub const WRAP_JITTER_ENV: &str = "BAZAAR_WRAP_JITTER_SECS";

/// Timestamp policy for gift-wrap envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapPolicy {
    /// Envelopes are stamped `now - U[0, max_backdate_secs]`.
    pub max_backdate_secs: u64,
}

impl Default for WrapPolicy {
    fn default() -> Self {
        Self {
            max_backdate_secs: DEFAULT_MAX_BACKDATE_SECS,
        }
    }
}

impl WrapPolicy {
    /// Policy with an explicit bound. Zero disables jitter.
    pub fn new(max_backdate_secs: u64) -> Self {
        Self { max_backdate_secs }
    }

    /// Load the policy from the environment.
    ///
    /// Variables:
    /// - `BAZAAR_WRAP_JITTER_SECS` (default: 172800)
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(WRAP_JITTER_ENV) {
            Ok(raw) => Self::parse_bound(&raw),
            Err(_) => Ok(Self::default()),
        }
    }

    fn parse_bound(raw: &str) -> Result<Self, ConfigError> {
        raw.trim()
            .parse::<u64>()
            .map(Self::new)
            .map_err(|e| ConfigError::InvalidValue {
                var: WRAP_JITTER_ENV.to_string(),
                value: raw.to_string(),
                reason: e.to_string(),
            })
    }

    /// Pick a jittered timestamp at or before `now`.
    pub fn stamp<R: Rng + ?Sized>(&self, now: UnixTimestamp, rng: &mut R) -> UnixTimestamp {
        if self.max_backdate_secs == 0 {
            return now;
        }
        now.saturating_sub(rng.gen_range(0..=self.max_backdate_secs))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held an unusable value.
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// Raw value.
        value: String,
        /// Parse failure.
        reason: String,
    },
}
