//! # CLI Configuration
//!
//! Settings resolve in this order, first match wins:
//!
//! 1. command-line flags
//! 2. the YAML file named by `--config`
//! 3. `BAZAAR_WRAP_JITTER_SECS` (jitter only)
//! 4. built-in defaults
//!
//! ```yaml
//! relay_file: ./relay.jsonl
//! status_cache: ./status.json
//! wrap_jitter_secs: 3600
//! self_copy: true
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use bazaar_transport::WrapPolicy;

/// Relay file used when neither flag nor config names one.
pub const DEFAULT_RELAY_FILE: &str = "bazaar-relay.jsonl";

/// On-disk configuration. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// JSON-lines relay file.
    pub relay_file: Option<PathBuf>,
    /// Durable order status cache.
    pub status_cache: Option<PathBuf>,
    /// Gift-wrap timestamp jitter bound, seconds.
    pub wrap_jitter_secs: Option<u64>,
    /// Whether senders receive their own envelope.
    pub self_copy: Option<bool>,
}

impl ConfigFile {
    /// Read and parse a YAML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }
}

/// Overrides taken from global command-line flags.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--relay`.
    pub relay_file: Option<PathBuf>,
    /// `--status-cache`.
    pub status_cache: Option<PathBuf>,
    /// `--wrap-jitter`.
    pub wrap_jitter_secs: Option<u64>,
    /// `--no-self-copy`.
    pub no_self_copy: bool,
}

/// Effective settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// JSON-lines relay file.
    pub relay_file: PathBuf,
    /// Durable order status cache, if any.
    pub status_cache: Option<PathBuf>,
    /// Gift-wrap policy.
    pub wrap_policy: WrapPolicy,
    /// Whether senders receive their own envelope.
    pub self_copy: bool,
}

impl Settings {
    /// Merge flags, file, environment, and defaults.
    pub fn resolve(config: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let file = match config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        Self::merge(file, overrides)
    }

    fn merge(file: ConfigFile, overrides: Overrides) -> Result<Self> {
        let wrap_policy = match overrides.wrap_jitter_secs.or(file.wrap_jitter_secs) {
            Some(secs) => WrapPolicy::new(secs),
            None => WrapPolicy::from_env().context("invalid wrap jitter in environment")?,
        };
        Ok(Self {
            relay_file: overrides
                .relay_file
                .or(file.relay_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RELAY_FILE)),
            status_cache: overrides.status_cache.or(file.status_cache),
            wrap_policy,
            self_copy: !overrides.no_self_copy && file.self_copy.unwrap_or(true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file() {
        let file = ConfigFile {
            relay_file: Some("from-file.jsonl".into()),
            status_cache: None,
            wrap_jitter_secs: Some(60),
            self_copy: Some(true),
        };
        let settings = Settings::merge(
            file,
            Overrides {
                relay_file: Some("from-flag.jsonl".into()),
                wrap_jitter_secs: Some(0),
                no_self_copy: true,
                ..Overrides::default()
            },
        )
        .unwrap();
        assert_eq!(settings.relay_file, PathBuf::from("from-flag.jsonl"));
        assert_eq!(settings.wrap_policy, WrapPolicy::new(0));
        assert!(!settings.self_copy);
    }

    #[test]
    fn file_values_apply_without_flags() {
        let file = ConfigFile {
            relay_file: Some("r.jsonl".into()),
            status_cache: Some("s.json".into()),
            wrap_jitter_secs: Some(600),
            self_copy: Some(false),
        };
        let settings = Settings::merge(file, Overrides::default()).unwrap();
        assert_eq!(settings.relay_file, PathBuf::from("r.jsonl"));
        assert_eq!(settings.status_cache, Some(PathBuf::from("s.json")));
        assert_eq!(settings.wrap_policy.max_backdate_secs, 600);
        assert!(!settings.self_copy);
    }

    #[test]
    fn yaml_file_loads_and_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.yaml");
        std::fs::write(&good, "relay_file: relay.jsonl\nwrap_jitter_secs: 5\n").unwrap();
        let cfg = ConfigFile::load(&good).unwrap();
        assert_eq!(cfg.wrap_jitter_secs, Some(5));
        assert_eq!(cfg.self_copy, None);

        let bad = dir.path().join("bad.yaml");
        std::fs::write(&bad, "relay: relay.jsonl\n").unwrap();
        assert!(ConfigFile::load(&bad).is_err());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::resolve(Some(&dir.path().join("nope.yaml")), Overrides::default())
            .is_err());
    }
}
