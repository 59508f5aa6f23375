//! Runtime configuration read from the process environment.
//!
//! # Invariants
//! - Loading never fails; invalid values fall back to defaults with a warning.
//! - Lock TTL is not configurable.

use crate::db::OpenOptions;
use crate::logging::default_log_level;
use crate::service::coordinator::DEFAULT_STORE_RETRY_ATTEMPTS;
use log::warn;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "FLOTTE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "FLOTTE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "FLOTTE_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "FLOTTE_BUSY_TIMEOUT_MS";
pub const ENV_STORE_RETRIES: &str = "FLOTTE_STORE_RETRIES";

const DEFAULT_DB_FILE: &str = "flotte.sqlite3";
const DEFAULT_LOG_DIR_NAME: &str = "flotte-logs";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
    pub busy_timeout_ms: u64,
    /// Extra attempts after a transient store failure.
    pub store_retry_attempts: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            log_level: default_log_level().to_string(),
            log_dir: std::env::temp_dir().join(DEFAULT_LOG_DIR_NAME),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            store_retry_attempts: DEFAULT_STORE_RETRY_ATTEMPTS,
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        Self {
            db_path: value(ENV_DB_PATH).map_or(defaults.db_path, PathBuf::from),
            log_level: value(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: value(ENV_LOG_DIR).map_or(defaults.log_dir, PathBuf::from),
            busy_timeout_ms: parse_or_default(
                ENV_BUSY_TIMEOUT_MS,
                value(ENV_BUSY_TIMEOUT_MS),
                defaults.busy_timeout_ms,
            ),
            store_retry_attempts: parse_or_default(
                ENV_STORE_RETRIES,
                value(ENV_STORE_RETRIES),
                defaults.store_retry_attempts,
            ),
        }
    }

    pub fn open_options(&self) -> OpenOptions {
        OpenOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}

fn parse_or_default<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(
                "event=config_load module=config status=fallback key={} value={} default={}",
                key, raw, default
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, ENV_BUSY_TIMEOUT_MS, ENV_DB_PATH, ENV_STORE_RETRIES};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn config_from(pairs: &[(&str, &str)]) -> CoreConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        CoreConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(config_from(&[]), CoreConfig::default());
    }

    #[test]
    fn values_override_defaults() {
        let config = config_from(&[
            (ENV_DB_PATH, "/var/lib/flotte/fleet.db"),
            (ENV_BUSY_TIMEOUT_MS, " 250 "),
            (ENV_STORE_RETRIES, "0"),
        ]);
        assert_eq!(config.db_path, PathBuf::from("/var/lib/flotte/fleet.db"));
        assert_eq!(config.store_retry_attempts, 0);
        assert_eq!(config.open_options().busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let config = config_from(&[(ENV_BUSY_TIMEOUT_MS, "soon"), (ENV_STORE_RETRIES, "-1")]);
        let defaults = CoreConfig::default();
        assert_eq!(config.busy_timeout_ms, defaults.busy_timeout_ms);
        assert_eq!(config.store_retry_attempts, defaults.store_retry_attempts);
    }

    #[test]
    fn blank_values_are_ignored() {
        assert_eq!(config_from(&[(ENV_DB_PATH, "   ")]).db_path, CoreConfig::default().db_path);
    }
}
