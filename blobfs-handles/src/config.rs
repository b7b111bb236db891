//! Registry configuration: constants, environment overrides, validation.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use blobfs_cache::CacheConfig;
use blobfs_core::constants::{
    ENV_EXPIRE_SECS, ENV_INIT_CAPACITY, ENV_MAX_CAPACITY, ENV_RENEW_INTERVAL_MS,
    LEASE_RENEW_INTERVAL, OPEN_FILES_EXPIRE_TIME, OPEN_FILES_INIT_CAPACITY,
    OPEN_FILES_MAX_CAPACITY,
};
use blobfs_core::error::{BlobFsError, Result};

/// Sizing and timing of an [`OpenFileRegistry`](crate::OpenFileRegistry).
///
/// Fixed at construction time; the registry never re-reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Allocation hint for the handle map
    pub initial_capacity: usize,
    /// Maximum number of open handles
    pub max_capacity: usize,
    /// Age at which a forgotten handle is dropped
    pub expire_time: Duration,
    /// Sleep between renewal cycles
    pub renew_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            initial_capacity: OPEN_FILES_INIT_CAPACITY,
            max_capacity: OPEN_FILES_MAX_CAPACITY,
            expire_time: OPEN_FILES_EXPIRE_TIME,
            renew_interval: LEASE_RENEW_INTERVAL,
        }
    }
}

impl RegistryConfig {
    /// Builds the configuration from the process environment.
    ///
    /// Loads a `.env` file if present, then applies `BLOBFS_*` overrides on
    /// top of the defaults. Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let max_capacity = parse_env(&lookup, ENV_MAX_CAPACITY).unwrap_or(defaults.max_capacity);
        Self {
            // An explicit hint is kept as-is so validate() can reject it
            initial_capacity: parse_env(&lookup, ENV_INIT_CAPACITY)
                .unwrap_or_else(|| defaults.initial_capacity.min(max_capacity)),
            max_capacity,
            expire_time: parse_env(&lookup, ENV_EXPIRE_SECS)
                .map(Duration::from_secs)
                .unwrap_or(defaults.expire_time),
            renew_interval: parse_env(&lookup, ENV_RENEW_INTERVAL_MS)
                .map(Duration::from_millis)
                .unwrap_or(defaults.renew_interval),
        }
    }

    /// Sets the maximum number of open handles.
    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self.initial_capacity = self.initial_capacity.min(max_capacity);
        self
    }

    /// Sets the map allocation hint.
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Sets the handle expiration window.
    pub fn with_expire_time(mut self, expire_time: Duration) -> Self {
        self.expire_time = expire_time;
        self
    }

    /// Sets the sleep between renewal cycles.
    pub fn with_renew_interval(mut self, renew_interval: Duration) -> Self {
        self.renew_interval = renew_interval;
        self
    }

    /// Rejects configurations the registry cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_capacity == 0 {
            return Err(BlobFsError::ConfigError("max_capacity must be positive".into()));
        }
        if self.initial_capacity > self.max_capacity {
            return Err(BlobFsError::ConfigError(format!(
                "initial_capacity {} exceeds max_capacity {}",
                self.initial_capacity, self.max_capacity
            )));
        }
        if self.expire_time.is_zero() {
            return Err(BlobFsError::ConfigError("expire_time must be positive".into()));
        }
        if self.renew_interval.is_zero() {
            return Err(BlobFsError::ConfigError("renew_interval must be positive".into()));
        }
        Ok(())
    }

    /// Cache settings derived from this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            initial_capacity: self.initial_capacity,
            max_entries: self.max_capacity,
            expire_time: self.expire_time,
        }
    }
}

fn parse_env<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring invalid configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = RegistryConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_capacity, OPEN_FILES_MAX_CAPACITY);
        assert_eq!(config.renew_interval, LEASE_RENEW_INTERVAL);
    }

    #[test]
    fn test_lookup_overrides() {
        let config = RegistryConfig::from_lookup(lookup_from(&[
            (ENV_INIT_CAPACITY, "8"),
            (ENV_MAX_CAPACITY, "64"),
            (ENV_EXPIRE_SECS, "30"),
            (ENV_RENEW_INTERVAL_MS, "250"),
        ]));

        assert_eq!(config.initial_capacity, 8);
        assert_eq!(config.max_capacity, 64);
        assert_eq!(config.expire_time, Duration::from_secs(30));
        assert_eq!(config.renew_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = RegistryConfig::from_lookup(lookup_from(&[
            (ENV_MAX_CAPACITY, "lots"),
            (ENV_RENEW_INTERVAL_MS, "-5"),
        ]));

        assert_eq!(config, RegistryConfig::default());
    }

    #[test]
    fn test_small_max_capacity_alone_is_valid() {
        let config = RegistryConfig::from_lookup(lookup_from(&[(ENV_MAX_CAPACITY, "100")]));

        assert_eq!(config.max_capacity, 100);
        assert_eq!(config.initial_capacity, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_hint_above_max_is_rejected() {
        let config = RegistryConfig::from_lookup(lookup_from(&[
            (ENV_INIT_CAPACITY, "500"),
            (ENV_MAX_CAPACITY, "100"),
        ]));

        assert_eq!(config.initial_capacity, 500);
        assert!(matches!(config.validate(), Err(BlobFsError::ConfigError(_))));
    }

    #[test]
    fn test_builder() {
        let config = RegistryConfig::default()
            .with_max_capacity(2)
            .with_expire_time(Duration::from_millis(100))
            .with_renew_interval(Duration::from_millis(20));

        assert_eq!(config.initial_capacity, 2);
        config.validate().unwrap();

        let cache = config.cache_config();
        assert_eq!(cache.max_entries, 2);
        assert_eq!(cache.expire_time, Duration::from_millis(100));
    }

    #[test_case(RegistryConfig::default().with_max_capacity(0) ; "zero capacity")]
    #[test_case(RegistryConfig::default().with_expire_time(Duration::ZERO) ; "zero expiry")]
    #[test_case(RegistryConfig::default().with_renew_interval(Duration::ZERO) ; "zero interval")]
    #[test_case(RegistryConfig::default().with_max_capacity(4).with_initial_capacity(5) ; "hint above max")]
    fn test_validate_rejects(config: RegistryConfig) {
        let err = config.validate().unwrap_err();
        assert!(matches!(err, BlobFsError::ConfigError(_)));
    }

    #[test]
    fn test_config_serializes() {
        let config = RegistryConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: RegistryConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
