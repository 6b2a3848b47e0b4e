//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Environment variable holding the maximum entry count.
pub const CAPACITY_VAR: &str = "CACHE_CAPACITY";

/// Environment variable holding the default TTL in milliseconds.
pub const DEFAULT_TTL_VAR: &str = "CACHE_DEFAULT_TTL_MS";

const DEFAULT_CAPACITY: usize = 1000;
const DEFAULT_TTL_MS: u64 = 300_000;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Default TTL in milliseconds for entries without explicit TTL, 0 = never expire
    pub default_ttl_ms: u64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000, 0 disables)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Strict variant of [`CacheConfig::from_env`].
    ///
    /// A variable that is set but cannot be parsed is reported instead of
    /// being replaced by its default, and the result is validated.
    pub fn try_from_env() -> Result<Self> {
        Self::try_from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            capacity: lookup(CAPACITY_VAR)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_CAPACITY),
            default_ttl_ms: lookup(DEFAULT_TTL_VAR)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_TTL_MS),
        }
    }

    fn try_from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            capacity: parse_var(&lookup, CAPACITY_VAR)?.unwrap_or(DEFAULT_CAPACITY),
            default_ttl_ms: parse_var(&lookup, DEFAULT_TTL_VAR)?.unwrap_or(DEFAULT_TTL_MS),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration describes a usable cache.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::InvalidConfig(format!(
                "{} must be greater than zero",
                CAPACITY_VAR
            )));
        }
        Ok(())
    }

    /// Default TTL as a duration, `None` when entries never expire by default.
    pub fn default_ttl(&self) -> Option<Duration> {
        (self.default_ttl_ms > 0).then(|| Duration::from_millis(self.default_ttl_ms))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            default_ttl_ms: DEFAULT_TTL_MS,
        }
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            CacheError::InvalidConfig(format!("{} has unparsable value {:?}", name, raw))
        }),
    }
}
