//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::cache::{parse_duration, Ttl};

/// Default TTL applied when the environment does not set one
pub const DEFAULT_TTL: Ttl = Ttl::For(Duration::from_secs(300));

/// Default interval between background sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// TTL for entries stored with `Ttl::UseDefault`
    pub default_ttl: Ttl,
    /// Background sweep interval
    pub sweep_interval: Duration,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// Absent or unparseable values fall back to the defaults.
    ///
    /// # Environment Variables
    /// - `CACHE_DEFAULT_TTL` - `default`, `never`, seconds, or `150ms`/`30s`/`5m`/`2h` (default: 300s)
    /// - `CACHE_SWEEP_INTERVAL` - seconds or a duration with unit (default: 1s)
    pub fn from_env() -> Self {
        Self {
            default_ttl: read_env("CACHE_DEFAULT_TTL", DEFAULT_TTL, |v| v.parse()),
            sweep_interval: read_env("CACHE_SWEEP_INTERVAL", DEFAULT_SWEEP_INTERVAL, parse_duration),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

fn read_env<T, F>(name: &str, default: T, parse: F) -> T
where
    F: FnOnce(&str) -> crate::error::Result<T>,
{
    match env::var(name) {
        Ok(raw) => parse(&raw).unwrap_or_else(|e| {
            warn!("Ignoring {}: {}", name, e);
            default
        }),
        Err(_) => default,
    }
}
