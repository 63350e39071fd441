//! TTL Module
//!
//! Time-to-live requests as a tagged variant instead of magic durations.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};

// == Ttl ==
/// Expiration requested for an entry, or configured as a cache default.
///
/// A zero `For` duration means the same thing as `UseDefault`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Ttl {
    /// Use the cache's normalized default TTL
    #[default]
    UseDefault,
    /// Never expire
    Never,
    /// Expire once this duration has elapsed after the store
    For(Duration),
}

impl Ttl {
    // == Normalize ==
    /// Folds `For(Duration::ZERO)` into `UseDefault`.
    pub fn normalize(self) -> Self {
        match self {
            Ttl::For(d) if d.is_zero() => Ttl::UseDefault,
            other => other,
        }
    }

    // == Resolve ==
    /// Resolves `UseDefault` against the cache's default.
    ///
    /// The default must itself already be normalized, so the result is
    /// either `Never` or a positive `For`.
    pub fn resolve(self, default: Ttl) -> Self {
        match self.normalize() {
            Ttl::UseDefault => default,
            other => other,
        }
    }

    /// Returns true for a positive `For` duration.
    pub fn is_finite(&self) -> bool {
        matches!(self, Ttl::For(d) if !d.is_zero())
    }

    /// Returns the finite duration, if any.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Ttl::For(d) if !d.is_zero() => Some(*d),
            _ => None,
        }
    }
}

impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        Ttl::For(duration).normalize()
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ttl::UseDefault => write!(f, "default"),
            Ttl::Never => write!(f, "never"),
            Ttl::For(d) => write!(f, "{}ms", d.as_millis()),
        }
    }
}

impl FromStr for Ttl {
    type Err = CacheError;

    /// Parses `default`, `never`, a signed integer in seconds (`0` is the
    /// default, negative is never) or a duration with a unit suffix.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "default" => return Ok(Ttl::UseDefault),
            "never" => return Ok(Ttl::Never),
            _ => {}
        }

        if let Ok(secs) = trimmed.parse::<i64>() {
            return Ok(match secs {
                0 => Ttl::UseDefault,
                n if n < 0 => Ttl::Never,
                n => Ttl::For(Duration::from_secs(n as u64)),
            });
        }

        parse_duration(trimmed).map(Ttl::from)
    }
}

// == Duration Parsing ==
/// Parses a non-negative duration such as `150ms`, `30s`, `5m`, `2h`, or a
/// bare integer number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);

    let amount: u64 = digits
        .parse()
        .map_err(|_| CacheError::InvalidDuration(s.to_string()))?;

    let duration = match unit.trim() {
        "" | "s" => Duration::from_secs(amount),
        "ms" => Duration::from_millis(amount),
        "m" => Duration::from_secs(amount.saturating_mul(60)),
        "h" => Duration::from_secs(amount.saturating_mul(3600)),
        _ => return Err(CacheError::InvalidDuration(s.to_string())),
    };

    Ok(duration)
}
