//! TTL Cache - An in-process concurrent key-value cache
//!
//! Every entry carries an optional time-to-live. Expired entries are never
//! returned; they are removed on read, on demand, or by a background sweep
//! task that runs while the cache has a finite default TTL.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{CacheEntry, CacheStats, Ttl, TtlCache};
pub use config::Config;
pub use error::{CacheError, Result};
