//! Cache Module
//!
//! Provides an in-memory concurrent cache with TTL expiration and
//! background sweeping.

mod entry;
mod stats;
mod store;
mod ttl;


// Re-export public types
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::TtlCache;
pub use ttl::{parse_duration, Ttl};
