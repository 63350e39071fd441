//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

use crate::cache::Ttl;

// == Cache Entry ==
/// A single cached value and its expiration policy.
///
/// Entries are immutable once built; an overwrite replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Never expires when set, regardless of `expires_at`
    pub persistent: bool,
    /// When the entry was stored
    pub created_at: Instant,
    /// Absolute deadline, None = no deadline
    pub expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry from an already resolved TTL.
    ///
    /// `Ttl::UseDefault` must be resolved by the caller; if it reaches here
    /// it is treated like `Ttl::Never`. A `Ttl::For` duration too large to
    /// add to the current `Instant` also leaves the entry without a deadline.
    pub fn new(value: V, ttl: Ttl, persistent: bool) -> Self {
        let now = Instant::now();
        let expires_at = match ttl {
            Ttl::For(d) if !persistent => now.checked_add(d),
            _ => None,
        };

        Self {
            value,
            persistent,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Persistent entries and entries without a deadline never expire. The
    /// comparison is strict: an entry is still live at its exact deadline.
    pub fn is_expired(&self) -> bool {
        if self.persistent {
            return false;
        }
        match self.expires_at {
            Some(deadline) => Instant::now() > deadline,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the remaining TTL, or None if the entry never expires.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` once the deadline has passed
    /// - `Some(remaining)` while the entry is live
    /// - `None` for persistent entries and entries without a deadline
    pub fn ttl_remaining(&self) -> Option<Duration> {
        if self.persistent {
            return None;
        }
        self.expires_at
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}
