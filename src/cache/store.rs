//! Cache Store Module
//!
//! Main cache engine combining a sharded concurrent map with TTL expiration
//! and an optional background sweep task.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, info};

use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheEntry, CacheStats, Ttl};
use crate::config::Config;
use crate::error::Result;
use crate::tasks::Sweeper;

// == Shared State ==
/// State reachable from both the cache handles and the sweep task.
///
/// The sweep task only holds this, never the owning `Inner`, so dropping the
/// last cache handle drops the sweeper and stops the task.
struct Shared<V> {
    /// Key-value storage
    entries: DashMap<String, Arc<CacheEntry<V>>>,
    /// Performance statistics
    stats: StatsRecorder,
}

impl<V> Shared<V> {
    fn new() -> Self {
        Self {
            entries: DashMap::new(),
            stats: StatsRecorder::default(),
        }
    }

    fn sweep(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            if entry.is_expired() {
                removed += 1;
                false
            } else {
                true
            }
        });
        self.stats.record_sweep(removed);
        removed
    }
}

struct Inner<V> {
    shared: Arc<Shared<V>>,
    /// Normalized default, never `Ttl::UseDefault`
    default_ttl: Ttl,
    sweeper: Option<Sweeper>,
}

// == TTL Cache ==
/// Concurrent key-value cache whose entries expire after a TTL.
///
/// Handles are cheap to clone and all share the same storage. Expired entries
/// are never returned by [`load`](Self::load); they are removed lazily on
/// read, by [`sweep_now`](Self::sweep_now), or by the background sweep task
/// that runs when the default TTL is finite.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use ttl_cache::{Ttl, TtlCache};
///
/// let cache = TtlCache::new(Ttl::UseDefault, Duration::ZERO);
/// cache.store("user:1", "alice".to_string(), Ttl::Never, false);
/// assert_eq!(cache.load("user:1").as_deref(), Some("alice"));
/// ```
pub struct TtlCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("default_ttl", &self.inner.default_ttl)
            .field("entries", &self.inner.shared.entries.len())
            .field("sweeper", &self.inner.sweeper)
            .finish()
    }
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a new cache with a default TTL and a sweep interval.
    ///
    /// A `Ttl::UseDefault` (or zero) default is normalized to `Ttl::Never`.
    /// The background sweep task starts only when the normalized default is a
    /// finite duration; a zero `sweep_interval` starts a task that never
    /// sweeps.
    ///
    /// # Panics
    /// Panics if a sweep task must start and no Tokio runtime is running. Use
    /// [`try_new`](Self::try_new) to get an error instead.
    pub fn new(default_ttl: Ttl, sweep_interval: Duration) -> Self {
        match Self::try_new(default_ttl, sweep_interval) {
            Ok(cache) => cache,
            Err(e) => panic!(
                "ttl_cache::TtlCache with a finite default TTL must be created \
                 inside a Tokio runtime: {}",
                e
            ),
        }
    }

    /// Fallible form of [`new`](Self::new).
    ///
    /// Returns `CacheError::RuntimeUnavailable` if a sweep task must start
    /// and no Tokio runtime is running.
    pub fn try_new(default_ttl: Ttl, sweep_interval: Duration) -> Result<Self> {
        let default_ttl = match default_ttl.normalize() {
            Ttl::UseDefault => Ttl::Never,
            other => other,
        };

        let shared = Arc::new(Shared::new());

        let sweeper = if default_ttl.is_finite() {
            let sweep_target = Arc::clone(&shared);
            Some(Sweeper::spawn(sweep_interval, move || sweep_target.sweep())?)
        } else {
            None
        };

        debug!(
            "Cache created: default_ttl={}, background_sweep={}",
            default_ttl,
            sweeper.is_some()
        );

        Ok(Self {
            inner: Arc::new(Inner {
                shared,
                default_ttl,
                sweeper,
            }),
        })
    }

    /// Creates a new cache from configuration.
    ///
    /// # Panics
    /// Same as [`new`](Self::new).
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.default_ttl, config.sweep_interval)
    }

    // == Store ==
    /// Stores a value, replacing any existing entry for the key.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - `UseDefault` resolves to the cache default, `Never` never expires
    /// * `persistent` - When true the entry never expires regardless of `ttl`
    pub fn store(&self, key: impl Into<String>, value: V, ttl: Ttl, persistent: bool) {
        let ttl = ttl.resolve(self.inner.default_ttl);
        let entry = CacheEntry::new(value, ttl, persistent);
        self.shared().entries.insert(key.into(), Arc::new(entry));
    }

    // == Load ==
    /// Retrieves a value by key.
    ///
    /// Returns None when the key is absent or expired. An expired entry is
    /// removed as a side effect.
    pub fn load(&self, key: &str) -> Option<V> {
        self.load_entry(key).map(|entry| entry.value.clone())
    }

    /// Retrieves a value along with its remaining TTL.
    ///
    /// The TTL is None for entries that never expire.
    pub fn load_with_ttl(&self, key: &str) -> Option<(V, Option<Duration>)> {
        self.load_entry(key)
            .map(|entry| (entry.value.clone(), entry.ttl_remaining()))
    }

    fn load_entry(&self, key: &str) -> Option<Arc<CacheEntry<V>>> {
        let shared = self.shared();

        let entry = match shared.entries.get(key) {
            Some(found) => Arc::clone(found.value()),
            None => {
                shared.stats.record_miss();
                return None;
            }
        };

        if entry.is_expired() {
            // Re-check under the shard lock so a concurrent overwrite survives
            if shared
                .entries
                .remove_if(key, |_, current| current.is_expired())
                .is_some()
            {
                shared.stats.record_expiration();
            }
            shared.stats.record_miss();
            return None;
        }

        shared.stats.record_hit();
        Some(entry)
    }

    // == Delete ==
    /// Removes an entry by key.
    ///
    /// Returns true if an entry was removed; deleting an absent key is a no-op.
    pub fn delete(&self, key: &str) -> bool {
        self.shared().entries.remove(key).is_some()
    }

    // == Range ==
    /// Calls `visit` for each stored entry until it returns false.
    ///
    /// Entries that have expired but not yet been removed are included;
    /// filtering is up to the caller. Order is unspecified. The visitor runs
    /// without any map lock held, so it may store or delete on this cache.
    /// Mutations made concurrently may or may not be observed.
    pub fn range<F>(&self, mut visit: F)
    where
        F: FnMut(&str, &V) -> bool,
    {
        let entries: Vec<(String, Arc<CacheEntry<V>>)> = self
            .shared()
            .entries
            .iter()
            .map(|item| (item.key().clone(), Arc::clone(item.value())))
            .collect();

        for (key, entry) in entries {
            if !visit(&key, &entry.value) {
                break;
            }
        }
    }

    // == Sweep ==
    /// Removes every entry that has expired.
    ///
    /// Returns the number of entries removed. Persistent entries are never
    /// removed.
    pub fn sweep_now(&self) -> usize {
        let removed = self.shared().sweep();
        debug!("Manual sweep: removed {} expired entries", removed);
        removed
    }

    // == Close ==
    /// Stops the background sweep task.
    ///
    /// Safe to call any number of times; returns true only for the call that
    /// stopped a running task. The cache stays usable afterwards, with
    /// expiration handled lazily and by `sweep_now`. Dropping the last handle
    /// has the same effect.
    pub fn close(&self) -> bool {
        let stopped = self
            .inner
            .sweeper
            .as_ref()
            .map(Sweeper::stop)
            .unwrap_or(false);
        if stopped {
            info!("Cache closed, background sweep stopped");
        }
        stopped
    }

    /// Returns true while a background sweep task is running.
    pub fn is_sweeping(&self) -> bool {
        self.inner
            .sweeper
            .as_ref()
            .map(Sweeper::is_running)
            .unwrap_or(false)
    }

    /// Returns the normalized default TTL (`Never` or a finite duration).
    pub fn default_ttl(&self) -> Ttl {
        self.inner.default_ttl
    }

    // == Inspection ==
    /// Returns the number of stored entries, including expired ones not yet removed.
    pub fn len(&self) -> usize {
        self.shared().entries.len()
    }

    /// Returns true if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.shared().entries.is_empty()
    }

    /// Returns true if the key is physically present, expired or not.
    pub fn contains_key(&self, key: &str) -> bool {
        self.shared().entries.contains_key(key)
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        let shared = self.shared();
        shared.stats.snapshot(shared.entries.len())
    }

    fn shared(&self) -> &Shared<V> {
        &self.inner.shared
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn never_cache() -> TtlCache<String> {
        TtlCache::new(Ttl::UseDefault, Duration::ZERO)
    }

    #[test]
    fn test_store_new() {
        let cache = never_cache();
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert!(!cache.is_sweeping());
    }

    #[test]
    fn test_store_and_load() {
        let cache = never_cache();

        cache.store("key1", "value1".to_string(), Ttl::UseDefault, false);

        assert_eq!(cache.load("key1"), Some("value1".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_load_nonexistent() {
        let cache = never_cache();
        assert_eq!(cache.load("nonexistent"), None);
    }

    #[test]
    fn test_use_default_normalizes_to_never() {
        let cache = never_cache();
        assert_eq!(cache.default_ttl(), Ttl::Never);

        cache.store("key1", "value1".to_string(), Ttl::UseDefault, false);
        let (value, ttl) = cache.load_with_ttl("key1").unwrap();

        assert_eq!(value, "value1");
        assert!(ttl.is_none(), "Entry should never expire");
    }

    #[test]
    fn test_zero_default_normalizes_to_never() {
        let cache: TtlCache<i32> = TtlCache::new(Ttl::For(Duration::ZERO), Duration::from_millis(10));
        assert_eq!(cache.default_ttl(), Ttl::Never);
        assert!(!cache.is_sweeping());
    }

    #[test]
    fn test_never_default_starts_no_sweeper() {
        let cache: TtlCache<i32> = TtlCache::new(Ttl::Never, Duration::from_millis(10));
        assert_eq!(cache.default_ttl(), Ttl::Never);
        assert!(!cache.is_sweeping());
        assert!(!cache.close());
    }

    #[test]
    fn test_finite_default_outside_runtime() {
        let result: Result<TtlCache<i32>> =
            TtlCache::try_new(Ttl::For(Duration::from_secs(1)), Duration::from_secs(1));
        assert!(matches!(
            result,
            Err(crate::error::CacheError::RuntimeUnavailable(_))
        ));
    }

    #[test]
    fn test_delete() {
        let cache = never_cache();

        cache.store("key1", "value1".to_string(), Ttl::Never, false);
        assert!(cache.delete("key1"));

        assert!(cache.is_empty());
        assert_eq!(cache.load("key1"), None);
    }

    #[test]
    fn test_delete_nonexistent() {
        let cache = never_cache();
        cache.store("key1", "value1".to_string(), Ttl::Never, false);

        assert!(!cache.delete("nonexistent"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_overwrite() {
        let cache = never_cache();

        cache.store("key1", "value1".to_string(), Ttl::For(Duration::from_millis(20)), false);
        cache.store("key1", "value2".to_string(), Ttl::Never, false);

        assert_eq!(cache.len(), 1);
        sleep(Duration::from_millis(40));
        assert_eq!(cache.load("key1"), Some("value2".to_string()));
    }

    #[test]
    fn test_lazy_expiration_removes_entry() {
        let cache = never_cache();

        cache.store("key1", "value1".to_string(), Ttl::For(Duration::from_millis(20)), false);
        assert_eq!(cache.load("key1"), Some("value1".to_string()));

        sleep(Duration::from_millis(40));

        assert!(cache.contains_key("key1"), "No sweeper, so still present");
        assert_eq!(cache.load("key1"), None);
        assert!(!cache.contains_key("key1"), "Load should remove the expired entry");
    }

    #[test]
    fn test_persistent_never_expires() {
        let cache = never_cache();

        cache.store("key1", "value1".to_string(), Ttl::For(Duration::from_millis(10)), true);
        sleep(Duration::from_millis(30));

        assert_eq!(cache.sweep_now(), 0);
        assert_eq!(cache.load("key1"), Some("value1".to_string()));
    }

    #[test]
    fn test_sweep_now() {
        let cache = never_cache();

        cache.store("short", "a".to_string(), Ttl::For(Duration::from_millis(10)), false);
        cache.store("long", "b".to_string(), Ttl::For(Duration::from_secs(60)), false);
        cache.store("never", "c".to_string(), Ttl::Never, false);
        cache.store("pinned", "d".to_string(), Ttl::For(Duration::from_millis(10)), true);

        sleep(Duration::from_millis(30));

        assert_eq!(cache.sweep_now(), 1);
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains_key("short"));
        assert_eq!(cache.sweep_now(), 0, "Second sweep should find nothing");
    }

    #[test]
    fn test_range_visits_all_including_expired() {
        let cache = never_cache();

        cache.store("a", "1".to_string(), Ttl::Never, false);
        cache.store("b", "2".to_string(), Ttl::Never, false);
        cache.store("c", "3".to_string(), Ttl::For(Duration::from_millis(1)), false);
        sleep(Duration::from_millis(10));

        let mut seen = Vec::new();
        cache.range(|key, value| {
            seen.push((key.to_string(), value.clone()));
            true
        });
        seen.sort();

        assert_eq!(
            seen,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_range_stops_early() {
        let cache = never_cache();
        for i in 0..10 {
            cache.store(format!("key{}", i), i.to_string(), Ttl::Never, false);
        }

        let mut visits = 0;
        cache.range(|_, _| {
            visits += 1;
            visits < 3
        });

        assert_eq!(visits, 3);
    }

    #[test]
    fn test_range_visitor_can_mutate() {
        let cache = never_cache();
        cache.store("a", "1".to_string(), Ttl::Never, false);
        cache.store("b", "2".to_string(), Ttl::Never, false);

        cache.range(|key, _| {
            cache.delete(key);
            true
        });

        assert!(cache.is_empty());
    }

    #[test]
    fn test_clones_share_storage() {
        let cache = never_cache();
        let other = cache.clone();

        other.store("key1", "value1".to_string(), Ttl::Never, false);
        assert_eq!(cache.load("key1"), Some("value1".to_string()));
    }

    #[test]
    fn test_stats() {
        let cache = never_cache();

        cache.store("key1", "value1".to_string(), Ttl::Never, false);
        cache.store("key2", "value2".to_string(), Ttl::For(Duration::from_millis(1)), false);
        sleep(Duration::from_millis(10));

        cache.load("key1"); // hit
        cache.load("nonexistent"); // miss
        cache.load("key2"); // miss, expired
        cache.sweep_now();

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.sweeps, 1);
        assert_eq!(stats.swept, 0);
        assert_eq!(stats.total_entries, 1);
    }

    #[tokio::test]
    async fn test_finite_default_starts_sweeper() {
        let cache: TtlCache<i32> =
            TtlCache::new(Ttl::For(Duration::from_secs(60)), Duration::from_millis(10));

        assert_eq!(cache.default_ttl(), Ttl::For(Duration::from_secs(60)));
        assert!(cache.is_sweeping());

        assert!(cache.close());
        assert!(!cache.close(), "Second close should be a no-op");
        assert!(!cache.is_sweeping());
    }

    #[tokio::test]
    async fn test_store_uses_finite_default() {
        let cache: TtlCache<i32> =
            TtlCache::new(Ttl::For(Duration::from_secs(60)), Duration::from_secs(1));

        cache.store("key1", 1, Ttl::UseDefault, false);
        let (_, ttl) = cache.load_with_ttl("key1").unwrap();
        let ttl = ttl.unwrap();

        assert!(ttl <= Duration::from_secs(60));
        assert!(ttl >= Duration::from_secs(59));
        cache.close();
    }

    #[tokio::test]
    async fn test_dropping_last_handle_stops_sweeper() {
        let cache: TtlCache<i32> =
            TtlCache::new(Ttl::For(Duration::from_millis(20)), Duration::from_millis(10));
        let shared = Arc::downgrade(&cache.inner.shared);
        let other = cache.clone();

        drop(other);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(shared.upgrade().is_some(), "A live handle keeps the task running");

        drop(cache);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(
            shared.upgrade().is_none(),
            "Sweep task should release the map once the last handle is dropped"
        );
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let cache = never_cache();

        cache.store("key1", "value1".to_string(), Ttl::For(Duration::MAX), false);

        assert_eq!(cache.sweep_now(), 0);
        assert_eq!(
            cache.load_with_ttl("key1"),
            Some(("value1".to_string(), None))
        );
    }
}
