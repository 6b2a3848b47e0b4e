//! Cache Store Module
//!
//! Main cache engine combining a key index with the LRU list and lazy TTL
//! expiration, guarded by a single reader-writer lock.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tracing::{debug, trace};

use crate::cache::{
    CacheBuilder, CacheEntry, CacheStats, Clock, LruList, NodeId, SystemClock,
    MAX_PREALLOCATED_ENTRIES,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

/// Callback receiving every `(key, value)` pair that leaves the cache through
/// capacity eviction, lazy expiry, [`LruCache::purge_expired`] or
/// [`LruCache::clear`]. It is never invoked by [`LruCache::remove`].
///
/// Callbacks run on the calling thread after the cache lock has been
/// released, so a callback may call back into the same cache. Another thread
/// can observe the entry as gone before its callback has run.
pub type EvictionCallback<K, V> = Arc<dyn Fn(K, V) + Send + Sync>;

/// State guarded by the cache lock. The order and the index always hold
/// the same set of entries.
struct Inner<K, V> {
    order: LruList<CacheEntry<K, V>>,
    index: HashMap<K, NodeId>,
    stats: CacheStats,
}

impl<K, V> Inner<K, V>
where
    K: Hash + Eq,
{
    fn remove_key<Q>(&mut self, key: &Q) -> Option<CacheEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.index.remove(key)?;
        self.order.remove(id)
    }

    /// Unlinks the least recently used entry.
    fn evict_oldest(&mut self) -> Option<CacheEntry<K, V>> {
        let entry = self.order.pop_back()?;
        self.index.remove(&entry.key);
        self.stats.record_eviction();
        Some(entry)
    }

    fn sync_len(&mut self) {
        self.stats.set_total_entries(self.index.len());
    }
}

// == LRU Cache ==
/// Thread-safe fixed-capacity cache with LRU eviction and per-entry TTL.
///
/// Expiry is lazy: a stale entry keeps its slot until `get`, `remove`,
/// `clear` or `purge_expired` touches it.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use lru_ttl_cache::LruCache;
///
/// let cache = LruCache::new(2, Some(Duration::from_secs(60))).unwrap();
/// cache.put("a", 1, None);
/// cache.put("b", 2, None);
/// assert_eq!(cache.get("a"), Some(1));
///
/// // "b" is now least recently used
/// assert!(cache.put("c", 3, None));
/// assert_eq!(cache.keys(), vec!["a", "c"]);
/// ```
pub struct LruCache<K, V, C = SystemClock> {
    inner: RwLock<Inner<K, V>>,
    capacity: usize,
    default_ttl: Option<Duration>,
    on_evict: Option<EvictionCallback<K, V>>,
    clock: C,
}

impl<K, V> LruCache<K, V, SystemClock>
where
    K: Hash + Eq + Clone,
{
    // == Constructors ==
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries, must be positive
    /// * `default_ttl` - TTL for entries put without one; `None` or zero never expires
    pub fn new(capacity: usize, default_ttl: Option<Duration>) -> Result<Self> {
        Self::from_parts(capacity, default_ttl, None, SystemClock)
    }

    /// Creates a cache that reports evicted pairs to `on_evict`.
    pub fn with_eviction_callback<F>(
        capacity: usize,
        default_ttl: Option<Duration>,
        on_evict: F,
    ) -> Result<Self>
    where
        F: Fn(K, V) + Send + Sync + 'static,
    {
        Self::from_parts(capacity, default_ttl, Some(Arc::new(on_evict)), SystemClock)
    }

    /// Creates a cache from loaded configuration.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::new(config.capacity, config.default_ttl())
    }

    /// Starts a [`CacheBuilder`] for the given capacity.
    pub fn builder(capacity: usize) -> CacheBuilder<K, V> {
        CacheBuilder::new(capacity)
    }
}

impl<K, V, C> LruCache<K, V, C>
where
    K: Hash + Eq + Clone,
    C: Clock,
{
    pub(crate) fn from_parts(
        capacity: usize,
        default_ttl: Option<Duration>,
        on_evict: Option<EvictionCallback<K, V>>,
        clock: C,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }
        let default_ttl = default_ttl.filter(|ttl| !ttl.is_zero());
        debug!(
            "Cache created: capacity={}, default_ttl={:?}, eviction_callback={}",
            capacity,
            default_ttl,
            on_evict.is_some()
        );

        // One extra slot: a new entry is linked before the LRU victim is evicted
        let reserved = capacity.saturating_add(1).min(MAX_PREALLOCATED_ENTRIES);

        Ok(Self {
            inner: RwLock::new(Inner {
                order: LruList::with_capacity(reserved),
                index: HashMap::with_capacity(reserved),
                stats: CacheStats::new(),
            }),
            capacity,
            default_ttl,
            on_evict,
            clock,
        })
    }

    // == Put ==
    /// Stores a key-value pair.
    ///
    /// If the key already exists its value and TTL are replaced in place and
    /// it becomes most recently used. If a new key pushes the cache over
    /// capacity, the least recently used entry is evicted.
    ///
    /// # Arguments
    /// * `ttl` - Overrides the default TTL when positive
    ///
    /// # Returns
    /// `true` if an entry was evicted to make room.
    pub fn put(&self, key: K, value: V, ttl: Option<Duration>) -> bool {
        let ttl = ttl.filter(|ttl| !ttl.is_zero()).or(self.default_ttl);
        let now = self.clock.now();

        let evicted = {
            let mut guard = self.write();
            let inner = &mut *guard;

            if let Some(&id) = inner.index.get(&key) {
                if let Some(entry) = inner.order.get_mut(id) {
                    entry.refresh(value, now, ttl);
                }
                inner.order.move_to_front(id);
                return false;
            }

            let id = inner
                .order
                .push_front(CacheEntry::new(key.clone(), value, now, ttl));
            inner.index.insert(key, id);

            let evicted = if inner.order.len() > self.capacity {
                inner.evict_oldest()
            } else {
                None
            };
            inner.sync_len();
            evicted
        };

        match evicted {
            Some(entry) => {
                debug!("LRU eviction: cache over capacity {}", self.capacity);
                self.notify(Some(entry.into_pair()));
                true
            }
            None => false,
        }
    }

    // == Get ==
    /// Retrieves a value by key and marks it most recently used.
    ///
    /// An expired entry is removed, reported to the eviction callback, and
    /// `None` is returned.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let now = self.clock.now();

        let expired = {
            let mut guard = self.write();
            let inner = &mut *guard;

            let Some(&id) = inner.index.get(key) else {
                inner.stats.record_miss();
                trace!("Cache miss");
                return None;
            };

            let is_expired = inner.order.get(id).map_or(true, |entry| entry.is_expired(now));
            if !is_expired {
                inner.order.move_to_front(id);
                inner.stats.record_hit();
                trace!("Cache hit");
                return inner.order.get(id).map(|entry| entry.value.clone());
            }

            let entry = inner.remove_key(key);
            inner.stats.record_miss();
            inner.stats.record_expirations(1);
            inner.sync_len();
            entry
        };

        debug!("Lazy expiry: removed stale entry on access");
        self.notify(expired.map(CacheEntry::into_pair));
        None
    }

    // == Peek ==
    /// Returns a live value without touching recency or statistics.
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let now = self.clock.now();
        let inner = self.read();
        inner
            .index
            .get(key)
            .and_then(|&id| inner.order.get(id))
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone())
    }

    // == Contains ==
    /// Checks whether a live entry exists, without altering recency.
    ///
    /// An expired entry reports `false` but is left in place; the next
    /// `get`, `remove`, `clear` or `purge_expired` reclaims its slot.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        let inner = self.read();
        inner
            .index
            .get(key)
            .and_then(|&id| inner.order.get(id))
            .is_some_and(|entry| !entry.is_expired(now))
    }

    // == TTL Remaining ==
    /// Returns the remaining TTL of a live entry.
    ///
    /// # Returns
    /// - `None` if the key is absent or expired
    /// - `Some(None)` if the entry never expires
    /// - `Some(Some(remaining))` otherwise
    pub fn ttl_remaining<Q>(&self, key: &Q) -> Option<Option<Duration>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        let inner = self.read();
        inner
            .index
            .get(key)
            .and_then(|&id| inner.order.get(id))
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.ttl_remaining(now))
    }

    // == Remove ==
    /// Removes an entry by key. The eviction callback is not invoked since
    /// the caller chose to discard the value.
    ///
    /// # Returns
    /// `true` if the key was present.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = {
            let mut inner = self.write();
            let removed = inner.remove_key(key);
            inner.sync_len();
            removed
        };
        removed.is_some()
    }

    // == Keys ==
    /// Returns all keys from least to most recently used.
    ///
    /// Expired entries that have not been touched yet are included.
    pub fn keys(&self) -> Vec<K> {
        self.read()
            .order
            .iter_lru()
            .map(|entry| entry.key.clone())
            .collect()
    }

    // == Length ==
    /// Returns the current number of entries, stale ones included.
    pub fn len(&self) -> usize {
        self.read().index.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.read().index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    // == Clear ==
    /// Removes every entry, reporting each to the eviction callback from
    /// least to most recently used.
    pub fn clear(&self) {
        let drained = {
            let mut guard = self.write();
            let inner = &mut *guard;
            inner.index.clear();
            let drained = inner.order.drain_lru();
            inner.sync_len();
            drained
        };

        debug!("Cache cleared: dropped {} entries", drained.len());
        self.notify(drained.into_iter().map(CacheEntry::into_pair));
    }

    /// Alias for [`LruCache::clear`].
    pub fn flush(&self) {
        self.clear();
    }

    // == Purge Expired ==
    /// Removes all expired entries and reports them to the eviction callback.
    ///
    /// This only runs when called; the cache never sweeps on its own.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();

        let expired = {
            let mut guard = self.write();
            let inner = &mut *guard;
            let expired_keys: Vec<K> = inner
                .order
                .iter_lru()
                .filter(|entry| entry.is_expired(now))
                .map(|entry| entry.key.clone())
                .collect();

            let expired: Vec<CacheEntry<K, V>> = expired_keys
                .iter()
                .filter_map(|key| inner.remove_key(key))
                .collect();
            inner.stats.record_expirations(expired.len());
            inner.sync_len();
            expired
        };

        let count = expired.len();
        if count > 0 {
            debug!("TTL purge: removed {} expired entries", count);
        }
        self.notify(expired.into_iter().map(CacheEntry::into_pair));
        count
    }

    // == Stats ==
    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.read();
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.index.len());
        stats
    }

    // == Lock Helpers ==
    // Callbacks never run under the lock, so poisoning can only come from a
    // panic inside the cache itself; the state is still consistent then.
    fn read(&self) -> RwLockReadGuard<'_, Inner<K, V>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner<K, V>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called with the lock released.
    fn notify<I>(&self, evicted: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        if let Some(on_evict) = &self.on_evict {
            for (key, value) in evicted {
                on_evict(key, value);
            }
        }
    }
}

impl<K, V, C> fmt::Debug for LruCache<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .index
            .len();
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity)
            .field("len", &len)
            .field("default_ttl", &self.default_ttl)
            .field("eviction_callback", &self.on_evict.is_some())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MockClock;
    use std::sync::Mutex;

    type Evicted = Arc<Mutex<Vec<(&'static str, i32)>>>;

    fn mock_cache(
        capacity: usize,
        default_ttl: Option<Duration>,
    ) -> (LruCache<&'static str, i32, MockClock>, MockClock, Evicted) {
        let clock = MockClock::new();
        let evicted: Evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = evicted.clone();
        let mut builder = LruCache::<&'static str, i32>::builder(capacity)
            .clock(clock.clone())
            .on_evict(move |k, v| sink.lock().unwrap().push((k, v)));
        if let Some(ttl) = default_ttl {
            builder = builder.default_ttl(ttl);
        }
        (builder.build().unwrap(), clock, evicted)
    }

    #[test]
    fn test_store_new() {
        let cache: LruCache<String, String> = LruCache::new(100, None).unwrap();
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 100);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result: Result<LruCache<String, String>> = LruCache::new(0, None);
        assert_eq!(result.unwrap_err(), CacheError::InvalidCapacity(0));
    }

    #[test]
    fn test_zero_default_ttl_is_no_ttl() {
        let cache: LruCache<u8, u8> = LruCache::new(1, Some(Duration::ZERO)).unwrap();
        assert_eq!(cache.default_ttl(), None);
    }

    #[test]
    fn test_store_put_and_get() {
        let (cache, _, _) = mock_cache(100, None);

        assert!(!cache.put("key1", 1, None));
        assert_eq!(cache.get("key1"), Some(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let (cache, _, _) = mock_cache(100, None);
        assert_eq!(cache.get("nonexistent"), None);
    }

    #[test]
    fn test_store_remove() {
        let (cache, _, evicted) = mock_cache(100, None);

        cache.put("key1", 1, None);
        assert!(cache.remove("key1"));
        assert!(!cache.remove("key1"));

        assert!(cache.is_empty());
        assert_eq!(cache.get("key1"), None);
        assert!(evicted.lock().unwrap().is_empty(), "remove must not fire callback");
    }

    #[test]
    fn test_store_overwrite_in_place() {
        let (cache, _, evicted) = mock_cache(2, None);

        cache.put("key1", 1, None);
        cache.put("key2", 2, None);
        assert!(!cache.put("key1", 10, None), "update never evicts");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.keys(), vec!["key2", "key1"]);
        assert_eq!(cache.get("key1"), Some(10));
        assert!(evicted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_store_lru_eviction() {
        let (cache, _, evicted) = mock_cache(3, None);

        cache.put("key1", 1, None);
        cache.put("key2", 2, None);
        cache.put("key3", 3, None);

        // Cache is full, adding key4 should evict key1 (oldest)
        assert!(cache.put("key4", 4, None));

        assert_eq!(cache.len(), 3);
        assert_eq!(*evicted.lock().unwrap(), vec![("key1", 1)]);
        assert_eq!(cache.get("key1"), None);
        assert_eq!(cache.keys(), vec!["key2", "key3", "key4"]);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let (cache, _, _) = mock_cache(3, None);

        cache.put("key1", 1, None);
        cache.put("key2", 2, None);
        cache.put("key3", 3, None);

        // Access key1 to make it most recently used
        cache.get("key1");

        // Adding key4 should evict key2 (now oldest)
        cache.put("key4", 4, None);

        assert!(cache.contains("key1"));
        assert!(!cache.contains("key2"));
    }

    #[test]
    fn test_contains_does_not_touch() {
        let (cache, _, evicted) = mock_cache(2, None);

        cache.put("old", 1, None);
        cache.put("new", 2, None);
        assert!(cache.contains("old"));
        assert_eq!(cache.peek("old"), Some(1));

        cache.put("newest", 3, None);
        assert_eq!(*evicted.lock().unwrap(), vec![("old", 1)]);
    }

    #[test]
    fn test_ttl_expiration_on_get() {
        let (cache, clock, evicted) = mock_cache(100, None);

        cache.put("key1", 1, Some(Duration::from_secs(1)));
        assert_eq!(cache.get("key1"), Some(1));

        clock.advance(Duration::from_secs(1));

        // Expired but not yet touched: still occupies a slot
        assert!(!cache.contains("key1"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.keys(), vec!["key1"]);

        assert_eq!(cache.get("key1"), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(*evicted.lock().unwrap(), vec![("key1", 1)]);

        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.evictions, 0);
    }

    #[test]
    fn test_default_ttl_and_override() {
        let (cache, clock, _) = mock_cache(100, Some(Duration::from_secs(5)));

        cache.put("default", 1, None);
        cache.put("zero_falls_back", 2, Some(Duration::ZERO));
        cache.put("override", 3, Some(Duration::from_secs(10)));

        clock.advance(Duration::from_secs(5));

        assert!(!cache.contains("default"));
        assert!(!cache.contains("zero_falls_back"));
        assert!(cache.contains("override"));
    }

    #[test]
    fn test_no_ttl_never_expires() {
        let (cache, clock, _) = mock_cache(100, None);

        cache.put("forever", 1, None);
        clock.advance(Duration::from_secs(365 * 24 * 3600));

        assert_eq!(cache.get("forever"), Some(1));
        assert_eq!(cache.ttl_remaining("forever"), Some(None));
    }

    #[test]
    fn test_put_refreshes_ttl() {
        let (cache, clock, _) = mock_cache(100, None);

        cache.put("key", 1, Some(Duration::from_secs(2)));
        clock.advance(Duration::from_secs(1));
        cache.put("key", 2, Some(Duration::from_secs(2)));
        clock.advance(Duration::from_secs(1));

        assert_eq!(
            cache.ttl_remaining("key"),
            Some(Some(Duration::from_secs(1)))
        );
        assert_eq!(cache.get("key"), Some(2));
    }

    #[test]
    fn test_ttl_remaining_absent_or_expired() {
        let (cache, clock, _) = mock_cache(100, None);

        assert_eq!(cache.ttl_remaining("missing"), None);
        cache.put("key", 1, Some(Duration::from_secs(1)));
        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.ttl_remaining("key"), None);
        assert_eq!(cache.peek("key"), None);
    }

    #[test]
    fn test_clear_fires_callback_for_every_entry() {
        let (cache, _, evicted) = mock_cache(10, None);

        cache.put("a", 1, None);
        cache.put("b", 2, None);
        cache.put("c", 3, None);
        cache.get("a");

        cache.clear();

        assert_eq!(cache.len(), 0);
        assert!(cache.keys().is_empty());
        assert_eq!(
            *evicted.lock().unwrap(),
            vec![("b", 2), ("c", 3), ("a", 1)]
        );
        for key in ["a", "b", "c"] {
            assert_eq!(cache.get(key), None);
        }
    }

    #[test]
    fn test_flush_is_clear() {
        let (cache, _, evicted) = mock_cache(10, None);

        cache.put("a", 1, None);
        cache.flush();

        assert!(cache.is_empty());
        assert_eq!(evicted.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_purge_expired() {
        let (cache, clock, evicted) = mock_cache(100, None);

        cache.put("short", 1, Some(Duration::from_secs(1)));
        cache.put("long", 2, Some(Duration::from_secs(10)));
        cache.put("forever", 3, None);

        clock.advance(Duration::from_secs(2));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.keys(), vec!["long", "forever"]);
        assert_eq!(*evicted.lock().unwrap(), vec![("short", 1)]);
        assert_eq!(cache.purge_expired(), 0);
    }

    #[test]
    fn test_store_stats() {
        let (cache, _, _) = mock_cache(1, None);

        cache.put("key1", 1, None);
        cache.get("key1"); // hit
        cache.get("nonexistent"); // miss
        cache.put("key2", 2, None); // eviction

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_string_keys_borrowed_lookup() {
        let cache: LruCache<String, u32> = LruCache::new(4, None).unwrap();

        cache.put("alpha".to_string(), 1, None);
        assert_eq!(cache.get("alpha"), Some(1));
        assert!(cache.contains("alpha"));
        assert!(cache.remove("alpha"));
    }

    #[test]
    fn test_from_config() {
        let config = CacheConfig {
            capacity: 2,
            default_ttl_ms: 0,
        };
        let cache: LruCache<u32, u32> = LruCache::from_config(&config).unwrap();
        assert_eq!(cache.capacity(), 2);
        assert_eq!(cache.default_ttl(), None);

        let bad = CacheConfig {
            capacity: 0,
            default_ttl_ms: 0,
        };
        assert!(LruCache::<u32, u32>::from_config(&bad).is_err());
    }

    #[test]
    fn test_debug_output() {
        let cache: LruCache<u32, u32> = LruCache::new(3, None).unwrap();
        cache.put(1, 1, None);
        let debug = format!("{:?}", cache);
        assert!(debug.contains("capacity: 3"));
        assert!(debug.contains("len: 1"));
    }
}
