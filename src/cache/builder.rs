//! Cache Builder Module
//!
//! Fluent construction for [`LruCache`] when the defaults of
//! [`LruCache::new`] are not enough (eviction callback, custom clock).

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Clock, EvictionCallback, LruCache, SystemClock};
use crate::error::Result;

// == Cache Builder ==
/// Builder for [`LruCache`].
///
/// # Example
/// ```
/// use std::time::Duration;
/// use lru_ttl_cache::cache::MockClock;
/// use lru_ttl_cache::LruCache;
///
/// let clock = MockClock::new();
/// let cache = LruCache::<u32, &str>::builder(16)
///     .default_ttl(Duration::from_secs(5))
///     .on_evict(|key, _value| println!("evicted {}", key))
///     .clock(clock.clone())
///     .build()
///     .unwrap();
///
/// cache.put(1, "one", None);
/// clock.advance(Duration::from_secs(5));
/// assert_eq!(cache.get(&1), None);
/// ```
pub struct CacheBuilder<K, V, C = SystemClock> {
    capacity: usize,
    default_ttl: Option<Duration>,
    on_evict: Option<EvictionCallback<K, V>>,
    clock: C,
}

impl<K, V> CacheBuilder<K, V, SystemClock> {
    /// Starts a builder for a cache of `capacity` entries using the system clock.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            default_ttl: None,
            on_evict: None,
            clock: SystemClock,
        }
    }
}

impl<K, V, C> CacheBuilder<K, V, C> {
    /// TTL applied to entries put without their own. Zero disables it.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Registers the eviction callback.
    pub fn on_evict<F>(mut self, on_evict: F) -> Self
    where
        F: Fn(K, V) + Send + Sync + 'static,
    {
        self.on_evict = Some(Arc::new(on_evict));
        self
    }

    /// Replaces the time source used for expiry.
    pub fn clock<C2: Clock>(self, clock: C2) -> CacheBuilder<K, V, C2> {
        CacheBuilder {
            capacity: self.capacity,
            default_ttl: self.default_ttl,
            on_evict: self.on_evict,
            clock,
        }
    }

    /// Builds the cache, failing with `InvalidCapacity` for a zero capacity.
    pub fn build(self) -> Result<LruCache<K, V, C>>
    where
        K: Hash + Eq + Clone,
        C: Clock,
    {
        LruCache::from_parts(self.capacity, self.default_ttl, self.on_evict, self.clock)
    }
}

impl<K, V, C: fmt::Debug> fmt::Debug for CacheBuilder<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("capacity", &self.capacity)
            .field("default_ttl", &self.default_ttl)
            .field("eviction_callback", &self.on_evict.is_some())
            .field("clock", &self.clock)
            .finish()
    }
}
