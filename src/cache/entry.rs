//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// Represents a single cache entry with its key, value and expiry metadata.
///
/// The key is kept alongside the value so that an entry reached through the
/// recency list (e.g. the LRU victim) can be removed from the index too.
#[derive(Debug, Clone)]
pub struct CacheEntry<K, V> {
    /// Key the entry is indexed under
    pub key: K,
    /// The stored value
    pub value: V,
    /// Instant the entry was created or last refreshed
    pub created_at: Instant,
    /// Absolute expiry instant, None = no expiration
    pub expires_at: Option<Instant>,
}

impl<K, V> CacheEntry<K, V> {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    ///
    /// # Arguments
    /// * `key` - The key the entry belongs to
    /// * `value` - The value to store
    /// * `now` - Current instant from the cache's clock
    /// * `ttl` - Optional time-to-live
    pub fn new(key: K, value: V, now: Instant, ttl: Option<Duration>) -> Self {
        Self {
            key,
            value,
            created_at: now,
            expires_at: expiry_from(now, ttl),
        }
    }

    // == Refresh ==
    /// Replaces the value and restarts the TTL in place.
    pub fn refresh(&mut self, value: V, now: Instant, ttl: Option<Duration>) {
        self.value = value;
        self.created_at = now;
        self.expires_at = expiry_from(now, ttl);
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: an entry is expired once `now >= expires_at`, so
    /// an entry with TTL `d` is absent at exactly `d` after insertion.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL at `now`, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the entry has expired
    /// - `Some(remaining)` if the entry has TTL and hasn't expired
    /// - `None` if the entry never expires
    pub fn ttl_remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(now))
    }

    /// Consumes the entry, yielding the pair handed to eviction callbacks.
    pub fn into_pair(self) -> (K, V) {
        (self.key, self.value)
    }
}

/// Absolute expiry for a TTL; zero or missing TTL means never.
fn expiry_from(now: Instant, ttl: Option<Duration>) -> Option<Instant> {
    ttl.filter(|ttl| !ttl.is_zero())
        .and_then(|ttl| now.checked_add(ttl))
}
