//! LRU TTL Cache - A thread-safe in-memory cache
//!
//! Bounds its size with least-recently-used eviction and expires entries
//! lazily after a per-entry time-to-live.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheBuilder, CacheStats, Clock, LruCache, MockClock, SystemClock};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
