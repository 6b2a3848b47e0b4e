//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and LRU eviction.

mod builder;
mod clock;
mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use builder::CacheBuilder;
pub use clock::{Clock, MockClock, SystemClock};
pub use entry::CacheEntry;
pub use lru::{Iter, LruList, NodeId};
pub use stats::CacheStats;
pub use store::{EvictionCallback, LruCache};

// == Public Constants ==
/// Upper bound on slots reserved up front; larger caches grow on demand.
pub const MAX_PREALLOCATED_ENTRIES: usize = 4096;
