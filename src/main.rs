//! LRU TTL Cache - demo driver
//!
//! Fills a cache built from environment configuration past its capacity,
//! exercises lookups and removals, and prints the resulting statistics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lru_ttl_cache::{CacheConfig, LruCache};

/// Entry point for the demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build a cache that counts evictions
/// 4. Insert twice the capacity, then read, remove and purge
/// 5. Print the statistics snapshot as JSON
fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lru_ttl_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::try_from_env().context("loading cache configuration")?;
    info!(
        "Configuration loaded: capacity={}, default_ttl={:?}",
        config.capacity,
        config.default_ttl()
    );

    let evictions = Arc::new(AtomicU64::new(0));
    let counter = evictions.clone();
    let mut builder = LruCache::<u64, u64>::builder(config.capacity).on_evict(move |key, value| {
        counter.fetch_add(1, Ordering::Relaxed);
        debug!("Evicted key={} value={}", key, value);
    });
    if let Some(ttl) = config.default_ttl() {
        builder = builder.default_ttl(ttl);
    }
    let cache = builder.build().context("building cache")?;

    let total = (config.capacity as u64).saturating_mul(2);
    for key in 0..total {
        cache.put(key, key, None);
    }
    info!(
        "Inserted {} keys: len={}, evictions={}",
        total,
        cache.len(),
        evictions.load(Ordering::Relaxed)
    );

    let present = (0..total).filter(|key| cache.get(key).is_some()).count();
    info!("{} of {} keys still present", present, total);

    let keys = cache.keys();
    let removed = keys
        .iter()
        .take(keys.len() / 2)
        .filter(|key| cache.remove(*key))
        .count();
    info!("Removed {} least recently used keys", removed);

    let purged = cache.purge_expired();
    info!("Purged {} expired entries", purged);

    let stats = cache.stats();
    println!(
        "{}",
        serde_json::to_string_pretty(&stats).context("serializing cache stats")?
    );
    info!("Hit rate: {:.2}", stats.hit_rate());

    Ok(())
}
