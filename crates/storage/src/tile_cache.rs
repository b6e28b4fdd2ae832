//! In-memory LRU cache for rendered pyramid tiles.
//!
//! The cache is an optimization only: a miss, an expired entry or a
//! disabled cache must still lead to a correct render.
//!
//! ## Policy
//!
//! Entries live for a fixed freshness window. A [`CachePolicy`] decides
//! which layer/zoom combinations are cacheable at all; `get` and `put` on
//! other keys are no-ops.

use bytes::Bytes;
use chart_common::TileCoord;
use lru::LruCache;
use std::collections::HashSet;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Cache key: layer name plus tile address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub layer: String,
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    pub fn new(layer: impl Into<String>, coord: TileCoord) -> Self {
        Self {
            layer: layer.into(),
            z: coord.z,
            x: coord.x,
            y: coord.y,
        }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.layer, self.z, self.x, self.y)
    }
}

/// Which tiles may be cached, and for how long.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// Freshness window of every entry
    pub ttl: Duration,
    /// Deepest cacheable zoom
    pub max_zoom: u32,
    /// Cacheable layers; `None` allows every layer
    pub layers: Option<HashSet<String>>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            max_zoom: 14,
            layers: None,
        }
    }
}

impl CachePolicy {
    pub fn is_cacheable(&self, key: &TileKey) -> bool {
        key.z <= self.max_zoom
            && self
                .layers
                .as_ref()
                .map_or(true, |layers| layers.contains(&key.layer))
    }
}

/// In-memory LRU cache for rendered tiles.
///
/// Reads take the write lock too, since a hit bumps recency. Expired
/// entries are dropped lazily when read. Crossing the memory limit evicts
/// about 5% of it in one batch.
pub struct TileCache {
    cache: RwLock<LruCache<TileKey, CachedTile>>,
    max_bytes: u64,
    policy: CachePolicy,
    entry_count: AtomicU64,
    size_bytes: AtomicU64,
}

struct CachedTile {
    data: Bytes,
    inserted_at: Instant,
}

/// Point-in-time occupancy of a [`TileCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileCacheStats {
    pub entry_count: u64,
    pub size_bytes: u64,
}

impl TileCache {
    /// Create new cache with specified memory limit and policy.
    ///
    /// # Example
    /// ```
    /// use storage::{CachePolicy, TileCache};
    ///
    /// // 256MB, one hour freshness, zoom <= 14
    /// let cache = TileCache::new(256, CachePolicy::default());
    /// ```
    pub fn new(max_size_mb: usize, policy: CachePolicy) -> Self {
        // Eviction is memory based; the entry bound only has to stay out of the way.
        const LRU_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1_000_000) {
            Some(n) => n,
            None => NonZeroUsize::MIN,
        };

        Self {
            cache: RwLock::new(LruCache::new(LRU_CAPACITY)),
            max_bytes: (max_size_mb as u64) * 1024 * 1024,
            policy,
            entry_count: AtomicU64::new(0),
            size_bytes: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Get tile from cache (returns None if expired, missing or not cacheable).
    pub async fn get(&self, key: &TileKey) -> Option<Bytes> {
        if !self.policy.is_cacheable(key) {
            return None;
        }

        let mut cache = self.cache.write().await;
        match cache.get(key) {
            Some(tile) if tile.inserted_at.elapsed() <= self.policy.ttl => {
                return Some(tile.data.clone());
            }
            Some(_) => {}
            None => return None,
        }

        if let Some(tile) = cache.pop(key) {
            self.forget(1, tile.data.len() as u64);
            debug!(key = %key, "Expired cached tile");
        }
        None
    }

    /// Store tile in cache. Returns false when the policy refuses the key.
    pub async fn put(&self, key: TileKey, data: Bytes) -> bool {
        if !self.policy.is_cacheable(&key) {
            return false;
        }
        let tile_size = data.len() as u64;

        let mut cache = self.cache.write().await;
        if self.size_bytes.load(Ordering::Relaxed) + tile_size > self.max_bytes {
            self.evict_batch_locked(&mut cache);
        }

        let previous = cache.put(
            key,
            CachedTile {
                data,
                inserted_at: Instant::now(),
            },
        );
        match previous {
            Some(old) => self.forget(0, old.data.len() as u64),
            None => {
                self.entry_count.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.size_bytes.fetch_add(tile_size, Ordering::Relaxed);
        true
    }

    fn forget(&self, entries: u64, bytes: u64) {
        self.entry_count.fetch_sub(entries, Ordering::Relaxed);
        self.size_bytes.fetch_sub(bytes, Ordering::Relaxed);
    }

    /// Evict ~5% of capacity (by memory) in LRU order.
    fn evict_batch_locked(&self, cache: &mut LruCache<TileKey, CachedTile>) {
        let target_free = (self.max_bytes / 20).max(1);
        let mut bytes_freed = 0u64;
        let mut entries_evicted = 0u64;

        while bytes_freed < target_free {
            let Some((_, evicted)) = cache.pop_lru() else {
                break;
            };
            bytes_freed += evicted.data.len() as u64;
            entries_evicted += 1;
        }
        self.forget(entries_evicted, bytes_freed);

        debug!(entries_evicted, bytes_freed, "Tile cache batch eviction");
    }

    pub fn stats(&self) -> TileCacheStats {
        TileCacheStats {
            entry_count: self.entry_count.load(Ordering::Relaxed),
            size_bytes: self.size_bytes.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.entry_count.load(Ordering::Relaxed) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(layer: &str, z: u32) -> TileKey {
        TileKey {
            layer: layer.to_string(),
            z,
            x: 0,
            y: 0,
        }
    }

    #[tokio::test]
    async fn test_cache_basic_operations() {
        let cache = TileCache::new(100, CachePolicy::default());

        assert!(cache.is_empty());
        assert!(cache.get(&key("gtpyr", 3)).await.is_none());

        let data = Bytes::from("test data");
        assert!(cache.put(key("gtpyr", 3), data.clone()).await);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key("gtpyr", 3)).await, Some(data));
        assert_eq!(
            cache.stats(),
            TileCacheStats {
                entry_count: 1,
                size_bytes: 9
            }
        );
    }

    #[tokio::test]
    async fn test_cache_ttl_expiration() {
        let policy = CachePolicy {
            ttl: Duration::from_millis(100),
            ..CachePolicy::default()
        };
        let cache = TileCache::new(100, policy);

        cache.put(key("gtpyr", 3), Bytes::from("x")).await;
        assert!(cache.get(&key("gtpyr", 3)).await.is_some());

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(cache.get(&key("gtpyr", 3)).await.is_none());
        assert_eq!(cache.stats(), TileCacheStats::default());
    }

    #[tokio::test]
    async fn test_policy_restricts_layers_and_zoom() {
        let policy = CachePolicy {
            max_zoom: 10,
            layers: Some(["gtpyr".to_string()].into_iter().collect()),
            ..CachePolicy::default()
        };
        let cache = TileCache::new(100, policy);

        assert!(!cache.put(key("gt50k", 3), Bytes::from("x")).await);
        assert!(!cache.put(key("gtpyr", 11), Bytes::from("x")).await);
        assert!(cache.put(key("gtpyr", 10), Bytes::from("x")).await);
        assert!(cache.get(&key("gtpyr", 11)).await.is_none());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_cache_memory_based_eviction() {
        let cache = TileCache::new(1, CachePolicy::default());

        let tile_100kb = Bytes::from(vec![0u8; 100 * 1024]);
        for i in 0..15 {
            let key = TileKey {
                layer: "gtpyr".into(),
                z: 5,
                x: i,
                y: 0,
            };
            cache.put(key, tile_100kb.clone()).await;
        }

        let stats = cache.stats();
        assert!(stats.entry_count < 15);
        assert_eq!(stats.size_bytes, stats.entry_count * 100 * 1024);
        assert!(stats.size_bytes <= 1024 * 1024);

        // Least recently used tiles go first.
        let first = TileKey {
            layer: "gtpyr".into(),
            z: 5,
            x: 0,
            y: 0,
        };
        assert!(cache.get(&first).await.is_none());
    }

    #[tokio::test]
    async fn test_replace_keeps_count() {
        let cache = TileCache::new(100, CachePolicy::default());

        cache.put(key("a", 1), Bytes::from("hello")).await;
        cache.put(key("b", 1), Bytes::from("world!")).await;
        assert_eq!(cache.stats().size_bytes, 11);

        cache.put(key("a", 1), Bytes::from("hello world")).await;
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().size_bytes, 17);
    }

    #[test]
    fn test_key_display() {
        let k = TileKey::new("gtpyr", TileCoord::new(3, 4, 5).unwrap());
        assert_eq!(k.to_string(), "gtpyr/3/4/5");
    }
}
