//! In-memory tile cache with strict LRU eviction.
//!
//! The cache is bounded by entry count, not bytes: every tile is a 256×256
//! bitmap so a count is the natural budget. Eviction order must be exact
//! (least recently used first), which rules out approximate admission
//! policies; an `lru::LruCache` behind a `parking_lot::Mutex` gives that.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;

use crate::cache::CacheStats;
use crate::coord::TileAddress;
use crate::tile::TileImage;

/// Default number of decoded tiles kept in memory.
pub const DEFAULT_CACHE_CAPACITY: usize = 70;

/// Capacity-bounded cache of decoded tiles keyed by address.
///
/// All methods take `&self`; the cache is shared between the loader's
/// completion tasks and the main context.
pub struct TileCache {
    entries: Mutex<LruCache<TileAddress, TileImage>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl TileCache {
    /// Create a cache holding at most `capacity` tiles (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let bound = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            entries: Mutex::new(LruCache::new(bound)),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a tile, marking it as most recently used.
    pub fn get(&self, address: &TileAddress) -> Option<TileImage> {
        let image = self.entries.lock().get(address).cloned();
        match image {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        image
    }

    /// Insert or overwrite a tile, evicting the least recently used entry
    /// when the cache is full.
    pub fn put(&self, address: TileAddress, image: TileImage) {
        let evicted = self.entries.lock().push(address, image);

        // push returns the replaced value for an existing key as well
        if let Some((old_address, _)) = evicted {
            if old_address != address {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(tile = %old_address, "Evicted tile from memory cache");
            }
        }
    }

    /// Check presence without touching the recency order.
    pub fn contains(&self, address: &TileAddress) -> bool {
        self.entries.lock().contains(address)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        let dropped = entries.len();
        entries.clear();
        tracing::debug!(dropped, "Cleared memory tile cache");
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_hits: self.hits.load(Ordering::Relaxed),
            memory_misses: self.misses.load(Ordering::Relaxed),
            memory_evictions: self.evictions.load(Ordering::Relaxed),
            memory_entry_count: self.len(),
        }
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
