//! Tile caches.
//!
//! - [`TileCache`] - decoded tiles in memory, strict LRU, bounded by count
//! - [`DiskTileStore`] - raw payloads on disk keyed by URL, bounded by bytes
//!
//! The loader consults the memory cache synchronously on every request and
//! the disk store from its fetch tasks, before going to the network.

mod disk;
mod memory;
mod stats;

pub use disk::{DiskTileStore, DiskUsage, TrimResult, DEFAULT_DISK_SIZE};
pub use memory::{TileCache, DEFAULT_CACHE_CAPACITY};
pub use stats::CacheStats;
