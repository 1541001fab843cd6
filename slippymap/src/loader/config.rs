//! Loader configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_DISK_SIZE};
use crate::config::ConfigFile;
use crate::provider::{TileUrlTemplate, DEFAULT_HTTP_TIMEOUT};

/// Maximum number of requests admitted to the in-flight registry.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Maximum number of fetches running concurrently.
pub const DEFAULT_MAX_CONNECTIONS: usize = 4;

/// Time budget of a single network fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = DEFAULT_HTTP_TIMEOUT;

/// On-disk payload store settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiskCacheConfig {
    /// Root directory of the store.
    pub directory: PathBuf,

    /// Byte budget; the oldest payloads are trimmed past it.
    pub max_size_bytes: u64,
}

impl DiskCacheConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            max_size_bytes: DEFAULT_DISK_SIZE,
        }
    }

    /// Set the byte budget.
    pub fn with_max_size(mut self, max_size_bytes: u64) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }
}

/// Configuration for [`TileLoader`](super::TileLoader).
#[derive(Clone, Debug)]
pub struct LoaderConfig {
    /// Tile server URL with `{x}`, `{y}` and `{z}` placeholders.
    pub url_template: TileUrlTemplate,

    /// Bound of the in-flight registry.
    pub max_in_flight: usize,

    /// Concurrent fetch slots.
    pub max_connections: usize,

    /// Per-fetch time budget.
    pub fetch_timeout: Duration,

    /// Capacity of the memory cache, in tiles.
    pub memory_tiles: usize,

    /// On-disk payload store, if enabled.
    pub disk_cache: Option<DiskCacheConfig>,

    /// Directory of bundled `{x}-{y}-{z}.png` tiles, if any.
    pub bundle_dir: Option<PathBuf>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            url_template: TileUrlTemplate::default(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            memory_tiles: DEFAULT_CACHE_CAPACITY,
            disk_cache: None,
            bundle_dir: None,
        }
    }
}

impl LoaderConfig {
    /// Build a loader configuration from the settings file.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        let disk_cache = config.cache.disk_enabled.then(|| {
            DiskCacheConfig::new(config.cache.directory.clone())
                .with_max_size(config.cache.disk_size)
        });

        Self {
            url_template: config.tiles.url_template.clone(),
            max_in_flight: config.loader.max_in_flight,
            max_connections: config.loader.max_connections,
            fetch_timeout: Duration::from_secs(config.loader.timeout_secs),
            memory_tiles: config.cache.memory_tiles,
            disk_cache,
            bundle_dir: config.tiles.bundle_dir.clone(),
        }
    }

    pub fn with_url_template(mut self, url_template: TileUrlTemplate) -> Self {
        self.url_template = url_template;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn with_memory_tiles(mut self, memory_tiles: usize) -> Self {
        self.memory_tiles = memory_tiles;
        self
    }

    pub fn with_disk_cache(mut self, disk_cache: DiskCacheConfig) -> Self {
        self.disk_cache = Some(disk_cache);
        self
    }

    pub fn with_bundle_dir(mut self, bundle_dir: impl Into<PathBuf>) -> Self {
        self.bundle_dir = Some(bundle_dir.into());
        self
    }
}
