//! Settings file.
//!
//! Settings live in `config.ini` under the platform config directory:
//!
//! ```ini
//! [tiles]
//! url_template = https://tile2.maps.2gis.com/tiles?x={x}&y={y}&z={z}&v=1.3&ts=online_hd
//! bundle_dir =
//!
//! [loader]
//! max_in_flight = 8
//! max_connections = 4
//! timeout = 5
//!
//! [cache]
//! memory_tiles = 70
//! directory = ~/.cache/slippymap
//! disk_size = 30MB
//! disk_enabled = true
//!
//! [map]
//! viewport_width = 184
//! viewport_height = 224
//! initial_scale = 2
//!
//! [logging]
//! level = info
//! file =
//! ```

mod file;
mod keys;
mod size;

pub use file::{
    config_file_path, default_cache_dir, expand_tilde, CacheSettings, ConfigError, ConfigFile,
    LoaderSettings, LoggingSettings, MapSettings, TilesSettings, DEFAULT_INITIAL_SCALE,
    DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH,
};
pub use keys::ConfigKey;
pub use size::{format_size, parse_size};
