//! `section.key` access to settings, shared by the file loader and the CLI.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::{expand_tilde, ConfigError, ConfigFile};
use super::size::{format_size, parse_size};
use crate::map::{MAX_SCALE, MIN_SCALE};
use crate::provider::TileUrlTemplate;

/// A settable configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    TilesUrlTemplate,
    TilesBundleDir,
    LoaderMaxInFlight,
    LoaderMaxConnections,
    LoaderTimeout,
    CacheMemoryTiles,
    CacheDirectory,
    CacheDiskSize,
    CacheDiskEnabled,
    MapViewportWidth,
    MapViewportHeight,
    MapInitialScale,
    LoggingLevel,
    LoggingFile,
}

const ALL_KEYS: [ConfigKey; 14] = [
    ConfigKey::TilesUrlTemplate,
    ConfigKey::TilesBundleDir,
    ConfigKey::LoaderMaxInFlight,
    ConfigKey::LoaderMaxConnections,
    ConfigKey::LoaderTimeout,
    ConfigKey::CacheMemoryTiles,
    ConfigKey::CacheDirectory,
    ConfigKey::CacheDiskSize,
    ConfigKey::CacheDiskEnabled,
    ConfigKey::MapViewportWidth,
    ConfigKey::MapViewportHeight,
    ConfigKey::MapInitialScale,
    ConfigKey::LoggingLevel,
    ConfigKey::LoggingFile,
];

impl ConfigKey {
    /// Every key, grouped by section in file order.
    pub fn all() -> &'static [ConfigKey] {
        &ALL_KEYS
    }

    /// Full name, e.g. `loader.timeout`.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::TilesUrlTemplate => "tiles.url_template",
            ConfigKey::TilesBundleDir => "tiles.bundle_dir",
            ConfigKey::LoaderMaxInFlight => "loader.max_in_flight",
            ConfigKey::LoaderMaxConnections => "loader.max_connections",
            ConfigKey::LoaderTimeout => "loader.timeout",
            ConfigKey::CacheMemoryTiles => "cache.memory_tiles",
            ConfigKey::CacheDirectory => "cache.directory",
            ConfigKey::CacheDiskSize => "cache.disk_size",
            ConfigKey::CacheDiskEnabled => "cache.disk_enabled",
            ConfigKey::MapViewportWidth => "map.viewport_width",
            ConfigKey::MapViewportHeight => "map.viewport_height",
            ConfigKey::MapInitialScale => "map.initial_scale",
            ConfigKey::LoggingLevel => "logging.level",
            ConfigKey::LoggingFile => "logging.file",
        }
    }

    pub fn section(&self) -> &'static str {
        self.name().split_once('.').map_or("", |(section, _)| section)
    }

    pub fn key_name(&self) -> &'static str {
        self.name().split_once('.').map_or("", |(_, key)| key)
    }

    /// Current value as it would be written to the file. Unset optional
    /// values are empty.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::TilesUrlTemplate => config.tiles.url_template.to_string(),
            ConfigKey::TilesBundleDir => optional_path(&config.tiles.bundle_dir),
            ConfigKey::LoaderMaxInFlight => config.loader.max_in_flight.to_string(),
            ConfigKey::LoaderMaxConnections => config.loader.max_connections.to_string(),
            ConfigKey::LoaderTimeout => config.loader.timeout_secs.to_string(),
            ConfigKey::CacheMemoryTiles => config.cache.memory_tiles.to_string(),
            ConfigKey::CacheDirectory => config.cache.directory.display().to_string(),
            ConfigKey::CacheDiskSize => format_size(config.cache.disk_size),
            ConfigKey::CacheDiskEnabled => config.cache.disk_enabled.to_string(),
            ConfigKey::MapViewportWidth => config.map.viewport_width.to_string(),
            ConfigKey::MapViewportHeight => config.map.viewport_height.to_string(),
            ConfigKey::MapInitialScale => config.map.initial_scale.to_string(),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingFile => optional_path(&config.logging.file),
        }
    }

    /// Validate and store `value`.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: self.name().to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };

        match self {
            ConfigKey::TilesUrlTemplate => {
                config.tiles.url_template =
                    TileUrlTemplate::new(value).map_err(|e| invalid(&e.to_string()))?;
            }
            ConfigKey::TilesBundleDir => config.tiles.bundle_dir = optional_dir(value),
            ConfigKey::LoaderMaxInFlight => {
                config.loader.max_in_flight = positive(value).ok_or_else(|| invalid("expected a positive integer"))?;
            }
            ConfigKey::LoaderMaxConnections => {
                config.loader.max_connections = positive(value).ok_or_else(|| invalid("expected a positive integer"))?;
            }
            ConfigKey::LoaderTimeout => {
                config.loader.timeout_secs = positive(value)
                    .map(|secs| secs as u64)
                    .ok_or_else(|| invalid("expected a number of seconds"))?;
            }
            ConfigKey::CacheMemoryTiles => {
                config.cache.memory_tiles = positive(value).ok_or_else(|| invalid("expected a positive integer"))?;
            }
            ConfigKey::CacheDirectory => {
                if value.is_empty() {
                    return Err(invalid("directory must not be empty"));
                }
                config.cache.directory = expand_tilde(value);
            }
            ConfigKey::CacheDiskSize => {
                config.cache.disk_size =
                    parse_size(value).ok_or_else(|| invalid("expected a size such as 30MB"))?;
            }
            ConfigKey::CacheDiskEnabled => {
                config.cache.disk_enabled = parse_bool(value).ok_or_else(|| invalid("expected true or false"))?;
            }
            ConfigKey::MapViewportWidth => {
                config.map.viewport_width = positive_f64(value).ok_or_else(|| invalid("expected a positive number"))?;
            }
            ConfigKey::MapViewportHeight => {
                config.map.viewport_height = positive_f64(value).ok_or_else(|| invalid("expected a positive number"))?;
            }
            ConfigKey::MapInitialScale => {
                config.map.initial_scale = value
                    .parse::<f64>()
                    .ok()
                    .filter(|s| (MIN_SCALE..=MAX_SCALE).contains(s))
                    .ok_or_else(|| invalid("expected a scale between 0.5 and 17.4"))?;
            }
            ConfigKey::LoggingLevel => {
                value
                    .parse::<tracing::Level>()
                    .map_err(|_| invalid("expected trace, debug, info, warn or error"))?;
                config.logging.level = value.to_ascii_lowercase();
            }
            ConfigKey::LoggingFile => config.logging.file = optional_dir(value),
        }
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ALL_KEYS
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn optional_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

fn optional_dir(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| expand_tilde(value))
}

fn positive(value: &str) -> Option<usize> {
    value.parse::<usize>().ok().filter(|n| *n > 0)
}

fn positive_f64(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|n| n.is_finite() && *n > 0.0)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
