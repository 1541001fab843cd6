//! INI settings file.

use std::io;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;
use tracing::{debug, warn};

use super::keys::ConfigKey;
use crate::cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_DISK_SIZE};
use crate::loader::{DEFAULT_MAX_CONNECTIONS, DEFAULT_MAX_IN_FLIGHT};
use crate::provider::TileUrlTemplate;

/// Name of the directory holding config and cache.
const APP_DIR: &str = "slippymap";

/// Default viewport, in points.
pub const DEFAULT_VIEWPORT_WIDTH: f64 = 184.0;
pub const DEFAULT_VIEWPORT_HEIGHT: f64 = 224.0;

/// Scale the map starts at before the first location fix.
pub const DEFAULT_INITIAL_SCALE: f64 = 2.0;

/// Errors reading, writing or editing the settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// `[tiles]`
#[derive(Debug, Clone, PartialEq)]
pub struct TilesSettings {
    pub url_template: TileUrlTemplate,
    pub bundle_dir: Option<PathBuf>,
}

/// `[loader]`
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderSettings {
    pub max_in_flight: usize,
    pub max_connections: usize,
    pub timeout_secs: u64,
}

/// `[cache]`
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Decoded tiles kept in memory.
    pub memory_tiles: usize,
    pub directory: PathBuf,
    /// Disk store budget in bytes.
    pub disk_size: u64,
    pub disk_enabled: bool,
}

/// `[map]`
#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub initial_scale: f64,
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    pub file: Option<PathBuf>,
}

/// Contents of `config.ini`. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub tiles: TilesSettings,
    pub loader: LoaderSettings,
    pub cache: CacheSettings,
    pub map: MapSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            tiles: TilesSettings {
                url_template: TileUrlTemplate::default(),
                bundle_dir: None,
            },
            loader: LoaderSettings {
                max_in_flight: DEFAULT_MAX_IN_FLIGHT,
                max_connections: DEFAULT_MAX_CONNECTIONS,
                timeout_secs: 5,
            },
            cache: CacheSettings {
                memory_tiles: DEFAULT_CACHE_CAPACITY,
                directory: default_cache_dir(),
                disk_size: DEFAULT_DISK_SIZE,
                disk_enabled: true,
            },
            map: MapSettings {
                viewport_width: DEFAULT_VIEWPORT_WIDTH,
                viewport_height: DEFAULT_VIEWPORT_HEIGHT,
                initial_scale: DEFAULT_INITIAL_SCALE,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                file: None,
            },
        }
    }
}

/// `<config dir>/slippymap/config.ini`
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.ini")
}

/// `<cache dir>/slippymap`
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join(APP_DIR)
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest.trim_start_matches(['/', '\\'])),
        _ => PathBuf::from(path),
    }
}

impl ConfigFile {
    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = match Ini::load_from_file(path) {
            Ok(ini) => ini,
            Err(ini::Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(ini::Error::Io(source)) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
            Err(ini::Error::Parse(e)) => {
                return Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        Self::from_ini(&ini)
    }

    /// Parse INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<string>"),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (section, properties) in ini.iter() {
            let Some(section) = section else { continue };
            for (key, value) in properties.iter() {
                let name = format!("{}.{}", section, key);
                match name.parse::<ConfigKey>() {
                    Ok(config_key) => config_key.set(&mut config, value)?,
                    Err(_) => warn!(key = %name, "Ignoring unknown config key"),
                }
            }
        }

        Ok(config)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        self.to_ini().write_to_file(path).map_err(io_error)?;
        debug!(path = %path.display(), "Saved config file");
        Ok(())
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            ini.with_section(Some(key.section()))
                .set(key.key_name(), key.get(self));
        }
        ini
    }
}
