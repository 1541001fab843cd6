//! CLI error type.

use std::fmt;
use std::io;
use std::path::PathBuf;

use slippymap::config::ConfigError;
use slippymap::loader::LoaderError;

/// Errors reported to the user before exiting with status 1.
#[derive(Debug)]
pub enum CliError {
    /// Invalid configuration or key.
    Config(String),
    /// Invalid command-line argument.
    InvalidArgument(String),
    /// The tile loader could not be created.
    Loader(LoaderError),
    /// The async runtime could not be started.
    Runtime(io::Error),
    /// Writing a tile image failed.
    WriteTile { path: PathBuf, message: String },
    CacheClear(String),
    CacheStats(String),
    /// Output serialization failed.
    Output(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Loader(e) => write!(f, "Failed to start tile loader: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::WriteTile { path, message } => {
                write!(f, "Failed to write {}: {}", path.display(), message)
            }
            CliError::CacheClear(msg) => write!(f, "Failed to clear cache: {}", msg),
            CliError::CacheStats(msg) => write!(f, "Failed to read cache statistics: {}", msg),
            CliError::Output(msg) => write!(f, "Failed to write output: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Loader(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoaderError> for CliError {
    fn from(e: LoaderError) -> Self {
        CliError::Loader(e)
    }
}
