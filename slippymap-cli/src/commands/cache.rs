//! Cache management CLI commands.

use clap::Subcommand;
use slippymap::cache::DiskTileStore;
use slippymap::config::{format_size, ConfigFile};

use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Remove every stored tile
    Clear,
    /// Show disk cache statistics
    Stats,
    /// Remove the oldest tiles until the cache fits cache.disk_size
    Trim,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction, config: &ConfigFile) -> Result<(), CliError> {
    let store = DiskTileStore::new(&config.cache.directory, config.cache.disk_size);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    match action {
        CacheAction::Clear => {
            println!("Clearing disk cache at: {}", store.root().display());
            let removed = runtime
                .block_on(store.clear())
                .map_err(|e| CliError::CacheClear(e.to_string()))?;
            println!("Deleted {} files", removed);
        }
        CacheAction::Stats => {
            let usage = runtime
                .block_on(store.usage())
                .map_err(|e| CliError::CacheStats(e.to_string()))?;
            println!("Disk cache: {}", store.root().display());
            println!("  Files:  {}", usage.entries);
            println!("  Size:   {}", format_size(usage.bytes));
            println!("  Budget: {}", format_size(store.max_size_bytes()));
            if !config.cache.disk_enabled {
                println!("  (disabled in config)");
            }
        }
        CacheAction::Trim => {
            let result = runtime
                .block_on(store.trim())
                .map_err(|e| CliError::CacheClear(e.to_string()))?;
            println!(
                "Deleted {} files, freed {}",
                result.entries_removed,
                format_size(result.bytes_freed)
            );
        }
    }
    Ok(())
}
