//! Bundled offline tiles.
//!
//! Tiles shipped with the application are resolved before any network I/O.
//! Bundles are keyed by `"{x}-{y}-{z}"`, the same name the asset files carry
//! on disk (`3-1-2.png`).

use std::collections::HashMap;
use std::io;
use std::path::Path;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::coord::TileAddress;

/// Source of bundled tile payloads.
pub trait BundledTiles: Send + Sync {
    /// Returns the encoded payload for `address`, if bundled.
    fn lookup(&self, address: &TileAddress) -> Option<Bytes>;
}

/// A bundle that contains nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBundle;

impl BundledTiles for NoBundle {
    fn lookup(&self, _address: &TileAddress) -> Option<Bytes> {
        None
    }
}

/// Bundle held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBundle {
    entries: HashMap<String, Bytes>,
}

impl MemoryBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `{x}-{y}-{z}.<ext>` file from a directory.
    ///
    /// Files whose stem does not parse as a tile name are skipped.
    pub fn from_dir(dir: &Path) -> io::Result<Self> {
        let mut bundle = Self::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if parse_bundle_name(stem).is_none() {
                warn!(path = %path.display(), "Skipping bundled file with unexpected name");
                continue;
            }
            let data = std::fs::read(&path)?;
            bundle.entries.insert(stem.to_string(), Bytes::from(data));
        }
        debug!(dir = %dir.display(), tiles = bundle.len(), "Loaded tile bundle");
        Ok(bundle)
    }

    /// Add a payload for `address`.
    pub fn insert(&mut self, address: TileAddress, data: impl Into<Bytes>) {
        self.entries.insert(address.bundle_name(), data.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BundledTiles for MemoryBundle {
    fn lookup(&self, address: &TileAddress) -> Option<Bytes> {
        self.entries.get(&address.bundle_name()).cloned()
    }
}

/// Parses `"{x}-{y}-{z}"` back into an address.
pub fn parse_bundle_name(name: &str) -> Option<TileAddress> {
    let mut parts = name.split('-');
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(TileAddress::new(x, y, z))
}
