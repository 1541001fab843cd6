//! On-disk store of raw tile payloads.
//!
//! Plays the role of an HTTP cache in front of the tile server: payloads are
//! stored under the SHA-256 of their URL, consulted before the network and
//! written after a successful download. The store is bounded by total bytes;
//! [`DiskTileStore::trim`] removes the oldest files first.
//!
//! Layout: `<root>/<first two hex digits>/<sha256 hex>.tile`

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Default disk budget (30 MB).
pub const DEFAULT_DISK_SIZE: u64 = 30 * 1024 * 1024;

/// Number of writes between automatic trims.
const TRIM_INTERVAL: u64 = 32;

/// File extension of stored payloads.
const TILE_EXTENSION: &str = "tile";

/// Result of a trim pass.
#[derive(Debug, Clone, Default)]
pub struct TrimResult {
    /// Number of files removed.
    pub entries_removed: usize,
    /// Total bytes freed.
    pub bytes_freed: u64,
    /// Duration of the pass in milliseconds.
    pub duration_ms: u64,
}

impl fmt::Display for TrimResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trim: removed {} entries, freed {} bytes in {}ms",
            self.entries_removed, self.bytes_freed, self.duration_ms
        )
    }
}

/// Usage summary of the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskUsage {
    pub entries: usize,
    pub bytes: u64,
}

struct StoredFile {
    path: PathBuf,
    len: u64,
    modified: SystemTime,
}

/// Byte-bounded on-disk payload store.
pub struct DiskTileStore {
    root: PathBuf,
    max_size_bytes: u64,
    writes: AtomicU64,
}

impl DiskTileStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>, max_size_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_size_bytes,
            writes: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        self.root
            .join(&hex[..2])
            .join(format!("{}.{}", hex, TILE_EXTENSION))
    }

    /// Read a stored payload. Read failures other than "not found" are
    /// logged and reported as a miss.
    pub async fn get(&self, url: &str) -> Option<Vec<u8>> {
        let path = self.path_for(url);
        match tokio::fs::read(&path).await {
            Ok(data) => Some(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cached tile");
                None
            }
        }
    }

    /// Store a payload, replacing any previous one for the same URL.
    ///
    /// The payload is written to a temporary file and renamed into place so
    /// readers never observe a partial file.
    pub async fn put(&self, url: &str, data: &[u8]) -> io::Result<()> {
        let path = self.path_for(url);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("partial");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &path).await?;

        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % TRIM_INTERVAL == 0 {
            let result = self.trim().await?;
            if result.entries_removed > 0 {
                debug!(%result, "Trimmed disk tile store");
            }
        }
        Ok(())
    }

    async fn scan(&self) -> io::Result<Vec<StoredFile>> {
        let mut files = Vec::new();
        let mut shards = match tokio::fs::read_dir(&self.root).await {
            Ok(shards) => shards,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e),
        };

        while let Some(shard) = shards.next_entry().await? {
            if !shard.file_type().await?.is_dir() {
                continue;
            }
            let mut entries = tokio::fs::read_dir(shard.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(TILE_EXTENSION) {
                    continue;
                }
                let metadata = entry.metadata().await?;
                files.push(StoredFile {
                    path,
                    len: metadata.len(),
                    modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                });
            }
        }
        Ok(files)
    }

    /// Current number of stored payloads and their total size.
    pub async fn usage(&self) -> io::Result<DiskUsage> {
        let files = self.scan().await?;
        Ok(DiskUsage {
            entries: files.len(),
            bytes: files.iter().map(|f| f.len).sum(),
        })
    }

    /// Remove the oldest payloads until the store fits its budget.
    pub async fn trim(&self) -> io::Result<TrimResult> {
        let start = Instant::now();
        let mut files = self.scan().await?;
        let mut total: u64 = files.iter().map(|f| f.len).sum();
        let mut result = TrimResult::default();

        if total > self.max_size_bytes {
            files.sort_by_key(|f| f.modified);
            for file in files {
                if total <= self.max_size_bytes {
                    break;
                }
                match tokio::fs::remove_file(&file.path).await {
                    Ok(()) => {
                        total -= file.len;
                        result.entries_removed += 1;
                        result.bytes_freed += file.len;
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        total -= file.len;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    /// Remove every stored payload. Returns the number of files removed.
    pub async fn clear(&self) -> io::Result<usize> {
        let files = self.scan().await?;
        let count = files.len();
        for file in files {
            match tokio::fs::remove_file(&file.path).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(count)
    }
}
