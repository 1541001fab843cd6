//! Loader counters.
//!
//! Lock-free atomic counters recorded on the request and completion paths,
//! with a point-in-time [`LoaderSnapshot`] for display.
//!
//! ```
//! use slippymap::loader::LoaderTelemetry;
//!
//! let telemetry = LoaderTelemetry::new();
//! telemetry.record_request();
//! telemetry.record_coalesced();
//!
//! let snapshot = telemetry.snapshot();
//! assert_eq!(snapshot.requests, 1);
//! assert_eq!(snapshot.coalesced, 1);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the lifetime of one loader.
#[derive(Debug, Default)]
pub struct LoaderTelemetry {
    requests: AtomicU64,
    rejected: AtomicU64,
    memory_hits: AtomicU64,
    bundle_hits: AtomicU64,
    coalesced: AtomicU64,
    skipped: AtomicU64,
    fetches_started: AtomicU64,
    disk_hits: AtomicU64,
    fetches_succeeded: AtomicU64,
    fetches_failed: AtomicU64,
    cancelled: AtomicU64,
    evicted: AtomicU64,
    late_discarded: AtomicU64,
}

macro_rules! counter {
    ($record:ident, $field:ident) => {
        pub fn $record(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl LoaderTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(record_request, requests);
    counter!(record_rejected, rejected);
    counter!(record_memory_hit, memory_hits);
    counter!(record_bundle_hit, bundle_hits);
    counter!(record_coalesced, coalesced);
    counter!(record_skipped, skipped);
    counter!(record_fetch_started, fetches_started);
    counter!(record_disk_hit, disk_hits);
    counter!(record_fetch_succeeded, fetches_succeeded);
    counter!(record_fetch_failed, fetches_failed);
    counter!(record_cancelled, cancelled);
    counter!(record_evicted, evicted);
    counter!(record_late_discarded, late_discarded);

    /// Copy every counter.
    pub fn snapshot(&self) -> LoaderSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        LoaderSnapshot {
            requests: load(&self.requests),
            rejected: load(&self.rejected),
            memory_hits: load(&self.memory_hits),
            bundle_hits: load(&self.bundle_hits),
            coalesced: load(&self.coalesced),
            skipped: load(&self.skipped),
            fetches_started: load(&self.fetches_started),
            disk_hits: load(&self.disk_hits),
            fetches_succeeded: load(&self.fetches_succeeded),
            fetches_failed: load(&self.fetches_failed),
            cancelled: load(&self.cancelled),
            evicted: load(&self.evicted),
            late_discarded: load(&self.late_discarded),
        }
    }
}

/// Point-in-time copy of [`LoaderTelemetry`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderSnapshot {
    /// Calls to `load`.
    pub requests: u64,
    /// Requests for invalid addresses.
    pub rejected: u64,
    /// Requests answered from the memory cache.
    pub memory_hits: u64,
    /// Requests answered from bundled tiles.
    pub bundle_hits: u64,
    /// Requests attached to an existing in-flight entry.
    pub coalesced: u64,
    /// Zero-priority misses that were not fetched.
    pub skipped: u64,
    /// Fetch tasks started.
    pub fetches_started: u64,
    /// Fetches answered by the disk store.
    pub disk_hits: u64,
    pub fetches_succeeded: u64,
    pub fetches_failed: u64,
    /// Explicit cancellations.
    pub cancelled: u64,
    /// Entries pushed out by the in-flight bound.
    pub evicted: u64,
    /// Completed fetches whose entry was already gone.
    pub late_discarded: u64,
}

impl LoaderSnapshot {
    /// Fraction of requests answered without starting a fetch.
    pub fn served_without_fetch(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        let served = self.memory_hits + self.bundle_hits + self.coalesced;
        served as f64 / self.requests as f64
    }
}

impl fmt::Display for LoaderSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests ({} memory, {} bundle, {} coalesced), {} fetches ({} ok, {} failed, {} from disk), {} cancelled, {} evicted",
            self.requests,
            self.memory_hits,
            self.bundle_hits,
            self.coalesced,
            self.fetches_started,
            self.fetches_succeeded,
            self.fetches_failed,
            self.disk_hits,
            self.cancelled,
            self.evicted
        )
    }
}
