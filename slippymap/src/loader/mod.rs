//! Tile acquisition and scheduling.
//!
//! [`TileLoader`] turns `(address, priority)` requests into decoded tiles.
//! Each request is answered from the first source that has the tile:
//!
//! ```text
//! load(addr, prio)
//!   ├─ invalid address ──────────────► Err(InvalidAddress)
//!   ├─ memory cache ─────────────────► Ok(image)          (resolved on return)
//!   ├─ bundled tiles ────────────────► Ok(image)          (resolved on return)
//!   └─ registry
//!        ├─ already in flight ───────► join waiters, priority = max
//!        ├─ priority 0 ──────────────► Err(Cancelled)
//!        └─ admit (evict oldest past the bound)
//!             └─ dispatch ─► disk store ─► network ─► decode ─► cache ─► fan out
//! ```
//!
//! Fetches run as Tokio tasks on the runtime the loader was built in. The
//! registry and the memory cache each sit behind a `parking_lot::Mutex`; the
//! registry lock is always taken first and neither is held across an
//! `.await`. A fetch that finishes after its entry was cancelled or evicted
//! finds no entry for its id and its result is dropped.

mod config;
mod registry;
mod telemetry;
mod types;

pub use config::{
    DiskCacheConfig, LoaderConfig, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_MAX_IN_FLIGHT,
};
pub use telemetry::{LoaderSnapshot, LoaderTelemetry};
pub use types::{LoaderError, TileError, TileOutcome, TileTicket};

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, DiskTileStore, TileCache};
use crate::coord::TileAddress;
use crate::provider::{
    AsyncHttpClient, AsyncReqwestClient, BundledTiles, MemoryBundle, NoBundle, TileUrlTemplate,
};
use crate::tile::{normalize_priority, TileImage, SKIP_PRIORITY};
use registry::{Dispatch, InFlightRegistry};

/// Asynchronous tile loader with a bounded in-flight registry.
///
/// Cloning is cheap and every clone drives the same registry and cache.
///
/// # Example
///
/// ```no_run
/// use slippymap::coord::TileAddress;
/// use slippymap::loader::{LoaderConfig, TileLoader};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let loader = TileLoader::new(LoaderConfig::default())?;
/// let image = loader.load(TileAddress::new(619, 320, 10), 1.0).await?;
/// println!("{}x{}", image.width(), image.height());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TileLoader {
    inner: Arc<LoaderInner>,
}

struct LoaderInner {
    client: Arc<dyn AsyncHttpClient>,
    bundle: Arc<dyn BundledTiles>,
    cache: Arc<TileCache>,
    disk: Option<Arc<DiskTileStore>>,
    urls: TileUrlTemplate,
    fetch_timeout: Duration,
    registry: Mutex<InFlightRegistry>,
    telemetry: LoaderTelemetry,
    runtime: Handle,
}

/// Builder for [`TileLoader`] with injectable collaborators.
///
/// Anything not supplied is created from the [`LoaderConfig`].
pub struct TileLoaderBuilder {
    config: LoaderConfig,
    client: Option<Arc<dyn AsyncHttpClient>>,
    bundle: Option<Arc<dyn BundledTiles>>,
    cache: Option<Arc<TileCache>>,
    disk: Option<Arc<DiskTileStore>>,
    runtime: Option<Handle>,
}

impl TileLoaderBuilder {
    /// Use this HTTP client instead of a reqwest client.
    pub fn client(mut self, client: Arc<dyn AsyncHttpClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Use this bundle instead of loading `bundle_dir`.
    pub fn bundle(mut self, bundle: Arc<dyn BundledTiles>) -> Self {
        self.bundle = Some(bundle);
        self
    }

    /// Share an existing memory cache.
    pub fn cache(mut self, cache: Arc<TileCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Share an existing disk store.
    pub fn disk_store(mut self, disk: Arc<DiskTileStore>) -> Self {
        self.disk = Some(disk);
        self
    }

    /// Spawn fetch tasks on this runtime instead of the current one.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<TileLoader, LoaderError> {
        let config = self.config;

        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| LoaderError::NoRuntime)?,
        };

        let client: Arc<dyn AsyncHttpClient> = match self.client {
            Some(client) => client,
            None => Arc::new(AsyncReqwestClient::with_timeout(config.fetch_timeout)?),
        };

        let bundle: Arc<dyn BundledTiles> = match (self.bundle, &config.bundle_dir) {
            (Some(bundle), _) => bundle,
            (None, Some(dir)) => {
                let bundle = MemoryBundle::from_dir(dir).map_err(|source| LoaderError::Bundle {
                    path: dir.clone(),
                    source,
                })?;
                info!(dir = %dir.display(), tiles = bundle.len(), "Loaded tile bundle");
                Arc::new(bundle)
            }
            (None, None) => Arc::new(NoBundle),
        };

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(TileCache::new(config.memory_tiles)));

        let disk = self.disk.or_else(|| {
            config.disk_cache.as_ref().map(|disk| {
                Arc::new(DiskTileStore::new(
                    disk.directory.clone(),
                    disk.max_size_bytes,
                ))
            })
        });

        debug!(
            max_in_flight = config.max_in_flight,
            max_connections = config.max_connections,
            timeout_ms = config.fetch_timeout.as_millis() as u64,
            memory_tiles = cache.capacity(),
            disk = disk.is_some(),
            "Tile loader created"
        );

        Ok(TileLoader {
            inner: Arc::new(LoaderInner {
                client,
                bundle,
                cache,
                disk,
                urls: config.url_template,
                fetch_timeout: config.fetch_timeout,
                registry: Mutex::new(InFlightRegistry::new(
                    config.max_in_flight,
                    config.max_connections,
                )),
                telemetry: LoaderTelemetry::new(),
                runtime,
            }),
        })
    }
}

impl TileLoader {
    /// Create a loader with a reqwest client. Must be called inside a Tokio
    /// runtime.
    pub fn new(config: LoaderConfig) -> Result<Self, LoaderError> {
        Self::builder(config).build()
    }

    pub fn builder(config: LoaderConfig) -> TileLoaderBuilder {
        TileLoaderBuilder {
            config,
            client: None,
            bundle: None,
            cache: None,
            disk: None,
            runtime: None,
        }
    }

    /// Request a tile.
    ///
    /// Never blocks on I/O. Requests that can be answered without a fetch
    /// are resolved before this returns.
    pub fn load(&self, address: TileAddress, priority: f32) -> TileTicket {
        let inner = &self.inner;
        let (tx, ticket) = TileTicket::channel(address);
        inner.telemetry.record_request();

        if !address.is_valid() {
            debug!(tile = %address, "Rejected invalid tile address");
            inner.telemetry.record_rejected();
            let _ = tx.send(Err(TileError::InvalidAddress(address)));
            return ticket;
        }

        if let Some(image) = inner.cache.get(&address) {
            inner.telemetry.record_memory_hit();
            let _ = tx.send(Ok(image));
            return ticket;
        }

        if let Some(image) = inner.load_bundled(&address) {
            inner.telemetry.record_bundle_hit();
            inner.cache.put(address, image.clone());
            let _ = tx.send(Ok(image));
            return ticket;
        }

        let priority = normalize_priority(priority);
        let (evicted, dispatches) = {
            let mut registry = inner.registry.lock();

            // A fetch may have completed since the first lookup
            if let Some(image) = inner.cache.get(&address) {
                inner.telemetry.record_memory_hit();
                let _ = tx.send(Ok(image));
                return ticket;
            }

            let tx = match registry.join(address, priority, tx) {
                Ok(()) => {
                    inner.telemetry.record_coalesced();
                    debug!(tile = %address, priority, "Joined in-flight request");
                    return ticket;
                }
                Err(tx) => tx,
            };

            if priority <= SKIP_PRIORITY {
                inner.telemetry.record_skipped();
                debug!(tile = %address, "Skipped zero-priority request");
                let _ = tx.send(Err(TileError::Cancelled));
                return ticket;
            }

            let evicted = registry.admit(address, priority, tx);
            (evicted, registry.dispatch())
        };

        if let Some(evicted) = evicted {
            inner.telemetry.record_evicted();
            debug!(
                tile = %evicted.address,
                waiters = evicted.waiters.len(),
                "Evicted oldest in-flight request"
            );
            evicted.cancel();
        }

        debug!(tile = %address, priority, "Admitted tile request");
        start(inner, dispatches);
        ticket
    }

    /// Request a tile and run `callback` with the outcome on a runtime task.
    pub fn load_with<F>(&self, address: TileAddress, priority: f32, callback: F)
    where
        F: FnOnce(TileAddress, TileOutcome) + Send + 'static,
    {
        let ticket = self.load(address, priority);
        self.inner.runtime.spawn(async move {
            let outcome = ticket.await;
            callback(address, outcome);
        });
    }

    /// Cancel the in-flight request for `address`.
    ///
    /// Every waiter receives [`TileError::Cancelled`]. Returns false if
    /// nothing was in flight for the address.
    pub fn cancel(&self, address: TileAddress) -> bool {
        let inner = &self.inner;
        let (entry, dispatches) = {
            let mut registry = inner.registry.lock();
            match registry.remove(&address) {
                Some(entry) => (entry, registry.dispatch()),
                None => return false,
            }
        };

        inner.telemetry.record_cancelled();
        debug!(tile = %address, waiters = entry.waiters.len(), "Cancelled tile request");
        entry.cancel();
        start(inner, dispatches);
        true
    }

    /// Cancel every in-flight request.
    pub fn cancel_all(&self) -> usize {
        let entries = self.inner.registry.lock().drain();
        let count = entries.len();
        for entry in entries {
            self.inner.telemetry.record_cancelled();
            entry.cancel();
        }
        if count > 0 {
            debug!(count, "Cancelled all tile requests");
        }
        count
    }

    /// Cached image for `address`, if any.
    pub fn current_image(&self, address: TileAddress) -> Option<TileImage> {
        self.inner.cache.get(&address)
    }

    /// Drop every decoded tile from the memory cache.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    /// Number of requests in the registry.
    pub fn in_flight(&self) -> usize {
        self.inner.registry.lock().len()
    }

    /// Addresses in the registry, oldest first.
    pub fn in_flight_addresses(&self) -> Vec<TileAddress> {
        self.inner.registry.lock().addresses()
    }

    /// Effective priority of an in-flight request.
    pub fn priority_of(&self, address: TileAddress) -> Option<f32> {
        self.inner.registry.lock().priority_of(&address)
    }

    pub fn telemetry(&self) -> LoaderSnapshot {
        self.inner.telemetry.snapshot()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    pub fn disk_store(&self) -> Option<&Arc<DiskTileStore>> {
        self.inner.disk.as_ref()
    }

    /// Runtime fetch tasks are spawned on.
    pub fn runtime(&self) -> &Handle {
        &self.inner.runtime
    }
}

impl LoaderInner {
    fn load_bundled(&self, address: &TileAddress) -> Option<TileImage> {
        let payload = self.bundle.lookup(address)?;
        match TileImage::decode(&payload) {
            Ok(image) => {
                debug!(tile = %address, "Loaded bundled tile");
                Some(image)
            }
            Err(e) => {
                warn!(tile = %address, error = %e, "Bundled tile is not decodable, fetching instead");
                None
            }
        }
    }
}

// =============================================================================
// Fetch tasks
// =============================================================================

fn start(inner: &Arc<LoaderInner>, dispatches: Vec<Dispatch>) {
    for dispatch in dispatches {
        inner.telemetry.record_fetch_started();
        inner.runtime.spawn(run_fetch(Arc::clone(inner), dispatch));
    }
}

async fn run_fetch(inner: Arc<LoaderInner>, dispatch: Dispatch) {
    let Dispatch {
        id,
        address,
        cancellation,
    } = dispatch;
    let url = inner.urls.url_for(address);

    let outcome = tokio::select! {
        biased;

        _ = cancellation.cancelled() => {
            debug!(tile = %address, "Fetch task stopped by cancellation");
            return;
        }

        outcome = fetch_tile(&inner, address, &url) => outcome,
    };

    finish(&inner, id, address, outcome);
}

async fn fetch_tile(inner: &LoaderInner, address: TileAddress, url: &str) -> TileOutcome {
    if let Some(disk) = &inner.disk {
        if let Some(payload) = disk.get(url).await {
            match decode(payload).await {
                Ok((image, _)) => {
                    inner.telemetry.record_disk_hit();
                    debug!(tile = %address, "Loaded tile from disk store");
                    return Ok(image);
                }
                Err(e) => {
                    warn!(tile = %address, error = %e, "Stored payload is not decodable, refetching");
                }
            }
        }
    }

    debug!(tile = %address, url, "Fetching tile");
    let payload = match tokio::time::timeout(inner.fetch_timeout, inner.client.get(url)).await {
        Ok(result) => result?,
        Err(_) => return Err(TileError::Timeout),
    };

    let (image, payload) = decode(payload).await?;

    if let Some(disk) = &inner.disk {
        if let Err(e) = disk.put(url, &payload).await {
            warn!(tile = %address, error = %e, "Failed to store tile payload");
        }
    }

    Ok(image)
}

async fn decode(payload: Vec<u8>) -> Result<(TileImage, Vec<u8>), TileError> {
    let (decoded, payload) =
        tokio::task::spawn_blocking(move || (TileImage::decode(&payload), payload))
            .await
            .map_err(|e| TileError::Decode(e.to_string()))?;

    decoded
        .map(|image| (image, payload))
        .map_err(|e| TileError::Decode(e.to_string()))
}

fn finish(inner: &Arc<LoaderInner>, id: u64, address: TileAddress, outcome: TileOutcome) {
    let (entry, dispatches) = {
        let mut registry = inner.registry.lock();
        let Some(entry) = registry.complete(id) else {
            inner.telemetry.record_late_discarded();
            debug!(tile = %address, "Discarded result of request no longer in flight");
            return;
        };
        if let Ok(image) = &outcome {
            inner.cache.put(address, image.clone());
        }
        (entry, registry.dispatch())
    };

    match &outcome {
        Ok(_) => {
            inner.telemetry.record_fetch_succeeded();
            debug!(tile = %address, waiters = entry.waiters.len(), "Tile loaded");
        }
        Err(e) => {
            inner.telemetry.record_fetch_failed();
            warn!(tile = %address, error = %e, "Tile load failed");
        }
    }

    start(inner, dispatches);
    entry.resolve(outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockAsyncHttpClient, ProviderError};
    use std::io::Cursor;
    use tempfile::TempDir;

    // =========================================================================
    // Helpers
    // =========================================================================

    fn png_bytes() -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image::RgbaImage::new(4, 4)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn tile(x: i32) -> TileAddress {
        TileAddress::new(x, 5, 10)
    }

    fn loader_with(mock: Arc<MockAsyncHttpClient>, config: LoaderConfig) -> TileLoader {
        TileLoader::builder(config).client(mock).build().unwrap()
    }

    fn loader(mock: Arc<MockAsyncHttpClient>) -> TileLoader {
        loader_with(mock, LoaderConfig::default())
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    // =========================================================================
    // Tests
    // =========================================================================

    #[tokio::test]
    async fn test_invalid_address_rejected_without_fetch() {
        let mock = Arc::new(MockAsyncHttpClient::new(Ok(png_bytes())));
        let loader = loader(Arc::clone(&mock));

        let invalid = TileAddress::new(2, 0, 1);
        let mut ticket = loader.load(invalid, 1.0);

        assert!(matches!(
            ticket.try_ready(),
            Some(Err(TileError::InvalidAddress(a))) if a == invalid
        ));
        assert_eq!(loader.in_flight(), 0);
        tokio::task::yield_now().await;
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_load_fetches_and_caches() {
        let mock = Arc::new(MockAsyncHttpClient::new(Ok(png_bytes())));
        let loader = loader(Arc::clone(&mock));

        let image = loader.load(tile(1), 1.0).await.unwrap();
        assert_eq!(image.width(), 4);
        assert!(loader.current_image(tile(1)).unwrap().ptr_eq(&image));
        assert_eq!(loader.in_flight(), 0);

        // Second request is a cache hit, resolved before return
        let mut again = loader.load(tile(1), 1.0);
        assert!(matches!(again.try_ready(), Some(Ok(_))));
        assert_eq!(mock.calls(), 1);
        assert_eq!(
            mock.requested_urls(),
            vec![TileUrlTemplate::default().url_for(tile(1))]
        );
    }

    #[tokio::test]
    async fn test_identical_requests_share_one_fetch() {
        let (mock, gate) = MockAsyncHttpClient::new(Ok(png_bytes())).gated();
        let mock = Arc::new(mock);
        let loader = loader(Arc::clone(&mock));

        let first = loader.load(tile(1), 0.5);
        let second = loader.load(tile(1), 1.0);
        assert_eq!(loader.in_flight(), 1);
        assert_eq!(loader.priority_of(tile(1)), Some(1.0));

        gate.add_permits(1);
        let a = first.await.unwrap();
        let b = second.await.unwrap();
        assert!(a.ptr_eq(&b));
        assert_eq!(mock.calls(), 1);
        assert_eq!(loader.telemetry().coalesced, 1);
    }

    #[tokio::test]
    async fn test_ninth_request_evicts_oldest() {
        let (mock, _gate) = MockAsyncHttpClient::new(Ok(png_bytes())).gated();
        let loader = loader(Arc::new(mock));

        let tickets: Vec<_> = (0..9).map(|x| loader.load(tile(x), 0.5)).collect();

        assert_eq!(loader.in_flight(), 8);
        assert!(!loader.in_flight_addresses().contains(&tile(0)));
        assert_eq!(loader.telemetry().evicted, 1);

        let mut tickets = tickets.into_iter();
        let oldest = tickets.next().unwrap();
        assert!(matches!(oldest.await, Err(TileError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_resolves_waiters_and_skips_cache() {
        let (mock, gate) = MockAsyncHttpClient::new(Ok(png_bytes())).gated();
        let loader = loader(Arc::new(mock));

        let first = loader.load(tile(1), 1.0);
        let second = loader.load(tile(1), 1.0);

        assert!(loader.cancel(tile(1)));
        assert!(!loader.cancel(tile(1)));
        assert!(matches!(first.await, Err(TileError::Cancelled)));
        assert!(matches!(second.await, Err(TileError::Cancelled)));

        gate.add_permits(1);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(loader.current_image(tile(1)).is_none());
        assert_eq!(loader.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_cached() {
        let mock = Arc::new(MockAsyncHttpClient::new(Err(ProviderError::Status {
            status: 404,
            url: "u".to_string(),
        })));
        let loader = loader(mock);

        let outcome = loader.load(tile(1), 1.0).await;
        assert!(matches!(outcome, Err(TileError::Transport(_))));
        assert!(loader.current_image(tile(1)).is_none());
        assert_eq!(loader.telemetry().fetches_failed, 1);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_decode_error() {
        let mock = Arc::new(MockAsyncHttpClient::new(Ok(b"not an image".to_vec())));
        let loader = loader(mock);

        let outcome = loader.load(tile(1), 1.0).await;
        assert!(matches!(outcome, Err(TileError::Decode(_))));
        assert!(loader.current_image(tile(1)).is_none());
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let (mock, _gate) = MockAsyncHttpClient::new(Ok(png_bytes())).gated();
        let config = LoaderConfig::default().with_fetch_timeout(Duration::from_millis(30));
        let loader = loader_with(Arc::new(mock), config);

        let outcome = loader.load(tile(1), 1.0).await;
        assert!(matches!(outcome, Err(TileError::Timeout)));
        assert_eq!(loader.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_zero_priority_miss_does_not_fetch() {
        let mock = Arc::new(MockAsyncHttpClient::new(Ok(png_bytes())));
        let loader = loader(Arc::clone(&mock));

        let mut ticket = loader.load(tile(1), 0.0);
        assert!(matches!(ticket.try_ready(), Some(Err(TileError::Cancelled))));
        assert_eq!(loader.in_flight(), 0);
        assert_eq!(mock.calls(), 0);
        assert_eq!(loader.telemetry().skipped, 1);
    }

    #[tokio::test]
    async fn test_zero_priority_joins_existing_fetch() {
        let (mock, gate) = MockAsyncHttpClient::new(Ok(png_bytes())).gated();
        let loader = loader(Arc::new(mock));

        let wanted = loader.load(tile(1), 0.5);
        let passive = loader.load(tile(1), 0.0);
        assert_eq!(loader.priority_of(tile(1)), Some(0.5));

        gate.add_permits(1);
        assert!(wanted.await.is_ok());
        assert!(passive.await.is_ok());
    }

    #[tokio::test]
    async fn test_bundled_tile_skips_network() {
        let mock = Arc::new(MockAsyncHttpClient::new(Ok(png_bytes())));
        let mut bundle = MemoryBundle::new();
        bundle.insert(tile(1), png_bytes());
        let loader = TileLoader::builder(LoaderConfig::default())
            .client(mock.clone())
            .bundle(Arc::new(bundle))
            .build()
            .unwrap();

        let mut ticket = loader.load(tile(1), 1.0);
        assert!(matches!(ticket.try_ready(), Some(Ok(_))));
        assert!(loader.current_image(tile(1)).is_some());
        assert_eq!(loader.in_flight(), 0);
        assert_eq!(mock.calls(), 0);
        assert_eq!(loader.telemetry().bundle_hits, 1);
    }

    #[tokio::test]
    async fn test_broken_bundled_tile_falls_back_to_network() {
        let mock = Arc::new(MockAsyncHttpClient::new(Ok(png_bytes())));
        let mut bundle = MemoryBundle::new();
        bundle.insert(tile(1), b"broken".to_vec());
        let loader = TileLoader::builder(LoaderConfig::default())
            .client(mock.clone())
            .bundle(Arc::new(bundle))
            .build()
            .unwrap();

        assert!(loader.load(tile(1), 1.0).await.is_ok());
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_free_slot_goes_to_highest_priority() {
        let (mock, gate) = MockAsyncHttpClient::new(Ok(png_bytes())).gated();
        let mock = Arc::new(mock);
        let config = LoaderConfig::default().with_max_connections(1);
        let loader = loader_with(Arc::clone(&mock), config);

        let _a = loader.load(tile(1), 0.2);
        let _b = loader.load(tile(2), 0.3);
        let _c = loader.load(tile(3), 0.9);
        wait_until(|| mock.calls() == 1).await;

        gate.add_permits(1);
        wait_until(|| mock.calls() == 2).await;
        gate.add_permits(1);
        wait_until(|| mock.calls() == 3).await;

        let urls = mock.requested_urls();
        let template = TileUrlTemplate::default();
        assert_eq!(urls[0], template.url_for(tile(1)));
        assert_eq!(urls[1], template.url_for(tile(3)));
        assert_eq!(urls[2], template.url_for(tile(2)));
    }

    #[tokio::test]
    async fn test_disk_store_answers_second_loader() {
        let dir = TempDir::new().unwrap();
        let config = LoaderConfig::default().with_disk_cache(DiskCacheConfig::new(dir.path()));

        let first_mock = Arc::new(MockAsyncHttpClient::new(Ok(png_bytes())));
        let first = loader_with(Arc::clone(&first_mock), config.clone());
        assert!(first.load(tile(1), 1.0).await.is_ok());
        assert_eq!(first_mock.calls(), 1);

        let second_mock = Arc::new(MockAsyncHttpClient::new(Ok(png_bytes())));
        let second = loader_with(Arc::clone(&second_mock), config);
        assert!(second.load(tile(1), 1.0).await.is_ok());
        assert_eq!(second_mock.calls(), 0);
        assert_eq!(second.telemetry().disk_hits, 1);
    }

    #[tokio::test]
    async fn test_load_with_runs_callback() {
        let mock = Arc::new(MockAsyncHttpClient::new(Ok(png_bytes())));
        let loader = loader(mock);
        let (tx, rx) = tokio::sync::oneshot::channel();

        loader.load_with(tile(1), 1.0, move |address, outcome| {
            let _ = tx.send((address, outcome.is_ok()));
        });

        assert_eq!(rx.await.unwrap(), (tile(1), true));
    }

    #[tokio::test]
    async fn test_cancel_all() {
        let (mock, _gate) = MockAsyncHttpClient::new(Ok(png_bytes())).gated();
        let loader = loader(Arc::new(mock));

        let ticket = loader.load(tile(1), 1.0);
        loader.load(tile(2), 1.0);

        assert_eq!(loader.cancel_all(), 2);
        assert_eq!(loader.in_flight(), 0);
        assert!(matches!(ticket.await, Err(TileError::Cancelled)));
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let mock = Arc::new(MockAsyncHttpClient::new(Ok(png_bytes())));
        let loader = loader(mock);
        loader.load(tile(1), 1.0).await.unwrap();

        loader.clear_cache();
        assert!(loader.current_image(tile(1)).is_none());
    }

    #[test]
    fn test_build_outside_runtime_fails() {
        let mock = Arc::new(MockAsyncHttpClient::new(Ok(Vec::new())));
        let result = TileLoader::builder(LoaderConfig::default())
            .client(mock)
            .build();
        assert!(matches!(result, Err(LoaderError::NoRuntime)));
    }
}
