//! Integration tests for the tile loader.
//!
//! These tests drive the public loader API against a scripted HTTP client:
//! - identical requests coalesce into one fetch at the highest priority,
//!   also when issued from tasks on different worker threads
//! - the in-flight bound evicts the oldest request
//! - cancellation resolves every waiter and keeps late results out of the cache
//! - invalid addresses never reach the network
//!
//! Run with: `cargo test --test loader_integration`

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{Barrier, Semaphore};

use slippymap::coord::TileAddress;
use slippymap::loader::{LoaderConfig, TileError, TileLoader};
use slippymap::provider::{AsyncHttpClient, ProviderError, TileUrlTemplate};

// ============================================================================
// Helper Functions
// ============================================================================

/// HTTP client that answers every request with a small PNG once a permit is
/// available on its gate.
struct GatedClient {
    gate: Arc<Semaphore>,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl GatedClient {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            gate: Arc::new(Semaphore::new(0)),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        })
    }

    fn release(&self, responses: usize) {
        self.gate.add_permits(responses);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl AsyncHttpClient for GatedClient {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ProviderError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        Box::pin(async move {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| ProviderError::HttpError(e.to_string()))?;
            permit.forget();
            Ok(png_bytes())
        })
    }
}

fn png_bytes() -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::RgbaImage::new(8, 8)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn loader(client: &Arc<GatedClient>) -> TileLoader {
    TileLoader::builder(LoaderConfig::default())
        .client(Arc::clone(client) as Arc<dyn AsyncHttpClient>)
        .build()
        .unwrap()
}

/// Tiles of the Moscow centre at zoom 10.
fn moscow(dx: i32) -> TileAddress {
    TileAddress::new(619 + dx, 320, 10)
}

// ============================================================================
// Integration Tests
// ============================================================================

#[tokio::test]
async fn test_duplicate_requests_coalesce_at_highest_priority() {
    let client = GatedClient::new();
    let loader = loader(&client);

    let low = loader.load(moscow(0), 0.5);
    let high = loader.load(moscow(0), 1.0);

    assert_eq!(loader.in_flight(), 1);
    assert_eq!(loader.priority_of(moscow(0)), Some(1.0));

    client.release(1);
    let a = low.await.unwrap();
    let b = high.await.unwrap();

    assert!(a.ptr_eq(&b));
    assert_eq!(client.calls(), 1);
    assert_eq!(
        client.urls(),
        vec![TileUrlTemplate::default().url_for(moscow(0))]
    );
    assert!(loader.current_image(moscow(0)).is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_from_many_tasks_share_one_fetch() {
    const TASKS: usize = 16;

    let client = GatedClient::new();
    let loader = loader(&client);
    let registered = Arc::new(Barrier::new(TASKS + 1));

    let handles: Vec<_> = (0..TASKS)
        .map(|i| {
            let loader = loader.clone();
            let registered = Arc::clone(&registered);
            tokio::spawn(async move {
                let ticket = loader.load(moscow(0), i as f32 / TASKS as f32);
                registered.wait().await;
                ticket.await
            })
        })
        .collect();

    registered.wait().await;
    assert_eq!(loader.in_flight(), 1);
    assert_eq!(loader.priority_of(moscow(0)), Some((TASKS - 1) as f32 / TASKS as f32));

    client.release(1);
    let mut images = Vec::new();
    for handle in handles {
        images.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(client.calls(), 1);
    assert!(images.iter().all(|image| image.ptr_eq(&images[0])));
    assert_eq!(loader.in_flight(), 0);
}

#[tokio::test]
async fn test_ninth_request_evicts_the_oldest() {
    let client = GatedClient::new();
    let loader = loader(&client);

    let mut tickets: Vec<_> = (0..9).map(|dx| loader.load(moscow(dx), 0.5)).collect();

    assert_eq!(loader.in_flight(), 8);
    let addresses = loader.in_flight_addresses();
    assert!(!addresses.contains(&moscow(0)));
    assert!(addresses.contains(&moscow(8)));

    let oldest = tickets.remove(0);
    assert!(matches!(oldest.await, Err(TileError::Cancelled)));

    client.release(16);
    for ticket in tickets {
        assert!(ticket.await.is_ok());
    }
    assert_eq!(loader.in_flight(), 0);
    assert!(loader.current_image(moscow(0)).is_none());
    assert!(loader.current_image(moscow(8)).is_some());
}

#[tokio::test]
async fn test_cancel_resolves_waiters_and_discards_late_result() {
    let client = GatedClient::new();
    let loader = loader(&client);

    let first = loader.load(moscow(1), 1.0);
    let second = loader.load(moscow(1), 0.5);

    assert!(loader.cancel(moscow(1)));
    assert!(matches!(first.await, Err(TileError::Cancelled)));
    assert!(matches!(second.await, Err(TileError::Cancelled)));

    client.release(1);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(loader.in_flight(), 0);
    assert!(loader.current_image(moscow(1)).is_none());
}

#[tokio::test]
async fn test_invalid_address_never_fetched() {
    let client = GatedClient::new();
    let loader = loader(&client);

    let invalid = TileAddress::new(2, 0, 1);
    let outcome = loader.load(invalid, 1.0).await;

    assert!(matches!(outcome, Err(TileError::InvalidAddress(a)) if a == invalid));
    assert_eq!(client.calls(), 0);
    assert_eq!(loader.in_flight(), 0);
    assert_eq!(loader.telemetry().rejected, 1);
}

#[tokio::test]
async fn test_cached_tile_served_without_fetch() {
    let client = GatedClient::new();
    let loader = loader(&client);

    client.release(1);
    loader.load(moscow(2), 1.0).await.unwrap();

    let mut again = loader.load(moscow(2), 0.0);
    assert!(matches!(again.try_ready(), Some(Ok(_))));
    assert_eq!(client.calls(), 1);
}
