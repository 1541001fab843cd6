//! Loader result and error types.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::sync::oneshot;

use crate::coord::TileAddress;
use crate::provider::ProviderError;
use crate::tile::TileImage;

/// Terminal outcome of a tile request.
pub type TileOutcome = Result<TileImage, TileError>;

/// Why a tile request did not produce an image.
///
/// Every variant is terminal; the loader never retries. Callers re-request
/// on their next visible-tile pass if the tile is still needed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TileError {
    /// Tile indices outside `[0, 2^z)` or zoom above the maximum.
    #[error("Invalid tile address {0}")]
    InvalidAddress(TileAddress),

    /// Network failure or non-success HTTP status.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Payload was not a decodable image.
    #[error("Failed to decode tile: {0}")]
    Decode(String),

    /// Fetch exceeded its time budget.
    #[error("Tile request timed out")]
    Timeout,

    /// Request was cancelled or evicted before it completed.
    #[error("Tile request cancelled")]
    Cancelled,
}

impl From<ProviderError> for TileError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Timeout => TileError::Timeout,
            other => TileError::Transport(other.to_string()),
        }
    }
}

/// Errors that can occur while building a loader.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// No Tokio runtime was available to run fetch tasks on.
    #[error("Tile loader must be created inside a Tokio runtime")]
    NoRuntime,

    /// The HTTP client could not be created.
    #[error(transparent)]
    Client(#[from] ProviderError),

    /// The bundle directory could not be read.
    #[error("Failed to load tile bundle from {path}: {source}")]
    Bundle {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Handle to the result of a [`load`](super::TileLoader::load) call.
///
/// Awaiting the ticket yields the outcome. Requests answered without I/O
/// (invalid address, cache hit, bundled tile) are already resolved when the
/// ticket is returned; [`TileTicket::try_ready`] picks those up without
/// awaiting.
#[derive(Debug)]
pub struct TileTicket {
    address: TileAddress,
    rx: oneshot::Receiver<TileOutcome>,
}

impl TileTicket {
    pub(crate) fn channel(address: TileAddress) -> (oneshot::Sender<TileOutcome>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { address, rx })
    }

    /// Address this ticket was issued for.
    pub fn address(&self) -> TileAddress {
        self.address
    }

    /// Returns the outcome if it is already available.
    ///
    /// Once this returns `Some`, the ticket is spent and must not be awaited.
    pub fn try_ready(&mut self) -> Option<TileOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(TileError::Cancelled)),
        }
    }
}

impl Future for TileTicket {
    type Output = TileOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // Sender dropped without an answer: the request went away
            Poll::Ready(Err(_)) => Poll::Ready(Err(TileError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_timeout_maps_to_timeout() {
        assert_eq!(TileError::from(ProviderError::Timeout), TileError::Timeout);
    }

    #[test]
    fn test_provider_status_maps_to_transport() {
        let err = TileError::from(ProviderError::Status {
            status: 503,
            url: "u".to_string(),
        });
        assert!(matches!(err, TileError::Transport(ref msg) if msg.contains("503")));
    }

    #[test]
    fn test_error_display() {
        let err = TileError::InvalidAddress(TileAddress::new(2, 0, 1));
        assert_eq!(err.to_string(), "Invalid tile address 1/2/0");
    }

    #[tokio::test]
    async fn test_ticket_resolves_with_sent_outcome() {
        let (tx, ticket) = TileTicket::channel(TileAddress::new(0, 0, 1));
        tx.send(Err(TileError::Timeout)).unwrap();
        assert_eq!(ticket.await.unwrap_err(), TileError::Timeout);
    }

    #[tokio::test]
    async fn test_dropped_sender_reads_as_cancelled() {
        let (tx, ticket) = TileTicket::channel(TileAddress::new(0, 0, 1));
        drop(tx);
        assert_eq!(ticket.await.unwrap_err(), TileError::Cancelled);
    }

    #[test]
    fn test_try_ready() {
        let (tx, mut ticket) = TileTicket::channel(TileAddress::new(0, 0, 1));
        assert!(ticket.try_ready().is_none());
        tx.send(Err(TileError::Cancelled)).unwrap();
        assert!(matches!(ticket.try_ready(), Some(Err(TileError::Cancelled))));
    }
}
