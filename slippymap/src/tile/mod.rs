//! Tile payload and request types.
//!
//! Provides [`TileImage`], the decoded bitmap shared between the cache, the
//! loader and renderers, and [`TileRequest`], an address paired with the
//! priority it should be loaded at.

mod bitmap;
mod request;

pub use bitmap::TileImage;
pub(crate) use request::normalize_priority;
pub use request::{TileRequest, CENTER_PRIORITY, NEIGHBOUR_PRIORITY, SKIP_PRIORITY};
