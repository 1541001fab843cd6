//! Map state and zoom continuity.
//!
//! - [`ZoomLayer`] - tile slots and placement correction of one zoom level
//! - [`MapView`] - camera, scale and overlays; changes zoom without moving
//!   the geographic point under the camera
//! - [`MapEngine`] - drives a view with a [`TileLoader`](crate::loader::TileLoader)
//! - [`DrawList`] - what to render for the current state

mod draw;
mod engine;
mod layer;
mod view;

pub use draw::{DrawList, Marker, MarkerKind, RoutePath, RouteRun, TilePlacement};
pub use engine::{FollowingMode, MapEngine, MapEvent};
pub use layer::{TileSlot, ZoomLayer};
pub use view::{zoom_for_scale, MapView, ZoomTransition, MAX_SCALE, MIN_SCALE};
