//! Render-agnostic draw instructions.
//!
//! A [`DrawList`] is everything a renderer needs for one frame, computed from
//! view state alone. All positions are in the current layer's corrected plane
//! (y up); the renderer maps the camera to its screen centre and scales by
//! `camera_scale`.

use serde::Serialize;

use crate::coord::{ScreenPoint, TileAddress};
use crate::session::TrafficLoad;
use crate::tile::TileImage;

#[derive(Debug, Clone, Serialize)]
pub struct DrawList {
    pub zoom: u8,
    pub scale: f64,
    pub camera: ScreenPoint,
    pub camera_scale: f64,
    pub tiles: Vec<TilePlacement>,
    pub route: Option<RoutePath>,
    /// Drawn in order; the user location is always last.
    pub markers: Vec<Marker>,
}

/// A tile slot and where its centre goes.
#[derive(Debug, Clone, Serialize)]
pub struct TilePlacement {
    pub address: TileAddress,
    pub center: ScreenPoint,
    pub loaded: bool,
    #[serde(skip)]
    pub image: Option<TileImage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    RouteStart,
    RouteEnd,
    Destination,
    /// Start of the maneuver the user picked from the route's list.
    SelectedManeuver,
    UserLocation,
}

/// A point overlay. Markers keep a constant on-screen size, so `scale` is
/// the camera scale they must be drawn at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub position: ScreenPoint,
    pub scale: f64,
}

/// Route polyline relative to `origin`, the placed route start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePath {
    pub origin: ScreenPoint,
    pub segments: Vec<RouteRun>,
}

impl RoutePath {
    /// Every point of the line in order, relative to the origin.
    pub fn points(&self) -> impl Iterator<Item = &ScreenPoint> {
        self.segments.iter().flat_map(|s| s.points.iter())
    }
}

/// Consecutive route points sharing one traffic load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRun {
    pub traffic: TrafficLoad,
    pub points: Vec<ScreenPoint>,
}
