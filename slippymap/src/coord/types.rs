//! Coordinate and tile address types.
//!
//! Three planes are in play:
//!
//! - [`WorldPoint`]: the zoom-0 Web Mercator plane, `[0, 256)` on both axes,
//!   y growing southward.
//! - [`ScreenPoint`]: the plane a zoom layer is laid out in. It is centred on
//!   (lat 0, lon 0), scaled by `2^z` and y grows northward.
//! - [`ZoomAnchor`]: a screen point divided by half the world size at its zoom.
//!   The same geographic point has the same anchor at every zoom.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Length of a tile edge in plane units (and pixels).
pub const TILE_LENGTH: f64 = 256.0;

/// Minimum zoom level a map layer exists for.
pub const MIN_ZOOM: u8 = 1;

/// Maximum supported zoom level.
pub const MAX_ZOOM: u8 = 18;

/// Zoom level used when centring on the user for the first time.
pub const DISTRICT_ZOOM: f64 = 14.0;

/// Zoom level used when focusing a single building or maneuver.
pub const BUILDING_ZOOM: f64 = 17.0;

/// Mean Earth radius in metres (IUGG).
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Distance under which two coordinates are considered the same place.
pub const NEAR_DISTANCE_M: f64 = 50.0;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    /// Create a coordinate from latitude and longitude in degrees.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in metres (haversine).
    pub fn distance_m(&self, other: &GeoCoordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Returns true when `other` is closer than [`NEAR_DISTANCE_M`].
    pub fn is_near(&self, other: &GeoCoordinate) -> bool {
        self.distance_m(other) < NEAR_DISTANCE_M
    }
}

impl fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Position on the zoom-0 Web Mercator plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

impl WorldPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Absolute position in a zoom layer's plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const ZERO: ScreenPoint = ScreenPoint { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point in the same plane.
    pub fn distance(&self, other: &ScreenPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl Add for ScreenPoint {
    type Output = ScreenPoint;

    fn add(self, rhs: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for ScreenPoint {
    type Output = ScreenPoint;

    fn sub(self, rhs: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for ScreenPoint {
    type Output = ScreenPoint;

    fn mul(self, rhs: f64) -> ScreenPoint {
        ScreenPoint::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for ScreenPoint {
    type Output = ScreenPoint;

    fn neg(self) -> ScreenPoint {
        ScreenPoint::new(-self.x, -self.y)
    }
}

/// Zoom-normalized position, invariant across zoom levels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ZoomAnchor {
    pub x: f64,
    pub y: f64,
}

impl ZoomAnchor {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Size of a viewport or rectangle in screen units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Uniformly scale both dimensions.
    pub fn scaled(&self, factor: f64) -> Size {
        Size::new(self.width * factor, self.height * factor)
    }
}

/// Axis-aligned rectangle in the screen plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: ScreenPoint,
    pub size: Size,
}

impl Rect {
    pub const fn new(origin: ScreenPoint, size: Size) -> Self {
        Self { origin, size }
    }

    /// Rectangle of `size` centred on `center`.
    pub fn from_center(center: ScreenPoint, size: Size) -> Self {
        Self {
            origin: ScreenPoint::new(center.x - size.width * 0.5, center.y - size.height * 0.5),
            size,
        }
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(
            self.origin.x + self.size.width * 0.5,
            self.origin.y + self.size.height * 0.5,
        )
    }

    pub fn min_x(&self) -> f64 {
        self.origin.x
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn min_y(&self) -> f64 {
        self.origin.y
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.height
    }

    /// Returns true if the two rectangles overlap with a non-empty area.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min_x() < other.max_x()
            && other.min_x() < self.max_x()
            && self.min_y() < other.max_y()
            && other.min_y() < self.max_y()
    }

    /// Same rectangle moved by `offset`.
    pub fn offset_by(&self, offset: ScreenPoint) -> Rect {
        Rect::new(self.origin + offset, self.size)
    }
}

/// Address of a tile in the XYZ grid.
///
/// Indices are signed so that neighbours of edge tiles can be expressed and
/// then rejected by [`TileAddress::is_valid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileAddress {
    pub x: i32,
    pub y: i32,
    pub z: u8,
}

impl TileAddress {
    pub const fn new(x: i32, y: i32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Number of tiles along one axis at this address's zoom level.
    pub fn grid_size(&self) -> i64 {
        1i64 << self.z.min(MAX_ZOOM)
    }

    /// Returns true when `0 <= x, y < 2^z` and the zoom is supported.
    pub fn is_valid(&self) -> bool {
        if self.z > MAX_ZOOM {
            return false;
        }
        let n = self.grid_size();
        self.x >= 0 && self.y >= 0 && i64::from(self.x) < n && i64::from(self.y) < n
    }

    /// The eight neighbouring addresses, column by column.
    ///
    /// Neighbours are returned even when they fall outside the grid.
    pub fn tiles_around(&self) -> Vec<TileAddress> {
        let mut tiles = Vec::with_capacity(8);
        for x in (self.x - 1)..=(self.x + 1) {
            for y in (self.y - 1)..=(self.y + 1) {
                if x != self.x || y != self.y {
                    tiles.push(TileAddress::new(x, y, self.z));
                }
            }
        }
        tiles
    }

    /// Key used to look the tile up in a bundled asset set.
    pub fn bundle_name(&self) -> String {
        format!("{}-{}-{}", self.x, self.y, self.z)
    }
}

impl Add for TileAddress {
    type Output = TileAddress;

    fn add(self, rhs: TileAddress) -> TileAddress {
        debug_assert_eq!(self.z, rhs.z, "adding addresses of different zoom levels");
        TileAddress::new(self.x + rhs.x, self.y + rhs.y, self.z)
    }
}

impl Sub for TileAddress {
    type Output = TileAddress;

    fn sub(self, rhs: TileAddress) -> TileAddress {
        debug_assert_eq!(self.z, rhs.z, "subtracting addresses of different zoom levels");
        TileAddress::new(self.x - rhs.x, self.y - rhs.y, self.z)
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}
