//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude),
//! the zoom-0 Web Mercator plane, per-zoom layer planes and XYZ tile addresses.
//!
//! Two tile lookups exist and are not interchangeable:
//!
//! - [`tile_address`] floors a world point onto the grid. Used for general
//!   addressing.
//! - [`visible_tile`] rounds a layer-plane point using the half-tile camera
//!   convention. Used to pick the tile under the camera.

mod types;

pub use types::{
    GeoCoordinate, Rect, ScreenPoint, Size, TileAddress, WorldPoint, ZoomAnchor, BUILDING_ZOOM,
    DISTRICT_ZOOM, MAX_ZOOM, MIN_ZOOM, NEAR_DISTANCE_M, TILE_LENGTH,
};

use std::f64::consts::PI;

/// Largest latitude representable in square Web Mercator.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Half of a tile edge.
const HALF_TILE: f64 = TILE_LENGTH * 0.5;

#[inline]
fn zoom_factor(zoom: u8) -> f64 {
    2.0_f64.powi(i32::from(zoom))
}

/// `2^(z-1)` as an integer, i.e. half the grid size.
#[inline]
fn half_grid(zoom: u8) -> i64 {
    (1i64 << zoom.min(62)) / 2
}

/// Converts a geographic coordinate to the zoom-0 world plane.
///
/// Latitude is clamped to `±MAX_LATITUDE` and longitude to `[-180, 180]`, so
/// polar and antimeridian input lands on the edge of the plane instead of
/// leaving it.
#[inline]
pub fn to_world_point(coord: GeoCoordinate) -> WorldPoint {
    let latitude = coord.latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let longitude = coord.longitude.clamp(-180.0, 180.0);
    let sin_lat = (latitude * PI / 180.0).sin().clamp(-1.0, 1.0);
    let y = ((1.0 + sin_lat) / (1.0 - sin_lat)).ln();

    WorldPoint {
        x: TILE_LENGTH * (0.5 + longitude / 360.0),
        y: TILE_LENGTH * (0.5 - y / (4.0 * PI)),
    }
}

/// Converts a zoom-0 world point back to a geographic coordinate.
#[inline]
pub fn to_geo(point: WorldPoint) -> GeoCoordinate {
    let longitude = point.x / TILE_LENGTH * 360.0 - 180.0;
    let mercator = (0.5 - point.y / TILE_LENGTH) * 2.0 * PI;
    let latitude = mercator.sinh().atan() * 180.0 / PI;

    GeoCoordinate {
        latitude,
        longitude,
    }
}

/// Floors a world point onto the tile grid at `zoom`.
///
/// Indices are clamped to `0..2^zoom`; the east edge (`x == 256`) belongs to
/// the last column and the south edge to the last row.
#[inline]
pub fn tile_address(point: WorldPoint, zoom: u8) -> TileAddress {
    let n = zoom_factor(zoom);
    let cell = |v: f64| (v * n / TILE_LENGTH).floor().clamp(0.0, n - 1.0) as i32;
    TileAddress {
        x: cell(point.x),
        y: cell(point.y),
        z: zoom,
    }
}

/// Tile address of a geographic coordinate at `zoom`.
#[inline]
pub fn tile_address_of(coord: GeoCoordinate, zoom: u8) -> TileAddress {
    tile_address(to_world_point(coord), zoom)
}

/// Tile under a layer-plane point, rounded to the cell centre.
///
/// The layer plane is centred on the world origin, so the camera sitting on a
/// tile corner resolves to the tile south-east of it.
#[inline]
pub fn visible_tile(point: ScreenPoint, zoom: u8) -> TileAddress {
    let x = (0.5 + point.x / TILE_LENGTH).round() as i64;
    let y = -((-0.5 + point.y / TILE_LENGTH).round() as i64);
    let offset = half_grid(zoom) - 1;

    TileAddress {
        x: (x + offset) as i32,
        y: (y + offset) as i32,
        z: zoom,
    }
}

/// South-west corner of a tile in its zoom layer's plane.
#[inline]
pub fn tile_origin(addr: TileAddress) -> ScreenPoint {
    let offset = 2.0_f64.powi(i32::from(addr.z) - 1);
    ScreenPoint {
        x: TILE_LENGTH * (-offset + f64::from(addr.x)),
        y: TILE_LENGTH * (offset - f64::from(addr.y) - 1.0),
    }
}

/// Centre of a tile in its zoom layer's plane.
#[inline]
pub fn tile_center(addr: TileAddress) -> ScreenPoint {
    tile_origin(addr) + ScreenPoint::new(HALF_TILE, HALF_TILE)
}

/// Square covered by a tile in its zoom layer's plane.
#[inline]
pub fn tile_frame(addr: TileAddress) -> Rect {
    Rect::from_center(tile_center(addr), Size::new(TILE_LENGTH, TILE_LENGTH))
}

/// Projects a world point into the plane of the zoom layer `zoom`.
#[inline]
pub fn screen_position(point: WorldPoint, zoom: u8) -> ScreenPoint {
    let n = zoom_factor(zoom);
    ScreenPoint {
        x: (point.x - HALF_TILE) * n,
        y: (HALF_TILE - point.y) * n,
    }
}

/// Inverse of [`screen_position`].
#[inline]
pub fn world_point(point: ScreenPoint, zoom: u8) -> WorldPoint {
    let n = zoom_factor(zoom);
    WorldPoint {
        x: point.x / n + HALF_TILE,
        y: HALF_TILE - point.y / n,
    }
}

/// Layer-plane position of a geographic coordinate.
#[inline]
pub fn geo_to_screen(coord: GeoCoordinate, zoom: u8) -> ScreenPoint {
    screen_position(to_world_point(coord), zoom)
}

/// Geographic coordinate of a layer-plane position.
#[inline]
pub fn screen_to_geo(point: ScreenPoint, zoom: u8) -> GeoCoordinate {
    to_geo(world_point(point, zoom))
}

/// Normalizes a layer-plane position by half the world size at `zoom`.
#[inline]
pub fn anchor(point: ScreenPoint, zoom: u8) -> ZoomAnchor {
    let half_world = HALF_TILE * zoom_factor(zoom);
    ZoomAnchor {
        x: point.x / half_world,
        y: point.y / half_world,
    }
}

/// Inverse of [`anchor`].
#[inline]
pub fn from_anchor(anchor: ZoomAnchor, zoom: u8) -> ScreenPoint {
    let half_world = HALF_TILE * zoom_factor(zoom);
    ScreenPoint {
        x: anchor.x * half_world,
        y: anchor.y * half_world,
    }
}

/// North-west corner of the world in the plane of `zoom`.
#[inline]
pub fn upper_left(zoom: u8) -> ScreenPoint {
    let half_world = TILE_LENGTH * 2.0_f64.powi(i32::from(zoom) - 1);
    ScreenPoint::new(-half_world, half_world)
}
