//! Tile load request types.
//!
//! Provides the `TileRequest` type that pairs a tile address with the
//! priority a visible-tile pass wants it loaded at.

use crate::coord::TileAddress;

/// Priority of the tile directly under the camera.
pub const CENTER_PRIORITY: f32 = 1.0;

/// Priority of a neighbouring tile that intersects the camera frame.
pub const NEIGHBOUR_PRIORITY: f32 = 0.5;

/// Priority of a tile that should not be fetched.
pub const SKIP_PRIORITY: f32 = 0.0;

/// Request to load a tile.
///
/// Priority ranges from 0.0 to 1.0, higher is more urgent. A priority of
/// zero means "do not fetch"; such requests may still be satisfied from the
/// cache.
///
/// # Example
///
/// ```
/// use slippymap::coord::TileAddress;
/// use slippymap::tile::TileRequest;
///
/// let request = TileRequest::new(TileAddress::new(619, 320, 10), 0.5);
/// assert_eq!(request.address().x, 619);
/// assert!(request.should_fetch());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileRequest {
    address: TileAddress,
    priority: f32,
}

impl TileRequest {
    /// Create a new tile request. The priority is clamped to `[0, 1]`.
    pub fn new(address: TileAddress, priority: f32) -> Self {
        Self {
            address,
            priority: normalize_priority(priority),
        }
    }

    /// Get the tile address.
    pub fn address(&self) -> TileAddress {
        self.address
    }

    /// Get the priority.
    pub fn priority(&self) -> f32 {
        self.priority
    }

    /// Returns true if this request may issue a fetch.
    pub fn should_fetch(&self) -> bool {
        self.priority > SKIP_PRIORITY
    }
}

/// Clamps a priority to `[0, 1]`, mapping NaN to zero.
pub(crate) fn normalize_priority(priority: f32) -> f32 {
    if priority.is_nan() {
        SKIP_PRIORITY
    } else {
        priority.clamp(SKIP_PRIORITY, CENTER_PRIORITY)
    }
}
