//! Per-zoom tile layers.
//!
//! Each zoom level owns a layer whose tiles are laid out in that zoom's
//! screen plane, shifted by a correction that keeps the tile under the camera
//! near the plane origin. Large absolute coordinates at high zoom would
//! otherwise lose precision in the renderer.

use std::collections::BTreeMap;

use crate::coord::{self, Rect, ScreenPoint, TileAddress, TILE_LENGTH};
use crate::tile::{TileImage, TileRequest, CENTER_PRIORITY, NEIGHBOUR_PRIORITY, SKIP_PRIORITY};

/// Load state of one tile slot.
#[derive(Debug, Clone, Default)]
pub enum TileSlot {
    /// Placed but not requested, or the last request failed.
    #[default]
    Empty,
    Loading,
    Loaded(TileImage),
}

impl TileSlot {
    pub fn image(&self) -> Option<&TileImage> {
        match self {
            TileSlot::Loaded(image) => Some(image),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, TileSlot::Loading)
    }
}

/// Tiles and placement correction of a single zoom level.
#[derive(Debug, Clone)]
pub struct ZoomLayer {
    zoom: u8,
    zero_tile: TileAddress,
    visible_tile: TileAddress,
    correction: ScreenPoint,
    slots: BTreeMap<TileAddress, TileSlot>,
}

impl ZoomLayer {
    pub fn new(zoom: u8) -> Self {
        let half = 1i32 << (zoom.max(1) - 1);
        Self {
            zoom,
            zero_tile: TileAddress::new(half, half - 1, zoom),
            visible_tile: TileAddress::new(0, 0, zoom),
            correction: ScreenPoint::ZERO,
            slots: BTreeMap::new(),
        }
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Tile whose south-west corner sits on the plane origin.
    pub fn zero_tile(&self) -> TileAddress {
        self.zero_tile
    }

    pub fn visible_tile(&self) -> TileAddress {
        self.visible_tile
    }

    /// Offset added to absolute plane positions when placing content.
    pub fn correction(&self) -> ScreenPoint {
        self.correction
    }

    /// Recentre the layer on `tile`.
    pub fn set_visible_tile(&mut self, tile: TileAddress) {
        let offset = self.zero_tile - tile;
        self.visible_tile = tile;
        self.correction = ScreenPoint::new(
            f64::from(offset.x) * TILE_LENGTH,
            -f64::from(offset.y) * TILE_LENGTH,
        );
    }

    /// Requests for the tile under the camera and its eight neighbours.
    ///
    /// `camera_frame` is in the corrected plane. Neighbours outside the grid
    /// or not overlapping the frame get [`SKIP_PRIORITY`].
    pub fn plan_visible_tiles(&self, camera_frame: Rect) -> Vec<TileRequest> {
        let frame = Rect::from_center(camera_frame.center() - self.correction, camera_frame.size);
        let center = coord::visible_tile(frame.center(), self.zoom);

        let mut plan = Vec::with_capacity(9);
        plan.push(TileRequest::new(center, CENTER_PRIORITY));
        for tile in center.tiles_around() {
            let priority = if tile.is_valid() && coord::tile_frame(tile).intersects(&frame) {
                NEIGHBOUR_PRIORITY
            } else {
                SKIP_PRIORITY
            };
            plan.push(TileRequest::new(tile, priority));
        }
        plan
    }

    /// Claim a slot for loading.
    ///
    /// Returns false when the address belongs to another zoom, is invalid,
    /// or its slot is already loading or loaded.
    pub fn begin_load(&mut self, address: TileAddress) -> bool {
        if address.z != self.zoom || !address.is_valid() {
            return false;
        }
        let slot = self.slots.entry(address).or_default();
        match slot {
            TileSlot::Empty => {
                *slot = TileSlot::Loading;
                true
            }
            TileSlot::Loading | TileSlot::Loaded(_) => false,
        }
    }

    /// Store a loaded image. Ignored unless the slot is waiting for one.
    pub fn finish_load(&mut self, address: TileAddress, image: TileImage) -> bool {
        match self.slots.get_mut(&address) {
            Some(slot) if slot.is_loading() => {
                *slot = TileSlot::Loaded(image);
                true
            }
            _ => false,
        }
    }

    /// Return a loading slot to empty so a later pass can retry it.
    pub fn abandon_load(&mut self, address: TileAddress) -> bool {
        match self.slots.get_mut(&address) {
            Some(slot) if slot.is_loading() => {
                *slot = TileSlot::Empty;
                true
            }
            _ => false,
        }
    }

    pub fn slot(&self, address: &TileAddress) -> Option<&TileSlot> {
        self.slots.get(address)
    }

    pub fn slots(&self) -> impl Iterator<Item = (&TileAddress, &TileSlot)> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Position of a tile's centre in the corrected plane.
    pub fn placement(&self, address: TileAddress) -> ScreenPoint {
        coord::tile_center(address) + self.correction
    }

    /// Drop every slot. Returns the addresses that were still loading.
    pub fn clean(&mut self) -> Vec<TileAddress> {
        let slots = std::mem::take(&mut self.slots);
        slots
            .into_iter()
            .filter(|(_, slot)| slot.is_loading())
            .map(|(address, _)| address)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Size;
    use image::RgbaImage;

    fn image() -> TileImage {
        TileImage::new(RgbaImage::new(1, 1))
    }

    #[test]
    fn test_zero_tile() {
        assert_eq!(ZoomLayer::new(1).zero_tile(), TileAddress::new(1, 0, 1));
        assert_eq!(ZoomLayer::new(3).zero_tile(), TileAddress::new(4, 3, 3));
    }

    #[test]
    fn test_zero_tile_has_origin_at_plane_origin() {
        for z in 1..=18 {
            let layer = ZoomLayer::new(z);
            assert_eq!(coord::tile_origin(layer.zero_tile()), ScreenPoint::ZERO);
        }
    }

    #[test]
    fn test_correction_moves_visible_tile_to_zero_tile() {
        let mut layer = ZoomLayer::new(10);
        let tile = TileAddress::new(619, 320, 10);
        layer.set_visible_tile(tile);

        assert_eq!(layer.visible_tile(), tile);
        assert_eq!(
            coord::tile_origin(tile) + layer.correction(),
            coord::tile_origin(layer.zero_tile())
        );
    }

    #[test]
    fn test_plan_has_center_and_eight_neighbours() {
        let mut layer = ZoomLayer::new(10);
        let tile = TileAddress::new(619, 320, 10);
        layer.set_visible_tile(tile);

        // Camera on the centre of the visible tile, frame smaller than a tile
        let camera = layer.placement(tile);
        let frame = Rect::from_center(camera, Size::new(100.0, 100.0));
        let plan = layer.plan_visible_tiles(frame);

        assert_eq!(plan.len(), 9);
        assert_eq!(plan[0].address(), tile);
        assert_eq!(plan[0].priority(), CENTER_PRIORITY);
        assert!(plan[1..].iter().all(|r| r.priority() == SKIP_PRIORITY));
    }

    #[test]
    fn test_plan_includes_intersecting_neighbours() {
        let mut layer = ZoomLayer::new(10);
        let tile = TileAddress::new(619, 320, 10);
        layer.set_visible_tile(tile);

        let camera = layer.placement(tile);
        let frame = Rect::from_center(camera, Size::new(400.0, 100.0));
        let plan = layer.plan_visible_tiles(frame);

        let wanted: Vec<_> = plan
            .iter()
            .filter(|r| r.priority() == NEIGHBOUR_PRIORITY)
            .map(|r| r.address())
            .collect();
        assert_eq!(
            wanted,
            vec![TileAddress::new(618, 320, 10), TileAddress::new(620, 320, 10)]
        );
    }

    #[test]
    fn test_plan_skips_invalid_neighbours() {
        let mut layer = ZoomLayer::new(2);
        let corner = TileAddress::new(0, 0, 2);
        layer.set_visible_tile(corner);

        let frame = Rect::from_center(layer.placement(corner), Size::new(1000.0, 1000.0));
        let plan = layer.plan_visible_tiles(frame);

        assert_eq!(plan[0].address(), corner);
        for request in &plan[1..] {
            if !request.address().is_valid() {
                assert_eq!(request.priority(), SKIP_PRIORITY);
            }
        }
        assert_eq!(
            plan.iter().filter(|r| r.priority() == NEIGHBOUR_PRIORITY).count(),
            3
        );
    }

    #[test]
    fn test_slot_lifecycle() {
        let mut layer = ZoomLayer::new(10);
        let tile = TileAddress::new(1, 1, 10);

        assert!(layer.begin_load(tile));
        assert!(!layer.begin_load(tile));
        assert!(layer.finish_load(tile, image()));
        assert!(!layer.begin_load(tile));
        assert!(layer.slot(&tile).unwrap().image().is_some());
    }

    #[test]
    fn test_abandoned_slot_can_be_retried() {
        let mut layer = ZoomLayer::new(10);
        let tile = TileAddress::new(1, 1, 10);

        layer.begin_load(tile);
        assert!(layer.abandon_load(tile));
        assert!(layer.begin_load(tile));
    }

    #[test]
    fn test_begin_load_rejects_foreign_and_invalid() {
        let mut layer = ZoomLayer::new(10);
        assert!(!layer.begin_load(TileAddress::new(1, 1, 11)));
        assert!(!layer.begin_load(TileAddress::new(-1, 0, 10)));
        assert!(layer.is_empty());
    }

    #[test]
    fn test_clean_returns_loading_slots() {
        let mut layer = ZoomLayer::new(10);
        let loading = TileAddress::new(1, 1, 10);
        let loaded = TileAddress::new(2, 1, 10);
        layer.begin_load(loading);
        layer.begin_load(loaded);
        layer.finish_load(loaded, image());

        assert_eq!(layer.clean(), vec![loading]);
        assert!(layer.is_empty());
        assert!(!layer.finish_load(loading, image()));
    }
}
