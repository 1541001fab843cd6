//! Camera, zoom layers and overlays.
//!
//! [`MapView`] is the single-threaded state of the map: the continuous scale
//! chosen by the user, the integer zoom it rounds to, the camera position in
//! the current layer's corrected plane and one [`ZoomLayer`] per zoom.
//!
//! Crossing into another integer zoom keeps the geographic point under the
//! camera fixed: the camera is normalized to a [`ZoomAnchor`] on the old
//! layer, denormalized on the new one, and the new layer is recentred on the
//! tile under it.

use tracing::debug;

use crate::coord::{
    self, GeoCoordinate, Rect, ScreenPoint, Size, TileAddress, ZoomAnchor, MAX_ZOOM, MIN_ZOOM,
};
use crate::session::{Maneuver, Route, SessionItem};
use crate::tile::{TileImage, TileRequest};

use super::draw::{DrawList, Marker, MarkerKind, RoutePath, RouteRun, TilePlacement};
use super::layer::ZoomLayer;

/// Smallest scale the user can zoom out to.
pub const MIN_SCALE: f64 = 0.5;

/// Largest scale the user can zoom in to.
pub const MAX_SCALE: f64 = 17.4;

/// Record of a change of integer zoom.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomTransition {
    pub from: u8,
    pub to: u8,
    /// Normalized camera position carried across.
    pub anchor: ZoomAnchor,
    /// Tile the target layer was recentred on.
    pub visible_tile: TileAddress,
    /// New camera position in the target layer's corrected plane.
    pub camera: ScreenPoint,
    /// Tiles of other layers that were still loading when they were cleaned.
    pub released: Vec<TileAddress>,
}

/// Rounds a continuous scale to the zoom whose layer is shown.
pub fn zoom_for_scale(scale: f64) -> u8 {
    scale.round().clamp(f64::from(MIN_ZOOM), f64::from(MAX_ZOOM)) as u8
}

#[derive(Debug, Clone)]
pub struct MapView {
    viewport: Size,
    scale: f64,
    zoom: u8,
    camera: ScreenPoint,
    layers: Vec<ZoomLayer>,
    session: SessionItem,
    selected_maneuver: Option<usize>,
    current_location: Option<GeoCoordinate>,
    last_centered: Option<GeoCoordinate>,
}

impl MapView {
    /// A view of `viewport` size at scale 1, camera on the plane origin.
    pub fn new(viewport: Size) -> Self {
        Self {
            viewport,
            scale: 1.0,
            zoom: MIN_ZOOM,
            camera: ScreenPoint::ZERO,
            layers: (MIN_ZOOM..=MAX_ZOOM).map(ZoomLayer::new).collect(),
            session: SessionItem::Empty,
            selected_maneuver: None,
            current_location: None,
            last_centered: None,
        }
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn camera(&self) -> ScreenPoint {
        self.camera
    }

    pub fn layer(&self, zoom: u8) -> Option<&ZoomLayer> {
        let index = usize::from(zoom.checked_sub(MIN_ZOOM)?);
        self.layers.get(index)
    }

    fn layer_mut(&mut self, zoom: u8) -> Option<&mut ZoomLayer> {
        let index = usize::from(zoom.checked_sub(MIN_ZOOM)?);
        self.layers.get_mut(index)
    }

    pub fn current_layer(&self) -> &ZoomLayer {
        &self.layers[usize::from(self.zoom - MIN_ZOOM)]
    }

    fn current_layer_mut(&mut self) -> &mut ZoomLayer {
        &mut self.layers[usize::from(self.zoom - MIN_ZOOM)]
    }

    /// Geographic point under the camera.
    pub fn camera_coordinate(&self) -> GeoCoordinate {
        coord::screen_to_geo(self.camera - self.current_layer().correction(), self.zoom)
    }

    /// Set the continuous scale, clamped to `[MIN_SCALE, MAX_SCALE]`.
    ///
    /// Returns the transition when the rounded zoom changes. Within the same
    /// zoom only the scale, and therefore the camera scale, changes. NaN is
    /// ignored.
    pub fn set_scale(&mut self, scale: f64) -> Option<ZoomTransition> {
        if scale.is_nan() {
            return None;
        }
        let scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        let to = zoom_for_scale(scale);
        let from = self.zoom;
        self.scale = scale;

        if to == from {
            return None;
        }

        let current = self.camera - self.current_layer().correction();
        let anchor = coord::anchor(current, from);
        let target = coord::from_anchor(anchor, to);
        let visible_tile = coord::visible_tile(target, to);

        let mut released = Vec::new();
        for layer in &mut self.layers {
            if layer.zoom() == to {
                layer.set_visible_tile(visible_tile);
            } else {
                released.extend(layer.clean());
            }
        }

        self.zoom = to;
        self.camera = target + self.current_layer().correction();

        debug!(
            from,
            to,
            tile = %visible_tile,
            released = released.len(),
            "Zoom level changed"
        );

        Some(ZoomTransition {
            from,
            to,
            anchor,
            visible_tile,
            camera: self.camera,
            released,
        })
    }

    /// `1 / ((1 + 2^(scale-1)) / 2^(zoom-1))`: how much the layer is shrunk
    /// on screen at the current fractional scale.
    pub fn camera_scale(&self) -> f64 {
        let scale = 1.0 + 2.0_f64.powf(self.scale - 1.0);
        let layer = 2.0_f64.powi(i32::from(self.zoom) - 1);
        layer / scale
    }

    /// Part of the current layer covered by the viewport.
    pub fn camera_frame(&self) -> Rect {
        Rect::from_center(self.camera, self.viewport.scaled(self.camera_scale()))
    }

    /// Centre on `coord`, then apply `scale`.
    pub fn move_to(&mut self, coord: GeoCoordinate, scale: f64) -> Option<ZoomTransition> {
        self.last_centered = Some(coord);

        let zoom = self.zoom;
        let position = coord::geo_to_screen(coord, zoom);
        let visible_tile = coord::visible_tile(position, zoom);
        let correction = {
            let layer = self.current_layer_mut();
            layer.set_visible_tile(visible_tile);
            layer.correction()
        };
        self.camera = position + correction;

        self.set_scale(scale)
    }

    /// Move the camera within the current layer's corrected plane.
    pub fn pan_to(&mut self, camera: ScreenPoint) {
        self.camera = camera;
    }

    /// Tiles to request for the current camera frame.
    pub fn plan_visible_tiles(&self) -> Vec<TileRequest> {
        self.current_layer().plan_visible_tiles(self.camera_frame())
    }

    /// Claim a tile slot before requesting it. See [`ZoomLayer::begin_load`].
    pub fn begin_load(&mut self, address: TileAddress) -> bool {
        self.layer_mut(address.z)
            .map_or(false, |layer| layer.begin_load(address))
    }

    /// Apply a load result. Returns false if no slot was waiting for it.
    pub fn finish_load(&mut self, address: TileAddress, image: Option<TileImage>) -> bool {
        let Some(layer) = self.layer_mut(address.z) else {
            return false;
        };
        match image {
            Some(image) => layer.finish_load(address, image),
            None => layer.abandon_load(address),
        }
    }

    pub fn session_item(&self) -> &SessionItem {
        &self.session
    }

    /// Replace the session item. Any maneuver selection belonged to the old
    /// route and is cleared.
    pub fn set_session_item(&mut self, item: SessionItem) {
        debug!(item = item.describe(), "Session item updated");
        self.session = item;
        self.selected_maneuver = None;
    }

    /// Select the route maneuver at `index` and return where it starts.
    ///
    /// Returns `None`, leaving any previous selection in place, when there is
    /// no route or the index is out of range. The caller centres the map on
    /// the returned point.
    pub fn select_maneuver(&mut self, index: usize) -> Option<GeoCoordinate> {
        let start = self.session.route()?.maneuver(index)?.start;
        debug!(index, %start, "Maneuver selected");
        self.selected_maneuver = Some(index);
        Some(start)
    }

    pub fn clear_maneuver_selection(&mut self) {
        self.selected_maneuver = None;
    }

    pub fn selected_maneuver(&self) -> Option<&Maneuver> {
        self.session.route()?.maneuver(self.selected_maneuver?)
    }

    pub fn current_location(&self) -> Option<GeoCoordinate> {
        self.current_location
    }

    pub fn last_centered(&self) -> Option<GeoCoordinate> {
        self.last_centered
    }

    /// Record the user's position.
    ///
    /// Returns true when the user has drifted 50 m or more from the
    /// coordinate the map was last centred on.
    pub fn set_current_location(&mut self, coord: GeoCoordinate) -> bool {
        self.current_location = Some(coord);
        self.last_centered
            .map_or(false, |centered| !centered.is_near(&coord))
    }

    pub fn clear_current_location(&mut self) {
        self.current_location = None;
    }

    /// Position of a geographic point in the current layer's corrected plane.
    pub fn place(&self, coord: GeoCoordinate) -> ScreenPoint {
        coord::geo_to_screen(coord, self.zoom) + self.current_layer().correction()
    }

    /// Point overlays for the current state, user location last.
    pub fn overlays(&self) -> Vec<Marker> {
        let scale = self.camera_scale();
        let marker = |kind, coord| Marker {
            kind,
            position: self.place(coord),
            scale,
        };

        let mut markers = Vec::new();
        match &self.session {
            SessionItem::Route(route) => {
                if let (Some(start), Some(end)) = (route.start_point(), route.end_point()) {
                    markers.push(marker(MarkerKind::RouteStart, start));
                    markers.push(marker(MarkerKind::RouteEnd, end));
                }
                if let Some(maneuver) = self.selected_maneuver() {
                    markers.push(marker(MarkerKind::SelectedManeuver, maneuver.start));
                }
            }
            SessionItem::Coordinate(coord) => {
                markers.push(marker(MarkerKind::Destination, *coord));
            }
            SessionItem::Empty => {}
        }
        if let Some(location) = self.current_location {
            markers.push(marker(MarkerKind::UserLocation, location));
        }
        markers
    }

    /// Route line in the current layer, relative to the placed route start.
    pub fn route_path(&self) -> Option<RoutePath> {
        let route = self.session.route()?;
        self.route_path_for(route)
    }

    fn route_path_for(&self, route: &Route) -> Option<RoutePath> {
        let start = coord::geo_to_screen(route.start_point()?, self.zoom);
        let segments = route
            .segments
            .iter()
            .filter(|s| !s.points.is_empty())
            .map(|s| RouteRun {
                traffic: s.traffic,
                points: s
                    .points
                    .iter()
                    .map(|p| coord::geo_to_screen(*p, self.zoom) - start)
                    .collect(),
            })
            .collect();

        Some(RoutePath {
            origin: start + self.current_layer().correction(),
            segments,
        })
    }

    /// Everything to draw for the current state.
    pub fn draw_list(&self) -> DrawList {
        let layer = self.current_layer();
        let tiles = layer
            .slots()
            .map(|(address, slot)| TilePlacement {
                address: *address,
                center: layer.placement(*address),
                loaded: slot.image().is_some(),
                image: slot.image().cloned(),
            })
            .collect();

        DrawList {
            zoom: self.zoom,
            scale: self.scale,
            camera: self.camera,
            camera_scale: self.camera_scale(),
            tiles,
            route: self.route_path(),
            markers: self.overlays(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{PathSegment, TrafficLoad};
    use crate::tile::{CENTER_PRIORITY, NEIGHBOUR_PRIORITY};
    use image::RgbaImage;

    const MOSCOW: GeoCoordinate = GeoCoordinate::new(55.7558, 37.6173);

    fn view() -> MapView {
        MapView::new(Size::new(184.0, 224.0))
    }

    fn assert_close(a: GeoCoordinate, b: GeoCoordinate) {
        assert!((a.latitude - b.latitude).abs() < 1e-7, "{} vs {}", a, b);
        assert!((a.longitude - b.longitude).abs() < 1e-7, "{} vs {}", a, b);
    }

    #[test]
    fn test_zoom_for_scale() {
        assert_eq!(zoom_for_scale(0.5), 1);
        assert_eq!(zoom_for_scale(2.4), 2);
        assert_eq!(zoom_for_scale(2.5), 3);
        assert_eq!(zoom_for_scale(17.4), 17);
        assert_eq!(zoom_for_scale(40.0), 18);
    }

    #[test]
    fn test_scale_within_band_keeps_zoom() {
        let mut view = view();
        view.set_scale(2.0);
        let camera = view.camera();

        assert!(view.set_scale(2.3).is_none());
        assert_eq!(view.zoom(), 2);
        assert_eq!(view.scale(), 2.3);
        assert_eq!(view.camera(), camera);
    }

    #[test]
    fn test_scale_is_clamped() {
        let mut view = view();
        view.set_scale(100.0);
        assert_eq!(view.scale(), MAX_SCALE);
        assert_eq!(view.zoom(), 17);

        view.set_scale(-3.0);
        assert_eq!(view.scale(), MIN_SCALE);
        assert_eq!(view.zoom(), 1);

        assert!(view.set_scale(f64::NAN).is_none());
        assert_eq!(view.scale(), MIN_SCALE);
    }

    #[test]
    fn test_zoom_preserves_geographic_point() {
        let mut view = view();
        view.move_to(MOSCOW, 10.0);
        assert_eq!(view.zoom(), 10);
        assert_close(view.camera_coordinate(), MOSCOW);

        for scale in [14.0, 3.0, 17.0, 1.0, 10.0] {
            view.set_scale(scale);
            assert_close(view.camera_coordinate(), MOSCOW);
        }
    }

    #[test]
    fn test_transition_recentres_target_layer() {
        let mut view = view();
        view.move_to(MOSCOW, 10.0);
        let transition = view.set_scale(12.0).unwrap();

        assert_eq!(transition.from, 10);
        assert_eq!(transition.to, 12);
        assert_eq!(transition.visible_tile, coord::tile_address_of(MOSCOW, 12));
        assert_eq!(view.current_layer().visible_tile(), transition.visible_tile);
        // The camera stays within a tile of the plane origin
        assert!(view.camera().x.abs() <= 256.0);
        assert!(view.camera().y.abs() <= 256.0);
    }

    #[test]
    fn test_transition_releases_loading_tiles_of_other_layers() {
        let mut view = view();
        view.move_to(MOSCOW, 10.0);
        let tile = coord::tile_address_of(MOSCOW, 10);
        assert!(view.begin_load(tile));

        let transition = view.set_scale(11.0).unwrap();
        assert_eq!(transition.released, vec![tile]);
        assert!(view.layer(10).unwrap().is_empty());
        assert!(!view.finish_load(tile, Some(TileImage::new(RgbaImage::new(1, 1)))));
    }

    #[test]
    fn test_camera_scale() {
        let mut view = view();
        view.set_scale(1.0);
        assert!((view.camera_scale() - 0.5).abs() < 1e-12);

        view.set_scale(3.0);
        // 2^2 / (1 + 2^2)
        assert!((view.camera_scale() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_camera_frame_scales_viewport() {
        let mut view = view();
        view.set_scale(3.0);
        let frame = view.camera_frame();
        assert!((frame.size.width - 184.0 * 0.8).abs() < 1e-9);
        assert_eq!(frame.center(), view.camera());
    }

    #[test]
    fn test_plan_centre_tile_is_tile_under_camera() {
        let mut view = view();
        view.move_to(MOSCOW, 10.0);
        let plan = view.plan_visible_tiles();

        assert_eq!(plan[0].address(), view.current_layer().visible_tile());
        assert_eq!(plan[0].priority(), CENTER_PRIORITY);
        assert!(plan[1..]
            .iter()
            .all(|r| r.priority() == 0.0 || r.priority() == NEIGHBOUR_PRIORITY));
    }

    #[test]
    fn test_pan_moves_camera_only() {
        let mut view = view();
        view.move_to(MOSCOW, 10.0);
        let correction = view.current_layer().correction();

        view.pan_to(ScreenPoint::new(300.0, -40.0));
        assert_eq!(view.camera(), ScreenPoint::new(300.0, -40.0));
        assert_eq!(view.current_layer().correction(), correction);
        assert_eq!(view.zoom(), 10);
    }

    #[test]
    fn test_drift_detection() {
        let mut view = view();
        assert!(!view.set_current_location(MOSCOW));

        view.move_to(MOSCOW, 14.0);
        assert!(!view.set_current_location(GeoCoordinate::new(55.7559, 37.6173)));
        // About 111 m north
        assert!(view.set_current_location(GeoCoordinate::new(55.7568, 37.6173)));
    }

    #[test]
    fn test_overlays_for_destination() {
        let mut view = view();
        view.move_to(MOSCOW, 14.0);
        view.set_session_item(SessionItem::Coordinate(MOSCOW));
        view.set_current_location(MOSCOW);

        let markers = view.overlays();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].kind, MarkerKind::Destination);
        assert_eq!(markers[1].kind, MarkerKind::UserLocation);
        // Centred on the destination, so it sits under the camera
        assert!(markers[0].position.distance(&view.camera()) < 1e-6);
        assert_eq!(markers[0].scale, view.camera_scale());
    }

    #[test]
    fn test_route_overlays_and_path() {
        let start = GeoCoordinate::new(55.75, 37.61);
        let middle = GeoCoordinate::new(55.76, 37.62);
        let end = GeoCoordinate::new(55.77, 37.63);
        let route = Route::new(vec![
            PathSegment::new(TrafficLoad::Slow, vec![start, middle]),
            PathSegment::new(TrafficLoad::Fast, vec![]),
            PathSegment::new(TrafficLoad::Normal, vec![middle, end]),
        ]);

        let mut view = view();
        view.move_to(start, 12.0);
        view.set_session_item(SessionItem::Route(route));

        let kinds: Vec<_> = view.overlays().iter().map(|m| m.kind).collect();
        assert_eq!(kinds, vec![MarkerKind::RouteStart, MarkerKind::RouteEnd]);

        let path = view.route_path().unwrap();
        assert_eq!(path.segments.len(), 2);
        assert_eq!(path.segments[0].points[0], ScreenPoint::ZERO);
        assert!(path.origin.distance(&view.place(start)) < 1e-9);

        let last = *path.points().last().unwrap();
        assert!((path.origin + last).distance(&view.place(end)) < 1e-6);
    }

    fn guided_route() -> Route {
        let start = GeoCoordinate::new(55.75, 37.61);
        let turn = GeoCoordinate::new(55.76, 37.62);
        let end = GeoCoordinate::new(55.77, 37.63);
        Route::new(vec![PathSegment::new(TrafficLoad::Fast, vec![start, turn, end])])
            .with_maneuvers(vec![Maneuver::new(start), Maneuver::new(turn)])
    }

    #[test]
    fn test_selected_maneuver_overlay() {
        let mut view = view();
        view.move_to(MOSCOW, 12.0);
        view.set_session_item(SessionItem::Route(guided_route()));
        view.set_current_location(MOSCOW);

        let turn = view.select_maneuver(1).unwrap();
        assert_eq!(turn, GeoCoordinate::new(55.76, 37.62));
        assert_eq!(view.selected_maneuver().map(|m| m.start), Some(turn));

        let markers = view.overlays();
        let kinds: Vec<_> = markers.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MarkerKind::RouteStart,
                MarkerKind::RouteEnd,
                MarkerKind::SelectedManeuver,
                MarkerKind::UserLocation,
            ]
        );
        assert!(markers[2].position.distance(&view.place(turn)) < 1e-9);
    }

    #[test]
    fn test_out_of_range_maneuver_keeps_selection() {
        let mut view = view();
        assert!(view.select_maneuver(0).is_none());

        view.set_session_item(SessionItem::Route(guided_route()));
        view.select_maneuver(0).unwrap();
        assert!(view.select_maneuver(5).is_none());
        assert_eq!(
            view.selected_maneuver().map(|m| m.start),
            Some(GeoCoordinate::new(55.75, 37.61))
        );

        view.clear_maneuver_selection();
        assert!(view.selected_maneuver().is_none());
    }

    #[test]
    fn test_new_session_item_clears_maneuver() {
        let mut view = view();
        view.set_session_item(SessionItem::Route(guided_route()));
        view.select_maneuver(1).unwrap();

        view.set_session_item(SessionItem::Route(guided_route()));
        assert!(view.selected_maneuver().is_none());
        assert!(!view
            .overlays()
            .iter()
            .any(|m| m.kind == MarkerKind::SelectedManeuver));
    }

    #[test]
    fn test_empty_route_has_no_overlays() {
        let mut view = view();
        view.set_session_item(SessionItem::Route(Route::default()));
        assert!(view.overlays().is_empty());
        assert!(view.route_path().is_none());
    }

    #[test]
    fn test_draw_list_reflects_slots() {
        let mut view = view();
        view.move_to(MOSCOW, 10.0);
        let tile = view.plan_visible_tiles()[0].address();
        view.begin_load(tile);

        let list = view.draw_list();
        assert_eq!(list.zoom, 10);
        assert_eq!(list.tiles.len(), 1);
        assert!(!list.tiles[0].loaded);

        view.finish_load(tile, Some(TileImage::new(RgbaImage::new(1, 1))));
        let list = view.draw_list();
        assert!(list.tiles[0].loaded);
        assert!(list.tiles[0].image.is_some());
        assert_eq!(list.tiles[0].center, view.current_layer().placement(tile));
    }
}
