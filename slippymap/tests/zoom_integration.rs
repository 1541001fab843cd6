//! Integration tests for zoom continuity.
//!
//! Zooming in and back out must keep the geographic point under the camera,
//! and every transition must recentre the target layer on the tile under
//! the camera.
//!
//! Run with: `cargo test --test zoom_integration`

use slippymap::coord::{self, GeoCoordinate, Size};
use slippymap::map::MapView;

// ============================================================================
// Helper Functions
// ============================================================================

const TOLERANCE_DEG: f64 = 1e-7;

fn view_at(coord: GeoCoordinate, scale: f64) -> MapView {
    let mut view = MapView::new(Size::new(184.0, 224.0));
    view.move_to(coord, scale);
    view
}

fn assert_same_point(a: GeoCoordinate, b: GeoCoordinate) {
    assert!(
        (a.latitude - b.latitude).abs() < TOLERANCE_DEG
            && (a.longitude - b.longitude).abs() < TOLERANCE_DEG,
        "{:?} != {:?}",
        a,
        b
    );
}

// ============================================================================
// Integration Tests
// ============================================================================

#[test]
fn test_zoom_in_and_out_preserves_camera_point() {
    let moscow = GeoCoordinate::new(55.7539, 37.6208);
    let mut view = view_at(moscow, 10.0);
    let before = view.camera_coordinate();
    assert_same_point(before, moscow);

    let zoom_in = view.set_scale(14.0).unwrap();
    assert_eq!((zoom_in.from, zoom_in.to), (10, 14));
    assert_same_point(view.camera_coordinate(), before);

    let zoom_out = view.set_scale(10.0).unwrap();
    assert_eq!((zoom_out.from, zoom_out.to), (14, 10));
    assert_same_point(view.camera_coordinate(), before);
}

#[test]
fn test_every_step_recentres_on_tile_under_camera() {
    let sydney = GeoCoordinate::new(-33.8688, 151.2093);
    let mut view = view_at(sydney, 3.0);

    for scale in [4.0, 7.0, 12.0, 17.0, 9.0, 2.0] {
        let transition = view.set_scale(scale).unwrap();
        let under_camera = coord::visible_tile(
            view.camera() - view.current_layer().correction(),
            transition.to,
        );
        assert_eq!(transition.visible_tile, under_camera);
        assert_eq!(view.current_layer().visible_tile(), under_camera);
        assert_same_point(view.camera_coordinate(), sydney);
    }
}

#[test]
fn test_fractional_scale_keeps_layer() {
    let mut view = view_at(GeoCoordinate::new(48.8566, 2.3522), 12.0);
    let camera = view.camera();

    assert!(view.set_scale(12.4).is_none());
    assert_eq!(view.zoom(), 12);
    assert_eq!(view.camera(), camera);
    assert!(view.camera_scale() < 2.0_f64.powi(11) / (1.0 + 2.0_f64.powi(11)) + 1e-12);
}

#[test]
fn test_visible_tile_agrees_with_tile_address_off_boundaries() {
    let point = GeoCoordinate::new(55.7539, 37.6208);
    for zoom in 1..=17u8 {
        let position = coord::geo_to_screen(point, zoom);
        assert_eq!(
            coord::visible_tile(position, zoom),
            coord::tile_address_of(point, zoom),
            "zoom {}",
            zoom
        );
    }
}
