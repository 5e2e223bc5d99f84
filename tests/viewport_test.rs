//! Integration test for the 2D viewport
//!
//! Covers zoom and pan, the scale clamp, fitting a world plane and mapping
//! through the world plane.

use medgeom::{AffineTransform, Error, PlaneFrame, Viewport2D};
use nalgebra::{Matrix3, Point2, Point3, Vector2, Vector3};

fn assert_point2_near(actual: &Point2<f64>, expected: &Point2<f64>) {
    assert!(
        (actual - expected).norm() < 1e-9,
        "expected {:?}, got {:?}",
        expected,
        actual
    );
}

fn world_plane(width: f64, height: f64) -> PlaneFrame {
    let mut plane = PlaneFrame::new();
    plane
        .set_bounds([0.0, width, 0.0, height, 0.0, 1.0])
        .unwrap();
    plane
}

#[test]
fn test_display_world_conversion() {
    let mut viewport = Viewport2D::new();
    viewport.set_scale_factor(0.5);
    viewport.set_origin_in_mm(&Point2::new(10.0, -4.0));

    let world = viewport.display_to_world(&Point2::new(4.0, 8.0));
    assert_point2_near(&world, &Point2::new(12.0, 0.0));
    assert_point2_near(&viewport.world_to_display(&world), &Point2::new(4.0, 8.0));
    assert_eq!(
        viewport.display_to_world_vector(&Vector2::new(4.0, 8.0)),
        Vector2::new(2.0, 4.0)
    );
    assert_eq!(
        viewport.world_to_display_vector(&Vector2::new(2.0, 4.0)),
        Vector2::new(4.0, 8.0)
    );
    assert_point2_near(&viewport.origin_in_display_units(), &Point2::new(20.0, -8.0));
}

#[test]
fn test_zoom_in_and_out_restores_state() {
    let mut viewport = Viewport2D::new();
    viewport.set_scale_factor(0.8);
    viewport.set_origin_in_mm(&Point2::new(1.0, 2.0));
    let center = Point2::new(3.0, 7.0);
    let fixed = viewport.display_to_world(&center);

    viewport.zoom(2.0, &center).unwrap();
    assert!((viewport.scale_factor() - 0.4).abs() < 1e-12);
    assert_point2_near(&viewport.display_to_world(&center), &fixed);

    viewport.zoom(0.5, &center).unwrap();
    assert!((viewport.scale_factor() - 0.8).abs() < 1e-12);
    assert_point2_near(&viewport.origin_in_mm(), &Point2::new(1.0, 2.0));
}

#[test]
fn test_scale_factor_is_clamped() {
    let mut viewport = Viewport2D::new();
    viewport.set_scale_factor(1.0e-6);
    assert_eq!(viewport.scale_factor(), 1.0e-4);

    viewport.set_scale_factor(1.0);
    let err = viewport.zoom(-1.0, &Point2::origin()).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_size_in_mm_follows_scale() {
    let mut viewport = Viewport2D::new();
    viewport.set_size_in_display_units(300, 200, false);
    viewport.set_scale_factor(0.25);
    assert_eq!(viewport.size_in_display_units(), Vector2::new(300, 200));
    assert_eq!(viewport.size_in_mm(), Vector2::new(75.0, 50.0));
}

#[test]
fn test_resize_keeping_region() {
    let mut viewport = Viewport2D::new();
    viewport.set_size_in_display_units(100, 100, false);
    let center_before = viewport.display_to_world(&Point2::new(50.0, 50.0));
    let diagonal_before = viewport.size_in_mm().norm();

    viewport.set_size_in_display_units(200, 100, true);

    let center_after = viewport.display_to_world(&Point2::new(100.0, 50.0));
    assert_point2_near(&center_after, &center_before);
    assert!((viewport.size_in_mm().norm() - diagonal_before).abs() < 1e-9);
    assert!(viewport.scale_factor() < 1.0);
}

#[test]
fn test_shrink_keeping_region() {
    let mut viewport = Viewport2D::new();
    viewport.set_size_in_display_units(200, 100, false);
    let center_before = viewport.display_to_world(&Point2::new(100.0, 50.0));
    let diagonal_before = viewport.size_in_mm().norm();

    viewport.set_size_in_display_units(50, 50, true);

    let center_after = viewport.display_to_world(&Point2::new(25.0, 25.0));
    assert_point2_near(&center_after, &center_before);
    assert!((viewport.size_in_mm().norm() - diagonal_before).abs() < 1e-9);
    assert!(viewport.scale_factor() > 1.0);
}

#[test]
fn test_fit_preserves_aspect_ratio() {
    let plane = world_plane(200.0, 100.0);
    let mut viewport = Viewport2D::new();
    viewport.set_size_in_display_units(400, 400, false);
    viewport.set_world_frame(Some(&plane));
    viewport.fit();

    assert!((viewport.scale_factor() - 0.5).abs() < 1e-12);
    assert_point2_near(
        &viewport.world_to_display(&Point2::new(0.0, 0.0)),
        &Point2::new(0.0, 100.0),
    );
    assert_point2_near(
        &viewport.world_to_display(&Point2::new(200.0, 100.0)),
        &Point2::new(400.0, 300.0),
    );
}

#[test]
fn test_fit_tall_plane() {
    let plane = world_plane(50.0, 100.0);
    let mut viewport = Viewport2D::new();
    viewport.set_size_in_display_units(400, 200, false);
    viewport.set_world_frame(Some(&plane));
    viewport.fit();

    assert!((viewport.scale_factor() - 0.5).abs() < 1e-12);
    assert_point2_near(
        &viewport.world_to_display(&Point2::new(0.0, 0.0)),
        &Point2::new(150.0, 0.0),
    );
}

#[test]
fn test_fit_ignores_invalid_world() {
    let mut plane = PlaneFrame::new();
    plane.set_transform(AffineTransform::new(Matrix3::zeros(), Vector3::zeros()));
    let mut viewport = Viewport2D::new();
    viewport.set_scale_factor(3.0);
    viewport.set_world_frame(Some(&plane));
    viewport.fit();
    assert_eq!(viewport.scale_factor(), 3.0);
}

#[test]
fn test_map_through_world_plane() {
    let plane = world_plane(100.0, 100.0);
    let mut viewport = Viewport2D::new();
    viewport.set_scale_factor(0.5);

    assert!(matches!(
        viewport.map_world_to_display(&Point3::origin()),
        Err(Error::MissingReferenceGeometry(_))
    ));

    viewport.set_world_frame(Some(&plane));
    let display = viewport
        .map_world_to_display(&Point3::new(10.0, 20.0, 0.0))
        .unwrap();
    assert_point2_near(&display, &Point2::new(20.0, 40.0));

    let world = viewport.map_display_to_world(&display).unwrap();
    assert!((world - Point3::new(10.0, 20.0, 0.0)).norm() < 1e-9);

    let vector = viewport
        .map_world_vector_to_display(&Vector3::new(1.0, 0.0, 0.0))
        .unwrap();
    assert!((vector - Vector2::new(2.0, 0.0)).norm() < 1e-12);
}
