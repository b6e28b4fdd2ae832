//! Round-trip and reference-point tests for all coordinate systems.

use projection::{
    CoordinateSystem, Ellipsoid, Lambert93, Position, ProjectionError, UtmZone, WebMercator,
    WorldMercator, GRS80, WGS84,
};

const DEG_TOLERANCE: f64 = 1e-6;

fn assert_close(actual: Position, expected: Position, tolerance: f64) {
    assert!(
        (actual.x - expected.x).abs() < tolerance && (actual.y - expected.y).abs() < tolerance,
        "expected {} got {}",
        expected,
        actual
    );
}

fn roundtrip(system: CoordinateSystem, zone: Option<&UtmZone>, samples: &[(f64, f64)]) {
    for &(lon, lat) in samples {
        let geo = Position::new(lon, lat);
        let projected = system.proj(geo, zone).unwrap();
        let back = system.geo(projected, zone).unwrap();
        assert_close(back, geo, DEG_TOLERANCE);
    }
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_lambert93_roundtrip() {
    roundtrip(
        CoordinateSystem::Lambert93,
        None,
        &[
            (2.435_368, 48.839_473),
            (-4.5, 48.4),
            (7.75, 48.58),
            (9.45, 42.0),
            (-1.55, 43.48),
            (3.0, 46.5),
        ],
    );
}

#[test]
fn test_web_mercator_roundtrip() {
    roundtrip(
        CoordinateSystem::web_mercator(),
        None,
        &[
            (0.0, 0.0),
            (10.0, 45.0),
            (-73.9857, 40.7484),
            (139.6917, 35.6895),
            (-180.0, -85.0),
            (180.0, 85.05),
        ],
    );
}

#[test]
fn test_world_mercator_roundtrip() {
    roundtrip(
        CoordinateSystem::world_mercator(),
        None,
        &[
            (0.0, 0.0),
            (2.435_368, 48.839_473),
            (-61.5, -16.2),
            (166.45, -22.27),
            (-179.9, 84.9),
            (45.0, -85.08),
        ],
    );
}

#[test]
fn test_utm_roundtrip() {
    let north: UtmZone = "31N".parse().unwrap();
    roundtrip(
        CoordinateSystem::utm(),
        Some(&north),
        &[(2.435_368, 48.839_473), (0.1, 10.0), (5.9, 70.0), (3.0, 0.0)],
    );

    let south: UtmZone = "58S".parse().unwrap();
    roundtrip(
        CoordinateSystem::utm(),
        Some(&south),
        &[(166.45, -22.27), (163.5, -10.0), (168.0, -45.0)],
    );
}

// ============================================================================
// Reference fixtures
// ============================================================================

#[test]
fn test_web_mercator_at_80_north() {
    let p = WebMercator::default().proj(Position::new(0.0, 80.0)).unwrap();
    assert!(p.x.abs() < 1e-9);
    assert!((p.y - 15_538_711.096_309).abs() < 1e-3, "y = {}", p.y);
}

#[test]
fn test_lambert93_to_web_mercator_chain() {
    let geo = Lambert93::new()
        .geo(Position::new(658_557.548, 6_860_084.001))
        .unwrap();
    assert_close(geo, Position::new(2.435_368, 48.839_473), DEG_TOLERANCE);

    let web = WebMercator::default().proj(geo).unwrap();
    assert!((web.x - 271_103.889_193).abs() < 1e-3, "x = {}", web.x);
    assert!((web.y - 6_247_667.030_696).abs() < 1e-3, "y = {}", web.y);
}

#[test]
fn test_world_mercator_antimeridian_converges() {
    let wm = WorldMercator::default();
    let projected = wm.proj(Position::new(180.0, 0.0)).unwrap();
    let back = wm.geo(projected).unwrap();
    assert_close(back, Position::new(180.0, 0.0), 1e-9);
}

#[test]
fn test_world_mercator_band_edge_converges() {
    let wm = WorldMercator::default();
    let top = wm.proj(Position::new(0.0, WorldMercator::MAX_LAT)).unwrap();
    assert!(top.y < std::f64::consts::PI * WGS84.a);
    let back = wm.geo(top).unwrap();
    assert!((back.y - WorldMercator::MAX_LAT).abs() < 1e-9);
}

// ============================================================================
// Range errors and alternate ellipsoids
// ============================================================================

#[test]
fn test_range_errors() {
    let err = CoordinateSystem::web_mercator()
        .proj(Position::new(0.0, 85.06), None)
        .unwrap_err();
    assert!(matches!(
        err,
        ProjectionError::OutOfRange {
            system: "WebMercator",
            ..
        }
    ));

    let err = CoordinateSystem::world_mercator()
        .proj(Position::new(0.0, -90.0), None)
        .unwrap_err();
    assert!(matches!(
        err,
        ProjectionError::OutOfRange {
            system: "WorldMercator",
            ..
        }
    ));
}

#[test]
fn test_alternate_ellipsoid_is_explicit() {
    let sphere = Ellipsoid::from_inverse_flattening(6_371_000.0, f64::INFINITY);
    assert_eq!(sphere.e2(), 0.0);

    let on_sphere = CoordinateSystem::WorldMercator(sphere)
        .proj(Position::new(90.0, 30.0), None)
        .unwrap();
    let on_wgs84 = CoordinateSystem::world_mercator()
        .proj(Position::new(90.0, 30.0), None)
        .unwrap();
    assert!((on_sphere.x - on_wgs84.x).abs() > 1000.0);

    roundtrip(
        CoordinateSystem::WorldMercator(GRS80),
        None,
        &[(12.0, 60.0), (-30.0, -40.0)],
    );
}
