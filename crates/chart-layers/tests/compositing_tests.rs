//! Integration tests for layer compositing over synthetic dalle stores.

use std::time::Duration;

use chart_common::{ErrorKind, GeoBox, ProjectedBox, SIZE0};
use chart_layers::config::parse_layers_yaml;
use chart_layers::{
    render_layers, DrawContext, DrawReport, Instance, Layer, LayerRegistry, RenderBudget,
};
use renderer::RenderCanvas;
use storage::DalleStore;
use test_utils::{dalle_color, ChartFixture};

const SQUARE_YAML: &str = r#"
erosion_px: 0
pyramid:
  name: pyr
  levels:
    - { layer: coarse, min_zoom: 0 }
    - { layer: fine, min_zoom: 5 }
layers:
  coarse:
    square:
      title: "Square chart"
      spatial: { SW: [-1.0, -1.0], NE: [1.0, 1.0] }
  fine:
    corner:
      spatial: { SW: [-1.0, -1.0], NE: [1.0, 1.0] }
"#;

/// 2048x2048 chart at 10 m/px covering [0, 20480] on both axes, plus a
/// 1024x1024 chart over its upper-left quarter.
fn square_fixture() -> (ChartFixture, LayerRegistry) {
    let fixture = ChartFixture::new();
    fixture.add_georeferenced("square", 2048, 2048, 10.0, [0.0, 20480.0]);
    fixture.add_georeferenced("corner", 1024, 1024, 10.0, [0.0, 20480.0]);
    let catalog = parse_layers_yaml(SQUARE_YAML).unwrap();
    let registry = LayerRegistry::build(&catalog, &fixture.store()).unwrap();
    (fixture, registry)
}

fn frame() -> ProjectedBox {
    ProjectedBox::from_coords(&[0.0, 0.0, 20480.0, 20480.0]).unwrap()
}

fn draw(
    registry: &LayerRegistry,
    store: &DalleStore,
    layers: &[&str],
    canvas: &mut RenderCanvas,
    zoom: Option<u32>,
) -> chart_common::ChartResult<DrawReport> {
    let budget = RenderBudget::unlimited();
    let ctx = DrawContext {
        registry,
        store,
        font: None,
        zoom,
        debug: false,
        budget: &budget,
    };
    render_layers(canvas, layers, &ctx)
}

// ============================================================================
// Tiff layer
// ============================================================================

#[test]
fn test_full_extent_draws_four_dalles_without_gaps() {
    let (fixture, registry) = square_fixture();
    let mut canvas = RenderCanvas::new(2048, 2048, frame()).unwrap();

    let report = draw(&registry, &fixture.store(), &["coarse"], &mut canvas, None).unwrap();
    assert_eq!(report.dalles_drawn, 4);
    assert_eq!(report.entries_drawn, 1);

    let img = canvas.image();
    assert!(img.pixels().all(|p| p[3] == 255), "gap in composited image");
    assert_eq!(img.get_pixel(0, 0), &dalle_color(0, 0));
    assert_eq!(img.get_pixel(1023, 1023), &dalle_color(0, 0));
    assert_eq!(img.get_pixel(1024, 0), &dalle_color(1, 0));
    assert_eq!(img.get_pixel(0, 1024), &dalle_color(0, 1));
    assert_eq!(img.get_pixel(1023, 1024), &dalle_color(0, 1));
    assert_eq!(img.get_pixel(2047, 2047), &dalle_color(1, 1));
}

#[test]
fn test_downsampled_request_still_covers_canvas() {
    let (fixture, registry) = square_fixture();
    let mut canvas = RenderCanvas::new(300, 300, frame()).unwrap();

    let report = draw(&registry, &fixture.store(), &["coarse"], &mut canvas, None).unwrap();
    assert_eq!(report.dalles_drawn, 4);
    assert!(canvas.image().pixels().all(|p| p[3] == 255));
}

#[test]
fn test_single_dalle_query() {
    let (fixture, registry) = square_fixture();
    // Exactly the upper-left dalle; neighbours only share an edge.
    let bbox = ProjectedBox::from_coords(&[0.0, 10240.0, 10240.0, 20480.0]).unwrap();
    let mut canvas = RenderCanvas::new(256, 256, bbox).unwrap();

    let report = draw(&registry, &fixture.store(), &["coarse"], &mut canvas, None).unwrap();
    assert_eq!(report.dalles_drawn, 1);
    assert_eq!(canvas.image().get_pixel(128, 128), &dalle_color(0, 0));
}

#[test]
fn test_query_outside_chart_draws_nothing() {
    let (fixture, registry) = square_fixture();
    let bbox = ProjectedBox::from_coords(&[50000.0, 50000.0, 60000.0, 60000.0]).unwrap();
    let mut canvas = RenderCanvas::new(64, 64, bbox).unwrap();

    let report = draw(&registry, &fixture.store(), &["coarse"], &mut canvas, None).unwrap();
    assert_eq!(report, DrawReport::default());
    assert!(canvas.image().pixels().all(|p| p[3] == 0));
}

#[test]
fn test_missing_primary_dalle_is_not_found() {
    let (fixture, registry) = square_fixture();
    fixture.remove_dalle("square", 1, 1);
    let mut canvas = RenderCanvas::new(256, 256, frame()).unwrap();

    let err = draw(&registry, &fixture.store(), &["coarse"], &mut canvas, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_debug_strokes_dalle_outlines() {
    let (fixture, registry) = square_fixture();
    let store = fixture.store();
    let budget = RenderBudget::unlimited();
    let ctx = DrawContext {
        registry: &registry,
        store: &store,
        font: None,
        zoom: None,
        debug: true,
        budget: &budget,
    };
    let mut canvas = RenderCanvas::new(2048, 2048, frame()).unwrap();
    render_layers(&mut canvas, &["coarse"], &ctx).unwrap();

    // Right edge of dalle (0, 0)
    assert_eq!(canvas.image().get_pixel(1023, 500), &image::Rgba([255, 0, 0, 255]));
    assert_eq!(canvas.image().get_pixel(500, 500), &dalle_color(0, 0));
}

#[test]
fn test_exhausted_budget_aborts() {
    let (fixture, registry) = square_fixture();
    let store = fixture.store();
    let budget = RenderBudget::new(Duration::ZERO);
    let ctx = DrawContext {
        registry: &registry,
        store: &store,
        font: None,
        zoom: None,
        debug: false,
        budget: &budget,
    };
    let mut canvas = RenderCanvas::new(64, 64, frame()).unwrap();
    let err = render_layers(&mut canvas, &["coarse"], &ctx).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[test]
fn test_spent_budget_stops_entry_before_any_dalle() {
    let (fixture, registry) = square_fixture();
    let Some(Layer::Tiff(tiff)) = registry.get("coarse") else {
        panic!("coarse is a tiff layer");
    };
    let mut canvas = RenderCanvas::new(256, 256, frame()).unwrap();

    let err = tiff.entries()[0]
        .draw(
            &mut canvas,
            &fixture.store(),
            Instance::Primary,
            false,
            &RenderBudget::new(Duration::ZERO),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(canvas.image().pixels().all(|p| p[3] == 0));
}

#[test]
fn test_unknown_layer_fails_before_drawing() {
    let (fixture, registry) = square_fixture();
    let mut canvas = RenderCanvas::new(64, 64, frame()).unwrap();

    let err = draw(&registry, &fixture.store(), &["coarse", "nope"], &mut canvas, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(canvas.image().pixels().all(|p| p[3] == 0));
}

// ============================================================================
// Pyramid and label layers
// ============================================================================

#[test]
fn test_pyramid_requires_zoom() {
    let (fixture, registry) = square_fixture();
    let mut canvas = RenderCanvas::new(64, 64, frame()).unwrap();

    let err = draw(&registry, &fixture.store(), &["pyr"], &mut canvas, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

#[test]
fn test_pyramid_unlocks_finer_layers_with_zoom() {
    let (fixture, registry) = square_fixture();
    let store = fixture.store();

    let mut canvas = RenderCanvas::new(256, 256, frame()).unwrap();
    let coarse_only = draw(&registry, &store, &["pyr"], &mut canvas, Some(3)).unwrap();
    assert_eq!(coarse_only.dalles_drawn, 4);

    let mut canvas = RenderCanvas::new(256, 256, frame()).unwrap();
    let both = draw(&registry, &store, &["pyr"], &mut canvas, Some(5)).unwrap();
    assert_eq!(both.dalles_drawn, 5);
    assert_eq!(both.entries_drawn, 2);
}

#[test]
fn test_registry_contents() {
    let (_fixture, registry) = square_fixture();
    let names: Vec<_> = registry.names().collect();
    assert_eq!(names, vec!["coarse", "coarse-num", "fine", "fine-num", "pyr"]);

    match registry.get("coarse-num") {
        Some(Layer::Label(labels)) => {
            assert_eq!(labels.anchors().len(), 1);
            let (text, anchor) = &labels.anchors()[0];
            assert_eq!(text, "square");
            assert_eq!((anchor.x, anchor.y), (0.0, 20480.0));
        }
        other => panic!("expected label layer, got {:?}", other.map(|l| l.kind())),
    }

    let pyramid = registry.get("pyr").unwrap();
    assert_eq!(pyramid.ebox(&registry), frame());
}

#[test]
fn test_labels_without_font_draw_nothing() {
    let (fixture, registry) = square_fixture();
    let mut canvas = RenderCanvas::new(64, 64, frame()).unwrap();
    let report = draw(&registry, &fixture.store(), &["coarse-num"], &mut canvas, None).unwrap();
    assert_eq!(report.labels_drawn, 0);
}

#[test]
fn test_entries_without_data_are_skipped() {
    let fixture = ChartFixture::new();
    let catalog = parse_layers_yaml(
        "layers:\n  l:\n    ghost:\n      spatial: { SW: [0.0, 0.0], NE: [1.0, 1.0] }\n",
    )
    .unwrap();
    let registry = LayerRegistry::build(&catalog, &fixture.store()).unwrap();
    match registry.get("l") {
        Some(Layer::Tiff(tiff)) => assert!(tiff.entries().is_empty()),
        _ => panic!("expected tiff layer"),
    }
}

// ============================================================================
// Anti-meridian
// ============================================================================

const SEAM_YAML: &str = r#"
erosion_px: 0
layers:
  seam:
    pacific:
      spatial: { SW: [179.9, -0.1], NE: [-179.9, 0.1] }
"#;

/// 2048x2048 chart at 10 m/px centred on the anti-meridian and the equator.
fn seam_fixture() -> (ChartFixture, LayerRegistry) {
    let fixture = ChartFixture::new();
    fixture.add_georeferenced("pacific", 2048, 2048, 10.0, [SIZE0 / 2.0 - 10240.0, 10240.0]);
    let catalog = parse_layers_yaml(SEAM_YAML).unwrap();
    let registry = LayerRegistry::build(&catalog, &fixture.store()).unwrap();
    (fixture, registry)
}

fn west_of_seam() -> ProjectedBox {
    ProjectedBox::from_coords(&[-SIZE0 / 2.0, -10240.0, -SIZE0 / 2.0 + 10240.0, 10240.0]).unwrap()
}

#[test]
fn test_mirror_draws_west_of_seam() {
    let (fixture, registry) = seam_fixture();
    let mut canvas = RenderCanvas::new(1024, 2048, west_of_seam()).unwrap();

    let report = draw(&registry, &fixture.store(), &["seam"], &mut canvas, None).unwrap();
    assert_eq!(report.dalles_drawn, 2);
    assert_eq!(canvas.image().get_pixel(10, 10), &dalle_color(1, 0));
    assert_eq!(canvas.image().get_pixel(10, 2000), &dalle_color(1, 1));
}

#[test]
fn test_primary_draws_east_of_seam() {
    let (fixture, registry) = seam_fixture();
    let east = ProjectedBox::from_coords(&[SIZE0 / 2.0 - 10240.0, -10240.0, SIZE0 / 2.0, 10240.0])
        .unwrap();
    let mut canvas = RenderCanvas::new(1024, 2048, east).unwrap();

    let report = draw(&registry, &fixture.store(), &["seam"], &mut canvas, None).unwrap();
    assert_eq!(report.dalles_drawn, 2);
    assert_eq!(canvas.image().get_pixel(10, 10), &dalle_color(0, 0));
}

#[test]
fn test_missing_mirror_dalle_is_skipped() {
    let (fixture, registry) = seam_fixture();
    fixture.remove_dalle("pacific", 1, 0);
    let mut canvas = RenderCanvas::new(1024, 2048, west_of_seam()).unwrap();

    let report = draw(&registry, &fixture.store(), &["seam"], &mut canvas, None).unwrap();
    assert_eq!(report.dalles_drawn, 1);
    assert_eq!(canvas.image().get_pixel(10, 10)[3], 0);
    assert_eq!(canvas.image().get_pixel(10, 2000), &dalle_color(1, 1));
}

// ============================================================================
// Candidate search
// ============================================================================

const SEARCH_YAML: &str = r#"
layers:
  l:
    west:
      spatial: { SW: [-2.0, 45.0], NE: [-1.0, 46.0] }
    east:
      spatial: { SW: [1.0, 45.0], NE: [2.0, 46.0] }
    wide:
      spatial: { SW: [-2.0, 44.0], NE: [2.0, 47.0] }
"#;

fn search_layer() -> (ChartFixture, LayerRegistry) {
    let fixture = ChartFixture::new();
    // Sizes keep derived pixels close to square at 45°N.
    fixture.add_scanned("west", 1024, 1400);
    fixture.add_scanned("east", 1024, 1400);
    fixture.add_scanned("wide", 1309, 1400);
    let catalog = parse_layers_yaml(SEARCH_YAML).unwrap();
    let registry = LayerRegistry::build(&catalog, &fixture.store()).unwrap();
    (fixture, registry)
}

#[test]
fn test_nearest_entries_by_coverage() {
    let (_fixture, registry) = search_layer();
    let Some(Layer::Tiff(tiff)) = registry.get("l") else {
        panic!("expected tiff layer");
    };

    let query = GeoBox::from_coords(&[1.4, 45.4, 1.6, 45.6]).unwrap();
    let ranked = tiff.nearest_entries(&query, 3);
    assert_eq!(ranked.len(), 3);
    let covering: Vec<_> = ranked
        .iter()
        .filter(|(_, d)| *d == 0.0)
        .map(|(e, _)| e.name())
        .collect();
    assert_eq!(covering, vec!["east", "wide"]);
    assert_eq!(ranked[2].0.name(), "west");
    assert!(ranked[2].1 > 0.0);

    assert_eq!(tiff.nearest_entries(&query, 1).len(), 1);
}

#[test]
fn test_best_match_by_distance() {
    let (_fixture, registry) = search_layer();
    let Some(Layer::Tiff(tiff)) = registry.get("l") else {
        panic!("expected tiff layer");
    };

    let query = GeoBox::from_coords(&[1.05, 45.0, 2.0, 45.95]).unwrap();
    assert_eq!(tiff.best_match(&query).unwrap().name(), "east");

    let big = GeoBox::from_coords(&[-2.1, 44.0, 2.0, 47.0]).unwrap();
    assert_eq!(tiff.best_match(&big).unwrap().name(), "wide");
    assert!(tiff.best_match(&GeoBox::empty()).is_none());
}
