//! Raster entry geometry: georeferenced and derived frames, erosion and
//! dalle boxes.

use chart_common::{ErrorKind, GeoBox, ProjectedBox};
use chart_layers::{BorderCrop, EntryConfig, RasterEntry};
use projection::Position;
use storage::{GeorefDescriptor, RasterInfo};
use test_utils::assert_approx_eq;

fn entry(spatial: [f64; 4], borders: Option<BorderCrop>) -> EntryConfig {
    EntryConfig {
        name: "7330".to_string(),
        title: "Test chart".to_string(),
        spatial: GeoBox::from_corners(
            Position::new(spatial[0], spatial[1]),
            Position::new(spatial[2], spatial[3]),
        ),
        outgrowth: Vec::new(),
        borders,
        deleted: Vec::new(),
    }
}

fn scanned(width: u32, height: u32) -> RasterInfo {
    RasterInfo {
        width,
        height,
        georef: None,
        edition: Some("2019-07".to_string()),
        scale_denominator: Some(50000),
        issued: None,
    }
}

fn georeferenced(crs: &str) -> RasterInfo {
    RasterInfo {
        georef: Some(GeorefDescriptor {
            crs: Some(crs.to_string()),
            pixel_size: Some([10.0, 10.0]),
            upper_left: Some([0.0, 20480.0]),
        }),
        ..scanned(2048, 2048)
    }
}

// ============================================================================
// Frames
// ============================================================================

#[test]
fn test_georeferenced_frame() {
    let raster = RasterEntry::build(&entry([-1.0, -1.0, 1.0, 1.0], None), georeferenced("EPSG:3395"), 3.0)
        .unwrap();
    assert_eq!(
        raster.frame(),
        &ProjectedBox::from_coords(&[0.0, 0.0, 20480.0, 20480.0]).unwrap()
    );
    assert_eq!(raster.pixel_size(), (10.0, 10.0));
    assert_eq!(raster.grid(), (2, 2));
    // The neat box is larger than the raster: the frame bounds the ebox.
    assert_eq!(raster.ebox(), raster.frame());
    assert_eq!(raster.info().scale_denominator, Some(50000));
}

#[test]
fn test_georeferencing_in_other_crs_rejected() {
    let err = RasterEntry::build(&entry([-1.0, -1.0, 1.0, 1.0], None), georeferenced("EPSG:3857"), 3.0)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Georeferencing);
}

#[test]
fn test_incomplete_georeferencing_rejected() {
    let mut info = georeferenced("EPSG:3395");
    if let Some(georef) = info.georef.as_mut() {
        georef.pixel_size = None;
    }
    let err = RasterEntry::build(&entry([-1.0, -1.0, 1.0, 1.0], None), info, 3.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Georeferencing);
}

#[test]
fn test_derived_frame_from_border_crop() {
    let crop = BorderCrop {
        left: 100.0,
        bottom: 50.0,
        right: 100.0,
        top: 50.0,
    };
    let raster = RasterEntry::build(&entry([0.0, 0.0, 0.2, 0.2], Some(crop)), scanned(2048, 2048), 0.0)
        .unwrap();

    let (dx, dy) = raster.pixel_size();
    assert_approx_eq!(raster.neat().width() / 1848.0, dx, 1e-9);
    assert_approx_eq!(raster.neat().height() / 1948.0, dy, 1e-9);
    assert_approx_eq!(raster.frame().width(), 2048.0 * dx, 1e-6);
    assert_approx_eq!(raster.frame().height(), 2048.0 * dy, 1e-6);

    let neat_min = raster.neat().min().unwrap();
    let frame_min = raster.frame().min().unwrap();
    assert_approx_eq!(neat_min.x - frame_min.x, 100.0 * dx, 1e-6);
    assert_approx_eq!(neat_min.y - frame_min.y, 50.0 * dy, 1e-6);
}

#[test]
fn test_pixel_ratio_mismatch_is_configuration_error() {
    // A square extent squeezed into a 2:1 raster.
    let err = RasterEntry::build(&entry([0.0, 0.0, 0.2, 0.2], None), scanned(2048, 1024), 0.0)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_crop_larger_than_raster_rejected() {
    let crop = BorderCrop {
        left: 1500.0,
        bottom: 0.0,
        right: 1500.0,
        top: 0.0,
    };
    let err = RasterEntry::build(&entry([0.0, 0.0, 0.2, 0.2], Some(crop)), scanned(2048, 2048), 0.0)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_chart_outside_mercator_band_fails() {
    let err = RasterEntry::build(&entry([0.0, 85.5, 1.0, 86.0], None), scanned(1024, 1024), 0.0)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProjectionRange);
}

// ============================================================================
// Erosion and outgrowths
// ============================================================================

#[test]
fn test_erosion_in_pixels() {
    let raster = RasterEntry::build(&entry([0.0, 0.0, 0.2, 0.2], None), scanned(2048, 2048), 3.0)
        .unwrap();
    let (dx, dy) = raster.pixel_size();
    let margin = 3.0 * (dx + dy) / 2.0;

    let neat = raster.neat().corners().unwrap();
    let ebox = raster.ebox().corners().unwrap();
    assert_approx_eq!(ebox.0.x - neat.0.x, margin, 1e-6);
    assert_approx_eq!(neat.1.y - ebox.1.y, margin, 1e-6);
}

#[test]
fn test_outgrowth_extends_extent() {
    let mut config = entry([0.0, 0.0, 0.2, 0.2], Some(BorderCrop {
        left: 0.0,
        bottom: 0.0,
        right: 400.0,
        top: 0.0,
    }));
    // Detached region printed in the right-hand border.
    config.outgrowth.push(GeoBox::from_corners(
        Position::new(0.2, 0.05),
        Position::new(0.22, 0.1),
    ));
    let raster = RasterEntry::build(&config, scanned(2448, 2048), 2.0).unwrap();

    assert_eq!(raster.outgrowths().len(), 1);
    let extent = raster.extent();
    assert!(extent.max().unwrap().x > raster.ebox().max().unwrap().x);
    assert!(raster.frame().includes(&extent));
}

// ============================================================================
// Dalle grid
// ============================================================================

#[test]
fn test_dalle_boxes_tile_the_frame() {
    let mut info = georeferenced("EPSG:3395");
    info.width = 2500;
    info.height = 1100;
    let raster = RasterEntry::build(&entry([-1.0, -1.0, 1.0, 1.0], None), info, 0.0).unwrap();
    assert_eq!(raster.grid(), (3, 2));

    // Upper-left corner is at (0, 20480); 1100 rows end at y = 9480.
    assert_eq!(
        raster.dalle_box(0, 0),
        ProjectedBox::from_coords(&[0.0, 10240.0, 10240.0, 20480.0]).unwrap()
    );
    assert_eq!(
        raster.dalle_box(2, 1),
        ProjectedBox::from_coords(&[20480.0, 9480.0, 25000.0, 10240.0]).unwrap()
    );

    let all = raster.dalles_in(raster.frame());
    assert_eq!(all.len(), 6);
    assert_eq!((all[0].i, all[0].j), (0, 0));
    assert_eq!((all[5].i, all[5].j), (2, 1));

    let inner = ProjectedBox::from_coords(&[12000.0, 12000.0, 13000.0, 13000.0]).unwrap();
    let hits = raster.dalles_in(&inner);
    assert_eq!(hits.len(), 1);
    assert_eq!((hits[0].i, hits[0].j), (1, 0));
}
