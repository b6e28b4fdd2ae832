//! Quad-pyramid tile geometry.
//!
//! The pyramid covers the World Mercator square `±π·a` (WGS84). Zoom `z`
//! splits it into `2^z × 2^z` tiles of 256 pixels, rows counted from the
//! north edge.

use projection::{Position, WorldMercator, WGS84};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bbox::{GeoBox, ProjectedBox};
use crate::error::{ChartError, ChartResult};

/// Side length of the projected world: `2π·a`.
pub const SIZE0: f64 = 2.0 * std::f64::consts::PI * WGS84.a;

/// Tile side in pixels.
pub const TILE_SIZE: u32 = 256;

/// Deepest zoom level.
pub const MAX_ZOOM: u32 = 18;

/// Admission limit on tiles along one axis of a request.
pub const MAX_TILES_PER_AXIS: u32 = 100;

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y), from the north edge
    pub y: u32,
}

impl TileCoord {
    /// Validated tile address: `z <= 18` and `x, y < 2^z`.
    pub fn new(z: u32, x: u32, y: u32) -> ChartResult<Self> {
        if z > MAX_ZOOM {
            return Err(ChartError::invalid_request(format!(
                "zoom {} above maximum {}",
                z, MAX_ZOOM
            )));
        }
        let n = tiles_per_axis(z);
        if x >= n || y >= n {
            return Err(ChartError::invalid_request(format!(
                "tile {}/{}/{} outside the {}x{} grid",
                z, x, y, n, n
            )));
        }
        Ok(Self { z, x, y })
    }

    /// Get the parent tile (zoom - 1).
    pub fn parent(&self) -> Option<TileCoord> {
        if self.z == 0 {
            return None;
        }
        Some(TileCoord {
            z: self.z - 1,
            x: self.x / 2,
            y: self.y / 2,
        })
    }

    /// Projected extent of the tile.
    pub fn bbox(&self) -> ProjectedBox {
        tile_box(self)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

fn tiles_per_axis(z: u32) -> u32 {
    1u32 << z
}

/// Metres per pixel at zoom `z`.
pub fn pixel_size(z: u32) -> f64 {
    SIZE0 / TILE_SIZE as f64 / tiles_per_axis(z) as f64
}

/// Zoom whose tiles span about `degrees` of longitude.
///
/// `round(log2(360 / degrees))` clamped to `0..=18`; zero degrees gives the
/// deepest zoom.
pub fn zoom_for_size(degrees: f64) -> u32 {
    if degrees <= 0.0 {
        return MAX_ZOOM;
    }
    (360.0 / degrees).log2().round().clamp(0.0, MAX_ZOOM as f64) as u32
}

/// Auto-fit zoom for a geographic box.
pub fn zoom_for_box(bbox: &GeoBox) -> u32 {
    zoom_for_size(bbox.size())
}

/// World-centered projected rectangle of a tile.
pub fn tile_box(coord: &TileCoord) -> ProjectedBox {
    let side = SIZE0 / tiles_per_axis(coord.z) as f64;
    let west = -SIZE0 / 2.0 + coord.x as f64 * side;
    let north = SIZE0 / 2.0 - coord.y as f64 * side;
    ProjectedBox::from_corners(
        Position::new(west, north - side),
        Position::new(west + side, north),
    )
}

/// Tiles covering `bbox` at the zoom matching a `width × height` pixel render.
///
/// The zoom follows whichever axis has the coarser resolution.
///
/// Columns wrap around the anti-meridian. Latitudes are clamped to the
/// World Mercator band. Fails with [`ChartError::ResourceLimit`] rather than
/// truncating when either axis needs more than [`MAX_TILES_PER_AXIS`] tiles.
pub fn box_to_tiles(bbox: &GeoBox, width: u32, height: u32) -> ChartResult<Vec<TileCoord>> {
    let (min, max) = bbox
        .corners()
        .ok_or_else(|| ChartError::invalid_request("empty bounding box"))?;
    if width == 0 || height == 0 {
        return Err(ChartError::invalid_request(format!(
            "invalid image size {}x{}",
            width, height
        )));
    }

    let clamp = |lat: f64| lat.clamp(-WorldMercator::MAX_LAT, WorldMercator::MAX_LAT);
    let mercator = WorldMercator::default();
    let sw = mercator.proj(Position::new(min.x, clamp(min.y)))?;
    let ne = mercator.proj(Position::new(max.x, clamp(max.y)))?;

    // Coarser of the two axis resolutions; the y span is measured in
    // Mercator metres expressed as degrees of the world side.
    let z_x = zoom_for_size(bbox.width() * TILE_SIZE as f64 / width as f64);
    let y_degrees = (ne.y - sw.y) / SIZE0 * 360.0;
    let z_y = zoom_for_size(y_degrees * TILE_SIZE as f64 / height as f64);
    let z = z_x.min(z_y);
    let n = tiles_per_axis(z);
    let side = SIZE0 / n as f64;

    let col0 = ((sw.x + SIZE0 / 2.0) / side).floor() as i64;
    let col1 = (((ne.x + SIZE0 / 2.0) / side).ceil() as i64 - 1).max(col0);
    let row0 = (((SIZE0 / 2.0 - ne.y) / side).floor() as i64).clamp(0, n as i64 - 1);
    let row1 = (((SIZE0 / 2.0 - sw.y) / side).ceil() as i64 - 1).clamp(row0, n as i64 - 1);

    let cols = ((col1 - col0 + 1) as u64).min(n as u64);
    let rows = (row1 - row0 + 1) as u64;
    for (axis, count) in [("x", cols), ("y", rows)] {
        if count > MAX_TILES_PER_AXIS as u64 {
            return Err(ChartError::ResourceLimit {
                axis,
                count,
                limit: MAX_TILES_PER_AXIS,
            });
        }
    }

    let mut tiles = Vec::with_capacity((cols * rows) as usize);
    for row in row0..=row1 {
        for step in 0..cols as i64 {
            let col = (col0 + step).rem_euclid(n as i64);
            tiles.push(TileCoord {
                z,
                x: col as u32,
                y: row as u32,
            });
        }
    }
    Ok(tiles)
}
