//! Synthetic chart stores.
//!
//! Each raster is sliced into `DALLE_SIZE` dalles exactly as the offline
//! slicer lays them out. Every dalle is a solid [`dalle_color`], so a test
//! can tell from a canvas pixel which dalle was drawn there.

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use storage::{dalle_grid, DalleStore, GeorefDescriptor, RasterInfo, DALLE_SIZE};
use tempfile::TempDir;

/// Fill colour of dalle `(i, j)`.
pub fn dalle_color(i: u32, j: u32) -> Rgba<u8> {
    Rgba([(20 + i * 40) as u8, (20 + j * 40) as u8, 200, 255])
}

/// A temporary data directory holding synthetic charts.
pub struct ChartFixture {
    dir: TempDir,
}

impl ChartFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn store(&self) -> DalleStore {
        DalleStore::new(self.dir.path())
    }

    /// Write `info.json` and every dalle of a raster.
    pub fn add_raster(&self, entry: &str, info: &RasterInfo) {
        let entry_dir = self.dir.path().join(entry);
        fs::create_dir_all(&entry_dir).expect("create entry dir");
        fs::write(
            entry_dir.join("info.json"),
            serde_json::to_string_pretty(info).expect("serialize sidecar"),
        )
        .expect("write sidecar");

        let (cols, rows) = dalle_grid(info.width, info.height);
        for j in 0..rows {
            for i in 0..cols {
                let w = DALLE_SIZE.min(info.width - i * DALLE_SIZE);
                let h = DALLE_SIZE.min(info.height - j * DALLE_SIZE);
                RgbaImage::from_pixel(w, h, dalle_color(i, j))
                    .save(entry_dir.join(format!("{}-{}.png", i, j)))
                    .expect("write dalle");
            }
        }
    }

    /// Raster georeferenced in World Mercator with square pixels.
    pub fn add_georeferenced(
        &self,
        entry: &str,
        width: u32,
        height: u32,
        pixel_size: f64,
        upper_left: [f64; 2],
    ) {
        let info = RasterInfo {
            width,
            height,
            georef: Some(GeorefDescriptor {
                crs: Some("EPSG:3395".to_string()),
                pixel_size: Some([pixel_size, pixel_size]),
                upper_left: Some(upper_left),
            }),
            edition: None,
            scale_denominator: None,
            issued: None,
        };
        self.add_raster(entry, &info);
    }

    /// Raster without georeferencing (a scanned chart).
    pub fn add_scanned(&self, entry: &str, width: u32, height: u32) {
        let info = RasterInfo {
            width,
            height,
            georef: None,
            edition: None,
            scale_denominator: None,
            issued: None,
        };
        self.add_raster(entry, &info);
    }

    pub fn remove_dalle(&self, entry: &str, i: u32, j: u32) {
        fs::remove_file(self.dir.path().join(entry).join(format!("{}-{}.png", i, j)))
            .expect("remove dalle");
    }

    /// Write an arbitrary file under the fixture root.
    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("write fixture file");
        path
    }
}

impl Default for ChartFixture {
    fn default() -> Self {
        Self::new()
    }
}
