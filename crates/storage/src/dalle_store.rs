//! Filesystem access to pre-sliced rasters.
//!
//! Layout under the data root:
//!
//! ```text
//! {root}/{entry}/info.json
//! {root}/{entry}/{i}-{j}.png     i = column, j = row, from the upper-left
//! ```
//!
//! Every dalle is `DALLE_SIZE` pixels square except along the right and
//! bottom edges of the raster.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chart_common::{ChartError, ChartResult};
use image::RgbaImage;
use tracing::{debug, warn};

use crate::sidecar::RasterInfo;

/// Side of a full dalle in pixels.
pub const DALLE_SIZE: u32 = 1024;

/// Number of dalle columns and rows for a raster of the given size.
pub fn dalle_grid(width: u32, height: u32) -> (u32, u32) {
    (
        (width + DALLE_SIZE - 1) / DALLE_SIZE,
        (height + DALLE_SIZE - 1) / DALLE_SIZE,
    )
}

/// Read-only dalle storage rooted at a directory.
#[derive(Debug, Clone)]
pub struct DalleStore {
    root: PathBuf,
}

impl DalleStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dalle_path(&self, entry: &str, i: u32, j: u32) -> PathBuf {
        self.root.join(entry).join(format!("{}-{}.png", i, j))
    }

    pub fn sidecar_path(&self, entry: &str) -> PathBuf {
        self.root.join(entry).join("info.json")
    }

    /// Whether the entry has a directory in the store.
    pub fn has_entry(&self, entry: &str) -> bool {
        self.root.join(entry).is_dir()
    }

    /// Load dalle `(i, j)` of `entry`.
    ///
    /// Returns `Ok(None)` when the file does not exist; the caller decides
    /// whether that is fatal.
    pub fn load_dalle(&self, entry: &str, i: u32, j: u32) -> ChartResult<Option<RgbaImage>> {
        let path = self.dalle_path(entry, i, j);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Dalle file not found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let image = image::load_from_memory(&bytes).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to decode dalle");
            ChartError::Image(format!("{}: {}", path.display(), e))
        })?;
        Ok(Some(image.to_rgba8()))
    }

    /// Read the sidecar of `entry`; a missing sidecar is `NotFound`.
    pub fn read_sidecar(&self, entry: &str) -> ChartResult<RasterInfo> {
        let path = self.sidecar_path(entry);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ChartError::not_found(format!(
                    "raster metadata {}",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text).map_err(|e| {
            ChartError::georeferencing(entry, format!("unreadable {}: {}", path.display(), e))
        })
    }
}
