//! Per-raster sidecar metadata (`{entry}/info.json`).
//!
//! Sidecars are produced offline next to the dalles. Example:
//!
//! ```json
//! {
//!   "width": 9800,
//!   "height": 7200,
//!   "georef": {
//!     "crs": "EPSG:3395",
//!     "pixel_size": [25.4, 25.4],
//!     "upper_left": [-222638.98, 6275277.33]
//!   },
//!   "edition": "2019-07",
//!   "scale_denominator": 50000,
//!   "issued": "2019-07-12"
//! }
//! ```

use chart_common::{ChartError, ChartResult, CrsCode};
use chrono::NaiveDate;
use projection::Position;
use serde::{Deserialize, Serialize};

/// Contents of a raster's `info.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterInfo {
    /// Full raster width in pixels
    pub width: u32,
    /// Full raster height in pixels
    pub height: u32,
    /// Embedded georeferencing, absent for scanned charts
    #[serde(default)]
    pub georef: Option<GeorefDescriptor>,
    #[serde(default)]
    pub edition: Option<String>,
    #[serde(default)]
    pub scale_denominator: Option<u32>,
    #[serde(default)]
    pub issued: Option<NaiveDate>,
}

/// Georeferencing block as written by the slicer. Every field is optional
/// on disk; [`GeorefDescriptor::resolve`] checks they are all there.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeorefDescriptor {
    #[serde(default)]
    pub crs: Option<String>,
    /// Metres per pixel along x and y (both positive)
    #[serde(default)]
    pub pixel_size: Option<[f64; 2]>,
    /// Projected coordinates of the upper-left pixel corner
    #[serde(default)]
    pub upper_left: Option<[f64; 2]>,
}

/// Complete georeferencing of a raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Georef {
    pub crs: CrsCode,
    pub pixel_size: (f64, f64),
    pub upper_left: Position,
}

impl GeorefDescriptor {
    pub fn resolve(&self, entry: &str) -> ChartResult<Georef> {
        let crs = self
            .crs
            .as_deref()
            .ok_or_else(|| ChartError::georeferencing(entry, "missing crs"))?;
        let crs = CrsCode::from_wms_string(crs)
            .map_err(|e| ChartError::georeferencing(entry, e.to_string()))?;
        let [dx, dy] = self
            .pixel_size
            .ok_or_else(|| ChartError::georeferencing(entry, "missing pixel_size"))?;
        if !(dx > 0.0 && dy > 0.0) {
            return Err(ChartError::georeferencing(
                entry,
                format!("invalid pixel_size [{}, {}]", dx, dy),
            ));
        }
        let upper_left = self
            .upper_left
            .ok_or_else(|| ChartError::georeferencing(entry, "missing upper_left"))?;

        Ok(Georef {
            crs,
            pixel_size: (dx, dy),
            upper_left: upper_left.into(),
        })
    }
}

impl RasterInfo {
    /// Resolved georeferencing, `None` when the raster carries none.
    pub fn georef(&self, entry: &str) -> ChartResult<Option<Georef>> {
        self.georef.as_ref().map(|g| g.resolve(entry)).transpose()
    }
}
