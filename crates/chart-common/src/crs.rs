//! Coordinate Reference System codes.

use projection::{CoordinateSystem, Hemisphere, UtmZone};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ChartError, ChartResult};

/// Well-known CRS codes accepted in render requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 geographic, lon/lat axis order
    Crs84,
    /// WGS84 geographic, lat/lon axis order
    Epsg4326,
    /// Web Mercator (meters)
    Epsg3857,
    /// World Mercator (meters)
    Epsg3395,
    /// RGF93 / Lambert93 (meters)
    Epsg2154,
    /// WGS84 / UTM, EPSG:326NN (north) or EPSG:327NN (south)
    Utm(UtmZone),
}

impl CrsCode {
    /// Parse a CRS string.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326"
    /// - "epsg:3857"
    /// - "CRS:84"
    /// - "EPSG:32631"
    pub fn from_wms_string(s: &str) -> ChartResult<Self> {
        let normalized = s.trim().to_uppercase();

        match normalized.as_str() {
            "CRS:84" => return Ok(CrsCode::Crs84),
            "EPSG:4326" => return Ok(CrsCode::Epsg4326),
            "EPSG:3857" | "EPSG:900913" => return Ok(CrsCode::Epsg3857),
            "EPSG:3395" => return Ok(CrsCode::Epsg3395),
            "EPSG:2154" => return Ok(CrsCode::Epsg2154),
            _ => {}
        }

        let unsupported = || ChartError::invalid_request(format!("Unsupported CRS: {}", s));
        let code: u32 = normalized
            .strip_prefix("EPSG:")
            .and_then(|c| c.parse().ok())
            .ok_or_else(unsupported)?;
        let hemisphere = match code / 100 {
            326 => Hemisphere::North,
            327 => Hemisphere::South,
            _ => return Err(unsupported()),
        };
        let zone = UtmZone::new((code % 100) as u8, hemisphere)?;
        Ok(CrsCode::Utm(zone))
    }

    /// Axis order of the CRS's coordinates.
    pub fn axis_order(&self) -> AxisOrder {
        match self {
            CrsCode::Epsg4326 => AxisOrder::LatLon,
            _ => AxisOrder::XY,
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Crs84 | CrsCode::Epsg4326)
    }

    /// Coordinate system converting this CRS's coordinates.
    pub fn coordinate_system(&self) -> CoordinateSystem {
        match self {
            CrsCode::Crs84 => CoordinateSystem::Geographic,
            CrsCode::Epsg4326 => CoordinateSystem::LatLon,
            CrsCode::Epsg3857 => CoordinateSystem::web_mercator(),
            CrsCode::Epsg3395 => CoordinateSystem::world_mercator(),
            CrsCode::Epsg2154 => CoordinateSystem::Lambert93,
            CrsCode::Utm(_) => CoordinateSystem::utm(),
        }
    }

    pub fn utm_zone(&self) -> Option<&UtmZone> {
        match self {
            CrsCode::Utm(zone) => Some(zone),
            _ => None,
        }
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrsCode::Crs84 => write!(f, "CRS:84"),
            CrsCode::Epsg4326 => write!(f, "EPSG:4326"),
            CrsCode::Epsg3857 => write!(f, "EPSG:3857"),
            CrsCode::Epsg3395 => write!(f, "EPSG:3395"),
            CrsCode::Epsg2154 => write!(f, "EPSG:2154"),
            CrsCode::Utm(zone) => {
                let base = match zone.hemisphere {
                    Hemisphere::North => 32600,
                    Hemisphere::South => 32700,
                };
                write!(f, "EPSG:{}", base + zone.number as u32)
            }
        }
    }
}

/// Axis order for coordinate interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// X (longitude/easting), Y (latitude/northing)
    XY,
    /// Y (latitude/northing), X (longitude/easting)
    LatLon,
}
