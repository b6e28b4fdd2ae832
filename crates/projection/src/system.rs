//! Named coordinate systems.
//!
//! A [`CoordinateSystem`] is a stateless bidirectional mapping between
//! geographic positions (lon/lat degrees) and the system's own coordinates.
//! Every projected variant carries the ellipsoid it is computed on, so
//! switching reference ellipsoid is a matter of building another value.

use crate::ellipsoid::{Ellipsoid, WGS84};
use crate::error::{ProjectionError, ProjectionResult};
use crate::lambert::Lambert93;
use crate::mercator::{WebMercator, WorldMercator};
use crate::position::Position;
use crate::utm::{Utm, UtmZone};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinateSystem {
    /// Longitude/latitude passthrough.
    Geographic,
    /// Latitude/longitude axis order; conversion swaps the axes.
    LatLon,
    /// Lambert93 on GRS80.
    Lambert93,
    WebMercator(Ellipsoid),
    WorldMercator(Ellipsoid),
    /// Zone-parameterized UTM; conversions require a zone.
    Utm(Ellipsoid),
}

impl CoordinateSystem {
    pub fn web_mercator() -> Self {
        Self::WebMercator(WGS84)
    }

    pub fn world_mercator() -> Self {
        Self::WorldMercator(WGS84)
    }

    pub fn utm() -> Self {
        Self::Utm(WGS84)
    }

    /// Short name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Geographic => "Geographic",
            Self::LatLon => "LatLon",
            Self::Lambert93 => "Lambert93",
            Self::WebMercator(_) => "WebMercator",
            Self::WorldMercator(_) => "WorldMercator",
            Self::Utm(_) => "UTM",
        }
    }

    /// Whether coordinates of this system are degrees rather than metres.
    pub fn is_geographic(&self) -> bool {
        matches!(self, Self::Geographic | Self::LatLon)
    }

    /// Geographic position to system coordinates.
    pub fn proj(&self, geo: Position, zone: Option<&UtmZone>) -> ProjectionResult<Position> {
        match self {
            Self::Geographic => Ok(geo),
            Self::LatLon => Ok(geo.swapped()),
            Self::Lambert93 => Lambert93::new().proj(geo),
            Self::WebMercator(e) => WebMercator::new(*e).proj(geo),
            Self::WorldMercator(e) => WorldMercator::new(*e).proj(geo),
            Self::Utm(e) => {
                let zone = zone.ok_or(ProjectionError::MissingZone)?;
                Utm::new(*e).proj(geo, zone)
            }
        }
    }

    /// System coordinates back to a geographic position.
    pub fn geo(&self, pos: Position, zone: Option<&UtmZone>) -> ProjectionResult<Position> {
        match self {
            Self::Geographic => Ok(pos),
            Self::LatLon => Ok(pos.swapped()),
            Self::Lambert93 => Lambert93::new().geo(pos),
            Self::WebMercator(e) => WebMercator::new(*e).geo(pos),
            Self::WorldMercator(e) => WorldMercator::new(*e).geo(pos),
            Self::Utm(e) => {
                let zone = zone.ok_or(ProjectionError::MissingZone)?;
                Utm::new(*e).geo(pos, zone)
            }
        }
    }
}
