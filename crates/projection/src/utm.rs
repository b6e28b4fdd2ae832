//! Universal Transverse Mercator.
//!
//! Uses the USGS series expansions (Snyder, "Map Projections: A Working
//! Manual", §8) for both directions. Zones are 6° wide, numbered 1..=60
//! eastward from 180°W; southern-hemisphere zones carry a 10 000 km false
//! northing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ellipsoid::{Ellipsoid, WGS84};
use crate::error::{ProjectionError, ProjectionResult};
use crate::position::Position;

const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hemisphere {
    North,
    South,
}

/// A UTM zone: 2-digit band number and hemisphere, written `31N`, `58S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtmZone {
    pub number: u8,
    pub hemisphere: Hemisphere,
}

impl UtmZone {
    pub fn new(number: u8, hemisphere: Hemisphere) -> ProjectionResult<Self> {
        if !(1..=60).contains(&number) {
            return Err(ProjectionError::InvalidZone(format!(
                "{}{}",
                number,
                hemisphere.letter()
            )));
        }
        Ok(Self { number, hemisphere })
    }

    /// Longitude of the central meridian in degrees.
    pub fn central_meridian(&self) -> f64 {
        (self.number as f64 - 1.0) * 6.0 - 180.0 + 3.0
    }
}

impl Hemisphere {
    fn letter(self) -> char {
        match self {
            Hemisphere::North => 'N',
            Hemisphere::South => 'S',
        }
    }
}

impl FromStr for UtmZone {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 3 || !s.is_ascii() {
            return Err(ProjectionError::InvalidZone(s.to_string()));
        }
        let number: u8 = s[..2]
            .parse()
            .map_err(|_| ProjectionError::InvalidZone(s.to_string()))?;
        let hemisphere = match &s[2..] {
            "N" | "n" => Hemisphere::North,
            "S" | "s" => Hemisphere::South,
            _ => return Err(ProjectionError::InvalidZone(s.to_string())),
        };
        Self::new(number, hemisphere)
    }
}

impl fmt::Display for UtmZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{}", self.number, self.hemisphere.letter())
    }
}

/// UTM projection on a given ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Utm {
    ellipsoid: Ellipsoid,
}

impl Utm {
    pub fn new(ellipsoid: Ellipsoid) -> Self {
        Self { ellipsoid }
    }

    /// Natural zone of a geographic position.
    pub fn zone(pos: Position) -> UtmZone {
        let lon = normalize_lon(pos.x);
        let number = (((lon + 180.0) / 6.0).floor() as i64).clamp(0, 59) as u8 + 1;
        let hemisphere = if pos.y < 0.0 {
            Hemisphere::South
        } else {
            Hemisphere::North
        };
        UtmZone { number, hemisphere }
    }

    /// Meridional arc length from the equator to `phi` (radians).
    fn meridional_arc(&self, phi: f64) -> f64 {
        let e2 = self.ellipsoid.e2();
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        self.ellipsoid.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }

    pub fn proj(&self, geo: Position, zone: &UtmZone) -> ProjectionResult<Position> {
        let e2 = self.ellipsoid.e2();
        let ep2 = self.ellipsoid.ep2();

        let phi = geo.y.to_radians();
        let dlon = normalize_lon(geo.x - zone.central_meridian()).to_radians();

        let (sin_phi, cos_phi) = phi.sin_cos();
        let tan_phi = phi.tan();

        let n = self.ellipsoid.a / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = cos_phi * dlon;
        let m = self.meridional_arc(phi);

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let x = K0
            * n
            * (a + (1.0 - t + c) * a3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0)
            + FALSE_EASTING;

        let mut y = K0
            * (m + n
                * tan_phi
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));

        if zone.hemisphere == Hemisphere::South {
            y += FALSE_NORTHING_SOUTH;
        }

        Ok(Position::new(x, y))
    }

    pub fn geo(&self, pos: Position, zone: &UtmZone) -> ProjectionResult<Position> {
        let a = self.ellipsoid.a;
        let e2 = self.ellipsoid.e2();
        let ep2 = self.ellipsoid.ep2();
        let e4 = e2 * e2;
        let e6 = e4 * e2;

        let x = pos.x - FALSE_EASTING;
        let y = match zone.hemisphere {
            Hemisphere::North => pos.y,
            Hemisphere::South => pos.y - FALSE_NORTHING_SOUTH,
        };

        // Footpoint latitude
        let m = y / K0;
        let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());
        let e1_2 = e1 * e1;
        let e1_3 = e1_2 * e1;
        let e1_4 = e1_3 * e1;
        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

        let (sin1, cos1) = phi1.sin_cos();
        let tan1 = phi1.tan();
        let w = 1.0 - e2 * sin1 * sin1;
        let n1 = a / w.sqrt();
        let t1 = tan1 * tan1;
        let c1 = ep2 * cos1 * cos1;
        let r1 = a * (1.0 - e2) / w.powf(1.5);
        let d = x / (n1 * K0);

        let d2 = d * d;
        let d3 = d2 * d;
        let d4 = d3 * d;
        let d5 = d4 * d;
        let d6 = d5 * d;

        let lat = phi1
            - (n1 * tan1 / r1)
                * (d2 / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d4 / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2
                        - 3.0 * c1 * c1)
                        * d6
                        / 720.0);

        let lon = (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d5
                / 120.0)
            / cos1;

        Ok(Position::new(
            zone.central_meridian() + lon.to_degrees(),
            lat.to_degrees(),
        ))
    }
}

impl Default for Utm {
    fn default() -> Self {
        Self::new(WGS84)
    }
}

/// Bring a longitude into [-180, 180).
fn normalize_lon(lon: f64) -> f64 {
    let mut lon = lon;
    while lon >= 180.0 {
        lon -= 360.0;
    }
    while lon < -180.0 {
        lon += 360.0;
    }
    lon
}
