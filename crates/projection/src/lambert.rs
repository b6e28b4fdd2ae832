//! Lambert Conformal Conic projection, ellipsoidal form.
//!
//! Lambert93 (EPSG:2154) is the official projection for metropolitan France.
//! It maps a cone secant to the GRS80 ellipsoid along two standard parallels
//! onto a flat plane.
//!
//! The projection parameters include:
//! - Standard parallels: 44°N and 49°N
//! - Latitude of origin: 46.5°N
//! - Central meridian: 3°E
//! - False easting / northing: 700 000 m / 6 600 000 m

use std::f64::consts::PI;

use crate::ellipsoid::{Ellipsoid, GRS80};
use crate::error::{ProjectionError, ProjectionResult};
use crate::position::Position;

/// Tolerance on latitude (radians) for the inverse iteration.
const LATITUDE_EPSILON: f64 = 1e-11;
const MAX_ITERATIONS: usize = 50;

/// Lambert Conformal Conic projection constants.
///
/// The cone constant `n`, the scale constant `c` and the pole northing `ys`
/// are derived once from the defining parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lambert93 {
    ellipsoid: Ellipsoid,
    /// Central meridian in radians
    lon0: f64,
    /// False easting (metres)
    xs: f64,
    /// Northing of the cone apex (metres)
    ys: f64,
    /// Cone constant
    n: f64,
    /// Scale constant (metres)
    c: f64,
}

impl Lambert93 {
    /// Build a secant Lambert projection from its defining parameters (degrees, metres).
    pub fn secant(
        ellipsoid: Ellipsoid,
        lat1_deg: f64,
        lat2_deg: f64,
        lat0_deg: f64,
        lon0_deg: f64,
        x0: f64,
        y0: f64,
    ) -> Self {
        let to_rad = PI / 180.0;
        let lat1 = lat1_deg * to_rad;
        let lat2 = lat2_deg * to_rad;
        let lat0 = lat0_deg * to_rad;

        let m1 = ellipsoid.prime_vertical_radius(lat1) * lat1.cos();
        let m2 = ellipsoid.prime_vertical_radius(lat2) * lat2.cos();
        let l1 = ellipsoid.isometric_latitude(lat1);
        let l2 = ellipsoid.isometric_latitude(lat2);

        let n = (m2 / m1).ln() / (l1 - l2);
        let c = m1 / n * (n * l1).exp();
        let ys = y0 + c * (-n * ellipsoid.isometric_latitude(lat0)).exp();

        Self {
            ellipsoid,
            lon0: lon0_deg * to_rad,
            xs: x0,
            ys,
            n,
            c,
        }
    }

    /// Lambert93 on GRS80.
    pub fn new() -> Self {
        Self::secant(GRS80, 44.0, 49.0, 46.5, 3.0, 700_000.0, 6_600_000.0)
    }

    /// Cone constant.
    pub fn cone_constant(&self) -> f64 {
        self.n
    }

    /// Convert a geographic position (lon/lat degrees) to Lambert93 metres.
    pub fn proj(&self, geo: Position) -> ProjectionResult<Position> {
        let lat = geo.y.to_radians();
        let lon = geo.x.to_radians();

        let iso = self.ellipsoid.isometric_latitude(lat);
        let rho = self.c * (-self.n * iso).exp();
        let theta = self.n * (lon - self.lon0);

        Ok(Position::new(
            self.xs + rho * theta.sin(),
            self.ys - rho * theta.cos(),
        ))
    }

    /// Convert Lambert93 metres back to a geographic position (lon/lat degrees).
    pub fn geo(&self, pos: Position) -> ProjectionResult<Position> {
        let dx = pos.x - self.xs;
        let dy = self.ys - pos.y;

        let rho = (dx * dx + dy * dy).sqrt();
        let theta = dx.atan2(dy);
        let lon = self.lon0 + theta / self.n;

        let iso = -(rho / self.c).abs().ln() / self.n;
        let lat = latitude_from_isometric(iso, self.ellipsoid.e())?;

        Ok(Position::new(lon.to_degrees(), lat.to_degrees()))
    }
}

impl Default for Lambert93 {
    fn default() -> Self {
        Self::new()
    }
}

/// Latitude from isometric latitude by fixed-point iteration.
fn latitude_from_isometric(iso: f64, e: f64) -> ProjectionResult<f64> {
    let expl = iso.exp();
    let mut phi = 2.0 * expl.atan() - PI / 2.0;
    for _ in 0..MAX_ITERATIONS {
        let esin = e * phi.sin();
        let next = 2.0 * (((1.0 + esin) / (1.0 - esin)).powf(e / 2.0) * expl).atan() - PI / 2.0;
        if (next - phi).abs() < LATITUDE_EPSILON {
            return Ok(next);
        }
        phi = next;
    }
    Err(ProjectionError::NoConvergence {
        system: "Lambert93",
        iterations: MAX_ITERATIONS,
    })
}
