//! Mercator projections.
//!
//! Web Mercator (EPSG:3857, spherical on the ellipsoid's semi-major axis):
//!   forward: x = a·λ, y = a·ln(tan(π/4 + φ/2))
//!   inverse: λ = x/a, φ = π/2 - 2·atan(exp(-y/a))
//!
//! World Mercator (EPSG:3395, ellipsoidal):
//!   forward: x = a·λ, y = a·ψ(φ) with ψ the isometric latitude
//!   inverse: fixed-point iteration on φ, see [`WorldMercator::geo`]
//!
//! Both are bounded so that the projected world is the square ±π·a.

use std::f64::consts::FRAC_PI_2;

use crate::ellipsoid::{Ellipsoid, WGS84};
use crate::error::{ProjectionError, ProjectionResult};
use crate::position::Position;

/// Spherical Mercator on the ellipsoid's semi-major axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebMercator {
    ellipsoid: Ellipsoid,
}

impl WebMercator {
    /// Latitude (degrees) at which y reaches π·a.
    pub const MAX_LAT: f64 = 85.051_129;

    pub fn new(ellipsoid: Ellipsoid) -> Self {
        Self { ellipsoid }
    }

    pub fn proj(&self, geo: Position) -> ProjectionResult<Position> {
        if geo.y.abs() > Self::MAX_LAT {
            return Err(ProjectionError::OutOfRange {
                system: "WebMercator",
                lat: geo.y,
                limit: Self::MAX_LAT,
            });
        }
        let a = self.ellipsoid.a;
        let phi = geo.y.to_radians();
        Ok(Position::new(
            a * geo.x.to_radians(),
            a * (std::f64::consts::FRAC_PI_4 + phi / 2.0).tan().ln(),
        ))
    }

    pub fn geo(&self, pos: Position) -> ProjectionResult<Position> {
        let a = self.ellipsoid.a;
        let lat = FRAC_PI_2 - 2.0 * (-pos.y / a).exp().atan();
        Ok(Position::new((pos.x / a).to_degrees(), lat.to_degrees()))
    }
}

impl Default for WebMercator {
    fn default() -> Self {
        Self::new(WGS84)
    }
}

/// Ellipsoidal Mercator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldMercator {
    ellipsoid: Ellipsoid,
}

impl WorldMercator {
    /// Latitude (degrees) at which y reaches π·a on WGS84.
    pub const MAX_LAT: f64 = 85.084_059;

    /// Maximum number of fixed-point iterations in the inverse.
    pub const MAX_ITERATIONS: usize = 20;

    /// Convergence threshold on latitude (radians).
    pub const EPSILON: f64 = 1e-11;

    pub fn new(ellipsoid: Ellipsoid) -> Self {
        Self { ellipsoid }
    }

    pub fn proj(&self, geo: Position) -> ProjectionResult<Position> {
        if geo.y.abs() > Self::MAX_LAT {
            return Err(ProjectionError::OutOfRange {
                system: "WorldMercator",
                lat: geo.y,
                limit: Self::MAX_LAT,
            });
        }
        let a = self.ellipsoid.a;
        Ok(Position::new(
            a * geo.x.to_radians(),
            a * self.ellipsoid.isometric_latitude(geo.y.to_radians()),
        ))
    }

    /// Inverse by iterating `φ = π/2 - 2·atan(t·((1 - e·sinφ)/(1 + e·sinφ))^(e/2))`
    /// with `t = exp(-y/a)`.
    pub fn geo(&self, pos: Position) -> ProjectionResult<Position> {
        let a = self.ellipsoid.a;
        let e = self.ellipsoid.e();
        let t = (-pos.y / a).exp();

        let mut phi = FRAC_PI_2 - 2.0 * t.atan();
        for _ in 0..Self::MAX_ITERATIONS {
            let esin = e * phi.sin();
            let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - esin) / (1.0 + esin)).powf(e / 2.0)).atan();
            if (next - phi).abs() < Self::EPSILON {
                return Ok(Position::new((pos.x / a).to_degrees(), next.to_degrees()));
            }
            phi = next;
        }

        Err(ProjectionError::NoConvergence {
            system: "WorldMercator",
            iterations: Self::MAX_ITERATIONS,
        })
    }
}

impl Default for WorldMercator {
    fn default() -> Self {
        Self::new(WGS84)
    }
}
