//! Reference ellipsoids.

use serde::{Deserialize, Serialize};

/// Reference ellipsoid: semi-major axis and flattening.
///
/// Eccentricities are derived on demand (`e² = 1 - (1 - f)²`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    /// Semi-major axis (metres)
    pub a: f64,
    /// Flattening (dimensionless)
    pub f: f64,
}

impl Ellipsoid {
    /// Build from the semi-major axis and the inverse flattening (e.g. 298.257223563).
    pub fn from_inverse_flattening(a: f64, inverse_flattening: f64) -> Self {
        Self {
            a,
            f: 1.0 / inverse_flattening,
        }
    }

    /// First eccentricity squared.
    pub fn e2(&self) -> f64 {
        1.0 - (1.0 - self.f) * (1.0 - self.f)
    }

    /// First eccentricity.
    pub fn e(&self) -> f64 {
        self.e2().sqrt()
    }

    /// Second eccentricity squared: e² / (1 - e²)
    pub fn ep2(&self) -> f64 {
        let e2 = self.e2();
        e2 / (1.0 - e2)
    }

    /// Radius of curvature in the prime vertical at latitude `phi` (radians).
    pub fn prime_vertical_radius(&self, phi: f64) -> f64 {
        self.a / (1.0 - self.e2() * phi.sin().powi(2)).sqrt()
    }

    /// Isometric latitude of `phi` (radians).
    pub fn isometric_latitude(&self, phi: f64) -> f64 {
        let e = self.e();
        let esin = e * phi.sin();
        ((std::f64::consts::FRAC_PI_4 + phi / 2.0).tan()
            * ((1.0 - esin) / (1.0 + esin)).powf(e / 2.0))
        .ln()
    }
}

/// WGS84, the default reference ellipsoid.
pub const WGS84: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    f: 1.0 / 298.257_223_563,
};

/// GRS80, the ellipsoid of RGF93 / Lambert93.
pub const GRS80: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    f: 1.0 / 298.257_222_101,
};

impl Default for Ellipsoid {
    fn default() -> Self {
        WGS84
    }
}
