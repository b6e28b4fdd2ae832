//! Coordinate pairs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A coordinate pair.
///
/// Geographic positions carry longitude in `x` and latitude in `y`, both in
/// degrees. Projected positions carry easting/northing in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Swap the two axes (lon/lat <-> lat/lon).
    pub fn swapped(self) -> Self {
        Self {
            x: self.y,
            y: self.x,
        }
    }

    /// Translate along the x axis.
    pub fn shifted_x(self, dx: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y,
        }
    }

    /// Componentwise minimum.
    pub fn min(self, other: Position) -> Self {
        Self {
            x: self.x.min(other.x),
            y: self.y.min(other.y),
        }
    }

    /// Componentwise maximum.
    pub fn max(self, other: Position) -> Self {
        Self {
            x: self.x.max(other.x),
            y: self.y.max(other.y),
        }
    }
}

impl From<[f64; 2]> for Position {
    fn from(v: [f64; 2]) -> Self {
        Self { x: v[0], y: v[1] }
    }
}

impl From<(f64, f64)> for Position {
    fn from(v: (f64, f64)) -> Self {
        Self { x: v.0, y: v.1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}
