//! Bounding box types and operations.
//!
//! A box is either empty (no extent, the identity of [`BBox::union`]) or a
//! pair of `min`/`max` corners with `min <= max` on both axes. The same
//! algebra serves geographic boxes (degrees) and projected boxes (metres);
//! the [`Space`] marker supplies what differs between the two.
//!
//! Geographic boxes keep `-180 <= min.x <= 180`. A box crossing the
//! anti-meridian stores its eastern bound shifted by 360°, so `max.x` lies
//! in `(180, 540]` and [`GeoBox::straddles`] is simply `max.x > 180`.

use std::fmt;
use std::marker::PhantomData;

use projection::{CoordinateSystem, Position, UtmZone};
use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// Coordinate space of a bounding box.
pub trait Space: Copy + fmt::Debug + PartialEq + Eq {
    const NAME: &'static str;

    /// Factor applied to x-extents so they compare with y-extents.
    fn x_scale(min_y: f64, max_y: f64) -> f64;

    /// Order two opposite corners into `(min, max)`.
    fn corners(a: Position, b: Position) -> (Position, Position);

    /// Restore the space's invariant after a translation or a union.
    fn normalize(min: Position, max: Position) -> (Position, Position);
}

/// Longitude/latitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geographic;

/// Projected metres.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projected;

impl Space for Geographic {
    const NAME: &'static str = "geographic";

    /// Longitude degrees shrink with `cos(mean latitude)`.
    fn x_scale(min_y: f64, max_y: f64) -> f64 {
        ((min_y + max_y) / 2.0).to_radians().cos()
    }

    /// `a` is the south-west corner and `b` the north-east one; an east
    /// bound west of the west bound means the box crosses the anti-meridian.
    fn corners(a: Position, b: Position) -> (Position, Position) {
        let east = if b.x < a.x { b.x + 360.0 } else { b.x };
        (
            Position::new(a.x, a.y.min(b.y)),
            Position::new(east, a.y.max(b.y)),
        )
    }

    fn normalize(min: Position, max: Position) -> (Position, Position) {
        let mut shift = 0.0;
        while min.x + shift > 180.0 {
            shift -= 360.0;
        }
        while min.x + shift < -180.0 {
            shift += 360.0;
        }
        (min.shifted_x(shift), max.shifted_x(shift))
    }
}

impl Space for Projected {
    const NAME: &'static str = "projected";

    fn x_scale(_min_y: f64, _max_y: f64) -> f64 {
        1.0
    }

    fn corners(a: Position, b: Position) -> (Position, Position) {
        (a.min(b), a.max(b))
    }

    fn normalize(min: Position, max: Position) -> (Position, Position) {
        (min, max)
    }
}

/// An axis-aligned bounding box in space `S`, possibly empty.
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct BBox<S: Space> {
    corners: Option<(Position, Position)>,
    #[serde(skip)]
    space: PhantomData<S>,
}

/// Geographic bounding box (degrees).
pub type GeoBox = BBox<Geographic>;

/// Projected bounding box (metres).
pub type ProjectedBox = BBox<Projected>;

impl<S: Space> BBox<S> {
    /// The box with no extent.
    pub const fn empty() -> Self {
        Self {
            corners: None,
            space: PhantomData,
        }
    }

    /// Build from already ordered corners, restoring the space's invariant.
    fn ordered(min: Position, max: Position) -> Self {
        if min.x.is_nan() || min.y.is_nan() || max.x.is_nan() || max.y.is_nan() {
            return Self::empty();
        }
        let (min, max) = S::normalize(min, max);
        Self {
            corners: Some((min, max)),
            space: PhantomData,
        }
    }

    /// Degenerate box covering a single position.
    pub fn from_position(pos: Position) -> Self {
        Self::ordered(pos, pos)
    }

    /// Box spanned by two opposite corners.
    ///
    /// For geographic boxes the corners are read as south-west then
    /// north-east, so an east bound lower than the west bound wraps.
    pub fn from_corners(a: Position, b: Position) -> Self {
        let (min, max) = S::corners(a, b);
        Self::ordered(min, max)
    }

    /// Box from 4 numbers `[minx, miny, maxx, maxy]` or 6 numbers
    /// `[minx, miny, minz, maxx, maxy, maxz]` (the z values are dropped).
    pub fn from_coords(coords: &[f64]) -> ChartResult<Self> {
        match coords {
            [x0, y0, x1, y1] => Ok(Self::from_corners(
                Position::new(*x0, *y0),
                Position::new(*x1, *y1),
            )),
            [x0, y0, _, x1, y1, _] => Ok(Self::from_corners(
                Position::new(*x0, *y0),
                Position::new(*x1, *y1),
            )),
            _ => Err(ChartError::invalid_request(format!(
                "bounding box needs 4 or 6 numbers, got {}",
                coords.len()
            ))),
        }
    }

    /// Parse a comma separated list: "minx,miny,maxx,maxy".
    pub fn from_wms_string(s: &str) -> ChartResult<Self> {
        let coords = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|_| ChartError::invalid_request(format!("invalid number in BBOX: {}", part)))
            })
            .collect::<ChartResult<Vec<f64>>>()?;
        Self::from_coords(&coords)
    }

    /// Componentwise envelope of a list of positions.
    pub fn envelope<I>(positions: I) -> Self
    where
        I: IntoIterator<Item = Position>,
    {
        positions
            .into_iter()
            .fold(Self::empty(), |acc, p| acc.union(&Self::from_position(p)))
    }

    /// Envelope of a list of rings.
    pub fn from_rings(rings: &[Vec<Position>]) -> Self {
        Self::envelope(rings.iter().flatten().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.corners.is_none()
    }

    /// `(min, max)` corners, `None` for the empty box.
    pub fn corners(&self) -> Option<(Position, Position)> {
        self.corners
    }

    pub fn min(&self) -> Option<Position> {
        self.corners.map(|(min, _)| min)
    }

    pub fn max(&self) -> Option<Position> {
        self.corners.map(|(_, max)| max)
    }

    pub fn width(&self) -> f64 {
        self.corners.map_or(0.0, |(min, max)| max.x - min.x)
    }

    pub fn height(&self) -> f64 {
        self.corners.map_or(0.0, |(min, max)| max.y - min.y)
    }

    /// Whether the box covers a non-zero area.
    pub fn has_area(&self) -> bool {
        self.width() > 0.0 && self.height() > 0.0
    }

    /// Smallest box containing both; the empty box is the identity.
    pub fn union(&self, other: &Self) -> Self {
        match (self.corners, other.corners) {
            (None, _) => *other,
            (_, None) => *self,
            (Some((a0, a1)), Some((b0, b1))) => Self::ordered(a0.min(b0), a1.max(b1)),
        }
    }

    /// Overlap rectangle, empty when the boxes do not overlap.
    ///
    /// Boxes sharing only an edge produce a degenerate (zero-area) box.
    pub fn intersection(&self, other: &Self) -> Self {
        match (self.corners, other.corners) {
            (Some((a0, a1)), Some((b0, b1))) => {
                let min = a0.max(b0);
                let max = a1.min(b1);
                if min.x <= max.x && min.y <= max.y {
                    Self::ordered(min, max)
                } else {
                    Self::empty()
                }
            }
            _ => Self::empty(),
        }
    }

    pub fn intersects(&self, other: &Self) -> bool {
        !self.intersection(other).is_empty()
    }

    /// Containment test without anti-meridian handling, boundaries inclusive.
    fn contains_box(&self, other: &Self) -> bool {
        match (self.corners, other.corners) {
            (Some((a0, a1)), Some((b0, b1))) => {
                a0.x <= b0.x && a0.y <= b0.y && b1.x <= a1.x && b1.y <= a1.y
            }
            _ => false,
        }
    }

    fn scale_between(&self, other: &Self) -> f64 {
        match (self.corners, other.corners) {
            (Some((a0, a1)), Some((b0, b1))) => {
                S::x_scale(a0.y.min(b0.y), a1.y.max(b1.y))
            }
            _ => 1.0,
        }
    }

    /// Largest side, x scaled to compare with y (ground size for
    /// geographic boxes). Zero for the empty box.
    pub fn size(&self) -> f64 {
        match self.corners {
            Some((min, max)) => ((max.x - min.x) * S::x_scale(min.y, max.y)).max(max.y - min.y),
            None => 0.0,
        }
    }

    /// Cheap gap between two boxes: 0 when they overlap, else the largest
    /// per-axis gap. A lower bound used for coverage search.
    pub fn dist(&self, other: &Self) -> f64 {
        match (self.corners, other.corners) {
            (Some((a0, a1)), Some((b0, b1))) => {
                let gap_x = (a0.x - b1.x).max(b0.x - a1.x).max(0.0);
                let gap_y = (a0.y - b1.y).max(b0.y - a1.y).max(0.0);
                (gap_x * self.scale_between(other)).max(gap_y)
            }
            _ => f64::INFINITY,
        }
    }

    /// Largest corner-wise coordinate difference, x scaled. Ranks
    /// candidate boxes against a reference box.
    pub fn distance(&self, other: &Self) -> f64 {
        match (self.corners, other.corners) {
            (Some((a0, a1)), Some((b0, b1))) => {
                let scale = self.scale_between(other);
                let dx = (a0.x - b0.x).abs().max((a1.x - b1.x).abs()) * scale;
                let dy = (a0.y - b0.y).abs().max((a1.y - b1.y).abs());
                dx.max(dy)
            }
            _ => f64::INFINITY,
        }
    }
}

impl<S: Space> Default for BBox<S> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: Space> fmt::Debug for BBox<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.corners {
            Some((min, max)) => write!(f, "{}Box({} - {})", S::NAME, min, max),
            None => write!(f, "{}Box(empty)", S::NAME),
        }
    }
}

impl<S: Space> fmt::Display for BBox<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.corners {
            Some((min, max)) => write!(f, "{},{},{},{}", min.x, min.y, max.x, max.y),
            None => write!(f, "empty"),
        }
    }
}

impl GeoBox {
    /// Whether the box crosses the anti-meridian.
    pub fn straddles(&self) -> bool {
        self.corners.map_or(false, |(_, max)| max.x > 180.0)
    }

    /// Containment, boundaries inclusive.
    ///
    /// When `self` straddles the anti-meridian and `small` does not,
    /// `small` is also tested translated 360° east, unless its east bound
    /// sits exactly on the seam.
    pub fn includes(&self, small: &GeoBox) -> bool {
        if self.contains_box(small) {
            return true;
        }
        match small.corners {
            Some((min, max)) if self.straddles() && !small.straddles() && max.x != 180.0 => {
                let east = BBox {
                    corners: Some((min.shifted_x(360.0), max.shifted_x(360.0))),
                    space: PhantomData,
                };
                self.contains_box(&east)
            }
            _ => false,
        }
    }

    pub fn includes_position(&self, pos: Position) -> bool {
        self.includes(&GeoBox::from_position(pos))
    }

    /// Project both corners into `system`.
    pub fn proj(
        &self,
        system: &CoordinateSystem,
        zone: Option<&UtmZone>,
    ) -> ChartResult<ProjectedBox> {
        match self.corners {
            Some((min, max)) => Ok(ProjectedBox::from_corners(
                system.proj(min, zone)?,
                system.proj(max, zone)?,
            )),
            None => Ok(ProjectedBox::empty()),
        }
    }
}

impl ProjectedBox {
    /// Containment, boundaries inclusive.
    pub fn includes(&self, small: &ProjectedBox) -> bool {
        self.contains_box(small)
    }

    /// Grow every side by `d` (shrink when negative). Shrinking past the
    /// centre yields the empty box.
    pub fn dilate(&self, d: f64) -> ProjectedBox {
        match self.corners {
            Some((min, max)) => {
                let min = Position::new(min.x - d, min.y - d);
                let max = Position::new(max.x + d, max.y + d);
                if min.x > max.x || min.y > max.y {
                    ProjectedBox::empty()
                } else {
                    ProjectedBox::ordered(min, max)
                }
            }
            None => ProjectedBox::empty(),
        }
    }

    /// Same box moved by `dx` along x.
    pub fn translate_x(&self, dx: f64) -> ProjectedBox {
        match self.corners {
            Some((min, max)) => ProjectedBox::ordered(min.shifted_x(dx), max.shifted_x(dx)),
            None => ProjectedBox::empty(),
        }
    }

    /// Unproject both corners from `system` to degrees.
    pub fn geo(&self, system: &CoordinateSystem, zone: Option<&UtmZone>) -> ChartResult<GeoBox> {
        match self.corners {
            Some((min, max)) => {
                let sw = system.geo(min, zone)?;
                let ne = system.geo(max, zone)?;
                // Corners come from an ordered box: never wrap, only renormalize.
                Ok(GeoBox::ordered(
                    Position::new(sw.x, sw.y.min(ne.y)),
                    Position::new(ne.x.max(sw.x), sw.y.max(ne.y)),
                ))
            }
            None => Ok(GeoBox::empty()),
        }
    }
}
