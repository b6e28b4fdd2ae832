//! Polygonal zones excluded from drawing.

use chart_common::ProjectedBox;
use projection::Position;

#[derive(Debug, Clone)]
struct Zone {
    bbox: ProjectedBox,
    ring: Vec<Position>,
}

/// Set of projected polygons whose interior is never painted.
///
/// Rings are implicitly closed. Rings with fewer than three vertices are
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct ExclusionMask {
    zones: Vec<Zone>,
}

impl ExclusionMask {
    pub fn new(rings: Vec<Vec<Position>>) -> Self {
        let zones = rings
            .into_iter()
            .filter(|ring| ring.len() >= 3)
            .map(|ring| Zone {
                bbox: ProjectedBox::envelope(ring.iter().copied()),
                ring,
            })
            .collect();
        Self { zones }
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Zones that could touch `bbox`.
    pub fn restricted_to(&self, bbox: &ProjectedBox) -> ExclusionMask {
        ExclusionMask {
            zones: self
                .zones
                .iter()
                .filter(|z| z.bbox.intersects(bbox))
                .cloned()
                .collect(),
        }
    }

    /// Same mask moved by `dx` along x.
    pub fn translate_x(&self, dx: f64) -> ExclusionMask {
        ExclusionMask {
            zones: self
                .zones
                .iter()
                .map(|z| Zone {
                    bbox: z.bbox.translate_x(dx),
                    ring: z.ring.iter().map(|p| p.shifted_x(dx)).collect(),
                })
                .collect(),
        }
    }

    /// Whether `pos` lies inside any zone (even-odd rule).
    pub fn excludes(&self, pos: Position) -> bool {
        self.zones.iter().any(|zone| {
            zone.bbox
                .corners()
                .map_or(false, |(min, max)| {
                    pos.x >= min.x && pos.x <= max.x && pos.y >= min.y && pos.y <= max.y
                })
                && ring_contains(&zone.ring, pos)
        })
    }
}

fn ring_contains(ring: &[Position], pos: Position) -> bool {
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > pos.y) != (b.y > pos.y) {
            let x = a.x + (pos.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if pos.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<Position> {
        vec![
            Position::new(0.0, 0.0),
            Position::new(10.0, 0.0),
            Position::new(0.0, 10.0),
        ]
    }

    #[test]
    fn test_point_in_triangle() {
        let mask = ExclusionMask::new(vec![triangle()]);
        assert!(mask.excludes(Position::new(2.0, 2.0)));
        assert!(!mask.excludes(Position::new(8.0, 8.0)));
        assert!(!mask.excludes(Position::new(-1.0, 2.0)));
    }

    #[test]
    fn test_degenerate_rings_ignored() {
        let mask = ExclusionMask::new(vec![vec![Position::new(0.0, 0.0), Position::new(1.0, 1.0)]]);
        assert!(mask.is_empty());
    }

    #[test]
    fn test_translate_and_restrict() {
        let mask = ExclusionMask::new(vec![triangle()]).translate_x(-100.0);
        assert!(mask.excludes(Position::new(-98.0, 2.0)));
        assert!(!mask.excludes(Position::new(2.0, 2.0)));

        let far = ProjectedBox::from_coords(&[50.0, 50.0, 60.0, 60.0]).unwrap();
        assert!(mask.restricted_to(&far).is_empty());
    }
}
