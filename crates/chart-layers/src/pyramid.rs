//! Scale pyramid: which real layers a zoom level unlocks.

use serde::{Deserialize, Serialize};

/// One rung of the ladder: `layer` is drawn from `min_zoom` onwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PyramidLevel {
    pub layer: String,
    pub min_zoom: u32,
}

/// Ordered coarse-to-fine scale ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PyramidConfig {
    pub name: String,
    pub levels: Vec<PyramidLevel>,
}

pub const DEFAULT_PYRAMID_NAME: &str = "gtpyr";

const DEFAULT_LADDER: &[(&str, u32)] = &[
    ("gt10M", 0),
    ("gt4M", 6),
    ("gt2M", 7),
    ("gt1M", 8),
    ("gt500k", 9),
    ("gt250k", 10),
    ("gt100k", 11),
    ("gt50k", 12),
    ("gt25k", 13),
    ("gt12k", 14),
    ("gt5k", 16),
];

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PYRAMID_NAME.to_string(),
            levels: DEFAULT_LADDER
                .iter()
                .map(|(layer, min_zoom)| PyramidLevel {
                    layer: layer.to_string(),
                    min_zoom: *min_zoom,
                })
                .collect(),
        }
    }
}

impl PyramidConfig {
    /// Keep levels sorted coarse-to-fine; equal thresholds keep file order.
    pub fn normalized(mut self) -> Self {
        self.levels.sort_by_key(|level| level.min_zoom);
        self
    }

    /// Layer names to draw at zoom `z`, coarsest first.
    pub fn layers_for_zoom(&self, z: u32) -> impl Iterator<Item = &str> {
        self.levels
            .iter()
            .filter(move |level| level.min_zoom <= z)
            .map(|level| level.layer.as_str())
    }
}
