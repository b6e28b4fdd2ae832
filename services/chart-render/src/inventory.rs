//! Layer listing and chart lookup.

use chart_common::{ChartError, ChartResult, GeoBox, ProjectedBox};
use chart_layers::{Layer, RasterEntry};
use projection::CoordinateSystem;
use serde::Serialize;

use crate::state::ChartService;

/// One registered layer.
#[derive(Debug, Clone, Serialize)]
pub struct LayerSummary {
    pub name: String,
    pub kind: &'static str,
    /// `[west, south, east, north]` of the layer extent, when non-empty
    pub bbox: Option<[f64; 4]>,
    pub entries: usize,
}

/// A chart matching a location.
#[derive(Debug, Clone, Serialize)]
pub struct EntryMatch {
    pub name: String,
    pub title: String,
    pub distance: f64,
    pub edition: Option<String>,
    pub scale_denominator: Option<u32>,
}

/// Charts of a layer around a location.
#[derive(Debug, Clone, Serialize)]
pub struct LocateResult {
    pub layer: String,
    /// Closest charts, covering ones first
    pub nearest: Vec<EntryMatch>,
    /// Chart whose extent best matches the query box
    pub best: Option<EntryMatch>,
}

fn geo_coords(bbox: &ProjectedBox) -> Option<[f64; 4]> {
    let geo = bbox.geo(&CoordinateSystem::world_mercator(), None).ok()?;
    let (sw, ne) = geo.corners()?;
    Some([sw.x, sw.y, ne.x, ne.y])
}

fn entry_match(entry: &RasterEntry, distance: f64) -> EntryMatch {
    EntryMatch {
        name: entry.name().to_string(),
        title: entry.title().to_string(),
        distance,
        edition: entry.info().edition.clone(),
        scale_denominator: entry.info().scale_denominator,
    }
}

impl ChartService {
    /// Every layer in registration order.
    pub fn layers(&self) -> Vec<LayerSummary> {
        self.registry
            .iter()
            .map(|layer| LayerSummary {
                name: layer.name().to_string(),
                kind: layer.kind(),
                bbox: geo_coords(&layer.ebox(&self.registry)),
                entries: match layer {
                    Layer::Tiff(tiff) => tiff.entries().len(),
                    Layer::Label(label) => label.anchors().len(),
                    Layer::Pyramid(pyramid) => pyramid.config().levels.len(),
                },
            })
            .collect()
    }

    /// Up to `n` charts of a tiff layer near `geo`, and the best match.
    pub fn locate(&self, layer: &str, geo: &GeoBox, n: usize) -> ChartResult<LocateResult> {
        let Layer::Tiff(tiff) = self.registry.require(layer)? else {
            return Err(ChartError::invalid_request(format!(
                "layer '{}' holds no charts",
                layer
            )));
        };
        let nearest = tiff
            .nearest_entries(geo, n)
            .into_iter()
            .map(|(entry, d)| entry_match(entry, d))
            .collect();
        let best = tiff
            .best_match(geo)
            .map(|entry| entry_match(entry, entry.spatial().distance(geo)));
        Ok(LocateResult {
            layer: layer.to_string(),
            nearest,
            best,
        })
    }
}
