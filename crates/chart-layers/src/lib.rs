//! Layer configuration and compositing for raster nautical charts.
//!
//! Charts are configured in a YAML file ([`config`]), compiled into a
//! [`LayerCatalog`] cached as JSON ([`catalog`]), and turned into a
//! [`LayerRegistry`] of drawable layers against a dalle store.
//!
//! ```yaml
//! erosion_px: 3
//! layers:
//!   gt50k:
//!     "7330":
//!       title: "De Cherbourg à Hendaye"
//!       spatial: { SW: "43°20,00'N - 2°00,00'W", NE: "49°45,00'N - 1°00,00'W" }
//!       borders: { left: 120, bottom: "2*45+3", right: 120, top: 95 }
//! ```
//!
//! Rendering is [`render_layers`] over a [`renderer::RenderCanvas`].

pub mod budget;
pub mod catalog;
pub mod config;
pub mod expr;
pub mod layer;
pub mod pyramid;
pub mod raster;
pub mod registry;

pub use budget::RenderBudget;
pub use catalog::{load_catalog, CatalogSource};
pub use config::{BorderCrop, EntryConfig, LayerCatalog, TiffLayerConfig};
pub use layer::{DrawContext, DrawReport, LabelLayer, Layer, PyramidLayer, TiffLayer};
pub use pyramid::{PyramidConfig, PyramidLevel};
pub use raster::{Instance, RasterEntry};
pub use registry::LayerRegistry;

use chart_common::ChartResult;
use renderer::RenderCanvas;

/// Draw `layers` in order onto `canvas`.
///
/// Unknown names fail before anything is drawn.
pub fn render_layers(
    canvas: &mut RenderCanvas,
    layers: &[&str],
    ctx: &DrawContext<'_>,
) -> ChartResult<DrawReport> {
    let resolved = layers
        .iter()
        .map(|name| ctx.registry.require(name))
        .collect::<ChartResult<Vec<_>>>()?;

    let mut report = DrawReport::default();
    for layer in resolved {
        report.merge(layer.map(canvas, ctx)?);
    }
    Ok(report)
}
