//! Layers: what a render request names.
//!
//! Three kinds share one contract, [`Layer::ebox`] and [`Layer::map`]:
//!
//! - [`TiffLayer`] draws its charts in configuration order;
//! - [`PyramidLayer`] picks real layers by zoom and draws them coarse to fine;
//! - [`LabelLayer`] writes chart numbers at their north-west corners.
//!
//! Later draws overwrite earlier ones; there is no blending.

use chart_common::{ChartError, ChartResult, GeoBox, ProjectedBox, SIZE0};
use projection::Position;
use renderer::text::{draw_label, label_size};
use renderer::{LabelStyle, RenderCanvas};
use rusttype::Font;
use storage::DalleStore;
use tracing::{debug, warn};

use crate::budget::RenderBudget;
use crate::pyramid::PyramidConfig;
use crate::raster::{Instance, RasterEntry};
use crate::registry::LayerRegistry;

/// Everything a layer needs besides the canvas.
pub struct DrawContext<'a> {
    pub registry: &'a LayerRegistry,
    pub store: &'a DalleStore,
    pub font: Option<&'a Font<'static>>,
    /// Zoom of a tile request; required by pyramid layers
    pub zoom: Option<u32>,
    /// Stroke clip boxes and dalle outlines
    pub debug: bool,
    pub budget: &'a RenderBudget,
}

/// What a draw call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawReport {
    pub entries_drawn: usize,
    pub dalles_drawn: usize,
    pub labels_drawn: usize,
}

impl DrawReport {
    pub fn merge(&mut self, other: DrawReport) {
        self.entries_drawn += other.entries_drawn;
        self.dalles_drawn += other.dalles_drawn;
        self.labels_drawn += other.labels_drawn;
    }
}

#[derive(Debug, Clone)]
pub enum Layer {
    Tiff(TiffLayer),
    Pyramid(PyramidLayer),
    Label(LabelLayer),
}

impl Layer {
    pub fn name(&self) -> &str {
        match self {
            Layer::Tiff(l) => &l.name,
            Layer::Pyramid(l) => &l.config.name,
            Layer::Label(l) => &l.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Layer::Tiff(_) => "tiff",
            Layer::Pyramid(_) => "pyramid",
            Layer::Label(_) => "label",
        }
    }

    /// Total extent of the layer in render space.
    pub fn ebox(&self, registry: &LayerRegistry) -> ProjectedBox {
        match self {
            Layer::Tiff(l) => l.ebox(),
            Layer::Pyramid(l) => l.ebox(registry),
            Layer::Label(l) => l.ebox(),
        }
    }

    /// Draw everything intersecting the canvas box.
    pub fn map(&self, canvas: &mut RenderCanvas, ctx: &DrawContext<'_>) -> ChartResult<DrawReport> {
        match self {
            Layer::Tiff(l) => l.map(canvas, ctx),
            Layer::Pyramid(l) => l.map(canvas, ctx),
            Layer::Label(l) => l.map(canvas, ctx),
        }
    }
}

// ============================================================================
// Tiff layer
// ============================================================================

#[derive(Debug, Clone)]
pub struct TiffLayer {
    name: String,
    entries: Vec<RasterEntry>,
}

impl TiffLayer {
    pub fn new(name: impl Into<String>, entries: Vec<RasterEntry>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[RasterEntry] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<&RasterEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    pub fn ebox(&self) -> ProjectedBox {
        self.entries
            .iter()
            .fold(ProjectedBox::empty(), |acc, e| acc.union(&e.extent()))
    }

    pub fn map(&self, canvas: &mut RenderCanvas, ctx: &DrawContext<'_>) -> ChartResult<DrawReport> {
        let view = *canvas.bbox();
        let mut report = DrawReport::default();

        for entry in &self.entries {
            ctx.budget.check()?;
            let extent = entry.extent();

            let mut drawn = 0;
            if extent.intersects(&view) {
                drawn += entry.draw(canvas, ctx.store, Instance::Primary, ctx.debug, ctx.budget)?;
            }
            if extent.translate_x(-SIZE0).intersects(&view) {
                drawn += entry.draw(canvas, ctx.store, Instance::Mirror, ctx.debug, ctx.budget)?;
            }
            if drawn > 0 {
                report.entries_drawn += 1;
                report.dalles_drawn += drawn;
            }
        }

        debug!(
            layer = %self.name,
            entries = report.entries_drawn,
            dalles = report.dalles_drawn,
            "Mapped tiff layer"
        );
        Ok(report)
    }

    /// Up to `n` entries ordered by [`GeoBox::dist`] to `geo`, closest
    /// first. Entries covering `geo` come first with distance 0.
    pub fn nearest_entries(&self, geo: &GeoBox, n: usize) -> Vec<(&RasterEntry, f64)> {
        let mut ranked: Vec<(&RasterEntry, f64)> = self
            .entries
            .iter()
            .map(|e| (e, e.spatial().dist(geo)))
            .filter(|(_, d)| d.is_finite())
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        ranked.truncate(n);
        ranked
    }

    /// Entry whose extent best matches `geo` by [`GeoBox::distance`]. Ties
    /// go to the entry listed first.
    pub fn best_match(&self, geo: &GeoBox) -> Option<&RasterEntry> {
        self.entries
            .iter()
            .map(|e| (e, e.spatial().distance(geo)))
            .filter(|(_, d)| d.is_finite())
            .fold(None, |best: Option<(&RasterEntry, f64)>, (e, d)| match best {
                Some((_, bd)) if bd <= d => best,
                _ => Some((e, d)),
            })
            .map(|(e, _)| e)
    }
}

// ============================================================================
// Pyramid layer
// ============================================================================

/// Meta-layer choosing real layers by zoom. Holds no imagery itself.
#[derive(Debug, Clone)]
pub struct PyramidLayer {
    config: PyramidConfig,
}

impl PyramidLayer {
    pub fn new(config: PyramidConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PyramidConfig {
        &self.config
    }

    pub fn ebox(&self, registry: &LayerRegistry) -> ProjectedBox {
        self.config
            .levels
            .iter()
            .filter_map(|level| registry.get(&level.layer))
            .filter(|layer| !matches!(layer, Layer::Pyramid(_)))
            .fold(ProjectedBox::empty(), |acc, layer| acc.union(&layer.ebox(registry)))
    }

    pub fn map(&self, canvas: &mut RenderCanvas, ctx: &DrawContext<'_>) -> ChartResult<DrawReport> {
        let z = ctx.zoom.ok_or_else(|| {
            ChartError::invalid_request(format!(
                "layer {} needs a zoom level",
                self.config.name
            ))
        })?;

        let mut report = DrawReport::default();
        for name in self.config.layers_for_zoom(z) {
            match ctx.registry.get(name) {
                Some(Layer::Pyramid(_)) => {
                    warn!(pyramid = %self.config.name, layer = %name, "Nested pyramid ignored");
                }
                Some(layer) => report.merge(layer.map(canvas, ctx)?),
                None => debug!(pyramid = %self.config.name, layer = %name, "Layer not configured"),
            }
        }
        Ok(report)
    }
}

// ============================================================================
// Label layer
// ============================================================================

/// Whether a `(width, height)` pixel box with its upper-left corner at
/// `(x, y)` overlaps the canvas.
fn shows_on(canvas: &RenderCanvas, (x, y): (f64, f64), (w, h): (i32, i32)) -> bool {
    x < canvas.width() as f64
        && x + w as f64 > 0.0
        && y < canvas.height() as f64
        && y + h as f64 > 0.0
}

/// Chart numbers of a tiff layer, drawn at each chart's north-west corner.
#[derive(Debug, Clone)]
pub struct LabelLayer {
    name: String,
    anchors: Vec<(String, Position)>,
    style: LabelStyle,
}

impl LabelLayer {
    /// Labels for every entry of `tiff`. The anchor is the north-west
    /// corner of the eroded extent, so it sits inside the drawn chart.
    pub fn for_tiff(tiff: &TiffLayer) -> Self {
        let anchors = tiff
            .entries()
            .iter()
            .filter_map(|e| {
                let (min, max) = e.ebox().corners()?;
                Some((e.name().to_string(), Position::new(min.x, max.y)))
            })
            .collect();
        Self {
            name: format!("{}-num", tiff.name()),
            anchors,
            style: LabelStyle::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn anchors(&self) -> &[(String, Position)] {
        &self.anchors
    }

    pub fn ebox(&self) -> ProjectedBox {
        ProjectedBox::envelope(self.anchors.iter().map(|(_, p)| *p))
    }

    pub fn map(&self, canvas: &mut RenderCanvas, ctx: &DrawContext<'_>) -> ChartResult<DrawReport> {
        let mut report = DrawReport::default();
        let Some(font) = ctx.font else {
            debug!(layer = %self.name, "No font configured, labels skipped");
            return Ok(report);
        };

        let pad = self.style.padding;
        for (text, anchor) in &self.anchors {
            let size = label_size(font, text, &self.style);
            for shift in [0.0, -SIZE0] {
                let (px, py) = canvas.to_pixel(anchor.shifted_x(shift));
                let corner = (px.round(), py.round());
                if !shows_on(canvas, corner, size) {
                    continue;
                }
                draw_label(
                    canvas.image_mut(),
                    font,
                    text,
                    corner.0 as i32 + pad,
                    corner.1 as i32 + pad,
                    &self.style,
                );
                report.labels_drawn += 1;
            }
        }
        Ok(report)
    }
}
