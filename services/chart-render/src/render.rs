//! Map and tile rendering.
//!
//! Compositing runs on the blocking pool under both a [`RenderBudget`]
//! (checked between units of work) and a `tokio` timeout, so a slow render
//! ends with an error rather than a partial image.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use chart_common::tile::{box_to_tiles, tile_box, zoom_for_size};
use chart_common::{
    AxisOrder, ChartError, ChartResult, CrsCode, GeoBox, ProjectedBox, TileCoord, SIZE0,
};
use chart_layers::{render_layers, DrawContext, DrawReport, LayerRegistry, RenderBudget};
use image::RgbaImage;
use projection::{CoordinateSystem, Position, WorldMercator};
use renderer::{encode, render_error_tile, warp, ErrorSymbol, OutputFormat, RenderCanvas};
use rusttype::Font;
use storage::{DalleStore, TileKey};
use tracing::{debug, info, warn};

use crate::metrics::{self, RenderKind};
use crate::state::ChartService;

/// Largest accepted image side in pixels.
pub const MAX_IMAGE_SIDE: u32 = 4096;

/// A validated whole-map request.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub layers: Vec<String>,
    pub crs: CrsCode,
    /// `minx,miny,maxx,maxy` in the CRS's axis order
    pub bbox: [f64; 4],
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub debug: bool,
}

/// An encoded image.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub data: Bytes,
    pub format: OutputFormat,
    pub report: DrawReport,
}

/// An encoded tile, possibly an error tile.
#[derive(Debug, Clone)]
pub struct TileResponse {
    pub data: Bytes,
    pub format: OutputFormat,
    pub from_cache: bool,
    /// Set when `data` is an error tile; carries the error's message
    pub error: Option<String>,
}

/// Render-space position of a point given in `crs` (lon/lat order for
/// geographic systems). Latitudes are clamped to the World Mercator band.
fn to_render(crs: CrsCode, pos: Position) -> ChartResult<Position> {
    let geo = if crs.is_geographic() {
        pos
    } else {
        crs.coordinate_system().geo(pos, crs.utm_zone())?
    };
    let lat = geo.y.clamp(-WorldMercator::MAX_LAT, WorldMercator::MAX_LAT);
    Ok(CoordinateSystem::world_mercator().proj(Position::new(geo.x, lat), None)?)
}

/// Boundary samples per side when bounding a request in render space.
const ENVELOPE_STEPS: usize = 32;

/// Output pixel grid of a request expressed in a CRS other than render space.
#[derive(Debug, Clone, Copy)]
pub struct RequestGrid {
    crs: CrsCode,
    /// Lower-left corner, x/y order
    min: Position,
    /// Upper-right corner, x/y order
    max: Position,
    width: u32,
    height: u32,
}

impl RequestGrid {
    fn point(&self, col: f64, row: f64) -> Position {
        Position::new(
            self.min.x + col / self.width as f64 * (self.max.x - self.min.x),
            self.max.y - row / self.height as f64 * (self.max.y - self.min.y),
        )
    }

    /// Render-space position of a fractional output pixel.
    pub fn render_position(&self, col: f64, row: f64) -> Option<Position> {
        to_render(self.crs, self.point(col, row)).ok()
    }

    /// Render-space box holding the whole grid, from samples along its edges.
    pub fn envelope(&self) -> ChartResult<ProjectedBox> {
        let (w, h) = (self.width as f64, self.height as f64);
        let mut points = Vec::with_capacity(4 * (ENVELOPE_STEPS + 1));
        for k in 0..=ENVELOPE_STEPS {
            let t = k as f64 / ENVELOPE_STEPS as f64;
            for (col, row) in [(t * w, 0.0), (t * w, h), (0.0, t * h), (w, t * h)] {
                points.push(to_render(self.crs, self.point(col, row))?);
            }
        }
        let envelope = ProjectedBox::envelope(points);
        if !envelope.has_area() {
            return Err(ChartError::invalid_request("bounding box has no area"));
        }
        Ok(envelope)
    }
}

/// Where a map request lands in render space.
#[derive(Debug, Clone)]
pub enum MapGeometry {
    /// The request is a render-space box drawn as is.
    Direct(ProjectedBox),
    /// The request is drawn on a render-space canvas covering `envelope`,
    /// then sampled pixel by pixel into `grid`.
    Warped {
        envelope: ProjectedBox,
        grid: RequestGrid,
    },
}

impl RenderRequest {
    /// Request corners in x/y order; geographic boxes crossing the
    /// anti-meridian get an east bound above 180.
    fn grid(&self) -> RequestGrid {
        let [a, b, c, d] = self.bbox;
        let (min, mut max) = match self.crs.axis_order() {
            AxisOrder::LatLon => (Position::new(b, a), Position::new(d, c)),
            AxisOrder::XY => (Position::new(a, b), Position::new(c, d)),
        };
        if self.crs.is_geographic() && max.x < min.x {
            max.x += 360.0;
        }
        RequestGrid {
            crs: self.crs,
            min,
            max,
            width: self.width,
            height: self.height,
        }
    }

    pub fn geometry(&self) -> ChartResult<MapGeometry> {
        if self.crs == CrsCode::Epsg3395 {
            return Ok(MapGeometry::Direct(ProjectedBox::from_coords(&self.bbox)?));
        }
        let grid = self.grid();
        Ok(MapGeometry::Warped {
            envelope: grid.envelope()?,
            grid,
        })
    }

    /// Render-space box covering the request.
    pub fn render_box(&self) -> ChartResult<ProjectedBox> {
        match self.geometry()? {
            MapGeometry::Direct(bbox) => Ok(bbox),
            MapGeometry::Warped { envelope, .. } => Ok(envelope),
        }
    }

    fn validate(&self) -> ChartResult<()> {
        if self.layers.is_empty() {
            return Err(ChartError::invalid_request("no layer requested"));
        }
        if self.width == 0
            || self.height == 0
            || self.width > MAX_IMAGE_SIDE
            || self.height > MAX_IMAGE_SIDE
        {
            return Err(ChartError::invalid_request(format!(
                "image size {}x{} outside 1..={}",
                self.width, self.height, MAX_IMAGE_SIDE
            )));
        }
        if self.bbox.iter().any(|v| !v.is_finite()) {
            return Err(ChartError::invalid_request("non-finite bounding box"));
        }
        Ok(())
    }
}

/// Canvas size sampling `envelope` at least as finely as the request's
/// `width × height` grid, bounded by twice the largest image side.
fn source_size(envelope: &ProjectedBox, width: u32, height: u32) -> (u32, u32) {
    let step = (envelope.width() / width as f64).min(envelope.height() / height as f64);
    let side = |extent: f64| ((extent / step).ceil() as u32).clamp(1, 2 * MAX_IMAGE_SIDE);
    (side(envelope.width()), side(envelope.height()))
}

/// Zoom matching the coarser axis of `width × height` pixels over `bbox`.
pub fn zoom_for_render(bbox: &ProjectedBox, width: u32, height: u32) -> u32 {
    let degrees = |extent: f64, pixels: u32| {
        extent / SIZE0 * 360.0 * chart_common::TILE_SIZE as f64 / pixels as f64
    };
    zoom_for_size(degrees(bbox.width(), width).max(degrees(bbox.height(), height)))
}

struct Job {
    registry: Arc<LayerRegistry>,
    store: Arc<DalleStore>,
    font: Option<Arc<Font<'static>>>,
    layers: Vec<String>,
    bbox: ProjectedBox,
    width: u32,
    height: u32,
    zoom: Option<u32>,
    debug: bool,
    limit: Duration,
    /// Set when the canvas must be resampled into the request's own grid
    output: Option<RequestGrid>,
}

impl Job {
    fn run(self) -> ChartResult<(RgbaImage, DrawReport)> {
        let budget = RenderBudget::new(self.limit);
        let mut canvas = RenderCanvas::new(self.width, self.height, self.bbox)?;
        let ctx = DrawContext {
            registry: &self.registry,
            store: &self.store,
            font: self.font.as_deref(),
            zoom: self.zoom,
            debug: self.debug,
            budget: &budget,
        };
        let names: Vec<&str> = self.layers.iter().map(String::as_str).collect();
        let report = render_layers(&mut canvas, &names, &ctx)?;
        let image = match self.output {
            Some(grid) => warp(&canvas, grid.width, grid.height, |col, row| {
                grid.render_position(col, row)
            }),
            None => canvas.into_image(),
        };
        Ok((image, report))
    }
}

impl ChartService {
    fn job(
        &self,
        layers: Vec<String>,
        bbox: ProjectedBox,
        width: u32,
        height: u32,
        zoom: Option<u32>,
        debug: bool,
    ) -> Job {
        Job {
            registry: Arc::clone(&self.registry),
            store: Arc::clone(&self.store),
            font: self.font.clone(),
            layers,
            bbox,
            width,
            height,
            zoom,
            debug,
            limit: self.config.render_timeout(),
            output: None,
        }
    }

    /// Composite on the blocking pool within the render timeout.
    async fn composite(&self, job: Job) -> ChartResult<(RgbaImage, DrawReport)> {
        let limit = job.limit;
        let started = Instant::now();
        match tokio::time::timeout(limit, tokio::task::spawn_blocking(move || job.run())).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ChartError::Internal(format!("render task failed: {}", e))),
            Err(_) => Err(ChartError::Timeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
            }),
        }
    }

    /// Render a whole map. Errors are returned to the caller, which reports
    /// them as protocol exceptions.
    pub async fn render_map(&self, request: &RenderRequest) -> ChartResult<RenderedImage> {
        let started = Instant::now();
        let result = self.render_map_inner(request).await;
        match &result {
            Ok(image) => {
                metrics::record_render(RenderKind::Map, started.elapsed(), image.report.dalles_drawn);
                info!(
                    layers = ?request.layers,
                    width = request.width,
                    height = request.height,
                    dalles = image.report.dalles_drawn,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Rendered map"
                );
            }
            Err(e) => {
                metrics::record_render_error(RenderKind::Map, e);
                warn!(error = %e, layers = ?request.layers, "Map render failed");
            }
        }
        result
    }

    async fn render_map_inner(&self, request: &RenderRequest) -> ChartResult<RenderedImage> {
        request.validate()?;
        let (bbox, width, height, output) = match request.geometry()? {
            MapGeometry::Direct(bbox) => (bbox, request.width, request.height, None),
            MapGeometry::Warped { envelope, grid } => {
                let (width, height) = source_size(&envelope, request.width, request.height);
                (envelope, width, height, Some(grid))
            }
        };
        let zoom = zoom_for_render(&bbox, width, height);
        let mut job = self.job(
            request.layers.clone(),
            bbox,
            width,
            height,
            Some(zoom),
            request.debug,
        );
        job.output = output;
        let (image, report) = self.composite(job).await?;
        let data = encode(&image, request.format)?;
        Ok(RenderedImage {
            data: Bytes::from(data),
            format: request.format,
            report,
        })
    }

    /// Render one pyramid tile, through the tile cache.
    ///
    /// Failures become an error tile, which is never cached; only a failure
    /// to encode the error tile itself is returned as an error.
    pub async fn render_tile(
        &self,
        layer: &str,
        coord: TileCoord,
        format: OutputFormat,
    ) -> ChartResult<TileResponse> {
        let key = TileKey::new(layer, coord);
        if let Some(cache) = &self.cache {
            if let Some(data) = cache.get(&key).await {
                metrics::record_cache_hit();
                debug!(tile = %key, "Tile cache hit");
                return Ok(TileResponse {
                    data,
                    format,
                    from_cache: true,
                    error: None,
                });
            }
            metrics::record_cache_miss();
        }

        let started = Instant::now();
        let job = self.job(
            vec![layer.to_string()],
            tile_box(&coord),
            chart_common::TILE_SIZE,
            chart_common::TILE_SIZE,
            Some(coord.z),
            false,
        );
        let rendered = match self.composite(job).await {
            Ok((image, report)) => encode(&image, format).map(|data| (data, report)),
            Err(e) => Err(e),
        };

        match rendered {
            Ok((data, report)) => {
                metrics::record_render(RenderKind::Tile, started.elapsed(), report.dalles_drawn);
                let data = Bytes::from(data);
                if let Some(cache) = &self.cache {
                    cache.put(key, data.clone()).await;
                    metrics::record_cache_stats(&cache.stats());
                }
                Ok(TileResponse {
                    data,
                    format,
                    from_cache: false,
                    error: None,
                })
            }
            Err(e) => {
                metrics::record_render_error(RenderKind::Tile, &e);
                metrics::record_error_tile();
                warn!(tile = %key, error = %e, "Tile render failed, serving error tile");
                let id = format!("{}/{}", layer, coord);
                let image = render_error_tile(
                    &id,
                    &e.to_string(),
                    ErrorSymbol::default(),
                    self.font.as_deref(),
                );
                let data = encode(&image, OutputFormat::Png)?;
                Ok(TileResponse {
                    data: Bytes::from(data),
                    format: OutputFormat::Png,
                    from_cache: false,
                    error: Some(e.to_string()),
                })
            }
        }
    }

    /// Tiles of `layer` covering a geographic box rendered at
    /// `width × height`, bounded by the per-axis tile guard.
    pub async fn render_tiles_for_box(
        &self,
        layer: &str,
        bbox: &GeoBox,
        width: u32,
        height: u32,
        format: OutputFormat,
    ) -> ChartResult<Vec<(TileCoord, TileResponse)>> {
        let tiles = box_to_tiles(bbox, width, height)?;
        let mut out = Vec::with_capacity(tiles.len());
        for coord in tiles {
            let response = self.render_tile(layer, coord, format).await?;
            out.push((coord, response));
        }
        Ok(out)
    }
}
