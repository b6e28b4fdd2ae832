//! Raster tile source: one chart, stored as a grid of dalles.
//!
//! All geometry lives in render space (World Mercator metres). A chart has
//! three boxes:
//!
//! - the *frame*, covering every pixel of the raster;
//! - the *neat* box, its cartographic extent inside the printed border;
//! - the *ebox*, the neat box shrunk by the erosion margin, which is what
//!   gets drawn. Outgrowths are drawn in addition to it.
//!
//! A chart crossing the anti-meridian lies east of `+πa`; its mirror
//! instance, translated by `-SIZE0`, serves the western side of the world.

use std::collections::HashMap;

use chart_common::{ChartError, ChartResult, CrsCode, GeoBox, ProjectedBox, SIZE0};
use image::{Rgba, RgbaImage};
use projection::{CoordinateSystem, Position};
use rayon::prelude::*;
use renderer::{copy_resampled, ExclusionMask, RenderCanvas};
use storage::{dalle_grid, DalleStore, RasterInfo, DALLE_SIZE};
use tracing::{debug, warn};

use crate::budget::RenderBudget;
use crate::config::{BorderCrop, EntryConfig};

/// Largest accepted relative difference between derived x and y pixel sizes.
pub const MAX_PIXEL_RATIO_DEVIATION: f64 = 0.10;

const DEBUG_CLIP_COLOR: Rgba<u8> = Rgba([0, 90, 255, 255]);
const DEBUG_DALLE_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Which logical copy of a chart is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instance {
    /// The chart where its configuration puts it; its dalles are required.
    Primary,
    /// The copy translated 360° west; missing dalles are skipped.
    Mirror,
}

impl Instance {
    pub fn offset(&self) -> f64 {
        match self {
            Instance::Primary => 0.0,
            Instance::Mirror => -SIZE0,
        }
    }
}

/// A dalle and the projected box it covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DalleRef {
    pub i: u32,
    pub j: u32,
    pub bbox: ProjectedBox,
}

/// A chart ready to be drawn.
#[derive(Debug, Clone)]
pub struct RasterEntry {
    name: String,
    title: String,
    spatial: GeoBox,
    info: RasterInfo,
    pixel_size: (f64, f64),
    frame: ProjectedBox,
    neat: ProjectedBox,
    ebox: ProjectedBox,
    outgrowths: Vec<ProjectedBox>,
    mask: ExclusionMask,
}

/// Whether `a` and `b` share a region of positive area.
fn overlaps(a: &ProjectedBox, b: &ProjectedBox) -> bool {
    a.intersection(b).has_area()
}

fn corners(bbox: &ProjectedBox, entry: &str) -> ChartResult<(Position, Position)> {
    bbox.corners()
        .ok_or_else(|| ChartError::configuration(format!("entry {}: empty extent", entry)))
}

/// Frame and pixel size derived from the neat box and the border crop.
fn derive_frame(
    entry: &str,
    neat: &ProjectedBox,
    info: &RasterInfo,
    crop: BorderCrop,
) -> ChartResult<(ProjectedBox, (f64, f64))> {
    let (min, max) = corners(neat, entry)?;
    let inner_w = info.width as f64 - crop.left - crop.right;
    let inner_h = info.height as f64 - crop.top - crop.bottom;
    if inner_w <= 0.0 || inner_h <= 0.0 {
        return Err(ChartError::configuration(format!(
            "entry {}: border crop {:?} leaves no pixels in a {}x{} raster",
            entry, crop, info.width, info.height
        )));
    }

    let dx = neat.width() / inner_w;
    let dy = neat.height() / inner_h;
    let ratio = dx / dy;
    if !ratio.is_finite() || (ratio - 1.0).abs() > MAX_PIXEL_RATIO_DEVIATION {
        return Err(ChartError::configuration(format!(
            "entry {}: derived pixel size {:.3}x{:.3} m (ratio {:.3}) suggests a bad border crop",
            entry, dx, dy, ratio
        )));
    }

    let frame = ProjectedBox::from_corners(
        Position::new(min.x - crop.left * dx, min.y - crop.bottom * dy),
        Position::new(max.x + crop.right * dx, max.y + crop.top * dy),
    );
    Ok((frame, (dx, dy)))
}

impl RasterEntry {
    /// Compute the geometry of a configured chart from its sidecar.
    ///
    /// Embedded georeferencing must be in render space (EPSG:3395);
    /// otherwise the frame is derived from the cartographic extent and the
    /// border crop.
    pub fn build(config: &EntryConfig, info: RasterInfo, erosion_px: f64) -> ChartResult<Self> {
        let name = config.name.as_str();
        if info.width == 0 || info.height == 0 {
            return Err(ChartError::georeferencing(name, "raster has no pixels"));
        }

        let render = CoordinateSystem::world_mercator();
        let neat = config.spatial.proj(&render, None)?;
        let straddles = config.spatial.straddles();
        let (neat_min, _) = corners(&neat, name)?;

        let (frame, pixel_size) = match info.georef(name)? {
            Some(georef) => {
                if georef.crs != CrsCode::Epsg3395 {
                    return Err(ChartError::georeferencing(
                        name,
                        format!("raster CRS {} is not the render CRS EPSG:3395", georef.crs),
                    ));
                }
                let (dx, dy) = georef.pixel_size;
                let ul = georef.upper_left;
                let frame = ProjectedBox::from_corners(
                    Position::new(ul.x, ul.y - info.height as f64 * dy),
                    Position::new(ul.x + info.width as f64 * dx, ul.y),
                );
                (frame, (dx, dy))
            }
            None => derive_frame(name, &neat, &info, config.borders.unwrap_or_default())?,
        };

        let margin = erosion_px * (pixel_size.0 + pixel_size.1) / 2.0;
        let ebox = neat.dilate(-margin).intersection(&frame);
        if !ebox.has_area() {
            warn!(entry = %name, "Eroded extent is empty, chart will not be drawn");
        }

        // Regions given west of the seam belong east of it for a straddling chart.
        let east_of_seam = |b: ProjectedBox| match b.max() {
            Some(max) if straddles && max.x < neat_min.x => b.translate_x(SIZE0),
            _ => b,
        };
        let outgrowths = config
            .outgrowth
            .iter()
            .map(|og| -> ChartResult<ProjectedBox> {
                Ok(east_of_seam(og.proj(&render, None)?)
                    .dilate(margin)
                    .intersection(&frame))
            })
            .collect::<ChartResult<Vec<_>>>()?
            .into_iter()
            .filter(|b| b.has_area())
            .collect();

        let spatial_min_lon = config.spatial.min().map_or(-180.0, |m| m.x);
        let rings = config
            .deleted
            .iter()
            .map(|ring| {
                ring.iter()
                    .map(|p| {
                        let lon = if straddles && p.x < spatial_min_lon {
                            p.x + 360.0
                        } else {
                            p.x
                        };
                        render.proj(Position::new(lon, p.y), None)
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            entry = %name,
            width = info.width,
            height = info.height,
            dx = pixel_size.0,
            dy = pixel_size.1,
            "Built raster entry"
        );

        Ok(Self {
            name: config.name.clone(),
            title: config.title.clone(),
            spatial: config.spatial,
            info,
            pixel_size,
            frame,
            neat,
            ebox,
            outgrowths,
            mask: ExclusionMask::new(rings),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Configured cartographic extent.
    pub fn spatial(&self) -> &GeoBox {
        &self.spatial
    }

    pub fn info(&self) -> &RasterInfo {
        &self.info
    }

    /// Metres per raster pixel along x and y.
    pub fn pixel_size(&self) -> (f64, f64) {
        self.pixel_size
    }

    pub fn frame(&self) -> &ProjectedBox {
        &self.frame
    }

    pub fn neat(&self) -> &ProjectedBox {
        &self.neat
    }

    pub fn ebox(&self) -> &ProjectedBox {
        &self.ebox
    }

    pub fn outgrowths(&self) -> &[ProjectedBox] {
        &self.outgrowths
    }

    /// Everything this chart can draw, primary instance only.
    pub fn extent(&self) -> ProjectedBox {
        self.outgrowths
            .iter()
            .fold(self.ebox, |acc, b| acc.union(b))
    }

    pub fn straddles(&self) -> bool {
        self.spatial.straddles()
    }

    /// Dalle columns and rows.
    pub fn grid(&self) -> (u32, u32) {
        dalle_grid(self.info.width, self.info.height)
    }

    /// Projected box of dalle `(i, j)`; edge dalles are clipped to the frame.
    pub fn dalle_box(&self, i: u32, j: u32) -> ProjectedBox {
        let Some((min, max)) = self.frame.corners() else {
            return ProjectedBox::empty();
        };
        let step_x = DALLE_SIZE as f64 * self.pixel_size.0;
        let step_y = DALLE_SIZE as f64 * self.pixel_size.1;
        let west = min.x + i as f64 * step_x;
        let north = max.y - j as f64 * step_y;
        ProjectedBox::from_corners(
            Position::new(west, (north - step_y).max(min.y)),
            Position::new((west + step_x).min(max.x), north),
        )
    }

    /// Dalles overlapping `region` (given in this chart's primary position),
    /// row-major from the upper-left.
    pub fn dalles_in(&self, region: &ProjectedBox) -> Vec<DalleRef> {
        let (Some((fmin, fmax)), Some((rmin, rmax))) = (self.frame.corners(), region.corners())
        else {
            return Vec::new();
        };
        let (cols, rows) = self.grid();
        let step_x = DALLE_SIZE as f64 * self.pixel_size.0;
        let step_y = DALLE_SIZE as f64 * self.pixel_size.1;
        let index = |v: f64, n: u32| (v.floor() as i64).clamp(0, n as i64 - 1) as u32;

        let i0 = index((rmin.x - fmin.x) / step_x, cols);
        let i1 = index((rmax.x - fmin.x) / step_x, cols);
        let j0 = index((fmax.y - rmax.y) / step_y, rows);
        let j1 = index((fmax.y - rmin.y) / step_y, rows);

        let mut dalles = Vec::new();
        for j in j0..=j1 {
            for i in i0..=i1 {
                let bbox = self.dalle_box(i, j);
                if overlaps(&bbox, region) {
                    dalles.push(DalleRef { i, j, bbox });
                }
            }
        }
        dalles
    }

    /// Draw one instance of the chart into `canvas`.
    ///
    /// Returns the number of dalles drawn. A missing dalle is
    /// [`ChartError::NotFound`] for the primary instance and skipped for the
    /// mirror.
    pub fn draw(
        &self,
        canvas: &mut RenderCanvas,
        store: &DalleStore,
        instance: Instance,
        debug: bool,
        budget: &RenderBudget,
    ) -> ChartResult<usize> {
        let offset = instance.offset();
        let view = canvas.bbox().translate_x(-offset);

        // Clip regions in primary coordinates.
        let clips: Vec<ProjectedBox> = std::iter::once(&self.ebox)
            .chain(self.outgrowths.iter())
            .map(|b| b.intersection(&view))
            .filter(|b| b.has_area())
            .collect();
        if clips.is_empty() {
            return Ok(0);
        }

        let jobs: Vec<(usize, DalleRef)> = clips
            .iter()
            .enumerate()
            .flat_map(|(k, clip)| self.dalles_in(clip).into_iter().map(move |d| (k, d)))
            .collect();

        let mut wanted: Vec<(u32, u32)> = jobs.iter().map(|(_, d)| (d.i, d.j)).collect();
        wanted.sort_unstable();
        wanted.dedup();

        // Loads are independent; drawing below stays in job order.
        let loaded: HashMap<(u32, u32), Option<RgbaImage>> = wanted
            .par_iter()
            .map(|&(i, j)| {
                budget.check()?;
                store.load_dalle(&self.name, i, j).map(|img| ((i, j), img))
            })
            .collect::<ChartResult<_>>()?;

        let mask = if offset == 0.0 {
            self.mask.clone()
        } else {
            self.mask.translate_x(offset)
        };

        let mut drawn = 0;
        for (k, dalle) in &jobs {
            budget.check()?;
            let image = match loaded.get(&(dalle.i, dalle.j)) {
                Some(Some(image)) => image,
                _ if instance == Instance::Primary => {
                    return Err(ChartError::not_found(format!(
                        "dalle {}-{} of chart {}",
                        dalle.i, dalle.j, self.name
                    )));
                }
                _ => {
                    debug!(entry = %self.name, i = dalle.i, j = dalle.j, "Mirror dalle missing, skipped");
                    continue;
                }
            };

            let dalle_box = dalle.bbox.translate_x(offset);
            let clip = clips[*k].translate_x(offset);
            if copy_resampled(canvas, image, &dalle_box, &clip, &mask) > 0 {
                drawn += 1;
            }
            if debug {
                canvas.stroke_box(&dalle_box, DEBUG_DALLE_COLOR);
            }
        }

        if debug {
            for clip in &clips {
                canvas.stroke_box(&clip.translate_x(offset), DEBUG_CLIP_COLOR);
            }
        }

        debug!(
            entry = %self.name,
            instance = ?instance,
            dalles = drawn,
            "Drew raster entry"
        );
        Ok(drawn)
    }
}
