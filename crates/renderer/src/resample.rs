//! Nearest-neighbour resampling of a source raster into a canvas.

use chart_common::ProjectedBox;
use image::{Rgba, RgbaImage};
use projection::Position;

use crate::canvas::RenderCanvas;
use crate::mask::ExclusionMask;

/// Copy the part of `src` (covering `src_box`) that falls inside `clip`
/// into `canvas`.
///
/// The destination rectangle is `src_box ∩ clip` mapped to canvas pixels.
/// Each destination pixel takes the source pixel under its centre; no
/// anti-aliasing. Fully transparent source pixels leave the canvas
/// untouched, everything else overwrites. Pixels whose centre falls in a
/// zone of `mask` are left untouched as well.
///
/// Returns the number of destination pixels covered.
pub fn copy_resampled(
    canvas: &mut RenderCanvas,
    src: &RgbaImage,
    src_box: &ProjectedBox,
    clip: &ProjectedBox,
    mask: &ExclusionMask,
) -> u64 {
    let (src_min, src_max) = match src_box.corners() {
        Some(c) if src.width() > 0 && src.height() > 0 && src_box.has_area() => c,
        _ => return 0,
    };
    let target = src_box.intersection(clip).intersection(canvas.bbox());
    let rect = match canvas.pixel_rect(&target) {
        Some(rect) => rect,
        None => return 0,
    };

    let src_dx = (src_max.x - src_min.x) / src.width() as f64;
    let src_dy = (src_max.y - src_min.y) / src.height() as f64;
    let max_col = src.width() as i64 - 1;
    let max_row = src.height() as i64 - 1;

    let mask = mask.restricted_to(&target);

    // Source column per destination column, computed once per call.
    let columns: Vec<u32> = (rect.x0..rect.x1)
        .map(|px| {
            let user = canvas.to_user(px as f64 + 0.5, 0.0);
            (((user.x - src_min.x) / src_dx).floor() as i64).clamp(0, max_col) as u32
        })
        .collect();

    for py in rect.y0..rect.y1 {
        let user = canvas.to_user(0.0, py as f64 + 0.5);
        let row = (((src_max.y - user.y) / src_dy).floor() as i64).clamp(0, max_row) as u32;
        for (px, &col) in (rect.x0..rect.x1).zip(columns.iter()) {
            if !mask.is_empty() && mask.excludes(canvas.to_user(px as f64 + 0.5, py as f64 + 0.5)) {
                continue;
            }
            let pixel = *src.get_pixel(col, row);
            if pixel[3] != 0 {
                canvas.image_mut().put_pixel(px, py, pixel);
            }
        }
    }

    rect.area()
}

/// Sample `source` into a `width × height` image laid out in another grid.
///
/// `locate` maps an output pixel centre `(col + 0.5, row + 0.5)` to its
/// render-space position; each output pixel takes the source pixel under
/// that position. Pixels without a position, or landing outside the
/// source, stay transparent.
pub fn warp<F>(source: &RenderCanvas, width: u32, height: u32, locate: F) -> RgbaImage
where
    F: Fn(f64, f64) -> Option<Position>,
{
    let mut out = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    let (src_w, src_h) = (source.width() as f64, source.height() as f64);
    for row in 0..height {
        for col in 0..width {
            let Some(pos) = locate(col as f64 + 0.5, row as f64 + 0.5) else {
                continue;
            };
            let (sx, sy) = source.to_pixel(pos);
            if !(0.0..src_w).contains(&sx) || !(0.0..src_h).contains(&sy) {
                continue;
            }
            out.put_pixel(col, row, *source.image().get_pixel(sx as u32, sy as u32));
        }
    }
    out
}
