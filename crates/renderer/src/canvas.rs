//! Destination raster for one render.
//!
//! A [`RenderCanvas`] pairs an RGBA image with the projected box it covers.
//! Pixel `(0, 0)` is the upper-left corner, i.e. `(min.x, max.y)`.

use chart_common::{ChartError, ChartResult, ProjectedBox};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use projection::Position;

/// Half-open pixel rectangle `[x0, x1) × [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    pub fn area(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.width() as u64 * self.height() as u64
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderCanvas {
    image: RgbaImage,
    bbox: ProjectedBox,
    min: Position,
    max: Position,
}

impl RenderCanvas {
    /// Transparent canvas of `width × height` pixels covering `bbox`.
    pub fn new(width: u32, height: u32, bbox: ProjectedBox) -> ChartResult<Self> {
        if width == 0 || height == 0 {
            return Err(ChartError::invalid_request(format!(
                "invalid image size {}x{}",
                width, height
            )));
        }
        let (min, max) = bbox
            .corners()
            .filter(|_| bbox.has_area())
            .ok_or_else(|| ChartError::invalid_request(format!("degenerate render box {}", bbox)))?;
        Ok(Self {
            image: RgbaImage::new(width, height),
            bbox,
            min,
            max,
        })
    }

    pub fn bbox(&self) -> &ProjectedBox {
        &self.bbox
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Metres per pixel along x and y.
    pub fn pixel_size(&self) -> (f64, f64) {
        (
            (self.max.x - self.min.x) / self.width() as f64,
            (self.max.y - self.min.y) / self.height() as f64,
        )
    }

    /// Fractional pixel coordinates of a projected position.
    pub fn to_pixel(&self, pos: Position) -> (f64, f64) {
        let (dx, dy) = self.pixel_size();
        ((pos.x - self.min.x) / dx, (self.max.y - pos.y) / dy)
    }

    /// Projected position of a fractional pixel coordinate.
    pub fn to_user(&self, px: f64, py: f64) -> Position {
        let (dx, dy) = self.pixel_size();
        Position::new(self.min.x + px * dx, self.max.y - py * dy)
    }

    /// Pixels whose rounded edges fall inside `bbox`, clipped to the canvas.
    ///
    /// Edges are rounded to the nearest pixel boundary, so two boxes sharing
    /// an edge map to adjacent rectangles without gap or overlap.
    pub fn pixel_rect(&self, bbox: &ProjectedBox) -> Option<PixelRect> {
        let (min, max) = bbox.corners()?;
        let (fx0, fy0) = self.to_pixel(Position::new(min.x, max.y));
        let (fx1, fy1) = self.to_pixel(Position::new(max.x, min.y));

        let clamp_x = |v: f64| v.round().clamp(0.0, self.width() as f64) as u32;
        let clamp_y = |v: f64| v.round().clamp(0.0, self.height() as f64) as u32;
        let rect = PixelRect {
            x0: clamp_x(fx0),
            y0: clamp_y(fy0),
            x1: clamp_x(fx1),
            y1: clamp_y(fy1),
        };
        (!rect.is_empty()).then_some(rect)
    }

    /// Outline `bbox` on the canvas (debug drawing).
    pub fn stroke_box(&mut self, bbox: &ProjectedBox, color: Rgba<u8>) {
        let Some((min, max)) = bbox.corners() else {
            return;
        };
        let (fx0, fy0) = self.to_pixel(Position::new(min.x, max.y));
        let (fx1, fy1) = self.to_pixel(Position::new(max.x, min.y));
        // Keep the outline within i32 range for boxes far outside the canvas.
        let limit = 4.0 * (self.width().max(self.height()) as f64);
        let x0 = fx0.round().clamp(-limit, limit) as i32;
        let y0 = fy0.round().clamp(-limit, limit) as i32;
        let x1 = fx1.round().clamp(-limit, limit) as i32;
        let y1 = fy1.round().clamp(-limit, limit) as i32;
        if x1 <= x0 || y1 <= y0 {
            return;
        }
        let rect = Rect::at(x0, y0).of_size((x1 - x0) as u32, (y1 - y0) as u32);
        draw_hollow_rect_mut(&mut self.image, rect, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> RenderCanvas {
        let bbox = ProjectedBox::from_coords(&[0.0, 0.0, 100.0, 50.0]).unwrap();
        RenderCanvas::new(200, 100, bbox).unwrap()
    }

    #[test]
    fn test_pixel_mapping() {
        let c = canvas();
        assert_eq!(c.pixel_size(), (0.5, 0.5));
        assert_eq!(c.to_pixel(Position::new(0.0, 50.0)), (0.0, 0.0));
        assert_eq!(c.to_pixel(Position::new(100.0, 0.0)), (200.0, 100.0));
        assert_eq!(c.to_user(100.0, 50.0), Position::new(50.0, 25.0));
    }

    #[test]
    fn test_adjacent_rects_share_edges() {
        let c = canvas();
        let left = ProjectedBox::from_coords(&[0.0, 0.0, 33.3, 50.0]).unwrap();
        let right = ProjectedBox::from_coords(&[33.3, 0.0, 100.0, 50.0]).unwrap();
        let a = c.pixel_rect(&left).unwrap();
        let b = c.pixel_rect(&right).unwrap();
        assert_eq!(a.x1, b.x0);
        assert_eq!(a.area() + b.area(), 200 * 100);
    }

    #[test]
    fn test_rect_clipped_or_absent() {
        let c = canvas();
        let outside = ProjectedBox::from_coords(&[200.0, 0.0, 300.0, 50.0]).unwrap();
        assert!(c.pixel_rect(&outside).is_none());
        let partial = ProjectedBox::from_coords(&[-50.0, 25.0, 50.0, 75.0]).unwrap();
        assert_eq!(
            c.pixel_rect(&partial).unwrap(),
            PixelRect {
                x0: 0,
                y0: 0,
                x1: 100,
                y1: 50
            }
        );
    }

    #[test]
    fn test_rejects_degenerate_canvas() {
        let flat = ProjectedBox::from_coords(&[0.0, 0.0, 10.0, 0.0]).unwrap();
        assert!(RenderCanvas::new(10, 10, flat).is_err());
        let ok = ProjectedBox::from_coords(&[0.0, 0.0, 10.0, 10.0]).unwrap();
        assert!(RenderCanvas::new(0, 10, ok).is_err());
    }

    #[test]
    fn test_stroke_box_draws_outline() {
        let mut c = canvas();
        let inner = ProjectedBox::from_coords(&[10.0, 10.0, 20.0, 20.0]).unwrap();
        let red = Rgba([255, 0, 0, 255]);
        c.stroke_box(&inner, red);
        assert_eq!(c.image().get_pixel(20, 60), &red);
        assert_eq!(c.image().get_pixel(30, 70)[3], 0);
    }
}
