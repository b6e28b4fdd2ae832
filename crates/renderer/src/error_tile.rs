//! Error tiles.
//!
//! Tile clients display these in place of imagery that could not be
//! rendered, so a failing dalle does not blank the whole viewport. The tile
//! is nominally 128×128 and drawn at twice that size: a symbol with a drop
//! shadow, the tile identifier and the word-wrapped error message.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, draw_polygon_mut,
};
use imageproc::point::Point;
use imageproc::rect::Rect;
use rusttype::Font;

use crate::text::{draw_label, wrap_text, LabelStyle};

/// Nominal tile side.
pub const ERROR_TILE_NOMINAL: u32 = 128;

/// Rendering scale of the nominal tile.
pub const ERROR_TILE_SCALE: u32 = 2;

const SHADOW_OFFSET: i32 = 4;
const SYMBOL_RADIUS: i32 = 36;
const MESSAGE_CHARS_PER_LINE: usize = 22;

/// Symbol drawn at the centre of an error tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorSymbol {
    Circle,
    Square,
    Diamond,
    #[default]
    Ringed,
}

impl ErrorSymbol {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "circle" => ErrorSymbol::Circle,
            "square" => ErrorSymbol::Square,
            "diamond" => ErrorSymbol::Diamond,
            _ => ErrorSymbol::Ringed,
        }
    }
}

fn draw_symbol(img: &mut RgbaImage, symbol: ErrorSymbol, cx: i32, cy: i32, color: Rgba<u8>) {
    let r = SYMBOL_RADIUS;
    match symbol {
        ErrorSymbol::Circle => draw_filled_circle_mut(img, (cx, cy), r, color),
        ErrorSymbol::Square => {
            let rect = Rect::at(cx - r, cy - r).of_size((2 * r) as u32, (2 * r) as u32);
            draw_filled_rect_mut(img, rect, color);
        }
        ErrorSymbol::Diamond => {
            let points = [
                Point::new(cx, cy - r),
                Point::new(cx + r, cy),
                Point::new(cx, cy + r),
                Point::new(cx - r, cy),
            ];
            draw_polygon_mut(img, &points, color);
        }
        ErrorSymbol::Ringed => {
            draw_filled_circle_mut(img, (cx, cy), r / 2, color);
            for offset in 0..4 {
                draw_hollow_circle_mut(img, (cx, cy), r - offset, color);
            }
        }
    }
}

/// Render an error tile.
///
/// `id` identifies the failed request (for instance `gtpyr/7/64/44`);
/// `message` is the error text. Without a font only the symbol is drawn.
pub fn render_error_tile(
    id: &str,
    message: &str,
    symbol: ErrorSymbol,
    font: Option<&Font<'_>>,
) -> RgbaImage {
    let side = ERROR_TILE_NOMINAL * ERROR_TILE_SCALE;
    let mut img = RgbaImage::from_pixel(side, side, Rgba([255, 255, 255, 0]));

    let center = (side / 2) as i32;
    let cy = center - SYMBOL_RADIUS / 2;
    draw_symbol(
        &mut img,
        symbol,
        center + SHADOW_OFFSET,
        cy + SHADOW_OFFSET,
        Rgba([0, 0, 0, 96]),
    );
    draw_symbol(&mut img, symbol, center, cy, Rgba([200, 30, 30, 230]));

    let Some(font) = font else {
        return img;
    };

    let id_style = LabelStyle {
        size: 18.0,
        color: Rgba([40, 40, 40, 255]),
        ..LabelStyle::default()
    };
    draw_label(&mut img, font, id, 8, 8, &id_style);

    let message_style = LabelStyle {
        size: 16.0,
        color: Rgba([120, 0, 0, 255]),
        background: None,
        ..LabelStyle::default()
    };
    let line_height = message_style.size as i32 + 2;
    let mut y = cy + SYMBOL_RADIUS + SHADOW_OFFSET + 8;
    for line in wrap_text(message, MESSAGE_CHARS_PER_LINE) {
        if y + line_height > side as i32 {
            break;
        }
        draw_label(&mut img, font, &line, 8, y, &message_style);
        y += line_height;
    }

    img
}
