//! Text drawing for chart labels and error tiles.
//!
//! Fonts are loaded at runtime from a TrueType file; without one, text
//! drawing is skipped and everything else still renders.

use std::path::Path;

use chart_common::{ChartError, ChartResult};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use rusttype::{point, Font, Scale};
use tracing::info;

/// Load a TrueType font from disk.
pub fn load_font(path: &Path) -> ChartResult<Font<'static>> {
    let bytes = std::fs::read(path)?;
    let font = Font::try_from_vec(bytes).ok_or_else(|| {
        ChartError::configuration(format!("{} is not a usable TrueType font", path.display()))
    })?;
    info!(path = %path.display(), "Loaded label font");
    Ok(font)
}

/// How a label is drawn.
#[derive(Debug, Clone, Copy)]
pub struct LabelStyle {
    pub size: f32,
    pub color: Rgba<u8>,
    /// Box drawn behind the text for readability
    pub background: Option<Rgba<u8>>,
    pub padding: i32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            size: 14.0,
            color: Rgba([160, 0, 120, 255]),
            background: Some(Rgba([255, 255, 255, 220])),
            padding: 2,
        }
    }
}

/// Advance width of `text` in pixels.
pub fn text_width(font: &Font<'_>, size: f32, text: &str) -> f32 {
    let scale = Scale::uniform(size);
    font.layout(text, scale, point(0.0, 0.0))
        .last()
        .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0)
}

/// Pixel size of the box [`draw_label`] covers, padding included.
pub fn label_size(font: &Font<'_>, text: &str, style: &LabelStyle) -> (i32, i32) {
    let w = text_width(font, style.size, text).ceil() as i32 + 2 * style.padding;
    let h = style.size.ceil() as i32 + 2 * style.padding;
    (w, h)
}

/// Draw `text` with its upper-left corner at `(x, y)`.
pub fn draw_label(
    img: &mut RgbaImage,
    font: &Font<'_>,
    text: &str,
    x: i32,
    y: i32,
    style: &LabelStyle,
) {
    if text.is_empty() {
        return;
    }
    if let Some(bg) = style.background {
        let (w, h) = label_size(font, text, style);
        if w > 0 && h > 0 {
            let rect = Rect::at(x - style.padding, y - style.padding).of_size(w as u32, h as u32);
            draw_filled_rect_mut(img, rect, bg);
        }
    }
    draw_text_mut(img, style.color, x, y, Scale::uniform(style.size), font, text);
}

/// Greedy word wrap to lines of at most `max_chars` characters. Words
/// longer than a line are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }

        let line_len = line.chars().count();
        if line_len > 0 && line_len + 1 + word.len() > max_chars {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.extend(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text() {
        assert_eq!(
            wrap_text("dalle 3-4 missing for chart 7330", 12),
            vec!["dalle 3-4", "missing for", "chart 7330"]
        );
        assert_eq!(wrap_text("", 10), Vec::<String>::new());
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("a abcdefghij", 4), vec!["a", "abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_missing_font_is_io_error() {
        let err = load_font(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_invalid_font_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        let err = load_font(&path).unwrap_err();
        assert_eq!(err.kind(), chart_common::ErrorKind::Configuration);
    }
}
