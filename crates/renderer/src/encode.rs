//! Output encoding.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use chart_common::{ChartError, ChartResult};
use image::{DynamicImage, ImageOutputFormat, RgbaImage};
use serde::{Deserialize, Serialize};

const JPEG_QUALITY: u8 = 85;

/// Image formats a render can be returned in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ChartError;

    /// Accepts MIME types and file extensions.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image/png" | "png" => Ok(OutputFormat::Png),
            "image/jpeg" | "image/jpg" | "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            other => Err(ChartError::invalid_request(format!(
                "Requested format not supported: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Encode a canvas image. JPEG drops the alpha channel.
pub fn encode(img: &RgbaImage, format: OutputFormat) -> ChartResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let result = match format {
        OutputFormat::Png => {
            DynamicImage::ImageRgba8(img.clone()).write_to(&mut buf, ImageOutputFormat::Png)
        }
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
            DynamicImage::ImageRgb8(rgb).write_to(&mut buf, ImageOutputFormat::Jpeg(JPEG_QUALITY))
        }
    };
    result.map_err(|e| ChartError::Image(format!("{} encoding failed: {}", format, e)))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_png_signature() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 4]));
        let bytes = encode(&img, OutputFormat::Png).unwrap();
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(3, 3), &Rgba([1, 2, 3, 4]));
    }

    #[test]
    fn test_jpeg_signature() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([200, 100, 50, 255]));
        let bytes = encode(&img, OutputFormat::Jpeg).unwrap();
        assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("image/png".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("JPG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert!("image/webp".parse::<OutputFormat>().is_err());
    }
}
