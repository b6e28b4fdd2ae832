//! Raster compositing primitives for chart rendering.
//!
//! - [`canvas`]: destination raster tied to a projected box
//! - [`mask`]: deleted zones that are never painted
//! - [`resample`]: nearest-neighbour copy of a source raster into a canvas
//! - [`text`]: font loading and label drawing
//! - [`error_tile`]: the image served in place of a failed tile
//! - [`encode`]: PNG/JPEG output

pub mod canvas;
pub mod encode;
pub mod error_tile;
pub mod mask;
pub mod resample;
pub mod text;

pub use canvas::{PixelRect, RenderCanvas};
pub use encode::{encode, OutputFormat};
pub use error_tile::{render_error_tile, ErrorSymbol};
pub use mask::ExclusionMask;
pub use resample::{copy_resampled, warp};
pub use text::{load_font, wrap_text, LabelStyle};
