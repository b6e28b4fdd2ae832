//! Common types and utilities shared across the chart services.

pub mod bbox;
pub mod crs;
pub mod dms;
pub mod error;
pub mod tile;

pub use bbox::{BBox, GeoBox, Geographic, Projected, ProjectedBox, Space};
pub use crs::{AxisOrder, CrsCode};
pub use dms::parse_dms_pair;
pub use error::{ChartError, ChartResult, ErrorKind};
pub use tile::{TileCoord, MAX_TILES_PER_AXIS, MAX_ZOOM, SIZE0, TILE_SIZE};
