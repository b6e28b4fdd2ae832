//! Storage for the chart services.
//!
//! Provides:
//! - Filesystem access to pre-sliced dalles and their sidecar metadata
//! - An in-memory LRU cache for rendered tiles

pub mod dalle_store;
pub mod sidecar;
pub mod tile_cache;

pub use dalle_store::{dalle_grid, DalleStore, DALLE_SIZE};
pub use sidecar::{Georef, GeorefDescriptor, RasterInfo};
pub use tile_cache::{CachePolicy, TileCache, TileCacheStats, TileKey};
