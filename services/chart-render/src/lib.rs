//! Chart rendering service.
//!
//! Wraps the layer registry with what a request handler needs: request
//! validation and CRS conversion, render timeouts, the tile cache, error
//! tiles and metrics.

pub mod config;
pub mod inventory;
pub mod metrics;
pub mod render;
pub mod state;

pub use config::ServiceConfig;
pub use inventory::{EntryMatch, LayerSummary, LocateResult};
pub use render::{
    zoom_for_render, MapGeometry, RenderRequest, RenderedImage, RequestGrid, TileResponse,
    MAX_IMAGE_SIDE,
};
pub use state::ChartService;
