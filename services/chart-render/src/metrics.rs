//! Render metrics.
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! these calls do nothing.

use std::time::Duration;

use chart_common::ChartError;
use metrics::{counter, gauge, histogram};
use storage::TileCacheStats;

/// Which entry point produced a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    Map,
    Tile,
}

impl RenderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderKind::Map => "map",
            RenderKind::Tile => "tile",
        }
    }
}

pub fn record_render(kind: RenderKind, duration: Duration, dalles: usize) {
    counter!("chart_renders_total", "kind" => kind.as_str()).increment(1);
    histogram!("chart_render_duration_ms", "kind" => kind.as_str())
        .record(duration.as_secs_f64() * 1000.0);
    histogram!("chart_render_dalles", "kind" => kind.as_str()).record(dalles as f64);
}

pub fn record_render_error(kind: RenderKind, error: &ChartError) {
    counter!(
        "chart_render_errors_total",
        "kind" => kind.as_str(),
        "error" => error.kind().as_str()
    )
    .increment(1);
}

pub fn record_error_tile() {
    counter!("chart_error_tiles_total").increment(1);
}

pub fn record_cache_hit() {
    counter!("chart_tile_cache_hits_total").increment(1);
}

pub fn record_cache_miss() {
    counter!("chart_tile_cache_misses_total").increment(1);
}

pub fn record_cache_stats(stats: &TileCacheStats) {
    gauge!("chart_tile_cache_entries").set(stats.entry_count as f64);
    gauge!("chart_tile_cache_bytes").set(stats.size_bytes as f64);
}
