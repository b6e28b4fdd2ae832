//! Service configuration from the environment.

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chart_common::{ChartError, ChartResult, MAX_ZOOM};
use serde::{Deserialize, Serialize};
use storage::CachePolicy;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// YAML layer configuration
    pub layers_file: PathBuf,
    /// Compiled JSON catalog, rebuilt when older than `layers_file`
    pub catalog_cache: PathBuf,
    /// Root of the dalle store
    pub data_dir: PathBuf,
    /// TrueType font for labels and error tiles; text is skipped without one
    pub font_path: Option<PathBuf>,
    /// Tile cache memory limit; 0 disables the cache
    pub tile_cache_size_mb: usize,
    pub tile_cache_ttl_secs: u64,
    pub tile_cache_max_zoom: u32,
    /// Cacheable layers; `None` allows every layer
    pub tile_cache_layers: Option<Vec<String>>,
    pub render_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            layers_file: PathBuf::from("config/layers.yaml"),
            catalog_cache: PathBuf::from("config/layers.json"),
            data_dir: PathBuf::from("data/charts"),
            font_path: None,
            tile_cache_size_mb: 256,
            tile_cache_ttl_secs: 3600,
            tile_cache_max_zoom: 14,
            tile_cache_layers: None,
            render_timeout_ms: 10_000,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(var = name, value = %raw, "Unparseable environment variable, using default");
                default
            }
        },
        Err(_) => default,
    }
}

impl ServiceConfig {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let path_var = |name: &str, default: PathBuf| {
            env::var(name).map(PathBuf::from).unwrap_or(default)
        };

        Self {
            layers_file: path_var("CHART_LAYERS_FILE", defaults.layers_file),
            catalog_cache: path_var("CHART_CATALOG_CACHE", defaults.catalog_cache),
            data_dir: path_var("CHART_DATA_DIR", defaults.data_dir),
            font_path: env::var("CHART_FONT_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            tile_cache_size_mb: parse_var("TILE_CACHE_SIZE_MB", defaults.tile_cache_size_mb),
            tile_cache_ttl_secs: parse_var("TILE_CACHE_TTL_SECS", defaults.tile_cache_ttl_secs),
            tile_cache_max_zoom: parse_var("TILE_CACHE_MAX_ZOOM", defaults.tile_cache_max_zoom),
            tile_cache_layers: env::var("TILE_CACHE_LAYERS").ok().map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }),
            render_timeout_ms: parse_var("RENDER_TIMEOUT_MS", defaults.render_timeout_ms),
        }
    }

    /// Check values that would make the service misbehave.
    pub fn validate(&self) -> ChartResult<()> {
        if self.render_timeout_ms == 0 {
            return Err(ChartError::configuration("RENDER_TIMEOUT_MS must be positive"));
        }
        if self.tile_cache_max_zoom > MAX_ZOOM {
            return Err(ChartError::configuration(format!(
                "TILE_CACHE_MAX_ZOOM {} exceeds the deepest zoom {}",
                self.tile_cache_max_zoom, MAX_ZOOM
            )));
        }
        if self.tile_cache_size_mb > 0 && self.tile_cache_ttl_secs == 0 {
            return Err(ChartError::configuration(
                "TILE_CACHE_TTL_SECS must be positive when the tile cache is enabled",
            ));
        }
        if !self.data_dir.is_dir() {
            return Err(ChartError::configuration(format!(
                "chart data directory {} does not exist",
                self.data_dir.display()
            )));
        }
        if !self.layers_file.is_file() {
            return Err(ChartError::configuration(format!(
                "layer configuration {} does not exist",
                self.layers_file.display()
            )));
        }
        Ok(())
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    pub fn cache_enabled(&self) -> bool {
        self.tile_cache_size_mb > 0
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            ttl: Duration::from_secs(self.tile_cache_ttl_secs),
            max_zoom: self.tile_cache_max_zoom,
            layers: self
                .tile_cache_layers
                .as_ref()
                .map(|layers| layers.iter().cloned().collect::<HashSet<_>>()),
        }
    }
}
