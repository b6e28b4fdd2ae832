//! Shared service state.

use std::sync::Arc;

use chart_common::ChartResult;
use chart_layers::{load_catalog, LayerRegistry};
use renderer::load_font;
use rusttype::Font;
use storage::{DalleStore, TileCache};
use tracing::{info, warn};

use crate::config::ServiceConfig;

/// Everything a render needs, read-only once built.
pub struct ChartService {
    pub(crate) config: ServiceConfig,
    pub(crate) registry: Arc<LayerRegistry>,
    pub(crate) store: Arc<DalleStore>,
    pub(crate) font: Option<Arc<Font<'static>>>,
    pub(crate) cache: Option<TileCache>,
}

impl ChartService {
    /// Load the catalog, build the layers and open the tile cache.
    pub fn from_config(config: ServiceConfig) -> ChartResult<Self> {
        let (catalog, source) = load_catalog(&config.layers_file, &config.catalog_cache)?;
        info!(
            layers = catalog.layers.len(),
            entries = catalog.entry_count(),
            source = ?source,
            "Layer catalog loaded"
        );

        let store = DalleStore::new(&config.data_dir);
        let registry = LayerRegistry::build(&catalog, &store)?;

        let font = match &config.font_path {
            Some(path) => match load_font(path) {
                Ok(font) => Some(font),
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "Font unavailable, text disabled");
                    None
                }
            },
            None => None,
        };

        Ok(Self::new(config, registry, store, font))
    }

    pub fn new(
        config: ServiceConfig,
        registry: LayerRegistry,
        store: DalleStore,
        font: Option<Font<'static>>,
    ) -> Self {
        let cache = config
            .cache_enabled()
            .then(|| TileCache::new(config.tile_cache_size_mb, config.cache_policy()));
        Self {
            config,
            registry: Arc::new(registry),
            store: Arc::new(store),
            font: font.map(Arc::new),
            cache,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn cache(&self) -> Option<&TileCache> {
        self.cache.as_ref()
    }
}
