//! The layer dictionary, built once at startup and read-only afterwards.

use std::collections::HashMap;

use chart_common::{ChartError, ChartResult};
use storage::DalleStore;
use tracing::{info, warn};

use crate::config::{LayerCatalog, TiffLayerConfig};
use crate::layer::{LabelLayer, Layer, PyramidLayer, TiffLayer};
use crate::raster::RasterEntry;

/// Layers by name, in registration order.
#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    layers: Vec<Layer>,
    index: HashMap<String, usize>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer; names are unique.
    pub fn insert(&mut self, layer: Layer) -> ChartResult<()> {
        let name = layer.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ChartError::configuration(format!(
                "layer {} defined twice",
                name
            )));
        }
        self.index.insert(name, self.layers.len());
        self.layers.push(layer);
        Ok(())
    }

    /// Build every layer of `catalog` against the dalle store.
    ///
    /// Each tiff layer `X` also gets a label layer `X-num`. Charts without
    /// data in the store are skipped with a warning; any other per-chart
    /// failure aborts the build.
    pub fn build(catalog: &LayerCatalog, store: &DalleStore) -> ChartResult<Self> {
        let mut registry = Self::new();

        for config in &catalog.layers {
            let tiff = build_tiff_layer(config, store, catalog.erosion_px)?;
            let labels = LabelLayer::for_tiff(&tiff);
            registry.insert(Layer::Tiff(tiff))?;
            registry.insert(Layer::Label(labels))?;
        }

        for level in &catalog.pyramid.levels {
            if !registry.contains(&level.layer) {
                warn!(
                    pyramid = %catalog.pyramid.name,
                    layer = %level.layer,
                    "Pyramid level refers to an unknown layer"
                );
            }
        }
        registry.insert(Layer::Pyramid(PyramidLayer::new(catalog.pyramid.clone())))?;

        info!(
            layers = registry.len(),
            pyramid = %catalog.pyramid.name,
            "Layer registry ready"
        );
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.index.get(name).map(|&i| &self.layers[i])
    }

    /// Like [`get`](Self::get), failing with `NotFound`.
    pub fn require(&self, name: &str) -> ChartResult<&Layer> {
        self.get(name)
            .ok_or_else(|| ChartError::not_found(format!("layer {}", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.name())
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

fn build_tiff_layer(
    config: &TiffLayerConfig,
    store: &DalleStore,
    erosion_px: f64,
) -> ChartResult<TiffLayer> {
    let mut entries = Vec::with_capacity(config.entries.len());
    for entry in &config.entries {
        let info = match store.read_sidecar(&entry.name) {
            Ok(info) => info,
            Err(e) if e.is_not_found() => {
                warn!(layer = %config.name, entry = %entry.name, "No raster data, entry skipped");
                continue;
            }
            Err(e) => return Err(e),
        };
        entries.push(RasterEntry::build(entry, info, erosion_px)?);
    }
    info!(
        layer = %config.name,
        entries = entries.len(),
        configured = config.entries.len(),
        "Built tiff layer"
    );
    Ok(TiffLayer::new(config.name.clone(), entries))
}
