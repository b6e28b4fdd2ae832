//! Layer configuration file.
//!
//! The YAML document maps layer names to ordered chart entries; see the
//! crate documentation for an example. Parsing produces a [`LayerCatalog`],
//! the compiled form that is also what [`crate::catalog`] caches as JSON.

use std::fs;
use std::path::Path;

use chart_common::{parse_dms_pair, ChartError, ChartResult, GeoBox};
use projection::Position;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::expr;
use crate::pyramid::{PyramidConfig, PyramidLevel};

/// Default erosion margin in native raster pixels.
pub const DEFAULT_EROSION_PX: f64 = 3.0;

// ============================================================================
// YAML structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct YamlLayersFile {
    #[serde(default)]
    erosion_px: Option<f64>,
    #[serde(default)]
    pyramid: Option<YamlPyramid>,
    #[serde(default)]
    layers: Mapping,
}

#[derive(Debug, Deserialize)]
struct YamlPyramid {
    name: String,
    levels: Vec<YamlPyramidLevel>,
}

#[derive(Debug, Deserialize)]
struct YamlPyramidLevel {
    layer: String,
    min_zoom: u32,
}

#[derive(Debug, Deserialize)]
struct YamlEntry {
    #[serde(default)]
    title: String,
    spatial: YamlExtent,
    #[serde(default)]
    outgrowth: Vec<YamlExtent>,
    #[serde(default)]
    borders: Option<YamlBorders>,
    #[serde(default)]
    deleted: Vec<Vec<YamlPoint>>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct YamlExtent {
    SW: YamlPoint,
    NE: YamlPoint,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum YamlPoint {
    Dms(String),
    LonLat([f64; 2]),
}

#[derive(Debug, Deserialize)]
struct YamlBorders {
    left: YamlNumber,
    bottom: YamlNumber,
    right: YamlNumber,
    top: YamlNumber,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum YamlNumber {
    Value(f64),
    Expr(String),
}

// ============================================================================
// Compiled configuration
// ============================================================================

/// Pixels cropped from each side of a scanned chart to reach its neat line.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BorderCrop {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

/// One chart of a tiled layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryConfig {
    /// Short identifier, also the directory name in the dalle store
    pub name: String,
    pub title: String,
    /// Cartographic extent inside the printed border
    pub spatial: GeoBox,
    /// Detached regions drawn outside the main extent
    #[serde(default)]
    pub outgrowth: Vec<GeoBox>,
    #[serde(default)]
    pub borders: Option<BorderCrop>,
    /// Polygons (lon/lat) never drawn from this chart
    #[serde(default)]
    pub deleted: Vec<Vec<Position>>,
}

/// A tiled layer and its entries in draw order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiffLayerConfig {
    pub name: String,
    pub entries: Vec<EntryConfig>,
}

/// Whole layer configuration in compiled form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerCatalog {
    pub erosion_px: f64,
    pub pyramid: PyramidConfig,
    pub layers: Vec<TiffLayerConfig>,
}

impl LayerCatalog {
    pub fn layer(&self, name: &str) -> Option<&TiffLayerConfig> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn entry_count(&self) -> usize {
        self.layers.iter().map(|l| l.entries.len()).sum()
    }
}

// ============================================================================
// Parsing
// ============================================================================

fn key_name(key: &Value) -> ChartResult<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(ChartError::configuration(format!(
            "layer and entry names must be strings, got {:?}",
            other
        ))),
    }
}

fn point(p: &YamlPoint) -> ChartResult<Position> {
    match p {
        YamlPoint::Dms(s) => parse_dms_pair(s),
        YamlPoint::LonLat([lon, lat]) => {
            if lon.abs() > 180.0 || lat.abs() > 90.0 {
                return Err(ChartError::configuration(format!(
                    "position [{}, {}] out of range",
                    lon, lat
                )));
            }
            Ok(Position::new(*lon, *lat))
        }
    }
}

fn extent(e: &YamlExtent) -> ChartResult<GeoBox> {
    let sw = point(&e.SW)?;
    let ne = point(&e.NE)?;
    if sw.y > ne.y {
        return Err(ChartError::configuration(format!(
            "south-west corner {} lies north of north-east corner {}",
            sw, ne
        )));
    }
    Ok(GeoBox::from_corners(sw, ne))
}

fn number(n: &YamlNumber) -> ChartResult<f64> {
    let value = match n {
        YamlNumber::Value(v) => *v,
        YamlNumber::Expr(s) => expr::evaluate(s)?,
    };
    if value < 0.0 {
        return Err(ChartError::configuration(format!(
            "negative border crop {}",
            value
        )));
    }
    Ok(value)
}

fn compile_entry(name: String, yaml: YamlEntry) -> ChartResult<EntryConfig> {
    let context = |e: ChartError| match e {
        ChartError::Configuration(msg) => {
            ChartError::configuration(format!("entry {}: {}", name, msg))
        }
        other => other,
    };

    let spatial = extent(&yaml.spatial).map_err(context)?;
    let outgrowth = yaml
        .outgrowth
        .iter()
        .map(extent)
        .collect::<ChartResult<Vec<_>>>()
        .map_err(context)?;
    let borders = yaml
        .borders
        .as_ref()
        .map(|b| -> ChartResult<BorderCrop> {
            Ok(BorderCrop {
                left: number(&b.left)?,
                bottom: number(&b.bottom)?,
                right: number(&b.right)?,
                top: number(&b.top)?,
            })
        })
        .transpose()
        .map_err(context)?;
    let deleted = yaml
        .deleted
        .iter()
        .map(|ring| ring.iter().map(point).collect::<ChartResult<Vec<_>>>())
        .collect::<ChartResult<Vec<_>>>()
        .map_err(context)?;

    Ok(EntryConfig {
        name,
        title: yaml.title,
        spatial,
        outgrowth,
        borders,
        deleted,
    })
}

/// Parse a YAML layer configuration.
pub fn parse_layers_yaml(text: &str) -> ChartResult<LayerCatalog> {
    let file: YamlLayersFile = serde_yaml::from_str(text)
        .map_err(|e| ChartError::configuration(format!("invalid layer file: {}", e)))?;

    let erosion_px = file.erosion_px.unwrap_or(DEFAULT_EROSION_PX);
    if !(erosion_px >= 0.0) {
        return Err(ChartError::configuration(format!(
            "erosion_px must be a non-negative number, got {}",
            erosion_px
        )));
    }

    let pyramid = match file.pyramid {
        Some(p) => PyramidConfig {
            name: p.name,
            levels: p
                .levels
                .into_iter()
                .map(|l| PyramidLevel {
                    layer: l.layer,
                    min_zoom: l.min_zoom,
                })
                .collect(),
        },
        None => PyramidConfig::default(),
    }
    .normalized();

    let mut layers = Vec::with_capacity(file.layers.len());
    for (layer_key, entries) in file.layers {
        let layer_name = key_name(&layer_key)?;
        let entries = match entries {
            Value::Mapping(m) => m,
            Value::Null => Mapping::new(),
            _ => {
                return Err(ChartError::configuration(format!(
                    "layer {} must map entry names to entries",
                    layer_name
                )))
            }
        };

        let mut compiled = Vec::with_capacity(entries.len());
        for (entry_key, value) in entries {
            let entry_name = key_name(&entry_key)?;
            let yaml: YamlEntry = serde_yaml::from_value(value).map_err(|e| {
                ChartError::configuration(format!(
                    "layer {} entry {}: {}",
                    layer_name, entry_name, e
                ))
            })?;
            compiled.push(compile_entry(entry_name, yaml)?);
        }
        debug!(layer = %layer_name, entries = compiled.len(), "Parsed layer");
        layers.push(TiffLayerConfig {
            name: layer_name,
            entries: compiled,
        });
    }

    if layers.iter().any(|l| l.name == pyramid.name) {
        return Err(ChartError::configuration(format!(
            "pyramid name {} collides with a layer",
            pyramid.name
        )));
    }

    Ok(LayerCatalog {
        erosion_px,
        pyramid,
        layers,
    })
}

/// Read and parse a YAML layer file.
pub fn load_layers_file(path: impl AsRef<Path>) -> ChartResult<LayerCatalog> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let catalog = parse_layers_yaml(&text)?;
    info!(
        path = %path.display(),
        layers = catalog.layers.len(),
        entries = catalog.entry_count(),
        "Loaded layer configuration"
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
erosion_px: 4
layers:
  gt50k:
    "7330":
      title: "De Cherbourg à Hendaye"
      spatial: { SW: "43°20,00'N - 2°00,00'W", NE: "49°45,00'N - 1°00,00'W" }
      borders: { left: 120, bottom: "2*45+3", right: 120, top: 95 }
    7331:
      spatial: { SW: [-1.5, 45.0], NE: [-1.0, 46.0] }
      outgrowth:
        - { SW: [-1.0, 45.5], NE: [-0.8, 45.8] }
      deleted:
        - ["46°00,00'N - 1°30,00'W", [-1.2, 46.0], [-1.2, 45.9]]
  gt10M:
    world:
      spatial: { SW: [179.0, 10.0], NE: [-179.0, 20.0] }
"#;

    #[test]
    fn test_parse_sample() {
        let catalog = parse_layers_yaml(SAMPLE).unwrap();
        assert_eq!(catalog.erosion_px, 4.0);
        assert_eq!(catalog.pyramid, PyramidConfig::default());
        assert_eq!(catalog.entry_count(), 3);

        let gt50k = catalog.layer("gt50k").unwrap();
        let names: Vec<_> = gt50k.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["7330", "7331"]);

        let first = &gt50k.entries[0];
        assert_eq!(first.title, "De Cherbourg à Hendaye");
        assert_eq!(
            first.borders,
            Some(BorderCrop { left: 120.0, bottom: 93.0, right: 120.0, top: 95.0 })
        );
        let (min, max) = first.spatial.corners().unwrap();
        assert!((min.y - 43.333_333).abs() < 1e-6);
        assert!((max.x + 1.0).abs() < 1e-12);

        let second = &gt50k.entries[1];
        assert_eq!(second.outgrowth.len(), 1);
        assert_eq!(second.deleted[0].len(), 3);
        assert_eq!(second.deleted[0][1], Position::new(-1.2, 46.0));
    }

    #[test]
    fn test_straddling_entry() {
        let catalog = parse_layers_yaml(SAMPLE).unwrap();
        let world = &catalog.layer("gt10M").unwrap().entries[0];
        assert!(world.spatial.straddles());
        assert_eq!(world.spatial.max().unwrap().x, 181.0);
    }

    #[test]
    fn test_layer_order_preserved() {
        let catalog = parse_layers_yaml(SAMPLE).unwrap();
        let names: Vec<_> = catalog.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["gt50k", "gt10M"]);
    }

    #[test]
    fn test_custom_pyramid() {
        let yaml = r#"
pyramid:
  name: mypyr
  levels:
    - { layer: fine, min_zoom: 9 }
    - { layer: coarse, min_zoom: 0 }
layers: {}
"#;
        let catalog = parse_layers_yaml(yaml).unwrap();
        assert_eq!(catalog.erosion_px, DEFAULT_EROSION_PX);
        assert_eq!(catalog.pyramid.name, "mypyr");
        assert_eq!(catalog.pyramid.levels[0].layer, "coarse");
    }

    #[test]
    fn test_bad_border_expression() {
        let yaml = r#"
layers:
  gt50k:
    a:
      spatial: { SW: [0.0, 0.0], NE: [1.0, 1.0] }
      borders: { left: "12*", bottom: 0, right: 0, top: 0 }
"#;
        let err = parse_layers_yaml(yaml).unwrap_err();
        assert_eq!(err.kind(), chart_common::ErrorKind::Configuration);
        assert!(err.to_string().contains("entry a"));
    }

    #[test]
    fn test_malformed_entries() {
        let bad_dms = r#"
layers:
  l:
    a:
      spatial: { SW: "43°75,00'N - 2°00,00'W", NE: [1.0, 50.0] }
"#;
        assert!(parse_layers_yaml(bad_dms).is_err());

        let inverted = r#"
layers:
  l:
    a:
      spatial: { SW: [0.0, 10.0], NE: [1.0, 5.0] }
"#;
        assert!(parse_layers_yaml(inverted).is_err());

        let missing_spatial = "layers:\n  l:\n    a:\n      title: x\n";
        assert!(parse_layers_yaml(missing_spatial).is_err());

        let collision = "pyramid: { name: l, levels: [] }\nlayers:\n  l: {}\n";
        assert!(parse_layers_yaml(collision).is_err());
    }
}
