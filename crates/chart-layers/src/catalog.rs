//! Compiled catalog cache.
//!
//! Parsing the YAML layer file is slow enough to matter at startup, so the
//! compiled [`LayerCatalog`] is kept next to it as JSON. The JSON is used
//! only when it is at least as recent as the YAML; a missing, stale or
//! unreadable cache triggers a rebuild.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chart_common::ChartResult;
use tracing::{debug, info, warn};

use crate::config::{load_layers_file, LayerCatalog};

/// How the catalog was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    /// Read from a fresh JSON cache
    Cache,
    /// Re-parsed from YAML (cache missing, stale or corrupt)
    Rebuilt,
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Whether `cache` exists and is not older than `source`.
pub fn is_cache_fresh(source: &Path, cache: &Path) -> bool {
    match (modified(source), modified(cache)) {
        (Some(src), Some(cached)) => cached >= src,
        _ => false,
    }
}

fn read_cache(cache: &Path) -> Option<LayerCatalog> {
    let text = match fs::read_to_string(cache) {
        Ok(text) => text,
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                warn!(error = %e, path = %cache.display(), "Failed to read catalog cache");
            }
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(catalog) => Some(catalog),
        Err(e) => {
            warn!(error = %e, path = %cache.display(), "Corrupt catalog cache, rebuilding");
            None
        }
    }
}

fn temp_path(cache: &Path) -> PathBuf {
    let mut name = cache
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    cache.with_file_name(name)
}

/// Write the catalog through a temporary file and an atomic rename.
pub fn write_cache(cache: &Path, catalog: &LayerCatalog) -> ChartResult<()> {
    let json = serde_json::to_string(catalog)?;
    let tmp = temp_path(cache);
    fs::write(&tmp, json)?;
    if let Err(e) = fs::rename(&tmp, cache) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// Load the layer catalog, preferring a fresh JSON cache.
///
/// Failing to write the cache is logged and otherwise ignored: the cache
/// is an optimisation, the YAML stays authoritative.
pub fn load_catalog(source: &Path, cache: &Path) -> ChartResult<(LayerCatalog, CatalogSource)> {
    if is_cache_fresh(source, cache) {
        if let Some(catalog) = read_cache(cache) {
            debug!(path = %cache.display(), "Using compiled catalog cache");
            return Ok((catalog, CatalogSource::Cache));
        }
    } else {
        debug!(path = %cache.display(), "Catalog cache missing or stale");
    }

    let catalog = load_layers_file(source)?;
    match write_cache(cache, &catalog) {
        Ok(()) => info!(path = %cache.display(), "Wrote compiled catalog cache"),
        Err(e) => warn!(error = %e, path = %cache.display(), "Failed to write catalog cache"),
    }
    Ok((catalog, CatalogSource::Rebuilt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const YAML: &str = r#"
layers:
  gt50k:
    a:
      spatial: { SW: [0.0, 0.0], NE: [1.0, 1.0] }
"#;

    fn set_mtime(path: &Path, time: SystemTime) {
        let file = fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(time).unwrap();
    }

    #[test]
    fn test_rebuild_then_cache_hit() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("layers.yaml");
        let cache = dir.path().join("layers.json");
        fs::write(&source, YAML).unwrap();

        let (first, how) = load_catalog(&source, &cache).unwrap();
        assert_eq!(how, CatalogSource::Rebuilt);
        assert!(cache.exists());
        assert!(!temp_path(&cache).exists());

        let (second, how) = load_catalog(&source, &cache).unwrap();
        assert_eq!(how, CatalogSource::Cache);
        assert_eq!(first, second);
    }

    #[test]
    fn test_stale_cache_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("layers.yaml");
        let cache = dir.path().join("layers.json");
        fs::write(&source, YAML).unwrap();
        load_catalog(&source, &cache).unwrap();

        let now = SystemTime::now();
        set_mtime(&cache, now - Duration::from_secs(60));
        set_mtime(&source, now);
        assert!(!is_cache_fresh(&source, &cache));

        let (_, how) = load_catalog(&source, &cache).unwrap();
        assert_eq!(how, CatalogSource::Rebuilt);
    }

    #[test]
    fn test_corrupt_cache_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("layers.yaml");
        let cache = dir.path().join("layers.json");
        fs::write(&source, YAML).unwrap();
        fs::write(&cache, "{ not json").unwrap();
        set_mtime(&cache, SystemTime::now() + Duration::from_secs(60));

        let (catalog, how) = load_catalog(&source, &cache).unwrap();
        assert_eq!(how, CatalogSource::Rebuilt);
        assert_eq!(catalog.entry_count(), 1);
    }

    #[test]
    fn test_unwritable_cache_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("layers.yaml");
        fs::write(&source, YAML).unwrap();
        let cache = dir.path().join("missing-dir").join("layers.json");

        let (catalog, how) = load_catalog(&source, &cache).unwrap();
        assert_eq!(how, CatalogSource::Rebuilt);
        assert_eq!(catalog.entry_count(), 1);
    }

    #[test]
    fn test_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_catalog(&dir.path().join("nope.yaml"), &dir.path().join("c.json"))
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
