//! Core catalog lookup.

use std::path::Path;

use flyback_core::Stage;
use flyback_magnetics::CoreSelection;
use indexmap::IndexMap;

use crate::error::{CatalogError, Result};

/// Cores bundled with the crate.
const BUILTIN_CORES: &str = include_str!("../data/cores.json");

/// A supplier of core geometry records.
pub trait CoreCatalog {
    /// Look up a core by model name (case-insensitive).
    fn lookup(&self, model: &str) -> Result<CoreSelection>;

    /// All model names, in catalog order.
    fn models(&self) -> Vec<&str>;
}

/// In-memory catalog preserving insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    cores: IndexMap<String, CoreSelection>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The bundled EE/EI/ETD/PQ core set.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_CORES)
    }

    /// Parse a JSON array of core records.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let records: Vec<CoreSelection> = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for core in records {
            catalog.insert(core)?;
        }
        log::debug!("loaded {} cores", catalog.len());
        Ok(catalog)
    }

    /// Load a JSON array of core records from `path`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        log::info!("reading core catalog from {}", path.display());
        Self::from_json_str(&text)
    }

    /// Add a validated core. Model names are unique ignoring case.
    pub fn insert(&mut self, core: CoreSelection) -> Result<()> {
        core.validate(Stage::Electromagnetic)
            .map_err(|source| CatalogError::InvalidCore {
                model: core.model.clone(),
                source,
            })?;
        let key = core.model.to_lowercase();
        if self.cores.contains_key(&key) {
            return Err(CatalogError::DuplicateCore(core.model));
        }
        self.cores.insert(key, core);
        Ok(())
    }

    /// Number of cores.
    pub fn len(&self) -> usize {
        self.cores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }

    /// Iterate over cores in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &CoreSelection> {
        self.cores.values()
    }
}

impl CoreCatalog for MemoryCatalog {
    fn lookup(&self, model: &str) -> Result<CoreSelection> {
        self.cores
            .get(&model.trim().to_lowercase())
            .cloned()
            .ok_or_else(|| CatalogError::UnknownCore(model.to_string()))
    }

    fn models(&self) -> Vec<&str> {
        self.cores.values().map(|c| c.model.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flyback_magnetics::CoreShape;

    fn sample(model: &str) -> CoreSelection {
        CoreSelection {
            model: model.to_string(),
            cross_section_area: 76e-6,
            window_area: 95e-6,
            volume: 5.47e-6,
            mean_turn_length: 52.8e-3,
            path_length: 72e-3,
            permeability: 2000.0,
            bobbin_width: 19.4e-3,
            inductance_factor: None,
            shape: CoreShape::Round { diameter: 9.8e-3 },
        }
    }

    #[test]
    fn test_lookup_ignores_case() {
        let mut catalog = MemoryCatalog::new();
        catalog.insert(sample("ETD29")).unwrap();
        assert_eq!(catalog.lookup("etd29").unwrap().model, "ETD29");
        assert_eq!(catalog.lookup(" Etd29 ").unwrap().model, "ETD29");
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut catalog = MemoryCatalog::new();
        catalog.insert(sample("ETD29")).unwrap();
        let err = catalog.insert(sample("etd29")).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateCore(ref m) if m == "etd29"));
    }

    #[test]
    fn test_invalid_core_rejected() {
        let mut core = sample("BAD");
        core.permeability = -1.0;
        let err = MemoryCatalog::new().insert(core).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidCore { ref model, .. } if model == "BAD"));
        assert!(err.to_string().contains("permeability"), "{}", err);
    }

    #[test]
    fn test_unknown_core() {
        let err = MemoryCatalog::new().lookup("EE99").unwrap_err();
        assert_eq!(err.to_string(), "unknown core model 'EE99'");
    }

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = MemoryCatalog::builtin().unwrap();
        assert!(catalog.len() >= 10);
        let models = catalog.models();
        assert_eq!(models[0], "EE16/8/5");
        assert!(models.contains(&"ETD29"));
        let pq = catalog.lookup("pq20/20").unwrap();
        assert!(pq.inductance_factor.is_some());
    }
}
