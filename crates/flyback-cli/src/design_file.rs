//! Design file loading and core resolution.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use flyback_catalog::CoreCatalog;
use flyback_core::DesignInputs;
use flyback_magnetics::CoreSelection;
use serde::{Deserialize, Serialize};

/// Core named by model or given in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoreSpec {
    Model(String),
    Custom(CoreSelection),
}

/// A JSON design file: the design inputs plus an optional core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignFile {
    #[serde(flatten)]
    pub inputs: DesignInputs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core: Option<CoreSpec>,
}

impl DesignFile {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading design file {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parsing design file {}", path.display()))
    }

    /// The reference design on a catalog core.
    pub fn template() -> Self {
        Self {
            inputs: DesignInputs::default(),
            core: Some(CoreSpec::Model("EE25/13/7".to_string())),
        }
    }

    /// Resolve the core: `model_override` wins over the file's own entry.
    pub fn resolve_core(
        &self,
        model_override: Option<&str>,
        catalog: &dyn CoreCatalog,
    ) -> Result<CoreSelection> {
        let spec = match model_override {
            Some(model) => CoreSpec::Model(model.to_string()),
            None => self.core.clone().ok_or_else(|| {
                anyhow!("no core selected; pass --core or set \"core\" in the design file")
            })?,
        };
        match spec {
            CoreSpec::Model(model) => Ok(catalog.lookup(&model)?),
            CoreSpec::Custom(core) => Ok(core),
        }
    }
}
