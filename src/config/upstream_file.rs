//! Upstream definition files passed with `--filename`.

use crate::domain::UpstreamParams;
use crate::error::RegistryError;
use crate::params::ParameterRegistry;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// YAML document with optional `name`, `type` and `spec`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpstreamFile {
    pub name: String,
    #[serde(rename = "type")]
    pub upstream_type: String,
    pub spec: BTreeMap<String, Value>,
}

pub fn load_upstream_file(path: &Path) -> Result<UpstreamFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed reading upstream file: {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(UpstreamFile::default());
    }
    serde_yaml::from_str(&content)
        .with_context(|| format!("Invalid upstream file: {}", path.display()))
}

impl UpstreamFile {
    /// Fill `params` from this file wherever the command line left a gap.
    ///
    /// Name and type are taken only when empty. Spec values go through
    /// [`ParameterRegistry::merge_from_file`] for the resulting type; an
    /// unknown type is left for the caller to reject.
    pub fn merge_into(
        &self,
        params: &mut UpstreamParams,
        registry: &mut ParameterRegistry,
    ) -> Result<(), RegistryError> {
        if params.name.is_empty() {
            params.name = self.name.clone();
        }
        if params.upstream_type.is_empty() {
            params.upstream_type = self.upstream_type.clone();
        }

        if params.upstream_type.is_empty() || !registry.is_type_valid(&params.upstream_type) {
            return Ok(());
        }

        let merged = registry.merge_from_file(&params.upstream_type, &self.spec)?;
        if !merged.is_empty() {
            tracing::debug!(params = ?merged, "spec values taken from upstream file");
        }
        Ok(())
    }
}
