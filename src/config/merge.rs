//! Merge command-line values with the config file.

use super::CliConfig;
use crate::domain::{GlobalParams, DEFAULT_NAMESPACE};
use crate::params::ParameterRegistry;
use anyhow::Result;
use std::path::PathBuf;

/// Global values given on the command line (or through their env vars).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub namespace: Option<String>,
    pub wait: Option<u64>,
    pub database: Option<PathBuf>,
    pub file_name: Option<PathBuf>,
}

/// Effective settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub global: GlobalParams,
    pub database: PathBuf,
}

pub fn merge_cli_with_config(cli: CliOverrides, config: &CliConfig) -> Result<Settings> {
    let namespace = cli
        .namespace
        .or_else(|| config.namespace.clone())
        .filter(|ns| !ns.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

    let database = match cli.database.or_else(|| config.database.clone()) {
        Some(path) => path,
        None => default_database_path().ok_or_else(|| {
            anyhow::anyhow!("Cannot determine a data directory for the upstream store; pass --db")
        })?,
    };

    Ok(Settings {
        global: GlobalParams {
            file_name: cli.file_name,
            wait_secs: cli.wait.or(config.wait).unwrap_or(0),
            namespace,
        },
        database,
    })
}

/// Registry with the built-in types plus the ones declared in `config`.
///
/// A config type reusing a built-in name is ignored with a warning.
pub fn build_registry(config: &CliConfig) -> ParameterRegistry {
    let mut registry = ParameterRegistry::with_builtin_types();
    for (upstream_type, defs) in &config.upstream_types {
        if registry.is_type_valid(upstream_type) {
            tracing::warn!("Upstream type '{}' is already defined; ignoring config entry", upstream_type);
            continue;
        }
        if let Err(e) = registry.register(upstream_type, defs.iter().cloned()) {
            tracing::warn!("Skipping upstream type from config: {}", e);
        }
    }
    registry
}

pub fn default_database_path() -> Option<PathBuf> {
    data_root_dir().map(|dir| dir.join("proxyctl").join("store.sqlite"))
}

fn data_root_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("LOCALAPPDATA").map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        if let Some(xdg) = std::env::var_os("XDG_DATA_HOME") {
            return Some(PathBuf::from(xdg));
        }
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("share"))
    }
}
