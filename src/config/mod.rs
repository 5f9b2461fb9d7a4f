//! Configuration loading and merging
//!
//! Handles the CLI config file, the per-command upstream file and the
//! precedence between them and the command line (CLI > Env > File > Defaults).

use crate::params::RawParamDefinition;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub mod loader;
pub mod merge;
pub mod upstream_file;

pub use loader::{default_search_dirs, load_config};
pub use merge::{build_registry, merge_cli_with_config, CliOverrides, Settings};
pub use upstream_file::{load_upstream_file, UpstreamFile};

/// Contents of a `proxyctl.yaml` / `proxyctl.toml` config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub namespace: Option<String>,
    /// Seconds to wait for a change to show up in storage.
    pub wait: Option<u64>,
    /// Path of the SQLite upstream store.
    pub database: Option<PathBuf>,
    /// Extra upstream types, registered after the built-in ones.
    pub upstream_types: BTreeMap<String, Vec<RawParamDefinition>>,
}
