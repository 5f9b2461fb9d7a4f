//! Config file loading

use super::CliConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const CANDIDATES: [&str; 6] = [
    "proxyctl.yaml",
    ".proxyctl.yaml",
    "proxyctl.yml",
    ".proxyctl.yml",
    "proxyctl.toml",
    ".proxyctl.toml",
];

/// Load the CLI config.
///
/// An explicit `config_path` must exist and parse. Otherwise the first
/// candidate file found in `search_dirs` is used; if that one is broken it
/// is reported with a warning and defaults are returned.
pub fn load_config(search_dirs: &[PathBuf], config_path: Option<&Path>) -> Result<CliConfig> {
    let config_path_provided = config_path.is_some();

    let discovered = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config(search_dirs),
    };

    let Some(config_file) = discovered else {
        return Ok(CliConfig::default());
    };

    let parsed = fs::read_to_string(&config_file)
        .with_context(|| format!("Failed reading config file: {}", config_file.display()))
        .and_then(|content| parse_config(&content, &config_file));

    match parsed {
        Ok(cfg) => {
            tracing::debug!(path = %config_file.display(), "loaded config");
            Ok(cfg)
        }
        Err(e) if !config_path_provided => {
            tracing::warn!(
                "Failed to load auto-discovered config {}: {:#}",
                config_file.display(),
                e
            );
            Ok(CliConfig::default())
        }
        Err(e) => Err(e),
    }
}

fn parse_config(content: &str, config_file: &Path) -> Result<CliConfig> {
    let ext = config_file.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "toml" => parse_toml_config(content, config_file),
        "yaml" | "yml" => parse_yaml_config(content, config_file),
        other => anyhow::bail!(
            "Unsupported config extension '.{}' for file {}",
            other,
            config_file.display()
        ),
    }
}

/// Parse TOML config, accepting settings at the top level or under `[proxyctl]`.
fn parse_toml_config(content: &str, config_file: &Path) -> Result<CliConfig> {
    let raw: toml::Value = toml::from_str(content)
        .with_context(|| format!("Invalid TOML syntax: {}", config_file.display()))?;

    let config_val = match raw.get("proxyctl") {
        Some(nested) => nested.clone(),
        None => raw,
    };

    config_val.try_into().with_context(|| format!("Invalid TOML config: {}", config_file.display()))
}

/// Parse YAML config, accepting settings at the top level or under `proxyctl:`.
fn parse_yaml_config(content: &str, config_file: &Path) -> Result<CliConfig> {
    if content.trim().is_empty() {
        return Ok(CliConfig::default());
    }

    let raw: serde_yaml::Value = serde_yaml::from_str(content)
        .with_context(|| format!("Invalid YAML syntax: {}", config_file.display()))?;

    let config_val = match raw.get("proxyctl") {
        Some(nested) => nested.clone(),
        None => raw,
    };

    serde_yaml::from_value(config_val)
        .with_context(|| format!("Invalid YAML config: {}", config_file.display()))
}

fn discover_config(search_dirs: &[PathBuf]) -> Option<PathBuf> {
    search_dirs
        .iter()
        .flat_map(|dir| CANDIDATES.iter().map(move |candidate| dir.join(candidate)))
        .find(|path| path.is_file())
}

/// Directories searched for a config file: the working directory, then the
/// user config directory (`$XDG_CONFIG_HOME/proxyctl` or `~/.config/proxyctl`).
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(config_home) = config_root_dir() {
        dirs.push(config_home.join("proxyctl"));
    }
    dirs
}

fn config_root_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg));
        }
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    }
}
