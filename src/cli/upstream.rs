//! Upstream command implementation

use anyhow::{Context, Result};
use clap::{ArgMatches, Args, Subcommand};
use std::fs;
use std::io::{self, Write};

use crate::config::{load_upstream_file, merge_cli_with_config, CliConfig, CliOverrides, Settings};
use crate::domain::{GlobalParams, UpstreamParams};
use crate::error::UpstreamError;
use crate::executor::UpstreamExecutor;
use crate::params::ParameterRegistry;
use crate::storage::SqliteStorage;

#[derive(Subcommand)]
pub enum UpstreamCommand {
    /// Create an upstream
    Create(UpstreamArgs),

    /// Update an existing upstream
    Update(UpstreamArgs),

    /// Delete an upstream
    Delete(UpstreamArgs),

    /// List upstreams, or show a single one with --name
    Get(UpstreamArgs),

    /// Print upstreams as JSON
    Describe(UpstreamArgs),

    /// List upstream types and their spec parameters
    Types,
}

#[derive(Args, Debug, Clone, Default)]
pub struct UpstreamArgs {
    /// Upstream name
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Upstream type (see `proxyctl upstream types`)
    #[arg(long = "type", value_name = "TYPE")]
    pub upstream_type: Option<String>,
}

pub fn run(
    command: UpstreamCommand,
    matches: Option<&ArgMatches>,
    overrides: CliOverrides,
    config: &CliConfig,
    registry: &mut ParameterRegistry,
) -> Result<()> {
    let args = match command {
        UpstreamCommand::Types => return print_types(registry, &mut io::stdout().lock()),
        UpstreamCommand::Create(ref args)
        | UpstreamCommand::Update(ref args)
        | UpstreamCommand::Delete(ref args)
        | UpstreamCommand::Get(ref args)
        | UpstreamCommand::Describe(ref args) => args.clone(),
    };

    let settings = merge_cli_with_config(overrides, config)?;
    let params = resolve_params(args, matches, &settings.global, registry)?;
    tracing::debug!(name = %params.name, upstream_type = %params.upstream_type, "resolved upstream params");

    let store = open_store(&settings)?;
    let mut executor = UpstreamExecutor::new(store, io::stdout().lock());
    let global = &settings.global;
    match command {
        UpstreamCommand::Create(_) => executor.run_create(global, &params)?,
        UpstreamCommand::Update(_) => executor.run_update(global, &params)?,
        UpstreamCommand::Delete(_) => executor.run_delete(global, &params)?,
        UpstreamCommand::Get(_) => executor.run_get(&params)?,
        UpstreamCommand::Describe(_) => executor.run_describe(&params)?,
        UpstreamCommand::Types => {}
    }
    Ok(())
}

/// Combine flags, the optional upstream file and the registry into the
/// parameters of this invocation.
///
/// Flags are applied first so that the file only fills in values the user
/// left at their defaults. A type that is not registered is an error.
pub fn resolve_params(
    args: UpstreamArgs,
    matches: Option<&ArgMatches>,
    global: &GlobalParams,
    registry: &mut ParameterRegistry,
) -> Result<UpstreamParams> {
    if let Some(matches) = matches {
        registry.apply_matches(matches);
    }

    let mut params = UpstreamParams {
        name: args.name.unwrap_or_default(),
        upstream_type: args.upstream_type.unwrap_or_default(),
        ..Default::default()
    };

    if let Some(path) = &global.file_name {
        let file = load_upstream_file(path)?;
        file.merge_into(&mut params, registry).map_err(UpstreamError::Registry)?;
    }

    if !params.upstream_type.is_empty() {
        params.spec = registry.resolve(&params.upstream_type).map_err(UpstreamError::Registry)?;
    }
    Ok(params)
}

fn open_store(settings: &Settings) -> Result<SqliteStorage> {
    if let Some(parent) = settings.database.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    SqliteStorage::open(&settings.database, &settings.global.namespace).with_context(|| {
        format!("Failed to open upstream store at {}", settings.database.display())
    })
}

fn print_types(registry: &ParameterRegistry, out: &mut impl Write) -> Result<()> {
    for upstream_type in registry.types() {
        writeln!(out, "{}", upstream_type)?;
        for def in registry.definitions(upstream_type).unwrap_or_default() {
            writeln!(
                out,
                "  --{} <{}>  {} [default: {:?}]",
                def.flag_name(),
                def.kind,
                def.description,
                def.default.to_string()
            )?;
        }
    }
    Ok(())
}
