//! Command-line interface for proxyctl
//!
//! The static part of the command tree is derived with clap; the
//! `--spec.<name>` flags of `upstream create` and `upstream update` are added
//! at runtime from the parameter registry.

use anyhow::Result;
use clap::{ArgMatches, Args, Command, CommandFactory, FromArgMatches, Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{build_registry, default_search_dirs, load_config, CliOverrides};
use crate::params::ParameterRegistry;

mod completions;
mod upstream;
mod utils;

/// Manage upstreams of a service proxy
#[derive(Parser)]
#[command(name = "proxyctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: proxyctl.yaml in the working or user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// SQLite database holding upstreams
    #[arg(long, global = true, value_name = "FILE", env = "PROXYCTL_DB")]
    db: Option<PathBuf>,

    /// Namespace to operate in
    #[arg(short, long, global = true, value_name = "NAME", env = "PROXYCTL_NAMESPACE")]
    namespace: Option<String>,

    /// Seconds to wait for a change to show up in storage (0 = don't wait)
    #[arg(short, long, global = true, value_name = "SECONDS")]
    wait: Option<u64>,

    /// YAML file with name, type and spec of the upstream
    #[arg(short = 'f', long, global = true, value_name = "FILE")]
    filename: Option<PathBuf>,
}

impl GlobalArgs {
    fn into_overrides(self) -> CliOverrides {
        CliOverrides {
            namespace: self.namespace,
            wait: self.wait,
            database: self.db,
            file_name: self.filename,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create, update, delete and inspect upstreams
    #[command(subcommand)]
    Upstream(upstream::UpstreamCommand),

    /// Print shell completions
    Completions(completions::CompletionsArgs),
}

pub fn run() -> Result<()> {
    let args: Vec<OsString> = std::env::args_os().collect();
    let early = utils::scan_early_args(&args);

    // Wire verbose flag to the tracing log level.
    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if early.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let config = load_config(&default_search_dirs(), early.config.as_deref())?;
    let mut registry = build_registry(&config);

    let matches = build_command(&registry).get_matches_from(args);
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    match cli.command {
        Commands::Upstream(command) => {
            let leaf = leaf_matches(&matches);
            upstream::run(command, leaf, cli.global.into_overrides(), &config, &mut registry)
        }
        Commands::Completions(args) => completions::run(args, build_command(&registry)),
    }
}

/// Full command tree, with the registry's parameters bound to the
/// commands that accept a spec.
pub fn build_command(registry: &ParameterRegistry) -> Command {
    Cli::command().mut_subcommand("upstream", |upstream| {
        upstream
            .mut_subcommand("create", |cmd| registry.bind_flags(cmd))
            .mut_subcommand("update", |cmd| registry.bind_flags(cmd))
    })
}

/// Matches of the innermost subcommand (`create`, `get`, ...).
fn leaf_matches(matches: &ArgMatches) -> Option<&ArgMatches> {
    let mut current = matches.subcommand()?.1;
    while let Some((_, sub)) = current.subcommand() {
        current = sub;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_tree_is_valid() {
        build_command(&ParameterRegistry::with_builtin_types()).debug_assert();
    }

    #[test]
    fn spec_flags_only_on_create_and_update() {
        let cmd = build_command(&ParameterRegistry::with_builtin_types());
        let upstream = cmd.find_subcommand("upstream").expect("upstream");
        let has_region = |name: &str| {
            upstream
                .find_subcommand(name)
                .expect("subcommand")
                .get_arguments()
                .any(|a| a.get_id() == "spec.region")
        };
        assert!(has_region("create"));
        assert!(has_region("update"));
        assert!(!has_region("delete"));
        assert!(!has_region("get"));
    }

    #[test]
    fn leaf_matches_reaches_innermost_command() {
        let mut registry = ParameterRegistry::with_builtin_types();
        let matches = build_command(&registry)
            .try_get_matches_from(["proxyctl", "upstream", "create", "--spec.serviceport", "9090"])
            .expect("parse");
        let leaf = leaf_matches(&matches).expect("leaf");
        assert_eq!(registry.apply_matches(leaf), 1);
    }
}
