//! Shell completion generation.

use anyhow::Result;
use clap::{Args, Command};
use clap_complete::Shell;
use std::io;

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Print completions for `cmd`, which already carries the `--spec.*` flags.
pub fn run(args: CompletionsArgs, mut cmd: Command) -> Result<()> {
    let name = cmd.get_name().to_string();
    clap_complete::generate(args.shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}
