//! Shared CLI utilities.

use std::ffi::OsString;
use std::path::PathBuf;

/// Flags that must be known before the full command tree can be built.
#[derive(Debug, Default, PartialEq)]
pub struct EarlyArgs {
    pub verbose: bool,
    pub config: Option<PathBuf>,
}

/// Pick `--verbose` and `--config` out of the raw arguments.
///
/// The `--spec.*` flags depend on the upstream types declared in the config
/// file, so the config has to be located before clap parses anything.
/// Scanning stops at `--`.
pub fn scan_early_args(args: &[OsString]) -> EarlyArgs {
    let mut early = EarlyArgs::default();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let Some(arg) = arg.to_str() else {
            continue;
        };
        match arg {
            "--" => break,
            "-v" | "--verbose" => early.verbose = true,
            "--config" => early.config = iter.next().map(PathBuf::from),
            _ => {
                if let Some(path) = arg.strip_prefix("--config=") {
                    early.config = Some(PathBuf::from(path));
                } else if let Some(cluster) = arg.strip_prefix('-').filter(|c| !c.starts_with('-')) {
                    // Short flags after one that takes a value are that value.
                    for c in cluster.chars() {
                        match c {
                            'v' => early.verbose = true,
                            'n' | 'w' | 'f' => break,
                            _ => {}
                        }
                    }
                }
            }
        }
    }
    early
}
