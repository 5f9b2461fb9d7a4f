//! proxyctl: manage upstreams of a service proxy from the command line.

use anyhow::Result;

fn main() -> Result<()> {
    proxyctl::cli::run()
}
