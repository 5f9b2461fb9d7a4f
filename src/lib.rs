//! proxyctl: command-line client for upstreams in a service-proxy control plane
//!
//! Upstreams are named backend targets with a type-specific spec. The
//! parameters each type accepts are declared in a [`params::ParameterRegistry`],
//! exposed as `--spec.<name>` flags, and merged with an optional YAML file
//! before the upstream is written to [`storage`].

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod params;
pub mod storage;
