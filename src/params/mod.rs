//! Dynamic per-type upstream parameters
//!
//! Definitions declare what parameters an upstream type has; the registry
//! turns them into `--spec.<name>` flags and resolves the final values with
//! the precedence flag > upstream file > default.

pub mod definition;
pub mod registry;

pub use definition::{builtin_definitions, ParamDefinition, ParamKind, ParamValue, RawParamDefinition};
pub use registry::ParameterRegistry;
