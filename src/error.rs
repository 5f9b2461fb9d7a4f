//! Typed errors for the registry, storage and upstream commands.

use thiserror::Error;

/// Errors raised while registering or resolving upstream parameters.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("upstream type name must not be empty")]
    EmptyTypeName,

    #[error("Unknown parameter type: {kind} (parameter '{param}')")]
    UnknownParamKind { param: String, kind: String },

    #[error("default value of parameter '{param}' does not match its type {kind}")]
    DefaultTypeMismatch { param: String, kind: String },

    #[error("parameter '{param}' is already defined for upstream type '{upstream_type}'")]
    DuplicateParam { upstream_type: String, param: String },

    #[error("upstream type '{upstream_type}' has no parameter '{param}'")]
    UnknownParam { upstream_type: String, param: String },

    #[error("value for parameter '{param}' must be of type {kind}")]
    ValueTypeMismatch { param: String, kind: String },

    #[error("Invalid Upstream Type: {0}")]
    InvalidType(String),
}

/// Errors surfaced by a [`crate::storage::Storage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upstream '{0}' already exists")]
    AlreadyExists(String),

    #[error("upstream '{0}' not found")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(#[from] rusqlite::Error),

    #[error("failed to encode upstream spec: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Errors raised by the upstream executor before or while talking to storage.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Name of the Upstream must be provided")]
    MissingName,

    #[error("Both Name and Type of the Upstream must be provided")]
    MissingNameOrType,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to write command output: {0}")]
    Output(#[from] std::io::Error),
}
