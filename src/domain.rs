//! Core data types shared by the CLI, executor and storage.

use crate::params::ParamValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const DEFAULT_NAMESPACE: &str = "default";

/// A named backend target the proxy can route traffic to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upstream {
    pub name: String,
    #[serde(rename = "type")]
    pub upstream_type: String,
    #[serde(default)]
    pub spec: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Upstream {
    pub fn new(name: &str, upstream_type: &str) -> Self {
        Self {
            name: name.to_string(),
            upstream_type: upstream_type.to_string(),
            spec: BTreeMap::new(),
            metadata: None,
        }
    }
}

/// Bookkeeping filled in by storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub namespace: String,
    pub resource_version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upstream parameters gathered for one command invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamParams {
    pub name: String,
    pub upstream_type: String,
    pub spec: BTreeMap<String, ParamValue>,
}

impl UpstreamParams {
    pub fn to_upstream(&self) -> Upstream {
        Upstream {
            name: self.name.clone(),
            upstream_type: self.upstream_type.clone(),
            spec: self.spec.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            metadata: None,
        }
    }
}

/// Settings shared by every upstream command.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalParams {
    pub file_name: Option<PathBuf>,
    pub wait_secs: u64,
    pub namespace: String,
}

impl Default for GlobalParams {
    fn default() -> Self {
        Self { file_name: None, wait_secs: 0, namespace: DEFAULT_NAMESPACE.to_string() }
    }
}
