//! Parameter definitions and typed values

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Prefix of every dynamically generated spec flag (`--spec.<name>`).
pub const SPEC_FLAG_PREFIX: &str = "spec.";

/// The value types a parameter can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Bool,
    Int,
    String,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::Bool => "bool",
            ParamKind::Int => "int",
            ParamKind::String => "string",
        }
    }

    /// Value a parameter of this kind takes when its definition has no default.
    pub fn zero_value(&self) -> ParamValue {
        match self {
            ParamKind::Bool => ParamValue::Bool(false),
            ParamKind::Int => ParamValue::Int(0),
            ParamKind::String => ParamValue::String(String::new()),
        }
    }
}

impl FromStr for ParamKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(ParamKind::Bool),
            "int" | "integer" => Ok(ParamKind::Int),
            "string" | "str" => Ok(ParamKind::String),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current or default value of a parameter slot.
///
/// `Raw` only appears when a value taken from an upstream file does not fit
/// the parameter's declared kind. It is kept as-is and never compares equal
/// to a typed default.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    String(String),
    Raw(Value),
}

impl ParamValue {
    /// Kind of this value, `None` for untyped file values.
    pub fn kind(&self) -> Option<ParamKind> {
        match self {
            ParamValue::Bool(_) => Some(ParamKind::Bool),
            ParamValue::Int(_) => Some(ParamKind::Int),
            ParamValue::String(_) => Some(ParamKind::String),
            ParamValue::Raw(_) => None,
        }
    }

    /// Interpret a JSON/YAML value as a value of `kind`, if it fits.
    pub fn from_json(kind: ParamKind, value: &Value) -> Option<Self> {
        match kind {
            ParamKind::Bool => value.as_bool().map(ParamValue::Bool),
            ParamKind::Int => value.as_i64().map(ParamValue::Int),
            ParamKind::String => value.as_str().map(|s| ParamValue::String(s.to_string())),
        }
    }

    /// Parse command-line text as a value of `kind`.
    pub fn parse_flag(kind: ParamKind, text: &str) -> Option<Self> {
        match kind {
            ParamKind::Bool => text.parse().ok().map(ParamValue::Bool),
            ParamKind::Int => text.parse().ok().map(ParamValue::Int),
            ParamKind::String => Some(ParamValue::String(text.to_string())),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Int(i) => Value::Number((*i).into()),
            ParamValue::String(s) => Value::String(s.clone()),
            ParamValue::Raw(v) => v.clone(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::String(s) => f.write_str(s),
            ParamValue::Raw(v) => write!(f, "{}", v),
        }
    }
}

/// Parameter definition as written in a config file, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawParamDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub default: Option<Value>,
}

impl RawParamDefinition {
    pub fn new(name: &str, description: &str, kind: &str, default: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            kind: kind.to_string(),
            default: Some(default),
        }
    }
}

/// A validated parameter definition. `default` always matches `kind`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDefinition {
    pub name: String,
    pub description: String,
    pub kind: ParamKind,
    pub default: ParamValue,
}

impl ParamDefinition {
    /// Long flag name this parameter is exposed as.
    pub fn flag_name(&self) -> String {
        format!("{}{}", SPEC_FLAG_PREFIX, self.name)
    }
}

impl TryFrom<RawParamDefinition> for ParamDefinition {
    type Error = RegistryError;

    fn try_from(raw: RawParamDefinition) -> Result<Self, Self::Error> {
        let kind = raw
            .kind
            .parse::<ParamKind>()
            .map_err(|kind| RegistryError::UnknownParamKind { param: raw.name.clone(), kind })?;

        let default = match raw.default {
            None | Some(Value::Null) => kind.zero_value(),
            Some(ref value) => ParamValue::from_json(kind, value).ok_or_else(|| {
                RegistryError::DefaultTypeMismatch {
                    param: raw.name.clone(),
                    kind: kind.to_string(),
                }
            })?,
        };

        Ok(Self { name: raw.name, description: raw.description, kind, default })
    }
}

/// Definitions every registry starts with.
pub fn builtin_definitions() -> Vec<(&'static str, Vec<RawParamDefinition>)> {
    vec![
        (
            "aws",
            vec![
                RawParamDefinition::new("region", "aws region", "string", Value::from("us-east-1")),
                RawParamDefinition::new("secret", "aws secret reference", "string", Value::from("")),
            ],
        ),
        (
            "kubernetes",
            vec![
                RawParamDefinition::new("servicename", "k8s service name", "string", Value::from("")),
                RawParamDefinition::new("serviceport", "k8s service port", "int", Value::from(0)),
            ],
        ),
    ]
}
