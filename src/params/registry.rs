//! Registry of per-type upstream parameters.
//!
//! Holds, for every upstream type, the declared parameter definitions, the
//! live value of each parameter and a snapshot of its default. A live value
//! that still equals its default is treated as "not set by the user", which
//! is what lets values from an upstream file fill it in later.

use super::definition::{builtin_definitions, ParamDefinition, ParamKind, ParamValue, RawParamDefinition};
use crate::error::RegistryError;
use clap::parser::ValueSource;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde_json::Value;
use std::collections::BTreeMap;

type SlotMap = BTreeMap<String, ParamValue>;

#[derive(Debug, Default)]
pub struct ParameterRegistry {
    definitions: BTreeMap<String, Vec<ParamDefinition>>,
    live: BTreeMap<String, SlotMap>,
    defaults: BTreeMap<String, SlotMap>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the `aws` and `kubernetes` types.
    pub fn with_builtin_types() -> Self {
        let mut registry = Self::new();
        for (upstream_type, defs) in builtin_definitions() {
            // Built-in type names are never empty.
            let _ = registry.register(upstream_type, defs);
        }
        registry
    }

    /// Register parameter definitions for `upstream_type`.
    ///
    /// Each definition gets a live slot initialized to its default. A bad
    /// definition is logged and skipped without affecting the others.
    /// Returns the number of definitions actually registered.
    pub fn register<I>(&mut self, upstream_type: &str, defs: I) -> Result<usize, RegistryError>
    where
        I: IntoIterator<Item = RawParamDefinition>,
    {
        if upstream_type.trim().is_empty() {
            return Err(RegistryError::EmptyTypeName);
        }

        let declared = self.definitions.entry(upstream_type.to_string()).or_default();
        let live = self.live.entry(upstream_type.to_string()).or_default();
        let defaults = self.defaults.entry(upstream_type.to_string()).or_default();

        let mut registered = 0;
        for raw in defs {
            let def = match ParamDefinition::try_from(raw) {
                Ok(def) => def,
                Err(e) => {
                    tracing::warn!(upstream_type, "{}", e);
                    continue;
                }
            };
            if declared.iter().any(|d| d.name == def.name) {
                let e = RegistryError::DuplicateParam {
                    upstream_type: upstream_type.to_string(),
                    param: def.name,
                };
                tracing::warn!("{}", e);
                continue;
            }

            live.insert(def.name.clone(), def.default.clone());
            defaults.insert(def.name.clone(), def.default.clone());
            tracing::debug!(upstream_type, param = %def.name, kind = %def.kind, "registered parameter");
            declared.push(def);
            registered += 1;
        }

        Ok(registered)
    }

    pub fn is_type_valid(&self, candidate: &str) -> bool {
        self.definitions.contains_key(candidate)
    }

    /// Registered type names in sorted order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Definitions of `upstream_type` in declaration order.
    pub fn definitions(&self, upstream_type: &str) -> Option<&[ParamDefinition]> {
        self.definitions.get(upstream_type).map(Vec::as_slice)
    }

    pub fn value(&self, upstream_type: &str, param: &str) -> Option<&ParamValue> {
        self.live.get(upstream_type)?.get(param)
    }

    pub fn default_value(&self, upstream_type: &str, param: &str) -> Option<&ParamValue> {
        self.defaults.get(upstream_type)?.get(param)
    }

    /// Whether the live value differs from the recorded default.
    ///
    /// A value explicitly set to its default is indistinguishable from an
    /// untouched one and reports `false`.
    pub fn is_overridden(&self, upstream_type: &str, param: &str) -> bool {
        match (self.value(upstream_type, param), self.default_value(upstream_type, param)) {
            (Some(current), Some(default)) => current != default,
            _ => false,
        }
    }

    /// Expose every registered parameter of every type as `--spec.<name>` on `cmd`.
    ///
    /// A name declared by several types becomes one flag shared by all of them.
    pub fn bind_flags(&self, cmd: Command) -> Command {
        let mut flags: Vec<(String, Vec<(&str, &ParamDefinition)>)> = Vec::new();
        for (upstream_type, defs) in &self.definitions {
            for def in defs {
                let id = def.flag_name();
                match flags.iter_mut().find(|(known, _)| *known == id) {
                    Some((_, shared)) => shared.push((upstream_type.as_str(), def)),
                    None => flags.push((id, vec![(upstream_type.as_str(), def)])),
                }
            }
        }
        flags.iter().fold(cmd, |cmd, (_, defs)| bind_flag(cmd, defs))
    }

    /// Expose the parameters of a single type as `--spec.<name>` on `cmd`.
    pub fn bind_type_flags(&self, upstream_type: &str, cmd: Command) -> Command {
        match self.definitions.get(upstream_type) {
            Some(defs) => defs.iter().fold(cmd, |cmd, def| bind_flag(cmd, &[(upstream_type, def)])),
            None => cmd,
        }
    }

    /// Copy user-supplied `--spec.*` values from parsed flags into the live slots.
    ///
    /// Flags left at their clap default are not copied. Parameters sharing a
    /// name across types share one flag, so every matching slot is written;
    /// a type whose kind cannot read the given text keeps its value.
    pub fn apply_matches(&mut self, matches: &ArgMatches) -> usize {
        let mut written = 0;
        for (upstream_type, defs) in &self.definitions {
            for def in defs {
                let id = def.flag_name();
                if !matches.ids().any(|known| known.as_str() == id) {
                    continue;
                }
                match matches.value_source(&id) {
                    None | Some(ValueSource::DefaultValue) => continue,
                    Some(_) => {}
                }

                let value = read_flag(matches, &id, def.kind);
                match value {
                    Some(value) => {
                        if let Some(slots) = self.live.get_mut(upstream_type) {
                            slots.insert(def.name.clone(), value);
                            written += 1;
                        }
                    }
                    None => tracing::warn!(
                        upstream_type = %upstream_type,
                        "--{} value cannot be read as {}; keeping the current value",
                        id,
                        def.kind
                    ),
                }
            }
        }
        written
    }

    /// Write `value` into the live slot of `param`.
    pub fn set_value(
        &mut self,
        upstream_type: &str,
        param: &str,
        value: ParamValue,
    ) -> Result<(), RegistryError> {
        let def = self
            .definitions
            .get(upstream_type)
            .ok_or_else(|| RegistryError::InvalidType(upstream_type.to_string()))?
            .iter()
            .find(|d| d.name == param)
            .ok_or_else(|| RegistryError::UnknownParam {
                upstream_type: upstream_type.to_string(),
                param: param.to_string(),
            })?;

        if value.kind() != Some(def.kind) {
            return Err(RegistryError::ValueTypeMismatch {
                param: param.to_string(),
                kind: def.kind.to_string(),
            });
        }

        if let Some(slots) = self.live.get_mut(upstream_type) {
            slots.insert(param.to_string(), value);
        }
        Ok(())
    }

    /// Live parameter values of `upstream_type`, keyed by parameter name.
    pub fn resolve(&self, upstream_type: &str) -> Result<SlotMap, RegistryError> {
        if !self.is_type_valid(upstream_type) {
            return Err(RegistryError::InvalidType(upstream_type.to_string()));
        }
        Ok(self.live.get(upstream_type).cloned().unwrap_or_default())
    }

    /// Fill parameters the user did not override with values from a file spec.
    ///
    /// Only parameters whose live value equals the default are replaced, and
    /// only when the file spec has a key for them. The file value is not
    /// rejected when it does not fit the declared kind; it is stored as
    /// [`ParamValue::Raw`] with a warning. Returns the names that were replaced.
    pub fn merge_from_file(
        &mut self,
        upstream_type: &str,
        file_spec: &BTreeMap<String, Value>,
    ) -> Result<Vec<String>, RegistryError> {
        let defs = self
            .definitions
            .get(upstream_type)
            .ok_or_else(|| RegistryError::InvalidType(upstream_type.to_string()))?;
        if file_spec.is_empty() {
            return Ok(Vec::new());
        }

        let (Some(live), Some(defaults)) =
            (self.live.get_mut(upstream_type), self.defaults.get(upstream_type))
        else {
            return Ok(Vec::new());
        };

        let mut merged = Vec::new();
        for def in defs {
            if live.get(&def.name) != defaults.get(&def.name) {
                tracing::debug!(param = %def.name, "keeping value set on the command line");
                continue;
            }
            let Some(raw) = file_spec.get(&def.name) else {
                continue;
            };

            let value = ParamValue::from_json(def.kind, raw).unwrap_or_else(|| {
                tracing::warn!(
                    upstream_type,
                    param = %def.name,
                    "file value {} is not of type {}; using it unchecked",
                    raw,
                    def.kind
                );
                ParamValue::Raw(raw.clone())
            });
            live.insert(def.name.clone(), value);
            merged.push(def.name.clone());
        }

        Ok(merged)
    }
}

/// Add the `--spec.<name>` flag for `defs`, which all share one name.
///
/// Flags of a single kind get that kind's parser. Mixed kinds are taken as
/// text and converted per type by [`read_flag`]. A default is shown only when
/// one type owns the name.
fn bind_flag(cmd: Command, defs: &[(&str, &ParamDefinition)]) -> Command {
    let Some(&(_, first)) = defs.first() else {
        return cmd;
    };
    let id = first.flag_name();
    if cmd.get_arguments().any(|a| a.get_id().as_str() == id) {
        return cmd;
    }

    let kind = defs.iter().all(|(_, d)| d.kind == first.kind).then_some(first.kind);
    let help = match defs {
        [(_, def)] => def.description.clone(),
        _ => defs
            .iter()
            .map(|(upstream_type, d)| format!("{} ({})", d.description, upstream_type))
            .collect::<Vec<_>>()
            .join("; "),
    };

    let mut arg = Arg::new(id.clone())
        .long(id)
        .help(help)
        .value_name(kind.map_or("value", |k| k.as_str()).to_ascii_uppercase())
        .action(ArgAction::Set);

    arg = match kind {
        Some(ParamKind::Bool) => arg
            .value_parser(value_parser!(bool))
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true"),
        Some(ParamKind::Int) => arg.value_parser(value_parser!(i64)).allow_negative_numbers(true),
        Some(ParamKind::String) => arg.value_parser(value_parser!(String)),
        None if defs.iter().any(|(_, d)| d.kind == ParamKind::Bool) => arg
            .value_parser(value_parser!(String))
            .num_args(0..=1)
            .default_missing_value("true")
            .allow_negative_numbers(true),
        None => arg.value_parser(value_parser!(String)).allow_negative_numbers(true),
    };

    if let [(_, def)] = defs {
        let default = def.default.to_string();
        if !default.is_empty() {
            arg = arg.default_value(default);
        }
    }

    cmd.arg(arg)
}

/// Value of flag `id` as `kind`, whether the flag was bound typed or as text.
fn read_flag(matches: &ArgMatches, id: &str, kind: ParamKind) -> Option<ParamValue> {
    let typed = match kind {
        ParamKind::Bool => matches.try_get_one::<bool>(id).ok().flatten().map(|v| ParamValue::Bool(*v)),
        ParamKind::Int => matches.try_get_one::<i64>(id).ok().flatten().map(|v| ParamValue::Int(*v)),
        ParamKind::String => None,
    };
    typed.or_else(|| {
        let text = matches.try_get_one::<String>(id).ok().flatten()?;
        ParamValue::parse_flag(kind, text)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn file_spec(value: Value) -> BTreeMap<String, Value> {
        serde_json::from_value(value).expect("spec map")
    }

    fn parse(cmd: Command, args: &[&str]) -> ArgMatches {
        cmd.try_get_matches_from(args).expect("valid args")
    }

    #[test]
    fn builtin_types_are_registered() {
        let registry = ParameterRegistry::with_builtin_types();
        assert_eq!(registry.types().collect::<Vec<_>>(), vec!["aws", "kubernetes"]);
        let names: Vec<_> = registry
            .definitions("kubernetes")
            .expect("kubernetes defs")
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["servicename", "serviceport"]);
        assert_eq!(registry.value("aws", "region"), Some(&ParamValue::String("us-east-1".into())));
    }

    #[test]
    fn type_validity_is_set_membership() {
        let mut registry = ParameterRegistry::new();
        registry.register("kubernetes", builtin_definitions()[1].1.clone()).expect("register");
        registry.register("aws", builtin_definitions()[0].1.clone()).expect("register");

        assert!(registry.is_type_valid("aws"));
        assert!(registry.is_type_valid("kubernetes"));
        assert!(!registry.is_type_valid("gcp"));
        assert!(!registry.is_type_valid("AWS"));
        assert!(!registry.is_type_valid(""));
    }

    #[test]
    fn resolve_rejects_unknown_type() {
        let registry = ParameterRegistry::with_builtin_types();
        let err = registry.resolve("gcp").expect_err("gcp is not registered");
        assert_eq!(err.to_string(), "Invalid Upstream Type: gcp");
    }

    #[test]
    fn unknown_kind_skips_only_that_definition() {
        let mut registry = ParameterRegistry::with_builtin_types();
        let registered = registry
            .register(
                "aws",
                vec![
                    RawParamDefinition::new("ratio", "weight", "float", json!(0.5)),
                    RawParamDefinition::new("tls", "use tls", "bool", json!(true)),
                ],
            )
            .expect("register");

        assert_eq!(registered, 1);
        assert!(registry.value("aws", "ratio").is_none());
        assert_eq!(registry.value("aws", "tls"), Some(&ParamValue::Bool(true)));
        assert_eq!(registry.value("aws", "region"), Some(&ParamValue::String("us-east-1".into())));
        assert_eq!(registry.value("kubernetes", "serviceport"), Some(&ParamValue::Int(0)));
    }

    #[test]
    fn duplicate_names_and_empty_type_are_rejected() {
        let mut registry = ParameterRegistry::with_builtin_types();
        let registered = registry
            .register("aws", vec![RawParamDefinition::new("region", "again", "string", json!("x"))])
            .expect("register");
        assert_eq!(registered, 0);
        assert_eq!(registry.default_value("aws", "region"), Some(&ParamValue::String("us-east-1".into())));

        assert!(matches!(registry.register("  ", Vec::new()), Err(RegistryError::EmptyTypeName)));
    }

    #[test]
    fn flags_write_into_live_slots() {
        let mut registry = ParameterRegistry::with_builtin_types();
        let cmd = registry.bind_flags(Command::new("create"));
        let matches =
            parse(cmd, &["create", "--spec.region=ap-south-1", "--spec.serviceport", "8080"]);

        assert_eq!(registry.apply_matches(&matches), 2);
        assert_eq!(registry.value("aws", "region"), Some(&ParamValue::String("ap-south-1".into())));
        assert_eq!(registry.value("kubernetes", "serviceport"), Some(&ParamValue::Int(8080)));
        assert!(registry.is_overridden("aws", "region"));
        assert!(!registry.is_overridden("aws", "secret"));
    }

    #[test]
    fn binding_twice_is_idempotent() {
        let mut once = ParameterRegistry::with_builtin_types();
        let mut twice = ParameterRegistry::with_builtin_types();
        let args = ["create", "--spec.region", "eu-central-1"];

        let cmd_once = once.bind_flags(Command::new("create"));
        let cmd_twice = twice.bind_flags(twice.bind_flags(Command::new("create")));
        assert_eq!(cmd_once.get_arguments().count(), cmd_twice.get_arguments().count());

        let m1 = parse(cmd_once, &args);
        let m2 = parse(cmd_twice, &args);
        once.apply_matches(&m1);
        twice.apply_matches(&m2);
        assert_eq!(once.resolve("aws").expect("aws"), twice.resolve("aws").expect("aws"));
    }

    #[test]
    fn bool_flags_accept_bare_and_explicit_forms() {
        let mut registry = ParameterRegistry::new();
        registry
            .register("static", vec![RawParamDefinition::new("tls", "", "bool", json!(false))])
            .expect("register");

        let matches = parse(registry.bind_flags(Command::new("create")), &["create", "--spec.tls"]);
        registry.apply_matches(&matches);
        assert_eq!(registry.value("static", "tls"), Some(&ParamValue::Bool(true)));

        let matches =
            parse(registry.bind_flags(Command::new("create")), &["create", "--spec.tls=false"]);
        registry.apply_matches(&matches);
        assert_eq!(registry.value("static", "tls"), Some(&ParamValue::Bool(false)));
    }

    #[test]
    fn type_scoped_binding_only_adds_that_type() {
        let registry = ParameterRegistry::with_builtin_types();
        let cmd = registry.bind_type_flags("kubernetes", Command::new("create"));
        let ids: Vec<_> = cmd.get_arguments().map(|a| a.get_id().to_string()).collect();
        assert_eq!(ids, vec!["spec.servicename", "spec.serviceport"]);
    }

    fn with_static_serviceport() -> ParameterRegistry {
        let mut registry = ParameterRegistry::with_builtin_types();
        registry
            .register(
                "static",
                vec![
                    RawParamDefinition::new("serviceport", "named port", "string", json!("http")),
                    RawParamDefinition::new("region", "edge region", "string", json!("")),
                ],
            )
            .expect("register");
        registry
    }

    #[test]
    fn shared_name_with_other_kind_reaches_every_type() {
        let mut registry = with_static_serviceport();
        let matches = parse(
            registry.bind_flags(Command::new("create")),
            &["create", "--spec.serviceport", "grpc"],
        );
        assert_eq!(registry.apply_matches(&matches), 1);
        assert_eq!(registry.value("static", "serviceport"), Some(&ParamValue::String("grpc".into())));
        assert_eq!(registry.value("kubernetes", "serviceport"), Some(&ParamValue::Int(0)));

        let mut registry = with_static_serviceport();
        let matches = parse(
            registry.bind_flags(Command::new("create")),
            &["create", "--spec.serviceport", "8080"],
        );
        assert_eq!(registry.apply_matches(&matches), 2);
        assert_eq!(registry.value("static", "serviceport"), Some(&ParamValue::String("8080".into())));
        assert_eq!(registry.value("kubernetes", "serviceport"), Some(&ParamValue::Int(8080)));
    }

    #[test]
    fn shared_flags_show_no_default() {
        let registry = with_static_serviceport();
        let cmd = registry.bind_flags(Command::new("create"));
        let defaults = |id: &str| {
            cmd.get_arguments()
                .find(|a| a.get_id() == id)
                .expect("bound flag")
                .get_default_values()
                .len()
        };
        assert_eq!(defaults("spec.region"), 0);
        assert_eq!(defaults("spec.serviceport"), 0);
        assert_eq!(defaults("spec.secret"), 0);

        let alone = ParameterRegistry::with_builtin_types().bind_flags(Command::new("create"));
        let region = alone.get_arguments().find(|a| a.get_id() == "spec.region").expect("region");
        assert_eq!(region.get_default_values(), ["us-east-1"]);
    }

    #[test]
    fn file_value_fills_untouched_parameter() {
        let mut registry = ParameterRegistry::with_builtin_types();
        let merged = registry
            .merge_from_file("aws", &file_spec(json!({"region": "eu-west-1"})))
            .expect("merge");

        assert_eq!(merged, vec!["region"]);
        let spec = registry.resolve("aws").expect("aws");
        assert_eq!(spec["region"], ParamValue::String("eu-west-1".into()));
        assert_eq!(spec["secret"], ParamValue::String(String::new()));
    }

    #[test]
    fn flag_value_wins_over_file_value() {
        let mut registry = ParameterRegistry::with_builtin_types();
        registry.set_value("aws", "region", ParamValue::String("ap-south-1".into())).expect("set");
        registry
            .merge_from_file("aws", &file_spec(json!({"region": "eu-west-1", "secret": "s3cr3t"})))
            .expect("merge");

        let spec = registry.resolve("aws").expect("aws");
        assert_eq!(spec["region"], ParamValue::String("ap-south-1".into()));
        assert_eq!(spec["secret"], ParamValue::String("s3cr3t".into()));
    }

    #[test]
    fn flag_set_to_default_is_overwritten_by_file() {
        let mut registry = ParameterRegistry::with_builtin_types();
        let matches = parse(
            registry.bind_flags(Command::new("create")),
            &["create", "--spec.region", "us-east-1"],
        );
        registry.apply_matches(&matches);
        assert!(!registry.is_overridden("aws", "region"));

        registry
            .merge_from_file("aws", &file_spec(json!({"region": "eu-west-1"})))
            .expect("merge");
        assert_eq!(registry.value("aws", "region"), Some(&ParamValue::String("eu-west-1".into())));
    }

    #[test]
    fn missing_file_keys_and_empty_spec_leave_values_alone() {
        let mut registry = ParameterRegistry::with_builtin_types();
        let merged = registry
            .merge_from_file("kubernetes", &file_spec(json!({"region": "eu-west-1"})))
            .expect("merge");
        assert!(merged.is_empty());

        let merged = registry.merge_from_file("kubernetes", &BTreeMap::new()).expect("merge");
        assert!(merged.is_empty());
        assert_eq!(registry.value("kubernetes", "serviceport"), Some(&ParamValue::Int(0)));

        assert!(matches!(
            registry.merge_from_file("gcp", &file_spec(json!({"x": 1}))),
            Err(RegistryError::InvalidType(_))
        ));
    }

    #[test]
    fn mismatched_file_value_is_kept_unchecked() {
        let mut registry = ParameterRegistry::with_builtin_types();
        registry
            .merge_from_file("kubernetes", &file_spec(json!({"serviceport": "http"})))
            .expect("merge");

        assert_eq!(registry.value("kubernetes", "serviceport"), Some(&ParamValue::Raw(json!("http"))));
        assert!(registry.is_overridden("kubernetes", "serviceport"));
    }

    #[test]
    fn set_value_checks_parameter_and_kind() {
        let mut registry = ParameterRegistry::with_builtin_types();
        assert!(matches!(
            registry.set_value("kubernetes", "serviceport", ParamValue::String("80".into())),
            Err(RegistryError::ValueTypeMismatch { .. })
        ));
        assert!(matches!(
            registry.set_value("aws", "zone", ParamValue::String("a".into())),
            Err(RegistryError::UnknownParam { .. })
        ));
        assert!(matches!(
            registry.set_value("gcp", "region", ParamValue::String("a".into())),
            Err(RegistryError::InvalidType(_))
        ));
    }
}
