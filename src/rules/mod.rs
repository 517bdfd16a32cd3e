//! Architecture rules
//!
//! Architectural Principle: Strategy Pattern - each layering policy is one Rule implementation
//! - Rules are pure functions of a SourceFile's facts and their own configuration
//! - A rule returns at most one violation per file
//! - Built-in defaults live inside each rule, configuration only overrides them

pub mod clean;
pub mod custom;
pub mod ddd;
pub mod hexagonal;
pub mod registry;

use crate::config::{merge_yaml, GuardianConfig};
use crate::domain::violations::{GuardianResult, Violation};
use crate::patterns::SourceFile;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::PathBuf;

pub use registry::RuleRegistry;

/// Shared, read-only inputs available to every rule during a run
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// Effective configuration of the run
    pub config: &'a GuardianConfig,
    /// Every file of the run, in discovery order
    pub files: &'a [PathBuf],
}

impl<'a> RuleContext<'a> {
    pub fn new(config: &'a GuardianConfig, files: &'a [PathBuf]) -> Self {
        Self { config, files }
    }
}

/// A single architecture policy
pub trait Rule: Send + Sync {
    /// Dotted identifier, `<family>.<policy>`
    fn name(&self) -> &str;

    /// One-line human description
    fn description(&self) -> &str;

    /// Replace the rule's configuration wholesale
    fn configure(&mut self, config: RuleConfig);

    /// Self check run after configuration
    fn validate(&self) -> GuardianResult<()> {
        Ok(())
    }

    /// Evaluate one file; never fails
    fn check(&self, file: &SourceFile, ctx: &RuleContext<'_>) -> Option<Violation>;
}

/// Option map handed to a single rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleConfig(Mapping);

impl RuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// String list under `key`; a single string counts as a one-element list
    pub fn string_list(&self, key: &str) -> Option<Vec<String>> {
        match self.get(key)? {
            Value::Sequence(items) => Some(items.iter().filter_map(scalar_to_string).collect()),
            Value::Null => Some(Vec::new()),
            other => scalar_to_string(other).map(|s| vec![s]),
        }
    }

    /// String list under `key`, or `default` when the key is absent
    pub fn list_or(&self, key: &str, default: &[&str]) -> Vec<String> {
        self.string_list(key)
            .unwrap_or_else(|| default.iter().map(|s| s.to_string()).collect())
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Boolean under `key`, or `default` when absent or not a boolean
    pub fn flag_or(&self, key: &str, default: bool) -> bool {
        self.flag(key).unwrap_or(default)
    }

    /// Nested map under `key`, preserving the configured key order
    pub fn mapping(&self, key: &str) -> Option<&Mapping> {
        self.get(key).and_then(Value::as_mapping)
    }

    pub fn with_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(Value::from(key), value.into());
        self
    }

    pub fn with_list(self, key: &str, items: &[&str]) -> Self {
        let items: Vec<Value> = items.iter().map(|s| Value::from(*s)).collect();
        self.with_value(key, Value::Sequence(items))
    }

    pub fn with_flag(self, key: &str, value: bool) -> Self {
        self.with_value(key, Value::Bool(value))
    }

    /// This configuration with `overrides` deep-merged on top
    pub fn merged(&self, overrides: &RuleConfig) -> RuleConfig {
        let mut base = Value::Mapping(self.0.clone());
        merge_yaml(&mut base, Value::Mapping(overrides.0.clone()));
        match base {
            Value::Mapping(map) => RuleConfig(map),
            _ => self.clone(),
        }
    }
}

impl From<Mapping> for RuleConfig {
    fn from(map: Mapping) -> Self {
        Self(map)
    }
}

pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Substring, case-sensitive layer membership: true when `namespace`
/// contains any of `patterns`
pub fn namespace_matches_any(namespace: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| namespace.contains(pattern.as_str()))
}

/// Violation listing forbidden dependencies, carrying both the forbidden
/// subset and every extracted dependency in its details
pub fn forbidden_dependency_violation(
    rule_name: &str,
    file: &SourceFile,
    summary: &str,
    forbidden: Vec<String>,
    severity: i64,
) -> Violation {
    let message = format!("{summary} Found dependencies: {}", forbidden.join(", "));
    Violation::new(file.path(), message, rule_name, severity)
        .with_detail("forbidden_dependencies", forbidden)
        .with_detail("all_dependencies", file.dependencies().as_slice().to_vec())
}

/// Whether any `implements` entry of the file's class resolves into a layer.
///
/// `None` when the class declares no `implements` clause; unresolvable
/// entries never count as members.
pub fn implements_from_layer(file: &SourceFile, layer_patterns: &[String]) -> Option<bool> {
    let entries = file.implemented_interfaces()?;
    Some(entries.iter().any(|entry| {
        file.resolve_interface(entry)
            .map_or(false, |full| namespace_matches_any(full, layer_patterns))
    }))
}

/// Split a dotted rule name into its family and policy parts
pub fn split_rule_name(name: &str) -> Option<(&str, &str)> {
    let (family, policy) = name.split_once('.')?;
    let valid = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    };
    (valid(family) && valid(policy)).then_some((family, policy))
}
