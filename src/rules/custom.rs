//! Project-specific rules driven entirely by configuration
//!
//! `dependency_rules` and `naming_rules` are keyed by namespace prefix and
//! consulted in the order they appear in the configuration file.

use super::{scalar_to_string, Rule, RuleConfig, RuleContext};
use crate::domain::violations::{GuardianError, GuardianResult, Violation};
use crate::patterns::dependencies::{is_same_or_child, is_same_or_named};
use crate::patterns::SourceFile;
use crate::rules::hexagonal::STANDARD_TYPES;
use regex::{Regex, RegexBuilder};
use serde_yaml::Value;

/// Restricts what code under a namespace prefix may depend on
#[derive(Debug, Default)]
pub struct NamespaceDependencyRule {
    config: RuleConfig,
}

impl NamespaceDependencyRule {
    pub const NAME: &'static str = "custom.namespace_dependency";

    /// Allowed dependencies of the first configured prefix that matches
    fn allowed_for(&self, namespace: &str) -> Option<Vec<String>> {
        let rules = self.config.mapping("dependency_rules")?;
        rules.iter().find_map(|(prefix, allowed)| {
            let prefix = scalar_to_string(prefix)?;
            if !namespace.starts_with(&prefix) {
                return None;
            }
            let allowed = match allowed {
                Value::Sequence(items) => items.iter().filter_map(scalar_to_string).collect(),
                other => scalar_to_string(other).into_iter().collect(),
            };
            Some(allowed)
        })
    }
}

impl Rule for NamespaceDependencyRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Namespaces may only depend on their configured allow-list"
    }

    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn check(&self, file: &SourceFile, _ctx: &RuleContext<'_>) -> Option<Violation> {
        let namespace = file.namespace();
        let allowed = self.allowed_for(namespace)?;
        let global = self
            .config
            .list_or("global_allowed_dependencies", STANDARD_TYPES);

        let forbidden = file.dependencies().matching(|dep| {
            !allowed.iter().any(|a| is_same_or_child(dep, a))
                && !global.iter().any(|g| is_same_or_named(dep, g))
        });
        if forbidden.is_empty() {
            return None;
        }

        let message = format!(
            "Namespace '{}' has forbidden dependencies: {}",
            namespace,
            forbidden.join(", ")
        );
        Some(
            Violation::new(file.path(), message, Self::NAME, 3)
                .with_detail("namespace", namespace)
                .with_detail("forbidden_dependencies", forbidden)
                .with_detail("allowed_dependencies", allowed)
                .with_detail("all_dependencies", file.dependencies().as_slice().to_vec()),
        )
    }
}

/// One configured naming requirement
#[derive(Debug, Clone)]
struct NamingPattern {
    source: String,
    description: String,
    regex: Regex,
}

/// Naming requirements under one namespace prefix
#[derive(Debug, Clone)]
struct NamingScope {
    prefix: String,
    patterns: Vec<NamingPattern>,
}

/// Declared type names under a namespace prefix must match a pattern
#[derive(Debug, Default)]
pub struct NamingConventionRule {
    scopes: Vec<NamingScope>,
    errors: Vec<String>,
}

impl NamingConventionRule {
    pub const NAME: &'static str = "custom.naming_convention";
}

impl Rule for NamingConventionRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Class names under a namespace prefix must follow a naming pattern"
    }

    fn configure(&mut self, config: RuleConfig) {
        self.scopes.clear();
        self.errors.clear();

        let Some(rules) = config.mapping("naming_rules") else {
            return;
        };

        for (prefix, entries) in rules {
            let Some(prefix) = scalar_to_string(prefix) else {
                self.errors.push(format!("non-string namespace key {prefix:?}"));
                continue;
            };

            let entries = match entries {
                Value::Sequence(items) => items.iter().collect::<Vec<_>>(),
                single => vec![single],
            };

            let mut patterns = Vec::new();
            for entry in entries {
                match parse_naming_entry(entry) {
                    Ok(pattern) => patterns.push(pattern),
                    Err(e) => self.errors.push(format!("{prefix}: {e}")),
                }
            }
            self.scopes.push(NamingScope { prefix, patterns });
        }
    }

    fn validate(&self) -> GuardianResult<()> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(GuardianError::invalid_rule(Self::NAME, self.errors.join("; ")))
    }

    fn check(&self, file: &SourceFile, _ctx: &RuleContext<'_>) -> Option<Violation> {
        let type_name = file.type_name();
        if type_name.is_empty() {
            return None;
        }

        let namespace = file.namespace();
        let failing = self
            .scopes
            .iter()
            .filter(|scope| namespace.starts_with(&scope.prefix))
            .flat_map(|scope| scope.patterns.iter())
            .find(|pattern| !pattern.regex.is_match(type_name))?;

        let message = format!(
            "Class '{}' in namespace '{}' does not follow naming convention: {}",
            type_name, namespace, failing.description
        );
        Some(
            Violation::new(file.path(), message, Self::NAME, 2)
                .with_detail("class_name", type_name)
                .with_detail("namespace", namespace)
                .with_detail("pattern", failing.source.as_str())
                .with_detail("description", failing.description.as_str()),
        )
    }
}

fn parse_naming_entry(entry: &Value) -> GuardianResult<NamingPattern> {
    let (source, description) = match entry {
        Value::String(pattern) => (pattern.clone(), None),
        Value::Mapping(map) => {
            let pattern = map
                .get("pattern")
                .and_then(Value::as_str)
                .ok_or_else(|| GuardianError::pattern("naming rule without 'pattern'"))?;
            let description = map.get("description").and_then(Value::as_str);
            (pattern.to_string(), description.map(str::to_string))
        }
        _ => return Err(GuardianError::pattern("naming rule must be a string or a map")),
    };

    let regex = compile_naming_pattern(&source)?;
    let description = description.unwrap_or_else(|| format!("Must match pattern: {source}"));
    Ok(NamingPattern {
        source,
        description,
        regex,
    })
}

const DELIMITERS: [char; 7] = ['/', '#', '~', '!', '@', '%', '|'];

/// Compile a naming pattern, accepting `/body/flags` delimited form.
///
/// Supported flags: `i`, `m`, `s`, `x`, and `u` (always on).
pub fn compile_naming_pattern(pattern: &str) -> GuardianResult<Regex> {
    let (body, flags) = split_delimited(pattern).unwrap_or((pattern, ""));

    let mut builder = RegexBuilder::new(body);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            'u' => builder.unicode(true),
            other => {
                return Err(GuardianError::pattern(format!(
                    "Unsupported flag '{other}' in pattern '{pattern}'"
                )))
            }
        };
    }

    builder
        .build()
        .map_err(|e| GuardianError::pattern(format!("Invalid pattern '{pattern}': {e}")))
}

fn split_delimited(pattern: &str) -> Option<(&str, &str)> {
    let delimiter = pattern.chars().next().filter(|c| DELIMITERS.contains(c))?;
    let close = pattern.rfind(delimiter).filter(|&i| i > 0)?;
    let flags = &pattern[close + 1..];
    if !flags.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some((&pattern[delimiter.len_utf8()..close], flags))
}
