//! Core domain models for architecture violations and validation results
//!
//! Architecture: Rich Domain Models - Violations are immutable entities with behavior
//! - Severity clamps itself into the 1..=5 range the moment it is constructed
//! - ViolationCollection preserves evaluation order through every aggregation
//! - ValidationReport acts as the aggregate root handed to reporters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// Graded severity of an architecture violation, from 1 (lowest) to 5 (highest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", from = "i64")]
pub enum Severity {
    /// Level 1
    Notice = 1,
    /// Level 2
    Info = 2,
    /// Level 3
    Warning = 3,
    /// Level 4
    Error = 4,
    /// Level 5
    Critical = 5,
}

impl Severity {
    /// All severities in ascending order
    pub const ALL: [Severity; 5] = [
        Self::Notice,
        Self::Info,
        Self::Warning,
        Self::Error,
        Self::Critical,
    ];

    /// Build a severity from a raw level, clamping it into `1..=5`
    pub fn from_level(level: i64) -> Self {
        match level {
            i64::MIN..=1 => Self::Notice,
            2 => Self::Info,
            3 => Self::Warning,
            4 => Self::Error,
            _ => Self::Critical,
        }
    }

    /// Numeric level in `1..=5`
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Label used by reporters
    pub fn label(self) -> &'static str {
        match self {
            Self::Notice => "NOTICE",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// Parse either a numeric level or a (case-insensitive) label
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(level) = value.parse::<i64>() {
            return Some(Self::from_level(level));
        }
        Self::ALL
            .into_iter()
            .find(|severity| severity.label().eq_ignore_ascii_case(value))
    }
}

impl From<i64> for Severity {
    fn from(level: i64) -> Self {
        Self::from_level(level)
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.level()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An architecture violation recorded by a single rule for a single file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    file_path: PathBuf,
    message: String,
    rule_name: String,
    severity: Severity,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    details: Map<String, Value>,
}

impl Violation {
    /// Create a new violation; `severity` is clamped into `1..=5`
    pub fn new(
        file_path: impl Into<PathBuf>,
        message: impl Into<String>,
        rule_name: impl Into<String>,
        severity: i64,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            message: message.into(),
            rule_name: rule_name.into(),
            severity: Severity::from_level(severity),
            details: Map::new(),
        }
    }

    /// Attach a detail entry while the violation is being built
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    /// Look up a single detail entry
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }

    /// The `forbidden_dependencies` detail, empty when absent
    pub fn forbidden_dependencies(&self) -> Vec<&str> {
        self.detail_strings("forbidden_dependencies")
    }

    /// The `all_dependencies` detail, empty when absent
    pub fn all_dependencies(&self) -> Vec<&str> {
        self.detail_strings("all_dependencies")
    }

    fn detail_strings(&self, key: &str) -> Vec<&str> {
        self.details
            .get(key)
            .and_then(Value::as_array)
            .map(|values| values.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} in {}",
            "*".repeat(usize::from(self.severity.level())),
            self.rule_name,
            self.message,
            self.file_path.display()
        )
    }
}

/// Ordered collection of violations; insertion order is evaluation order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViolationCollection {
    violations: Vec<Violation>,
}

impl ViolationCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one violation
    pub fn add(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Append every violation of `other`, keeping its order
    pub fn merge(&mut self, other: ViolationCollection) {
        self.violations.extend(other.violations);
    }

    /// Violations with severity at or above `min`, in original relative order
    pub fn filter_by_severity(&self, min: Severity) -> ViolationCollection {
        self.violations
            .iter()
            .filter(|v| v.severity >= min)
            .cloned()
            .collect()
    }

    /// Violations recorded by exactly `rule_name`, in original relative order
    pub fn filter_by_rule(&self, rule_name: &str) -> ViolationCollection {
        self.violations
            .iter()
            .filter(|v| v.rule_name == rule_name)
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.violations.iter()
    }

    pub fn as_slice(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_vec(self) -> Vec<Violation> {
        self.violations
    }

    /// Count violations per severity level
    pub fn counts(&self) -> ViolationCounts {
        let mut counts = ViolationCounts::default();
        for violation in &self.violations {
            counts.add(violation.severity);
        }
        counts
    }
}

impl fmt::Display for ViolationCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("No violations found.");
        }

        writeln!(f, "Found {} violation(s):", self.len())?;
        writeln!(f)?;
        for (index, violation) in self.violations.iter().enumerate() {
            writeln!(f, "{}. {}", index + 1, violation)?;
        }
        Ok(())
    }
}

impl FromIterator<Violation> for ViolationCollection {
    fn from_iter<I: IntoIterator<Item = Violation>>(iter: I) -> Self {
        Self {
            violations: iter.into_iter().collect(),
        }
    }
}

impl Extend<Violation> for ViolationCollection {
    fn extend<I: IntoIterator<Item = Violation>>(&mut self, iter: I) {
        self.violations.extend(iter);
    }
}

impl IntoIterator for ViolationCollection {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

impl<'a> IntoIterator for &'a ViolationCollection {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}

/// Count of violations by severity level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationCounts {
    pub notice: usize,
    pub info: usize,
    pub warning: usize,
    pub error: usize,
    pub critical: usize,
}

impl ViolationCounts {
    /// Total number of violations across all severities
    pub fn total(&self) -> usize {
        self.notice + self.info + self.warning + self.error + self.critical
    }

    /// Number of violations at a given severity
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Notice => self.notice,
            Severity::Info => self.info,
            Severity::Warning => self.warning,
            Severity::Error => self.error,
            Severity::Critical => self.critical,
        }
    }

    /// Add a violation to the counts
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Notice => self.notice += 1,
            Severity::Info => self.info += 1,
            Severity::Warning => self.warning += 1,
            Severity::Error => self.error += 1,
            Severity::Critical => self.critical += 1,
        }
    }
}

/// A file that could not be evaluated during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Summary statistics for a validation report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Number of files handed to the analyzers
    pub total_files: usize,
    /// Files that could not be read, reported but not fatal
    pub skipped_files: Vec<SkippedFile>,
    /// Number of violations by severity level
    pub violations_by_severity: ViolationCounts,
    /// Total execution time in milliseconds
    pub execution_time_ms: u64,
    /// Timestamp when validation was performed
    pub validated_at: DateTime<Utc>,
    /// Whether the run was cancelled before every file was evaluated
    pub cancelled: bool,
}

/// Complete validation report containing all violations and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// All violations found, in evaluation order
    pub violations: ViolationCollection,
    /// Summary statistics
    pub summary: ValidationSummary,
    /// Fingerprint of the configuration used for this validation
    pub config_fingerprint: Option<String>,
}

impl ValidationReport {
    /// Create a new empty validation report
    pub fn new() -> Self {
        Self {
            violations: ViolationCollection::new(),
            summary: ValidationSummary {
                validated_at: Utc::now(),
                ..Default::default()
            },
            config_fingerprint: None,
        }
    }

    /// Add a violation to the report
    pub fn add_violation(&mut self, violation: Violation) {
        self.summary.violations_by_severity.add(violation.severity());
        self.violations.add(violation);
    }

    /// Append a whole collection, keeping its order
    pub fn add_collection(&mut self, collection: ViolationCollection) {
        for violation in collection {
            self.add_violation(violation);
        }
    }

    /// Whether the report contains any violations
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Whether any violation reaches `min`
    pub fn has_violations_at(&self, min: Severity) -> bool {
        self.violations.iter().any(|v| v.severity() >= min)
    }

    /// Record a file that was skipped
    pub fn add_skipped_file(&mut self, path: impl Into<PathBuf>, reason: impl Into<String>) {
        self.summary.skipped_files.push(SkippedFile {
            path: path.into(),
            reason: reason.into(),
        });
    }

    /// Set the number of files analyzed
    pub fn set_files_analyzed(&mut self, count: usize) {
        self.summary.total_files = count;
    }

    /// Set the execution time
    pub fn set_execution_time(&mut self, duration_ms: u64) {
        self.summary.execution_time_ms = duration_ms;
    }

    /// Set the configuration fingerprint
    pub fn set_config_fingerprint(&mut self, fingerprint: impl Into<String>) {
        self.config_fingerprint = Some(fingerprint.into());
    }

    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.summary.cancelled = cancelled;
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Error types that can occur during validation
#[derive(Debug, thiserror::Error)]
pub enum GuardianError {
    /// Configuration file could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic I/O failure outside of source reading
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A source file could not be read; the file is skipped
    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Pattern compilation failed
    #[error("Pattern error: {message}")]
    Pattern { message: String },

    /// No rule is registered under the requested identifier
    #[error("Rule not found: {name}")]
    RuleNotFound { name: String },

    /// A rule was resolved but does not satisfy the rule contract
    #[error("Invalid rule '{name}': {reason}")]
    InvalidRule { name: String, reason: String },

    /// Validation operation failed
    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl GuardianError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a pattern error
    pub fn pattern(message: impl Into<String>) -> Self {
        Self::Pattern {
            message: message.into(),
        }
    }

    /// Create a file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Create a rule-not-found error
    pub fn rule_not_found(name: impl Into<String>) -> Self {
        Self::RuleNotFound { name: name.into() }
    }

    /// Create an invalid-rule error
    pub fn invalid_rule(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Result type for Guardian operations
pub type GuardianResult<T> = Result<T, GuardianError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn violation(rule: &str, severity: i64) -> Violation {
        Violation::new("src/Domain/User.php", "message", rule, severity)
    }

    #[rstest]
    #[case(-7, 1)]
    #[case(0, 1)]
    #[case(1, 1)]
    #[case(3, 3)]
    #[case(5, 5)]
    #[case(6, 5)]
    #[case(i64::MAX, 5)]
    fn test_severity_is_clamped(#[case] input: i64, #[case] expected: u8) {
        let v = violation("ddd.domain_layer", input);
        assert_eq!(v.severity().level(), expected);
    }

    #[test]
    fn test_severity_labels() {
        let labels: Vec<_> = Severity::ALL.iter().map(|s| (s.level(), s.label())).collect();
        assert_eq!(
            labels,
            vec![
                (1, "NOTICE"),
                (2, "INFO"),
                (3, "WARNING"),
                (4, "ERROR"),
                (5, "CRITICAL")
            ]
        );
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!(Severity::parse("warning"), Some(Severity::Warning));
        assert_eq!(Severity::parse("4"), Some(Severity::Error));
        assert_eq!(Severity::parse("42"), Some(Severity::Critical));
        assert_eq!(Severity::parse("loud"), None);
    }

    #[test]
    fn test_severity_deserialization_clamps() {
        let severity: Severity = serde_json::from_str("9").unwrap();
        assert_eq!(severity, Severity::Critical);
        assert_eq!(serde_json::to_string(&Severity::Info).unwrap(), "2");
    }

    #[test]
    fn test_violation_accessors_and_display() {
        let v = Violation::new("src/Domain/User.php", "Bad import", "ddd.domain_layer", 4)
            .with_detail("forbidden_dependencies", vec!["App\\Infra\\Db"])
            .with_detail("all_dependencies", vec!["App\\Domain\\Id", "App\\Infra\\Db"]);

        assert_eq!(v.rule_name(), "ddd.domain_layer");
        assert_eq!(v.message(), "Bad import");
        assert_eq!(v.file_path(), Path::new("src/Domain/User.php"));
        assert_eq!(v.forbidden_dependencies(), vec!["App\\Infra\\Db"]);
        assert_eq!(v.all_dependencies().len(), 2);
        assert_eq!(
            v.to_string(),
            "[****] ddd.domain_layer: Bad import in src/Domain/User.php"
        );
    }

    #[test]
    fn test_filter_by_severity_keeps_order() {
        let mut collection = ViolationCollection::new();
        collection.add(violation("a", 1));
        collection.add(violation("b", 3));
        collection.add(violation("c", 5));

        let filtered = collection.filter_by_severity(Severity::Warning);
        let rules: Vec<_> = filtered.iter().map(|v| v.rule_name()).collect();
        assert_eq!(rules, vec!["b", "c"]);
        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn test_filter_by_rule_keeps_order() {
        let collection: ViolationCollection = vec![
            violation("x", 2),
            violation("y", 5),
            violation("x", 4),
        ]
        .into_iter()
        .collect();

        let filtered = collection.filter_by_rule("x");
        let severities: Vec<_> = filtered.iter().map(|v| v.severity().level()).collect();
        assert_eq!(severities, vec![2, 4]);
        assert!(collection.filter_by_rule("z").is_empty());
    }

    #[test]
    fn test_merge_is_order_preserving() {
        let a: ViolationCollection = vec![violation("a", 1)].into_iter().collect();
        let b: ViolationCollection = vec![violation("b", 2), violation("b2", 2)].into_iter().collect();
        let c: ViolationCollection = vec![violation("c", 3)].into_iter().collect();

        let mut left = a.clone();
        left.merge(b.clone());
        left.merge(c.clone());

        let mut bc = ViolationCollection::new();
        bc.merge(b);
        bc.merge(c);
        let mut right = a;
        right.merge(bc);

        assert_eq!(left, right);
        let rules: Vec<_> = left.iter().map(|v| v.rule_name()).collect();
        assert_eq!(rules, vec!["a", "b", "b2", "c"]);
    }

    #[test]
    fn test_collection_display() {
        let empty = ViolationCollection::new();
        assert_eq!(empty.to_string(), "No violations found.");

        let collection: ViolationCollection = vec![violation("a", 2)].into_iter().collect();
        let rendered = collection.to_string();
        assert!(rendered.starts_with("Found 1 violation(s):"));
        assert!(rendered.contains("1. [**] a: message in src/Domain/User.php"));
    }

    #[test]
    fn test_validation_report_counts() {
        let mut report = ValidationReport::new();
        report.add_violation(violation("a", 5));
        report.add_violation(violation("b", 3));
        report.add_skipped_file("missing.php", "not found");

        assert!(report.has_violations());
        assert!(report.has_violations_at(Severity::Critical));
        assert_eq!(report.summary.violations_by_severity.critical, 1);
        assert_eq!(report.summary.violations_by_severity.total(), 2);
        assert_eq!(report.summary.skipped_files.len(), 1);
    }
}
