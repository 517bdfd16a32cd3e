//! Configuration loading and management for Architecture Guardian
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML documents
//! - User documents are deep-merged over embedded defaults before deserialization
//! - Rule option maps stay opaque here and are interpreted by the rules themselves
//! - Configuration is read-only once a run starts

use crate::analyzer::ArchitectureFamily;
use crate::domain::violations::{GuardianError, GuardianResult, Severity};
use crate::patterns::path_filter::{DEFAULT_EXCLUDES, DEFAULT_EXTENSION};
use crate::report::OutputFormat;
use crate::rules::custom::compile_naming_pattern;
use crate::rules::RuleConfig;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// File names probed, in order, in each directory during discovery
pub const CONFIG_FILE_NAMES: [&str; 3] = [
    "architecture_guardian.yaml",
    "architecture_guardian.yml",
    ".architecture-guardian.yaml",
];

const SUPPORTED_VERSIONS: [&str; 1] = ["1.0"];

/// Main configuration structure for Architecture Guardian
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardianConfig {
    /// Configuration format version
    pub version: String,
    /// Rule families and their options
    pub analyzers: AnalyzersConfig,
    /// File discovery configuration
    pub paths: PathConfig,
    /// Reporting configuration
    pub report: ReportConfig,
}

/// One entry per rule family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzersConfig {
    pub ddd: FamilyConfig,
    pub clean: FamilyConfig,
    pub hexagonal: FamilyConfig,
    pub custom: FamilyConfig,
}

/// Settings of a single rule family
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilyConfig {
    /// Whether the family runs at all
    pub enabled: bool,
    /// Options shared by every rule of the family
    pub config: RuleConfig,
    /// Per-rule overrides keyed by rule name, merged over `config`
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rules: BTreeMap<String, RuleConfig>,
    /// Additional registry rules keyed by registry id
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_rules: BTreeMap<String, RuleConfig>,
}

impl FamilyConfig {
    fn disabled_with(config: RuleConfig) -> Self {
        Self {
            enabled: false,
            config,
            ..Default::default()
        }
    }

    /// Effective option map for every rule name in `rule_names`
    pub fn rule_configs<'a>(
        &self,
        rule_names: impl IntoIterator<Item = &'a str>,
    ) -> HashMap<String, RuleConfig> {
        rule_names
            .into_iter()
            .map(|name| {
                let effective = match self.rules.get(name) {
                    Some(overrides) => self.config.merged(overrides),
                    None => self.config.clone(),
                };
                (name.to_string(), effective)
            })
            .collect()
    }
}

/// File discovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Extensions of analyzed files, without the dot
    pub extensions: Vec<String>,
    /// Substring or glob patterns of excluded paths; `!` re-includes
    pub exclude_patterns: Vec<String>,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            exclude_patterns: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Reporting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Output format
    pub format: OutputFormat,
    /// Violations below this level are neither shown nor fail the run
    pub min_severity: Severity,
    /// Colorize human output
    pub use_colors: bool,
    /// Cap on the number of listed violations
    pub max_violations: Option<usize>,
    /// Write the report here instead of stdout
    pub output: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Human,
            min_severity: Severity::Warning,
            use_colors: true,
            max_violations: None,
            output: None,
        }
    }
}

impl AnalyzersConfig {
    pub fn family(&self, family: ArchitectureFamily) -> &FamilyConfig {
        match family {
            ArchitectureFamily::Ddd => &self.ddd,
            ArchitectureFamily::Clean => &self.clean,
            ArchitectureFamily::Hexagonal => &self.hexagonal,
            ArchitectureFamily::Custom => &self.custom,
        }
    }

    pub fn family_mut(&mut self, family: ArchitectureFamily) -> &mut FamilyConfig {
        match family {
            ArchitectureFamily::Ddd => &mut self.ddd,
            ArchitectureFamily::Clean => &mut self.clean,
            ArchitectureFamily::Hexagonal => &mut self.hexagonal,
            ArchitectureFamily::Custom => &mut self.custom,
        }
    }

    /// Enabled families in run order
    pub fn enabled_families(&self) -> impl Iterator<Item = ArchitectureFamily> + '_ {
        ArchitectureFamily::ALL
            .into_iter()
            .filter(move |family| self.family(*family).enabled)
    }
}

impl Default for AnalyzersConfig {
    fn default() -> Self {
        Self {
            ddd: FamilyConfig::disabled_with(
                RuleConfig::new()
                    .with_list("domain_namespaces", &["Domain", "Model"])
                    .with_list("application_namespaces", &["Application"])
                    .with_list("infrastructure_namespaces", &["Infrastructure", "Infra"]),
            ),
            clean: FamilyConfig::disabled_with(
                RuleConfig::new()
                    .with_list("entity_namespaces", &["Entity", "Domain\\Entity", "Domain\\Model"])
                    .with_list(
                        "use_case_namespaces",
                        &["UseCase", "Application", "Domain\\UseCase"],
                    )
                    .with_list(
                        "controller_namespaces",
                        &["Controller", "Interfaces", "Presentation", "UI"],
                    )
                    .with_list(
                        "framework_namespaces",
                        &["Framework", "Infrastructure", "External", "Persistence"],
                    ),
            ),
            hexagonal: FamilyConfig::disabled_with(
                RuleConfig::new()
                    .with_list("domain_namespaces", &["Domain", "Core", "Application"])
                    .with_list(
                        "port_namespaces",
                        &["Port", "Domain\\Port", "Application\\Port", "Domain\\Contract"],
                    )
                    .with_list(
                        "adapter_namespaces",
                        &["Infrastructure", "Adapter", "Framework", "UI", "Persistence"],
                    )
                    .with_flag("adapters_should_implement_ports", true),
            ),
            custom: FamilyConfig::disabled_with(
                RuleConfig::new()
                    .with_value("naming_rules", Value::Mapping(Mapping::new()))
                    .with_value("dependency_rules", Value::Mapping(Mapping::new()))
                    .with_list(
                        "global_allowed_dependencies",
                        &[
                            "DateTimeInterface",
                            "DateTime",
                            "DateTimeImmutable",
                            "Exception",
                            "stdClass",
                        ],
                    ),
            ),
        }
    }
}

impl GuardianConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> GuardianResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            GuardianError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::load_from_str(&contents).map_err(|e| match e {
            GuardianError::Configuration { message } => GuardianError::config(format!(
                "{}: {}",
                path.display(),
                message
            )),
            other => other,
        })
    }

    /// Load configuration from string content, merged over the defaults
    pub fn load_from_str(content: &str) -> GuardianResult<Self> {
        let user: Value = serde_yaml::from_str(content)
            .map_err(|e| GuardianError::config(format!("Failed to parse config: {e}")))?;

        let user = match user {
            Value::Null => Value::Mapping(Mapping::new()),
            Value::Mapping(map) => Value::Mapping(map),
            _ => return Err(GuardianError::config("Configuration root must be a mapping")),
        };

        let mut merged = serde_yaml::to_value(Self::with_defaults())
            .map_err(|e| GuardianError::config(format!("Failed to encode defaults: {e}")))?;
        merge_yaml(&mut merged, user);
        normalize_rule_maps(&mut merged);

        let config: Self = serde_yaml::from_value(merged)
            .map_err(|e| GuardianError::config(format!("Invalid configuration: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Walk up from `start` looking for a configuration file
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start.ancestors().find_map(|dir| {
            CONFIG_FILE_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
        })
    }

    /// Get default configuration
    pub fn with_defaults() -> Self {
        Self {
            version: "1.0".to_string(),
            analyzers: AnalyzersConfig::default(),
            paths: PathConfig::default(),
            report: ReportConfig::default(),
        }
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> GuardianResult<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            return Err(GuardianError::config(format!(
                "Unsupported configuration version: {}. Supported versions: {}",
                self.version,
                SUPPORTED_VERSIONS.join(", ")
            )));
        }

        for pattern in &self.paths.exclude_patterns {
            let raw = pattern.strip_prefix('!').unwrap_or(pattern);
            if raw.contains(['*', '?', '[']) {
                glob::Pattern::new(raw).map_err(|e| {
                    GuardianError::config(format!("Invalid exclude pattern '{pattern}': {e}"))
                })?;
            }
        }

        for family in ArchitectureFamily::ALL {
            let settings = self.analyzers.family(family);
            for (rule, overrides) in &settings.rules {
                if !family.rule_ids().contains(&rule.as_str()) {
                    return Err(GuardianError::config(format!(
                        "Unknown rule '{}' in analyzers.{}.rules",
                        rule,
                        family.key()
                    )));
                }
                validate_naming_rules(&settings.config.merged(overrides))?;
            }
            validate_naming_rules(&settings.config)?;
        }

        Ok(())
    }

    /// Convert to JSON for serialization
    pub fn to_json(&self) -> GuardianResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GuardianError::config(format!("Failed to serialize config: {e}")))
    }

    /// Convert to YAML, the on-disk format
    pub fn to_yaml(&self) -> GuardianResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| GuardianError::config(format!("Failed to serialize config: {e}")))
    }

    /// Create a fingerprint of the effective configuration
    pub fn fingerprint(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        // The YAML rendering is stable: structs keep field order, maps keep key order
        match serde_yaml::to_string(self) {
            Ok(rendered) => rendered.hash(&mut hasher),
            Err(_) => self.version.hash(&mut hasher),
        }
        format!("{:x}", hasher.finish())
    }
}

impl Default for GuardianConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn validate_naming_rules(config: &RuleConfig) -> GuardianResult<()> {
    let Some(rules) = config.mapping("naming_rules") else {
        return Ok(());
    };

    for entries in rules.values() {
        let entries: Vec<&Value> = match entries {
            Value::Sequence(items) => items.iter().collect(),
            single => vec![single],
        };
        for entry in entries {
            let pattern = match entry {
                Value::String(pattern) => Some(pattern.as_str()),
                Value::Mapping(map) => map.get("pattern").and_then(Value::as_str),
                _ => None,
            };
            let pattern = pattern.ok_or_else(|| {
                GuardianError::config("Naming rules need a 'pattern' string".to_string())
            })?;
            compile_naming_pattern(pattern)
                .map_err(|e| GuardianError::config(format!("Invalid naming rule: {e}")))?;
        }
    }
    Ok(())
}

/// Deep-merge `overlay` into `base`: maps merge key by key, anything else replaces
pub fn merge_yaml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// `rules` and `custom_rules` entries may be written without a body
fn normalize_rule_maps(root: &mut Value) {
    let Some(analyzers) = root.get_mut("analyzers").and_then(Value::as_mapping_mut) else {
        return;
    };
    for (_, family) in analyzers.iter_mut() {
        for section in ["config", "rules", "custom_rules"] {
            let Some(value) = family.get_mut(section) else {
                continue;
            };
            if value.is_null() {
                *value = Value::Mapping(Mapping::new());
            }
            if section == "config" {
                continue;
            }
            if let Some(entries) = value.as_mapping_mut() {
                for (_, body) in entries.iter_mut() {
                    if body.is_null() {
                        *body = Value::Mapping(Mapping::new());
                    }
                }
            }
        }
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: GuardianConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: GuardianConfig::default(),
        }
    }

    /// Turn a rule family on
    pub fn enable(mut self, family: ArchitectureFamily) -> Self {
        self.config.analyzers.family_mut(family).enabled = true;
        self
    }

    /// Replace a family-wide option
    pub fn family_option(
        mut self,
        family: ArchitectureFamily,
        key: &str,
        value: impl Into<Value>,
    ) -> Self {
        let settings = self.config.analyzers.family_mut(family);
        settings.config = settings.config.clone().with_value(key, value);
        self
    }

    /// Override options of a single rule
    pub fn rule_override(
        mut self,
        family: ArchitectureFamily,
        rule: impl Into<String>,
        config: RuleConfig,
    ) -> Self {
        self.config
            .analyzers
            .family_mut(family)
            .rules
            .insert(rule.into(), config);
        self
    }

    /// Add a registry rule to the custom family
    pub fn custom_rule(mut self, id: impl Into<String>, config: RuleConfig) -> Self {
        self.config.analyzers.custom.custom_rules.insert(id.into(), config);
        self
    }

    /// Add an exclude pattern
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.config.paths.exclude_patterns.push(pattern.into());
        self
    }

    /// Set the reporting threshold
    pub fn min_severity(mut self, severity: Severity) -> Self {
        self.config.report.min_severity = severity;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> GuardianResult<GuardianConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
