//! Architecture Guardian - architectural conformance checking for PHP source trees
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Lexical extraction in `patterns` feeds pure rule predicates in `rules`
//! - `analyzer` sequences rules per file; `report` renders the outcome
//! - `GuardianValidator` ties discovery, analysis and reporting together

pub mod analyzer;
pub mod config;
pub mod domain;
pub mod patterns;
pub mod report;
pub mod rules;

// Re-export main types for convenient access
pub use domain::violations::{
    GuardianError, GuardianResult, Severity, ValidationReport, ValidationSummary, Violation,
    ViolationCollection,
};

pub use config::{ConfigBuilder, GuardianConfig};

pub use analyzer::{AnalysisOptions, Analyzer, ArchitectureFamily, CancellationToken};

pub use patterns::{PathFilter, SourceFile};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

pub use rules::{Rule, RuleConfig, RuleContext, RuleRegistry};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Main Guardian validator providing high-level validation operations
#[derive(Debug)]
pub struct GuardianValidator {
    config: GuardianConfig,
    registry: RuleRegistry,
    report_formatter: ReportFormatter,
}

/// Options for a single validation run
#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// Evaluation strategy and cancellation
    pub analysis: AnalysisOptions,
    /// Exclude patterns applied on top of the configured ones
    pub extra_excludes: Vec<String>,
}

impl GuardianValidator {
    /// Create a validator for a configuration, rejecting invalid ones up front
    pub fn new(config: GuardianConfig) -> GuardianResult<Self> {
        config.validate()?;
        let report_formatter = ReportFormatter::new(ReportOptions::from(&config.report));

        Ok(Self {
            config,
            registry: RuleRegistry::with_builtin_rules(),
            report_formatter,
        })
    }

    /// Create a validator loading configuration from file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> GuardianResult<Self> {
        Self::new(GuardianConfig::load_from_file(path)?)
    }

    /// Replace the rule registry used for custom rules
    pub fn with_registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    pub fn config(&self) -> &GuardianConfig {
        &self.config
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// One configured analyzer per enabled family, in family order.
    ///
    /// Custom rules that fail to instantiate are logged and left out.
    pub fn build_analyzers(&self) -> Vec<Analyzer> {
        let mut analyzers = Vec::new();

        for family in self.config.analyzers.enabled_families() {
            let family_config = self.config.analyzers.family(family);
            let mut analyzer = Analyzer::for_family(family, &self.registry);
            analyzer.configure(&family_config.rule_configs(family.rule_ids().iter().copied()));

            if family == ArchitectureFamily::Custom {
                for (id, rule_config) in &family_config.custom_rules {
                    match self.registry.create(id, rule_config.clone()) {
                        Ok(rule) => analyzer.add_rule(rule),
                        Err(e) => tracing::warn!("Skipping custom rule '{}': {}", id, e),
                    }
                }
            }

            analyzers.push(analyzer);
        }

        if analyzers.is_empty() {
            tracing::warn!("No architecture families are enabled; nothing will be checked");
        }
        analyzers
    }

    /// Every analyzable file below `paths`, deduplicated, in discovery order
    pub fn discover_files<P: AsRef<Path>>(
        &self,
        paths: &[P],
        extra_excludes: &[String],
    ) -> GuardianResult<Vec<PathBuf>> {
        let mut patterns = self.config.paths.exclude_patterns.clone();
        patterns.extend(extra_excludes.iter().cloned());
        let filter = PathFilter::new(patterns, self.config.paths.extensions.clone())?;

        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for path in paths {
            for file in filter.find_files(path)? {
                if seen.insert(file.clone()) {
                    files.push(file);
                }
            }
        }

        tracing::debug!("Discovered {} file(s)", files.len());
        Ok(files)
    }

    /// Validate every analyzable file below `paths`
    pub fn validate_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: &ValidationOptions,
    ) -> GuardianResult<ValidationReport> {
        let start_time = Instant::now();

        let files = self.discover_files(paths, &options.extra_excludes)?;
        let mut report = self.validate_files(&files, options);
        report.set_execution_time(start_time.elapsed().as_millis() as u64);

        tracing::info!(
            "Validated {} file(s): {} violation(s), {} skipped{}",
            report.summary.total_files,
            report.violations.len(),
            report.summary.skipped_files.len(),
            if report.summary.cancelled { " (cancelled)" } else { "" }
        );
        Ok(report)
    }

    /// Load and validate an explicit file list; files that cannot be read are skipped
    pub fn validate_files(&self, files: &[PathBuf], options: &ValidationOptions) -> ValidationReport {
        let start_time = Instant::now();
        let (sources, skipped) = analyzer::load_sources(files, &options.analysis);

        let mut report = self.run(&sources, files, &options.analysis);
        for file in skipped {
            report.add_skipped_file(file.path, file.reason);
        }
        report.set_execution_time(start_time.elapsed().as_millis() as u64);
        report
    }

    /// Validate already loaded sources
    pub fn validate_sources(
        &self,
        sources: &[SourceFile],
        options: &AnalysisOptions,
    ) -> ValidationReport {
        let start_time = Instant::now();
        let files: Vec<PathBuf> = sources.iter().map(|s| s.path().to_path_buf()).collect();

        let mut report = self.run(sources, &files, options);
        report.set_execution_time(start_time.elapsed().as_millis() as u64);
        report
    }

    fn run(
        &self,
        sources: &[SourceFile],
        files: &[PathBuf],
        options: &AnalysisOptions,
    ) -> ValidationReport {
        let ctx = RuleContext::new(&self.config, files);
        let mut report = ValidationReport::new();
        report.set_config_fingerprint(self.config.fingerprint());
        report.set_files_analyzed(sources.len());

        // A file counts as analyzed once the first family has evaluated it.
        for (index, analyzer) in self.build_analyzers().into_iter().enumerate() {
            let outcome = analyzer.analyze_sources(sources, &ctx, options);
            report.add_collection(outcome.violations);

            if outcome.cancelled {
                if index == 0 {
                    report.set_files_analyzed(outcome.files_analyzed);
                }
                report.set_cancelled(true);
                tracing::warn!("Validation cancelled during {}", analyzer.name());
                break;
            }
        }

        report
    }

    /// Format a validation report for output
    pub fn format_report(&self, report: &ValidationReport, format: OutputFormat) -> GuardianResult<String> {
        self.report_formatter.format_report(report, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn ddd_validator() -> GuardianValidator {
        let config = ConfigBuilder::new()
            .enable(ArchitectureFamily::Ddd)
            .min_severity(Severity::Notice)
            .build()
            .unwrap();
        GuardianValidator::new(config).unwrap()
    }

    #[test]
    fn test_validate_paths() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "src/Domain/User.php",
            "<?php\nnamespace App\\Domain;\n\nuse App\\Infrastructure\\Db;\n\nclass User {}\n",
        );
        write(
            dir.path(),
            "vendor/lib/Domain/Other.php",
            "<?php\nnamespace Lib\\Domain;\n\nuse Lib\\Infrastructure\\Db;\n\nclass Other {}\n",
        );
        write(dir.path(), "README.md", "not php");

        let report = ddd_validator()
            .validate_paths(&[dir.path()], &ValidationOptions::default())
            .unwrap();

        assert_eq!(report.summary.total_files, 1);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations.as_slice()[0].rule_name(), "ddd.domain_layer");
        assert!(report.config_fingerprint.is_some());
        assert!(!report.summary.cancelled);
    }

    #[test]
    fn test_extra_excludes() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "legacy/Domain/User.php",
            "<?php\nnamespace App\\Domain;\n\nuse App\\Infrastructure\\Db;\n\nclass User {}\n",
        );

        let options = ValidationOptions {
            extra_excludes: vec!["/legacy/".to_string()],
            ..Default::default()
        };
        let report = ddd_validator().validate_paths(&[dir.path()], &options).unwrap();
        assert_eq!(report.summary.total_files, 0);
        assert!(!report.has_violations());
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(ddd_validator()
            .validate_paths(&[missing], &ValidationOptions::default())
            .is_err());
    }

    #[test]
    fn test_nothing_enabled_reports_nothing() {
        let validator = GuardianValidator::new(GuardianConfig::default()).unwrap();
        assert!(validator.build_analyzers().is_empty());

        let sources = vec![SourceFile::from_content(
            "User.php",
            "<?php\nnamespace App\\Domain;\nuse App\\Infrastructure\\Db;\nclass User {}\n",
        )];
        let report = validator.validate_sources(&sources, &AnalysisOptions::default());
        assert!(!report.has_violations());
        assert_eq!(report.summary.total_files, 1);
    }

    #[test]
    fn test_families_run_in_order() {
        let config = ConfigBuilder::new()
            .enable(ArchitectureFamily::Hexagonal)
            .enable(ArchitectureFamily::Ddd)
            .build()
            .unwrap();
        let validator = GuardianValidator::new(config).unwrap();
        let names: Vec<String> = validator
            .build_analyzers()
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                ArchitectureFamily::Ddd.display_name().to_string(),
                ArchitectureFamily::Hexagonal.display_name().to_string(),
            ]
        );
    }

    #[test]
    fn test_unknown_custom_rule_is_skipped() {
        let config = ConfigBuilder::new()
            .enable(ArchitectureFamily::Custom)
            .custom_rule("acme.missing", RuleConfig::new())
            .build()
            .unwrap();
        let validator = GuardianValidator::new(config).unwrap();
        let analyzers = validator.build_analyzers();

        assert_eq!(analyzers.len(), 1);
        assert_eq!(analyzers[0].len(), ArchitectureFamily::Custom.rule_ids().len());
    }

    #[test]
    fn test_cancelled_run_is_flagged() {
        let token = CancellationToken::new();
        token.cancel();
        let options = AnalysisOptions {
            parallel: false,
            cancellation: Some(token),
        };
        let sources = vec![SourceFile::from_content(
            "User.php",
            "<?php\nnamespace App\\Domain;\nuse App\\Infrastructure\\Db;\nclass User {}\n",
        )];

        let report = ddd_validator().validate_sources(&sources, &options);
        assert!(report.summary.cancelled);
        assert_eq!(report.summary.total_files, 0);
        assert!(!report.has_violations());
    }

    lazy_static::lazy_static! {
        static ref LATE_CANCEL: CancellationToken = CancellationToken::new();
    }

    #[derive(Default)]
    struct CancelRule;

    impl Rule for CancelRule {
        fn name(&self) -> &str {
            "acme.cancel"
        }
        fn description(&self) -> &str {
            "cancels the run"
        }
        fn configure(&mut self, _config: RuleConfig) {}
        fn check(&self, _file: &SourceFile, _ctx: &RuleContext<'_>) -> Option<Violation> {
            LATE_CANCEL.cancel();
            None
        }
    }

    #[test]
    fn test_cancel_in_later_family_keeps_file_count() {
        let mut registry = RuleRegistry::with_builtin_rules();
        registry.register("acme.cancel", rules::registry::boxed::<CancelRule>);
        let config = ConfigBuilder::new()
            .enable(ArchitectureFamily::Ddd)
            .enable(ArchitectureFamily::Custom)
            .custom_rule("acme.cancel", RuleConfig::new())
            .build()
            .unwrap();
        let validator = GuardianValidator::new(config).unwrap().with_registry(registry);

        let sources: Vec<SourceFile> = ["A", "B", "C"]
            .iter()
            .map(|name| {
                SourceFile::from_content(
                    format!("{name}.php"),
                    format!("<?php\nnamespace App\\Domain;\nuse App\\Infrastructure\\Db;\nclass {name} {{}}\n"),
                )
            })
            .collect();
        let options = AnalysisOptions {
            parallel: false,
            cancellation: Some(LATE_CANCEL.clone()),
        };

        let report = validator.validate_sources(&sources, &options);
        assert!(report.summary.cancelled);
        assert_eq!(report.summary.total_files, 3);
        assert_eq!(report.violations.filter_by_rule("ddd.domain_layer").len(), 3);
    }
}
