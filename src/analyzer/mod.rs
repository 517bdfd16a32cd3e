//! Rule orchestration for Architecture Guardian
//!
//! CDD Principle: Domain Services - Analyzer applies an ordered rule set to an ordered file set
//! - Each file is read and its facts extracted once, then shared by every rule
//! - Results are always concatenated in (file, rule) order, parallel or not
//! - Unreadable files are skipped and reported without aborting the run

use crate::domain::violations::{SkippedFile, ViolationCollection};
use crate::patterns::SourceFile;
use crate::rules::{Rule, RuleConfig, RuleContext, RuleRegistry};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Built-in rule families, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchitectureFamily {
    Ddd,
    Clean,
    Hexagonal,
    Custom,
}

impl ArchitectureFamily {
    pub const ALL: [ArchitectureFamily; 4] = [Self::Ddd, Self::Clean, Self::Hexagonal, Self::Custom];

    /// Configuration key and rule-name prefix
    pub fn key(self) -> &'static str {
        match self {
            Self::Ddd => "ddd",
            Self::Clean => "clean",
            Self::Hexagonal => "hexagonal",
            Self::Custom => "custom",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Ddd => "Domain-Driven Design",
            Self::Clean => "Clean Architecture",
            Self::Hexagonal => "Hexagonal Architecture",
            Self::Custom => "Custom Rules",
        }
    }

    /// Built-in rules of this family, in evaluation order
    pub fn rule_ids(self) -> &'static [&'static str] {
        match self {
            Self::Ddd => &[
                "ddd.domain_layer",
                "ddd.application_layer",
                "ddd.infrastructure_layer",
            ],
            Self::Clean => &[
                "clean.entity_layer",
                "clean.use_case_layer",
                "clean.controller_layer",
            ],
            Self::Hexagonal => &["hexagonal.domain", "hexagonal.port", "hexagonal.adapter"],
            Self::Custom => &["custom.namespace_dependency", "custom.naming_convention"],
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|family| family.key() == key)
    }
}

impl fmt::Display for ArchitectureFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Cooperative cancellation flag, checked between files
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options for customizing analysis behavior
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Whether to evaluate files on the rayon pool
    pub parallel: bool,
    /// Stops evaluation of remaining files once tripped
    pub cancellation: Option<CancellationToken>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            cancellation: None,
        }
    }
}

impl AnalysisOptions {
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Default::default()
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .map_or(false, CancellationToken::is_cancelled)
    }
}

/// Result of running one analyzer over a file set
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    /// Violations in (file, rule) order
    pub violations: ViolationCollection,
    /// Number of files that were evaluated
    pub files_analyzed: usize,
    /// Whether evaluation stopped early
    pub cancelled: bool,
}

/// Read every path once, keeping discovery order.
///
/// Unreadable files are returned separately and logged.
pub fn load_sources(paths: &[PathBuf], options: &AnalysisOptions) -> (Vec<SourceFile>, Vec<SkippedFile>) {
    let loaded: Vec<_> = if options.parallel {
        paths.par_iter().map(SourceFile::load).collect()
    } else {
        paths.iter().map(SourceFile::load).collect()
    };

    let mut sources = Vec::with_capacity(paths.len());
    let mut skipped = Vec::new();
    for (path, result) in paths.iter().zip(loaded) {
        match result {
            Ok(source) => sources.push(source),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                skipped.push(SkippedFile {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    (sources, skipped)
}

/// Ordered set of rules applied to every file
pub struct Analyzer {
    name: String,
    rules: Vec<Box<dyn Rule>>,
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field("name", &self.name)
            .field("rules", &self.rule_names().collect::<Vec<_>>())
            .finish()
    }
}

impl Analyzer {
    /// Create an analyzer without rules
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Analyzer preloaded with a family's built-in rules
    pub fn for_family(family: ArchitectureFamily, registry: &RuleRegistry) -> Self {
        let mut analyzer = Self::new(family.display_name());
        for id in family.rule_ids() {
            match registry.instantiate(id) {
                Ok(rule) => analyzer.add_rule(rule),
                Err(e) => tracing::warn!("Built-in rule '{}' unavailable: {}", id, e),
            }
        }
        analyzer
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a rule; rules run in insertion order
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        tracing::debug!("{}: adding rule '{}'", self.name, rule.name());
        self.rules.push(rule);
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|rule| rule.as_ref())
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.name())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Hand each rule the entry stored under its own name; rules without an
    /// entry keep their current configuration
    pub fn configure(&mut self, configs: &HashMap<String, RuleConfig>) {
        for rule in &mut self.rules {
            if let Some(config) = configs.get(rule.name()) {
                rule.configure(config.clone());
            }
        }
    }

    /// Every rule's verdict on one file, in rule order
    pub fn evaluate(&self, file: &SourceFile, ctx: &RuleContext<'_>) -> ViolationCollection {
        self.rules
            .iter()
            .filter_map(|rule| rule.check(file, ctx))
            .collect()
    }

    /// Evaluate every file and concatenate results in discovery order
    pub fn analyze_sources(
        &self,
        files: &[SourceFile],
        ctx: &RuleContext<'_>,
        options: &AnalysisOptions,
    ) -> AnalysisOutcome {
        let per_file: Vec<Option<ViolationCollection>> = if options.parallel {
            files
                .par_iter()
                .map(|file| (!options.is_cancelled()).then(|| self.evaluate(file, ctx)))
                .collect()
        } else {
            let mut results = Vec::with_capacity(files.len());
            for file in files {
                if options.is_cancelled() {
                    break;
                }
                results.push(Some(self.evaluate(file, ctx)));
            }
            results
        };

        // Parallel workers may finish files past the first skipped one; only
        // the unbroken leading run is reported.
        let mut outcome = AnalysisOutcome::default();
        for result in per_file.into_iter().map_while(|result| result) {
            outcome.files_analyzed += 1;
            outcome.violations.merge(result);
        }
        outcome.cancelled = outcome.files_analyzed < files.len();

        tracing::debug!(
            "{}: {} file(s), {} violation(s)",
            self.name,
            outcome.files_analyzed,
            outcome.violations.len()
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuardianConfig;
    use crate::domain::violations::{GuardianResult, Violation};
    use std::fs;
    use tempfile::TempDir;

    fn sources() -> Vec<SourceFile> {
        vec![
            SourceFile::from_content(
                "a/Entity.php",
                "<?php\nnamespace App\\Domain\\Entity;\nuse App\\Infrastructure\\Db;\nclass User {}\n",
            ),
            SourceFile::from_content(
                "b/Controller.php",
                "<?php\nnamespace App\\Controller;\nuse App\\Framework\\Http;\nclass Web {}\n",
            ),
            SourceFile::from_content(
                "c/UseCase.php",
                "<?php\nnamespace App\\UseCase;\nuse App\\Controller\\Request;\nuse App\\Infrastructure\\Db;\nclass Register {}\n",
            ),
        ]
    }

    fn fingerprint(collection: &ViolationCollection) -> Vec<(String, String)> {
        collection
            .iter()
            .map(|v| (v.file_path().display().to_string(), v.rule_name().to_string()))
            .collect()
    }

    #[test]
    fn test_family_presets() {
        let registry = RuleRegistry::default();
        for family in ArchitectureFamily::ALL {
            let analyzer = Analyzer::for_family(family, &registry);
            let names: Vec<_> = analyzer.rule_names().collect();
            assert_eq!(names, family.rule_ids());
        }
        assert_eq!(ArchitectureFamily::from_key("hexagonal"), Some(ArchitectureFamily::Hexagonal));
        assert_eq!(ArchitectureFamily::from_key("layered"), None);
    }

    #[test]
    fn test_results_follow_file_then_rule_order() {
        let config = GuardianConfig::default();
        let files: Vec<PathBuf> = sources().iter().map(|s| s.path().to_path_buf()).collect();
        let ctx = RuleContext::new(&config, &files);
        let analyzer = Analyzer::for_family(ArchitectureFamily::Clean, &RuleRegistry::default());

        let outcome = analyzer.analyze_sources(&sources(), &ctx, &AnalysisOptions::sequential());
        assert_eq!(
            fingerprint(&outcome.violations),
            vec![
                ("a/Entity.php".to_string(), "clean.entity_layer".to_string()),
                ("b/Controller.php".to_string(), "clean.controller_layer".to_string()),
                ("c/UseCase.php".to_string(), "clean.use_case_layer".to_string()),
            ]
        );
        assert_eq!(outcome.files_analyzed, 3);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let config = GuardianConfig::default();
        let mut many = Vec::new();
        for i in 0..64 {
            for source in sources() {
                many.push(SourceFile::from_content(
                    format!("{i:03}/{}", source.path().display()),
                    source.content(),
                ));
            }
        }
        let files: Vec<PathBuf> = many.iter().map(|s| s.path().to_path_buf()).collect();
        let ctx = RuleContext::new(&config, &files);
        let analyzer = Analyzer::for_family(ArchitectureFamily::Clean, &RuleRegistry::default());

        let sequential = analyzer.analyze_sources(&many, &ctx, &AnalysisOptions::sequential());
        let parallel = analyzer.analyze_sources(&many, &ctx, &AnalysisOptions::default());
        assert_eq!(sequential.violations, parallel.violations);
        assert_eq!(sequential.violations.len(), 64 * 3);
    }

    #[test]
    fn test_cancelled_before_start() {
        let config = GuardianConfig::default();
        let ctx = RuleContext::new(&config, &[]);
        let analyzer = Analyzer::for_family(ArchitectureFamily::Clean, &RuleRegistry::default());
        let token = CancellationToken::new();
        token.cancel();

        for parallel in [true, false] {
            let options = AnalysisOptions {
                parallel,
                cancellation: Some(token.clone()),
            };
            let outcome = analyzer.analyze_sources(&sources(), &ctx, &options);
            assert!(outcome.cancelled);
            assert!(outcome.violations.is_empty());
        }
    }

    struct Tripwire {
        token: CancellationToken,
        at: PathBuf,
    }

    impl Rule for Tripwire {
        fn name(&self) -> &str {
            "acme.tripwire"
        }
        fn description(&self) -> &str {
            "cancels the run on one file"
        }
        fn configure(&mut self, _config: RuleConfig) {}
        fn check(&self, file: &SourceFile, _ctx: &RuleContext<'_>) -> Option<Violation> {
            if file.path() == self.at {
                self.token.cancel();
            }
            Some(Violation::new(file.path(), "seen", self.name(), 1))
        }
    }

    fn tripwire_run(parallel: bool, count: usize, at: usize) -> (Vec<PathBuf>, AnalysisOutcome) {
        let many: Vec<SourceFile> = (0..count)
            .map(|i| SourceFile::from_content(format!("{i:03}.php"), "<?php\nclass A {}\n"))
            .collect();
        let files: Vec<PathBuf> = many.iter().map(|s| s.path().to_path_buf()).collect();
        let config = GuardianConfig::default();
        let ctx = RuleContext::new(&config, &files);

        let token = CancellationToken::new();
        let mut analyzer = Analyzer::new("tripwire");
        analyzer.add_rule(Box::new(Tripwire {
            token: token.clone(),
            at: files[at].clone(),
        }));
        let options = AnalysisOptions {
            parallel,
            cancellation: Some(token),
        };
        let outcome = analyzer.analyze_sources(&many, &ctx, &options);
        (files, outcome)
    }

    #[test]
    fn test_cancelled_mid_run_sequential() {
        let (files, outcome) = tripwire_run(false, 5, 1);
        assert!(outcome.cancelled);
        assert_eq!(outcome.files_analyzed, 2);
        let seen: Vec<_> = outcome.violations.iter().map(|v| v.file_path().to_path_buf()).collect();
        assert_eq!(seen, files[..2].to_vec());
    }

    #[test]
    fn test_cancelled_parallel_run_reports_a_leading_prefix() {
        let (files, outcome) = tripwire_run(true, 256, 8);
        assert_eq!(outcome.cancelled, outcome.files_analyzed < files.len());
        let seen: Vec<_> = outcome.violations.iter().map(|v| v.file_path().to_path_buf()).collect();
        assert_eq!(seen.len(), outcome.files_analyzed);
        assert_eq!(seen, files[..outcome.files_analyzed].to_vec());
    }

    #[test]
    fn test_configure_by_rule_name() {
        let config = GuardianConfig::default();
        let ctx = RuleContext::new(&config, &[]);
        let mut analyzer = Analyzer::for_family(ArchitectureFamily::Clean, &RuleRegistry::default());

        let mut configs = HashMap::new();
        configs.insert(
            "clean.entity_layer".to_string(),
            RuleConfig::new().with_list("entity_namespaces", &["Nothing"]),
        );
        analyzer.configure(&configs);

        let outcome = analyzer.analyze_sources(&sources(), &ctx, &AnalysisOptions::sequential());
        assert!(outcome.violations.filter_by_rule("clean.entity_layer").is_empty());
        assert_eq!(outcome.violations.filter_by_rule("clean.use_case_layer").len(), 1);
    }

    #[test]
    fn test_custom_rule_added_after_builtins_runs_last() {
        struct Everything;
        impl Rule for Everything {
            fn name(&self) -> &str {
                "acme.everything"
            }
            fn description(&self) -> &str {
                "flags every file"
            }
            fn configure(&mut self, _config: RuleConfig) {}
            fn check(&self, file: &SourceFile, _ctx: &RuleContext<'_>) -> Option<Violation> {
                Some(Violation::new(file.path(), "seen", self.name(), 1))
            }
        }

        let config = GuardianConfig::default();
        let ctx = RuleContext::new(&config, &[]);
        let mut analyzer = Analyzer::for_family(ArchitectureFamily::Clean, &RuleRegistry::default());
        analyzer.add_rule(Box::new(Everything));

        let outcome = analyzer.analyze_sources(&sources()[..1], &ctx, &AnalysisOptions::sequential());
        let rules: Vec<_> = outcome.violations.iter().map(|v| v.rule_name()).collect();
        assert_eq!(rules, vec!["clean.entity_layer", "acme.everything"]);
    }

    #[test]
    fn test_load_sources_skips_unreadable_files() -> GuardianResult<()> {
        let temp_dir = TempDir::new()?;
        let present = temp_dir.path().join("User.php");
        fs::write(&present, "<?php\nnamespace App\\Domain;\nclass User {}\n")?;
        let missing = temp_dir.path().join("Missing.php");

        let (sources, skipped) = load_sources(&[present.clone(), missing.clone()], &AnalysisOptions::default());
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].path(), present.as_path());
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].path, missing);
        Ok(())
    }
}
