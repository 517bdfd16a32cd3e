//! Report generation with multiple output formats
//!
//! Formatters translate a [`ValidationReport`] into something a person or a
//! CI system can consume. None of them change the report itself.

use crate::config::ReportConfig;
use crate::domain::violations::{GuardianError, GuardianResult, Severity, ValidationReport, Violation};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Supported output formats for validation reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Numbered, optionally colored console listing
    #[default]
    #[serde(alias = "console")]
    Human,
    /// JSON document for programmatic consumption
    Json,
    /// GitHub Actions workflow annotations
    #[serde(alias = "github-actions")]
    GitHub,
}

impl OutputFormat {
    /// Get all available format names
    pub fn all_formats() -> &'static [&'static str] {
        &["human", "json", "github"]
    }
}

impl FromStr for OutputFormat {
    type Err = GuardianError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "console" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "github" | "github-actions" => Ok(Self::GitHub),
            other => Err(GuardianError::config(format!(
                "Unknown output format '{}'. Available: {}",
                other,
                Self::all_formats().join(", ")
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Human => "human",
            Self::Json => "json",
            Self::GitHub => "github",
        };
        f.write_str(name)
    }
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use colored output (human format only)
    pub use_colors: bool,
    /// Violations below this level are left out
    pub min_severity: Severity,
    /// Maximum number of violations to list
    pub max_violations: Option<usize>,
    /// List forbidden dependencies under each violation
    pub show_details: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            use_colors: true,
            min_severity: Severity::Notice,
            max_violations: None,
            show_details: true,
        }
    }
}

impl From<&ReportConfig> for ReportOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            use_colors: config.use_colors,
            min_severity: config.min_severity,
            max_violations: config.max_violations,
            show_details: true,
        }
    }
}

/// Renders validation reports in the supported formats
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    /// Format a validation report in the specified format
    pub fn format_report(&self, report: &ValidationReport, format: OutputFormat) -> GuardianResult<String> {
        let selected = self.select(report);

        match format {
            OutputFormat::Human => Ok(self.format_human(report, &selected)),
            OutputFormat::Json => self.format_json(report, &selected),
            OutputFormat::GitHub => Ok(self.format_github(&selected.shown)),
        }
    }

    /// Write a formatted report to a writer
    pub fn write_report<W: Write>(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
        mut writer: W,
    ) -> GuardianResult<()> {
        let formatted = self.format_report(report, format)?;
        writer.write_all(formatted.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    fn select<'a>(&self, report: &'a ValidationReport) -> Selection<'a> {
        let mut shown: Vec<&Violation> = report
            .violations
            .iter()
            .filter(|v| v.severity() >= self.options.min_severity)
            .collect();
        let matching = shown.len();

        if let Some(max) = self.options.max_violations {
            shown.truncate(max);
        }

        Selection { shown, matching }
    }

    fn format_human(&self, report: &ValidationReport, selection: &Selection<'_>) -> String {
        let mut output = String::new();

        if selection.matching == 0 {
            output.push_str(&self.paint("No architecture violations found!", |s| s.green()));
            output.push('\n');
        } else {
            let header = format!("Found {} architecture violation(s):\n", selection.matching);
            output.push_str(&self.paint(&header, |s| s.red()));

            for (index, violation) in selection.shown.iter().enumerate() {
                self.push_violation(&mut output, index + 1, violation);
            }

            let hidden = selection.matching - selection.shown.len();
            if hidden > 0 {
                output.push_str(&format!("... and {} more not shown\n\n", hidden));
            }
        }

        output.push_str(&self.format_summary(report));
        output
    }

    fn push_violation(&self, output: &mut String, number: usize, violation: &Violation) {
        let path = violation.file_path().display().to_string();
        output.push_str(&format!(
            "\n{}) {} in {}\n",
            number,
            self.severity_label(violation.severity()),
            self.paint(&path, |s| s.cyan()),
        ));
        output.push_str(&format!("   Rule: {}\n", violation.rule_name()));
        output.push_str(&format!("   {}\n", violation.message()));

        if self.options.show_details {
            let forbidden = violation.forbidden_dependencies();
            if !forbidden.is_empty() {
                output.push_str("   Forbidden dependencies:\n");
                for dep in forbidden {
                    output.push_str(&format!("     - {}\n", dep));
                }
            }
        }

        output.push('\n');
    }

    fn severity_label(&self, severity: Severity) -> String {
        let label = severity.label();
        if !self.options.use_colors {
            return label.to_string();
        }

        match severity {
            Severity::Notice => label.blue(),
            Severity::Info => label.cyan(),
            Severity::Warning => label.yellow(),
            Severity::Error => label.red(),
            Severity::Critical => label.white().on_red(),
        }
        .to_string()
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> colored::ColoredString) -> String {
        if self.options.use_colors {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Format the summary footer
    fn format_summary(&self, report: &ValidationReport) -> String {
        let summary = &report.summary;
        let seconds = summary.execution_time_ms as f64 / 1000.0;

        let counts: Vec<String> = Severity::ALL
            .iter()
            .rev()
            .filter_map(|&severity| {
                let count = summary.violations_by_severity.get(severity);
                (count > 0).then(|| format!("{} {}", count, severity.label().to_lowercase()))
            })
            .collect();
        let counts = if counts.is_empty() {
            "0 violations".to_string()
        } else {
            counts.join(", ")
        };

        let mut footer = format!(
            "{} {} in {} files ({:.1}s)\n",
            self.paint("Summary:", |s| s.bold()),
            counts,
            summary.total_files,
            seconds
        );

        if !summary.skipped_files.is_empty() {
            footer.push_str(&format!("Skipped {} unreadable file(s)\n", summary.skipped_files.len()));
        }
        if summary.cancelled {
            footer.push_str(&self.paint("Validation was cancelled; results are partial\n", |s| s.yellow()));
        }

        footer
    }

    fn format_json(&self, report: &ValidationReport, selection: &Selection<'_>) -> GuardianResult<String> {
        let summary = &report.summary;
        let counts = &summary.violations_by_severity;

        let json_report = serde_json::json!({
            "violations": selection.shown,
            "summary": {
                "total_files": summary.total_files,
                "skipped_files": summary.skipped_files,
                "violations_by_severity": {
                    "NOTICE": counts.notice,
                    "INFO": counts.info,
                    "WARNING": counts.warning,
                    "ERROR": counts.error,
                    "CRITICAL": counts.critical,
                },
                "total_violations": counts.total(),
                "reported_violations": selection.shown.len(),
                "execution_time_ms": summary.execution_time_ms,
                "validated_at": summary.validated_at.to_rfc3339(),
                "cancelled": summary.cancelled,
            },
            "config_fingerprint": report.config_fingerprint,
        });

        let mut rendered = serde_json::to_string_pretty(&json_report)
            .map_err(|e| GuardianError::validation(format!("Failed to serialize report: {}", e)))?;
        rendered.push('\n');
        Ok(rendered)
    }

    fn format_github(&self, violations: &[&Violation]) -> String {
        let mut output = String::new();

        for violation in violations {
            let level = match violation.severity().level() {
                4..=5 => "error",
                3 => "warning",
                _ => "notice",
            };

            output.push_str(&format!(
                "::{} file={},title={}::{}\n",
                level,
                violation.file_path().display(),
                violation.rule_name(),
                escape_annotation(violation.message())
            ));
        }

        output
    }
}

struct Selection<'a> {
    shown: Vec<&'a Violation>,
    matching: usize,
}

/// Annotation messages end at the first newline unless it is encoded
fn escape_annotation(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn create_test_report() -> ValidationReport {
        let mut report = ValidationReport::new();
        report.add_violation(
            Violation::new(
                "src/Domain/User.php",
                "Domain layer should not depend on application or infrastructure layers. Found dependencies: App\\Infrastructure\\Db",
                "ddd.domain_layer",
                4,
            )
            .with_detail("forbidden_dependencies", vec!["App\\Infrastructure\\Db"])
            .with_detail("all_dependencies", vec!["App\\Infrastructure\\Db"]),
        );
        report.add_violation(Violation::new(
            "src/Infrastructure/Foo.php",
            "Adapter 'Foo' should implement a port/interface from the domain",
            "hexagonal.adapter",
            3,
        ));
        report.add_violation(Violation::new(
            "src/Ui/HomeController.php",
            "Naming convention",
            "custom.naming_convention",
            2,
        ));
        report.set_files_analyzed(3);
        report.set_execution_time(1500);
        report
    }

    fn plain(min_severity: Severity) -> ReportFormatter {
        ReportFormatter::new(ReportOptions {
            use_colors: false,
            min_severity,
            ..Default::default()
        })
    }

    #[test]
    fn test_human_format() {
        let report = create_test_report();
        let output = plain(Severity::Notice)
            .format_report(&report, OutputFormat::Human)
            .unwrap();

        assert!(output.starts_with("Found 3 architecture violation(s):\n"));
        assert!(output.contains("\n1) ERROR in src/Domain/User.php\n   Rule: ddd.domain_layer\n"));
        assert!(output.contains("   Forbidden dependencies:\n     - App\\Infrastructure\\Db\n"));
        assert!(output.contains("\n2) WARNING in src/Infrastructure/Foo.php\n"));
        assert!(output.contains("\n3) INFO in src/Ui/HomeController.php\n"));
        assert!(output.contains("Summary: 1 error, 1 warning, 1 info in 3 files (1.5s)"));
    }

    #[test]
    fn test_human_format_respects_min_severity() {
        let report = create_test_report();
        let output = plain(Severity::Warning)
            .format_report(&report, OutputFormat::Human)
            .unwrap();

        assert!(output.starts_with("Found 2 architecture violation(s):\n"));
        assert!(!output.contains("HomeController"));
    }

    #[test]
    fn test_human_format_without_violations() {
        let report = create_test_report();
        let output = plain(Severity::Critical)
            .format_report(&report, OutputFormat::Human)
            .unwrap();
        assert!(output.starts_with("No architecture violations found!\n"));
    }

    #[test]
    fn test_max_violations_truncates_listing() {
        let report = create_test_report();
        let formatter = ReportFormatter::new(ReportOptions {
            use_colors: false,
            max_violations: Some(1),
            ..Default::default()
        });
        let output = formatter.format_report(&report, OutputFormat::Human).unwrap();

        assert!(output.starts_with("Found 3 architecture violation(s):\n"));
        assert!(!output.contains("\n2) "));
        assert!(output.contains("... and 2 more not shown"));
    }

    #[test]
    fn test_details_can_be_hidden() {
        let report = create_test_report();
        let formatter = ReportFormatter::new(ReportOptions {
            use_colors: false,
            show_details: false,
            ..Default::default()
        });
        let output = formatter.format_report(&report, OutputFormat::Human).unwrap();
        assert!(!output.contains("Forbidden dependencies"));
    }

    #[test]
    fn test_json_format() {
        let mut report = create_test_report();
        report.set_config_fingerprint("abc123");
        let output = plain(Severity::Warning)
            .format_report(&report, OutputFormat::Json)
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        let violations = parsed["violations"].as_array().unwrap();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0]["rule_name"], "ddd.domain_layer");
        assert_eq!(violations[0]["severity"], 4);
        assert_eq!(parsed["summary"]["total_violations"], 3);
        assert_eq!(parsed["summary"]["violations_by_severity"]["WARNING"], 1);
        assert_eq!(parsed["config_fingerprint"], "abc123");
    }

    #[test]
    fn test_github_format() {
        let report = create_test_report();
        let output = plain(Severity::Notice)
            .format_report(&report, OutputFormat::GitHub)
            .unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("::error file=src/Domain/User.php,title=ddd.domain_layer::"));
        assert!(lines[1].starts_with("::warning file=src/Infrastructure/Foo.php"));
        assert!(lines[2].starts_with("::notice file=src/Ui/HomeController.php"));
    }

    #[rstest]
    #[case("human", OutputFormat::Human)]
    #[case("console", OutputFormat::Human)]
    #[case("JSON", OutputFormat::Json)]
    #[case("github", OutputFormat::GitHub)]
    fn test_parse_format(#[case] input: &str, #[case] expected: OutputFormat) {
        assert_eq!(input.parse::<OutputFormat>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_format() {
        assert!("junit".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_write_report() {
        let report = create_test_report();
        let mut buffer = Vec::new();
        plain(Severity::Error)
            .write_report(&report, OutputFormat::GitHub, &mut buffer)
            .unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap().lines().count(), 1);
    }
}
