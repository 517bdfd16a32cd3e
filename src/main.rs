//! Architecture Guardian CLI - Command-line interface for architectural conformance checks
//!
//! CDD Principle: Application Layer - CLI coordinates user interactions with domain services
//! - Translates user commands to domain operations
//! - Handles external concerns like file I/O, process exit codes, and terminal output

use anyhow::{bail, Context};
use architecture_guardian::{
    AnalysisOptions, ArchitectureFamily, CancellationToken, GuardianConfig, GuardianValidator,
    OutputFormat, ReportFormatter, ReportOptions, RuleRegistry, Severity, ValidationOptions,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Exit code when violations at or above the threshold were found
const EXIT_VIOLATIONS: i32 = 1;
/// Exit code for configuration and other fatal errors
const EXIT_FAILURE: i32 = 2;

/// Architecture Guardian - architectural conformance checks for PHP code
#[derive(Parser)]
#[command(name = "architecture-guardian")]
#[command(version)]
#[command(about = "Checks PHP source trees against DDD, Clean and Hexagonal architecture rules")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check source trees for architecture violations
    Check(CheckArgs),

    /// Validate a configuration file
    ValidateConfig {
        /// Configuration file to validate
        config_file: Option<PathBuf>,
    },

    /// List the rules of every family
    Rules {
        /// Only show this family
        #[arg(long, value_enum)]
        family: Option<FamilyArg>,
    },

    /// Explain what a specific rule does
    Explain {
        /// Rule identifier, e.g. ddd.domain_layer
        rule_id: String,
    },

    /// Write a default configuration file
    Init {
        /// Destination file
        #[arg(default_value = "architecture_guardian.yaml")]
        file: PathBuf,

        /// Families to enable in the written file
        #[arg(long, value_enum, action = clap::ArgAction::Append)]
        enable: Vec<FamilyArg>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Default)]
struct CheckArgs {
    /// Paths to analyze (files or directories)
    paths: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormatArg>,

    /// Minimum severity to report and fail on (1-5 or a label)
    #[arg(short = 's', long, value_parser = parse_severity)]
    min_severity: Option<Severity>,

    /// Maximum number of violations to list
    #[arg(long)]
    max_violations: Option<usize>,

    /// Additional exclude patterns
    #[arg(long, action = clap::ArgAction::Append)]
    exclude: Vec<String>,

    /// Enable a family regardless of the configuration
    #[arg(long, value_enum, action = clap::ArgAction::Append)]
    enable: Vec<FamilyArg>,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Disable parallel processing
    #[arg(long)]
    no_parallel: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(Copy, Clone, ValueEnum)]
enum OutputFormatArg {
    Human,
    Json,
    Github,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Github => OutputFormat::GitHub,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum FamilyArg {
    Ddd,
    Clean,
    Hexagonal,
    Custom,
}

impl From<FamilyArg> for ArchitectureFamily {
    fn from(arg: FamilyArg) -> Self {
        match arg {
            FamilyArg::Ddd => ArchitectureFamily::Ddd,
            FamilyArg::Clean => ArchitectureFamily::Clean,
            FamilyArg::Hexagonal => ArchitectureFamily::Hexagonal,
            FamilyArg::Custom => ArchitectureFamily::Custom,
        }
    }
}

fn parse_severity(value: &str) -> Result<Severity, String> {
    Severity::parse(value).ok_or_else(|| {
        format!("invalid severity '{value}': expected 1-5 or NOTICE, INFO, WARNING, ERROR, CRITICAL")
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_json);

    match run_command(cli).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(EXIT_FAILURE);
        }
    }
}

async fn run_command(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Check(args) => run_check(cli.config, args).await,
        Commands::ValidateConfig { config_file } => run_validate_config(config_file.or(cli.config)),
        Commands::Rules { family } => run_list_rules(cli.config, family.map(ArchitectureFamily::from)),
        Commands::Explain { rule_id } => run_explain(cli.config, &rule_id),
        Commands::Init { file, enable, force } => run_init(&file, &enable, force),
    }
}

/// Explicit path, else the nearest configuration file, else the defaults
fn load_config(config_path: Option<PathBuf>) -> anyhow::Result<GuardianConfig> {
    let path = match config_path {
        Some(path) => Some(path),
        None => {
            let cwd = std::env::current_dir().context("Cannot determine the current directory")?;
            GuardianConfig::discover(&cwd)
        }
    };

    match path {
        Some(path) => {
            tracing::debug!("Loading configuration from {}", path.display());
            GuardianConfig::load_from_file(&path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))
        }
        None => {
            tracing::debug!("No configuration file found, using defaults");
            Ok(GuardianConfig::default())
        }
    }
}

async fn run_check(config_path: Option<PathBuf>, args: CheckArgs) -> anyhow::Result<i32> {
    let mut config = load_config(config_path)?;

    for family in &args.enable {
        config.analyzers.family_mut((*family).into()).enabled = true;
    }
    if config.analyzers.enabled_families().next().is_none() {
        eprintln!(
            "No architecture families are enabled. Enable one with --enable <family> \
             or create a configuration with `architecture-guardian init`."
        );
    }

    let format = args.format.map(OutputFormat::from).unwrap_or(config.report.format);
    let mut report_options = ReportOptions::from(&config.report);
    if let Some(severity) = args.min_severity {
        report_options.min_severity = severity;
    }
    if args.max_violations.is_some() {
        report_options.max_violations = args.max_violations;
    }
    if args.no_color {
        report_options.use_colors = false;
    }
    let threshold = report_options.min_severity;
    let output = args.output.or_else(|| config.report.output.clone());
    if output.is_some() {
        report_options.use_colors = false;
    }

    let validator = GuardianValidator::new(config)?
        .with_report_formatter(ReportFormatter::new(report_options));

    let paths = if args.paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        args.paths
    };

    let token = CancellationToken::new();
    let options = ValidationOptions {
        analysis: AnalysisOptions {
            parallel: !args.no_parallel,
            cancellation: Some(token.clone()),
        },
        extra_excludes: args.exclude,
    };

    let signal_token = token.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing the files already in progress");
            signal_token.cancel();
        }
    });

    let (validator, report) = tokio::task::spawn_blocking(move || {
        let report = validator.validate_paths(&paths, &options);
        (validator, report)
    })
    .await
    .context("Validation task failed")?;
    signal_task.abort();
    let report = report?;

    let formatted = validator.format_report(&report, format)?;
    match output {
        Some(path) => {
            fs::write(&path, formatted)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(formatted.as_bytes())?;
            stdout.flush()?;
        }
    }

    if report.summary.cancelled {
        return Ok(EXIT_FAILURE);
    }
    if report.has_violations_at(threshold) {
        Ok(EXIT_VIOLATIONS)
    } else {
        Ok(0)
    }
}

fn run_validate_config(config_path: Option<PathBuf>) -> anyhow::Result<i32> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            let cwd = std::env::current_dir().context("Cannot determine the current directory")?;
            match GuardianConfig::discover(&cwd) {
                Some(path) => path,
                None => bail!("No configuration file found; pass one explicitly"),
            }
        }
    };

    println!("Validating configuration: {}", config_path.display());

    match GuardianConfig::load_from_file(&config_path) {
        Ok(config) => {
            println!("Configuration is valid");

            let registry = RuleRegistry::default();
            let enabled: Vec<&str> = config
                .analyzers
                .enabled_families()
                .map(ArchitectureFamily::display_name)
                .collect();
            println!("Configuration summary:");
            if enabled.is_empty() {
                println!("  Enabled families: none");
            } else {
                println!("  Enabled families: {}", enabled.join(", "));
            }

            for id in config.analyzers.custom.custom_rules.keys() {
                if !registry.contains(id) {
                    println!("  Warning: custom rule '{}' is not registered and will be skipped", id);
                }
            }
            println!("  Exclude patterns: {}", config.paths.exclude_patterns.len());
            println!("  Minimum severity: {}", config.report.min_severity);
            println!("  Fingerprint: {}", config.fingerprint());

            Ok(0)
        }
        Err(e) => {
            eprintln!("Configuration validation failed: {}", e);
            Ok(EXIT_FAILURE)
        }
    }
}

fn run_list_rules(config_path: Option<PathBuf>, family: Option<ArchitectureFamily>) -> anyhow::Result<i32> {
    let config = load_config(config_path)?;
    let registry = RuleRegistry::default();

    for current in ArchitectureFamily::ALL {
        if family.map_or(false, |wanted| wanted != current) {
            continue;
        }

        let settings = config.analyzers.family(current);
        let status = if settings.enabled { "enabled" } else { "disabled" };
        println!("{} [{}] ({})", current.display_name(), current.key(), status);

        for id in current.rule_ids() {
            let rule = registry.instantiate(id)?;
            println!("  {} - {}", id, rule.description());
        }
        if current == ArchitectureFamily::Custom {
            for id in settings.custom_rules.keys() {
                println!("  {} (custom)", id);
            }
        }
        println!();
    }

    Ok(0)
}

fn run_explain(config_path: Option<PathBuf>, rule_id: &str) -> anyhow::Result<i32> {
    let config = load_config(config_path)?;
    let registry = RuleRegistry::default();

    let family = ArchitectureFamily::ALL
        .into_iter()
        .find(|family| family.rule_ids().contains(&rule_id));

    let (Some(family), Ok(rule)) = (family, registry.instantiate(rule_id)) else {
        eprintln!("Rule '{}' not found", rule_id);
        println!();
        println!("Available rules:");
        for id in registry.ids() {
            println!("  - {}", id);
        }
        return Ok(EXIT_FAILURE);
    };

    let settings = config.analyzers.family(family);
    println!("Rule: {}", rule.name());
    println!("Family: {} ({})", family.display_name(), if settings.enabled { "enabled" } else { "disabled" });
    println!();
    println!("Description:");
    println!("   {}", rule.description());

    let effective = settings.rule_configs([rule_id]).remove(rule_id).unwrap_or_default();
    if !effective.is_empty() {
        println!();
        println!("Effective options:");
        let rendered = serde_yaml::to_string(&effective).context("Failed to render rule options")?;
        for line in rendered.lines() {
            println!("   {}", line);
        }
    }

    Ok(0)
}

fn run_init(file: &Path, enable: &[FamilyArg], force: bool) -> anyhow::Result<i32> {
    if file.exists() && !force {
        eprintln!("{} already exists; use --force to overwrite", file.display());
        return Ok(EXIT_FAILURE);
    }

    let mut config = GuardianConfig::default();
    for family in enable {
        config.analyzers.family_mut((*family).into()).enabled = true;
    }

    let yaml = config.to_yaml()?;
    let header = "# Architecture Guardian configuration\n\
                  # Enable a family by setting `enabled: true` under analyzers.<family>.\n";
    fs::write(file, format!("{header}{yaml}"))
        .with_context(|| format!("Failed to write {}", file.display()))?;

    println!("Wrote default configuration to {}", file.display());
    Ok(0)
}

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
