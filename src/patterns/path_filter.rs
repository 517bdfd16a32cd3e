//! Source file discovery with extension and exclude filtering
//!
//! Architectural Principle: Service Layer - PathFilter owns the rules for which files reach the analyzers
//! - Plain patterns such as `/vendor/` exclude any path containing them
//! - Patterns with glob metacharacters are matched as globs
//! - A leading `!` turns a pattern into an include that overrides earlier excludes

use crate::domain::violations::{GuardianError, GuardianResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories skipped by default, matched as path substrings
pub const DEFAULT_EXCLUDES: [&str; 4] = ["/vendor/", "/tests/", "/var/", "/cache/"];

/// Extension of files analyzed by default
pub const DEFAULT_EXTENSION: &str = "php";

/// Decides which files under a root are analyzed
#[derive(Debug, Clone)]
pub struct PathFilter {
    /// Include/exclude patterns, later patterns win
    patterns: Vec<FilterPattern>,
    /// Accepted file extensions without the dot
    extensions: Vec<String>,
}

/// A single path filter pattern
#[derive(Debug, Clone)]
struct FilterPattern {
    matcher: Matcher,
    /// Whether this is an include pattern (starts with !)
    is_include: bool,
}

#[derive(Debug, Clone)]
enum Matcher {
    Substring(String),
    Glob { pattern: glob::Pattern, whole_path: bool },
}

impl FilterPattern {
    fn parse(raw: &str) -> GuardianResult<Self> {
        let (is_include, raw) = match raw.strip_prefix('!') {
            Some(stripped) => (true, stripped),
            None => (false, raw),
        };

        let matcher = if raw.contains(['*', '?', '[']) {
            let pattern = glob::Pattern::new(raw)
                .map_err(|e| GuardianError::pattern(format!("Invalid pattern '{raw}': {e}")))?;
            Matcher::Glob {
                pattern,
                whole_path: raw.contains('/'),
            }
        } else {
            Matcher::Substring(raw.to_string())
        };

        Ok(Self { matcher, is_include })
    }

    fn matches(&self, normalized: &str, file_name: &str) -> bool {
        match &self.matcher {
            Matcher::Substring(needle) => normalized.contains(needle.as_str()),
            Matcher::Glob { pattern, whole_path: true } => {
                pattern.matches(normalized) || pattern.matches(normalized.trim_start_matches('/'))
            }
            Matcher::Glob { pattern, whole_path: false } => pattern.matches(file_name),
        }
    }
}

impl PathFilter {
    /// Create a path filter from exclude patterns and accepted extensions
    pub fn new(patterns: Vec<String>, extensions: Vec<String>) -> GuardianResult<Self> {
        let patterns = patterns
            .iter()
            .map(|raw| FilterPattern::parse(raw))
            .collect::<GuardianResult<Vec<_>>>()?;

        let extensions = extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_string())
            .collect();

        Ok(Self { patterns, extensions })
    }

    /// Filter with the default excludes and `.php` files only
    pub fn with_defaults() -> GuardianResult<Self> {
        Self::new(
            DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            vec![DEFAULT_EXTENSION.to_string()],
        )
    }

    /// Check whether a path passes the extension and pattern filters
    pub fn should_analyze<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        self.has_accepted_extension(path) && !self.is_excluded(&normalize(path), path)
    }

    fn has_accepted_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .map(|ext| ext.to_string_lossy())
            .map_or(false, |ext| self.extensions.iter().any(|accepted| *accepted == ext))
    }

    /// Apply patterns in order, like .gitignore
    fn is_excluded(&self, normalized: &str, path: &Path) -> bool {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut excluded = false;
        for pattern in &self.patterns {
            if pattern.matches(normalized, &file_name) {
                excluded = !pattern.is_include;
            }
        }
        excluded
    }

    /// All files below `root` that should be analyzed, sorted.
    ///
    /// Patterns are matched against the path relative to `root` with a
    /// leading `/`, so `/vendor/` also excludes a top-level `vendor` directory.
    /// A `root` that is itself a file is returned when its extension matches.
    pub fn find_files<P: AsRef<Path>>(&self, root: P) -> GuardianResult<Vec<PathBuf>> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(GuardianError::validation(format!(
                "Path does not exist: {}",
                root.display()
            )));
        }

        if root.is_file() {
            let files = if self.has_accepted_extension(root) {
                vec![root.to_path_buf()]
            } else {
                Vec::new()
            };
            return Ok(files);
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(false).into_iter() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !self.has_accepted_extension(path) {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path);
            let normalized = format!("/{}", normalize(relative));
            if !self.is_excluded(&normalized, path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Filter a list of paths to only those that should be analyzed
    pub fn filter_paths<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<PathBuf> {
        paths
            .iter()
            .filter(|path| self.should_analyze(path))
            .map(|path| path.as_ref().to_path_buf())
            .collect()
    }

    /// Add a pattern to the filter
    pub fn add_pattern(&mut self, pattern: &str) -> GuardianResult<()> {
        self.patterns.push(FilterPattern::parse(pattern)?);
        Ok(())
    }
}

/// Path as a string with forward slashes
fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
