//! Dependency edge extraction
//!
//! Five independent lexical passes over the raw text: `use` imports,
//! parameter type hints, return types, constructor parameters and typed
//! properties. Type hints only count when written fully qualified with a
//! leading backslash, which is kept as part of the name.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref USE_STATEMENT: Regex =
        Regex::new(r"use\s+([^;]+);").expect("constant pattern is valid");
    static ref USE_ALIAS: Regex =
        Regex::new(r"(?is)^(.+?)\s+as\s+(\w+)$").expect("constant pattern is valid");
    static ref PARAMETER_HINT: Regex =
        Regex::new(r"(?s)function\s+\w+\s*\(.*?(\\\w+(?:\\\w+)*)\s+\$\w+.*?\)")
            .expect("constant pattern is valid");
    static ref RETURN_HINT: Regex =
        Regex::new(r"(?s)function\s+\w+\s*\(.*?\)\s*:\s*(\\\w+(?:\\\w+)*)")
            .expect("constant pattern is valid");
    static ref CONSTRUCTOR_HINT: Regex =
        Regex::new(r"(?s)function\s+__construct\s*\(.*?(\\\w+(?:\\\w+)*)\s+\$\w+.*?\)")
            .expect("constant pattern is valid");
    static ref PROPERTY_HINT: Regex =
        Regex::new(r"(?:private|protected|public)\s+(\\\w+(?:\\\w+)*)\s+\$\w+")
            .expect("constant pattern is valid");
}

/// A single `use` import with its optional alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseStatement {
    pub path: String,
    pub alias: Option<String>,
}

impl UseStatement {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match USE_ALIAS.captures(raw) {
            Some(caps) => Self {
                path: caps[1].trim().to_string(),
                alias: Some(caps[2].to_string()),
            },
            None => Self {
                path: raw.to_string(),
                alias: None,
            },
        }
    }

    /// Segment after the last backslash of the imported path
    pub fn short_name(&self) -> &str {
        self.path.rsplit('\\').next().unwrap_or(&self.path)
    }

    /// Whether this import brings `name` into scope, by alias or short name
    pub fn imports(&self, name: &str) -> bool {
        self.alias.as_deref() == Some(name) || self.short_name() == name
    }
}

/// All `use` imports in source order
pub fn use_statements(content: &str) -> Vec<UseStatement> {
    USE_STATEMENT
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| UseStatement::parse(m.as_str()))
        .collect()
}

/// Deduplicated dependency names in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    ordered: Vec<String>,
    index: HashSet<String>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a trimmed name unless already present
    pub fn insert(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.index.contains(name) {
            return false;
        }
        self.index.insert(name.to_string());
        self.ordered.push(name.to_string());
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ordered
    }

    /// Dependencies satisfying `predicate`, in extraction order
    pub fn matching<F>(&self, mut predicate: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        self.ordered.iter().filter(|dep| predicate(dep)).cloned().collect()
    }

    /// Whether any dependency equals `target` or lives below `target\`
    pub fn has_dependency(&self, target: &str) -> bool {
        self.iter().any(|dep| is_same_or_child(dep, target))
    }

    /// Dependencies that equal or live below any of `forbidden`
    pub fn find_forbidden(&self, forbidden: &[String]) -> Vec<String> {
        self.matching(|dep| forbidden.iter().any(|f| is_same_or_child(dep, f)))
    }
}

impl<'a> FromIterator<&'a str> for Dependencies {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut deps = Self::new();
        for name in iter {
            deps.insert(name);
        }
        deps
    }
}

/// `dep == base` or `dep` starts with `base\`
pub fn is_same_or_child(dep: &str, base: &str) -> bool {
    dep == base
        || dep
            .strip_prefix(base)
            .map_or(false, |rest| rest.starts_with('\\'))
}

/// `dep == name` or `dep` ends with `\name`
pub fn is_same_or_named(dep: &str, name: &str) -> bool {
    dep == name
        || dep
            .strip_suffix(name)
            .map_or(false, |rest| rest.ends_with('\\'))
}

/// Extract every outward dependency named in `content`
pub fn extract_dependencies(content: &str) -> Dependencies {
    let mut deps = Dependencies::new();

    for import in use_statements(content) {
        deps.insert(&import.path);
    }

    for pass in [
        &*PARAMETER_HINT,
        &*RETURN_HINT,
        &*CONSTRUCTOR_HINT,
        &*PROPERTY_HINT,
    ] {
        for caps in pass.captures_iter(content) {
            if let Some(m) = caps.get(1) {
                deps.insert(m.as_str());
            }
        }
    }

    deps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_compile() {
        lazy_static::initialize(&USE_STATEMENT);
        lazy_static::initialize(&USE_ALIAS);
        lazy_static::initialize(&PARAMETER_HINT);
        lazy_static::initialize(&RETURN_HINT);
        lazy_static::initialize(&CONSTRUCTOR_HINT);
        lazy_static::initialize(&PROPERTY_HINT);
    }

    const SERVICE: &str = r#"<?php

namespace App\Application;

use App\Domain\User;
use App\Infrastructure\Mailer as SmtpMailer;
use App\Domain\User;

class RegisterUser
{
    private \App\Domain\Clock $clock;

    public function __construct(\App\Infrastructure\Db $db, $plain)
    {
    }

    public function handle(int $id, \App\Domain\Command $command): \App\Domain\Result
    {
    }
}
"#;

    #[test]
    fn test_extracts_all_passes_in_order() {
        let deps = extract_dependencies(SERVICE);
        let names: Vec<_> = deps.iter().collect();
        assert_eq!(
            names,
            vec![
                "App\\Domain\\User",
                "App\\Infrastructure\\Mailer",
                "\\App\\Infrastructure\\Db",
                "\\App\\Domain\\Command",
                "\\App\\Domain\\Result",
                "\\App\\Domain\\Clock",
            ]
        );
    }

    #[test]
    fn test_alias_is_removed_and_recorded() {
        let imports = use_statements(SERVICE);
        assert_eq!(imports[1].path, "App\\Infrastructure\\Mailer");
        assert_eq!(imports[1].alias.as_deref(), Some("SmtpMailer"));
        assert!(imports[1].imports("SmtpMailer"));
        assert!(imports[1].imports("Mailer"));
        assert_eq!(imports[0].short_name(), "User");
    }

    #[test]
    fn test_unqualified_hints_are_ignored() {
        let deps = extract_dependencies("<?php\nfunction run(User $user): Result {}\n");
        assert!(deps.is_empty());
    }

    #[test]
    fn test_dependencies_are_trimmed_and_unique() {
        let deps: Dependencies = vec!["  A\\B ", "A\\B", "C"].into_iter().collect();
        assert_eq!(deps.len(), 2);
        assert!(deps.contains("A\\B"));
        assert!(!deps.contains("  A\\B "));
    }

    #[test]
    fn test_prefix_and_suffix_helpers() {
        assert!(is_same_or_child("App\\Domain\\User", "App\\Domain"));
        assert!(is_same_or_child("App\\Domain", "App\\Domain"));
        assert!(!is_same_or_child("App\\DomainX\\User", "App\\Domain"));

        assert!(is_same_or_named("\\DateTimeImmutable", "DateTimeImmutable"));
        assert!(is_same_or_named("Exception", "Exception"));
        assert!(!is_same_or_named("MyException", "Exception"));
    }

    #[test]
    fn test_find_forbidden() {
        let deps = extract_dependencies(SERVICE);
        let forbidden = deps.find_forbidden(&["App\\Infrastructure".to_string()]);
        assert_eq!(forbidden, vec!["App\\Infrastructure\\Mailer"]);
        assert!(deps.has_dependency("App\\Domain"));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        assert_eq!(extract_dependencies(SERVICE), extract_dependencies(SERVICE));
    }
}
