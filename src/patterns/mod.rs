//! Fact extraction for architecture analysis
//!
//! Architectural Principle: Service Layer - pattern modules turn raw source text into facts
//! - symbols recovers the declared namespace and type name
//! - dependencies recovers outward dependency edges
//! - SourceFile reads each file once and carries its facts to every rule

pub mod dependencies;
pub mod path_filter;
pub mod symbols;

use crate::domain::violations::{GuardianError, GuardianResult};
use std::fs;
use std::path::{Path, PathBuf};

pub use dependencies::{extract_dependencies, Dependencies, UseStatement};
pub use path_filter::PathFilter;
pub use symbols::{extract_namespace, extract_type_name, fully_qualified_name, is_interface};

/// A source file with its structural facts extracted once
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    content: String,
    namespace: String,
    type_name: String,
    dependencies: Dependencies,
    imports: Vec<UseStatement>,
}

impl SourceFile {
    /// Read `path` and extract its facts.
    ///
    /// Bytes that are not valid UTF-8 (Latin-1 comments in legacy code) are
    /// replaced rather than rejected; only I/O failures are errors.
    pub fn load(path: impl AsRef<Path>) -> GuardianResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| GuardianError::file_read(path, e))?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Self::from_content(path, content))
    }

    /// Extract facts from text already in memory
    pub fn from_content(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            namespace: symbols::extract_namespace(&content),
            type_name: symbols::extract_type_name(&content),
            dependencies: dependencies::extract_dependencies(&content),
            imports: dependencies::use_statements(&content),
            content,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Declared namespace, empty when absent
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Declared class, interface or trait name, empty when absent
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    pub fn imports(&self) -> &[UseStatement] {
        &self.imports
    }

    pub fn fully_qualified_name(&self) -> String {
        symbols::qualify(&self.namespace, &self.type_name)
    }

    pub fn is_interface(&self) -> bool {
        symbols::is_interface(&self.content)
    }

    /// Entries of the declared class's `implements` clause, `None` without one
    pub fn implemented_interfaces(&self) -> Option<Vec<String>> {
        symbols::implemented_interfaces(&self.content, &self.type_name)
    }

    /// Full name an `implements` entry refers to.
    ///
    /// Entries containing a backslash are already qualified; bare names are
    /// looked up in the first import that brings them into scope.
    pub fn resolve_interface<'a>(&'a self, entry: &'a str) -> Option<&'a str> {
        if entry.contains('\\') {
            return Some(entry);
        }
        self.imports
            .iter()
            .find(|import| import.imports(entry))
            .map(|import| import.path.as_str())
    }
}
