//! Lexical symbol extraction: declared namespace, declared type name and
//! `implements` clauses. Never parses; every function is total.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NAMESPACE_DECL: Regex =
        Regex::new(r"namespace\s+([^;]+);").expect("constant pattern is valid");
    static ref CLASS_DECL: Regex =
        Regex::new(r"class\s+([a-zA-Z0-9_]+)").expect("constant pattern is valid");
    static ref INTERFACE_DECL: Regex =
        Regex::new(r"interface\s+([a-zA-Z0-9_]+)").expect("constant pattern is valid");
    static ref TRAIT_DECL: Regex =
        Regex::new(r"trait\s+([a-zA-Z0-9_]+)").expect("constant pattern is valid");
    /// Interface declarations must be preceded by whitespace
    static ref INTERFACE_CHECK: Regex =
        Regex::new(r"\sinterface\s+[a-zA-Z0-9_]+").expect("constant pattern is valid");
}

/// First `namespace X;` declaration, trimmed; empty when there is none
pub fn extract_namespace(content: &str) -> String {
    NAMESPACE_DECL
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Declared type name: the first `class`, else the first `interface`, else the
/// first `trait` anywhere in the text; empty when none is declared
pub fn extract_type_name(content: &str) -> String {
    [&*CLASS_DECL, &*INTERFACE_DECL, &*TRAIT_DECL]
        .iter()
        .find_map(|decl| decl.captures(content).and_then(|caps| caps.get(1)))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Whether the text declares an interface
pub fn is_interface(content: &str) -> bool {
    INTERFACE_CHECK.is_match(content)
}

/// `Namespace\TypeName`, or empty if either part is missing
pub fn fully_qualified_name(content: &str) -> String {
    qualify(&extract_namespace(content), &extract_type_name(content))
}

pub(crate) fn qualify(namespace: &str, type_name: &str) -> String {
    if namespace.is_empty() || type_name.is_empty() {
        return String::new();
    }
    format!("{namespace}\\{type_name}")
}

/// Entries of the `implements` list that follows `class <type_name>`.
///
/// Returns `None` when the class has no `implements` clause. The list ends at
/// the first `{` and entries are trimmed; `.` does not cross lines between the
/// class name and the keyword.
pub fn implemented_interfaces(content: &str, type_name: &str) -> Option<Vec<String>> {
    let pattern = format!(r"class\s+{}.*implements\s+([^{{]+)", regex::escape(type_name));
    let clause = Regex::new(&pattern).ok()?;
    let list = clause.captures(content)?.get(1)?.as_str();

    Some(list.split(',').map(|entry| entry.trim().to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ENTITY: &str = "<?php\n\nnamespace App\\Domain\\Entity;\n\nclass User\n{\n}\n";

    #[test]
    fn test_patterns_compile() {
        lazy_static::initialize(&NAMESPACE_DECL);
        lazy_static::initialize(&CLASS_DECL);
        lazy_static::initialize(&INTERFACE_DECL);
        lazy_static::initialize(&TRAIT_DECL);
        lazy_static::initialize(&INTERFACE_CHECK);
    }

    #[test]
    fn test_extract_namespace() {
        assert_eq!(extract_namespace(ENTITY), "App\\Domain\\Entity");
        assert_eq!(extract_namespace("<?php\nnamespace   App\\Core ;\n"), "App\\Core");
        assert_eq!(extract_namespace("<?php\nclass User {}\n"), "");
    }

    #[rstest]
    #[case("<?php\nclass User {}", "User")]
    #[case("<?php\ninterface UserRepository {}", "UserRepository")]
    #[case("<?php\ntrait Loggable {}", "Loggable")]
    #[case("<?php\ntrait Loggable {}\nclass Late {}", "Late")]
    #[case("<?php\nfunction helper() {}", "")]
    fn test_extract_type_name(#[case] content: &str, #[case] expected: &str) {
        assert_eq!(extract_type_name(content), expected);
    }

    #[test]
    fn test_is_interface_requires_leading_whitespace() {
        assert!(is_interface("<?php\ninterface Port {}"));
        assert!(!is_interface("interface Port {}"));
        assert!(!is_interface("<?php\nclass Port {}"));
    }

    #[test]
    fn test_fully_qualified_name() {
        assert_eq!(fully_qualified_name(ENTITY), "App\\Domain\\Entity\\User");
        assert_eq!(fully_qualified_name("<?php\nnamespace App\\Domain;\n"), "");
        assert_eq!(fully_qualified_name("<?php\nclass User {}"), "");
    }

    #[test]
    fn test_implemented_interfaces() {
        let content = "<?php\nclass DoctrineRepo extends Base implements UserRepository, \\App\\Domain\\Port\\Clock\n{\n}";
        assert_eq!(
            implemented_interfaces(content, "DoctrineRepo"),
            Some(vec![
                "UserRepository".to_string(),
                "\\App\\Domain\\Port\\Clock".to_string()
            ])
        );
        assert_eq!(implemented_interfaces("<?php\nclass Foo {}", "Foo"), None);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let first = (extract_namespace(ENTITY), extract_type_name(ENTITY));
        let second = (extract_namespace(ENTITY), extract_type_name(ENTITY));
        assert_eq!(first, second);
    }
}
