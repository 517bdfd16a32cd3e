//! Hexagonal (ports and adapters) rules

use super::{
    forbidden_dependency_violation, implements_from_layer, namespace_matches_any, Rule,
    RuleConfig, RuleContext,
};
use crate::domain::violations::Violation;
use crate::patterns::dependencies::is_same_or_named;
use crate::patterns::SourceFile;

const DOMAIN_NAMESPACES: &[&str] = &["Domain", "Core", "Application"];
const PORT_NAMESPACES: &[&str] = &["Port", "Domain\\Port", "Application\\Port", "Domain\\Contract"];
const ADAPTER_NAMESPACES: &[&str] = &["Infrastructure", "Adapter", "Framework", "UI", "Persistence"];

/// Standard-library types every layer may use
pub(crate) const STANDARD_TYPES: &[&str] = &[
    "DateTimeInterface",
    "DateTime",
    "DateTimeImmutable",
    "Exception",
    "stdClass",
];

/// The domain core depends on nothing but itself and standard types
#[derive(Debug, Default)]
pub struct DomainRule {
    config: RuleConfig,
}

impl DomainRule {
    pub const NAME: &'static str = "hexagonal.domain";
}

impl Rule for DomainRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Domain must not depend on adapters or code outside the domain"
    }

    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn check(&self, file: &SourceFile, _ctx: &RuleContext<'_>) -> Option<Violation> {
        let domain = self.config.list_or("domain_namespaces", DOMAIN_NAMESPACES);
        if !namespace_matches_any(file.namespace(), &domain) {
            return None;
        }

        let adapters = self.config.list_or("adapter_namespaces", ADAPTER_NAMESPACES);
        let allowed = self
            .config
            .list_or("allowed_external_dependencies", STANDARD_TYPES);

        let forbidden = file.dependencies().matching(|dep| {
            let outside = namespace_matches_any(dep, &adapters) || !namespace_matches_any(dep, &domain);
            outside && !allowed.iter().any(|name| is_same_or_named(dep, name))
        });
        if forbidden.is_empty() {
            return None;
        }

        Some(forbidden_dependency_violation(
            Self::NAME,
            file,
            "Domain should not depend on adapters or external code.",
            forbidden,
            5,
        ))
    }
}

/// Ports are interfaces and never reference adapters
#[derive(Debug, Default)]
pub struct PortRule {
    config: RuleConfig,
}

impl PortRule {
    pub const NAME: &'static str = "hexagonal.port";
}

impl Rule for PortRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Ports must be interfaces and must not depend on adapters"
    }

    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn check(&self, file: &SourceFile, _ctx: &RuleContext<'_>) -> Option<Violation> {
        let ports = self.config.list_or("port_namespaces", PORT_NAMESPACES);
        if !namespace_matches_any(file.namespace(), &ports) {
            return None;
        }

        if !file.is_interface() {
            return Some(
                Violation::new(
                    file.path(),
                    "Ports in Hexagonal Architecture should be interfaces",
                    Self::NAME,
                    4,
                )
                .with_detail("namespace", file.namespace()),
            );
        }

        let adapters = self.config.list_or("adapter_namespaces", ADAPTER_NAMESPACES);
        let forbidden = file
            .dependencies()
            .matching(|dep| namespace_matches_any(dep, &adapters));
        if forbidden.is_empty() {
            return None;
        }

        Some(forbidden_dependency_violation(
            Self::NAME,
            file,
            "Ports should not depend on adapters.",
            forbidden,
            4,
        ))
    }
}

/// Adapters implement at least one port
#[derive(Debug, Default)]
pub struct AdapterRule {
    config: RuleConfig,
}

impl AdapterRule {
    pub const NAME: &'static str = "hexagonal.adapter";
}

impl Rule for AdapterRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Adapters should implement a port interface from the domain"
    }

    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn check(&self, file: &SourceFile, _ctx: &RuleContext<'_>) -> Option<Violation> {
        let adapters = self.config.list_or("adapter_namespaces", ADAPTER_NAMESPACES);
        if !namespace_matches_any(file.namespace(), &adapters) {
            return None;
        }

        if !self.config.flag_or("adapters_should_implement_ports", true) {
            return None;
        }

        let ports = self.config.list_or("port_namespaces", PORT_NAMESPACES);
        if implements_from_layer(file, &ports).unwrap_or(false) {
            return None;
        }

        let message = format!(
            "Adapter '{}' should implement a port/interface from the domain",
            file.type_name()
        );
        Some(
            Violation::new(file.path(), message, Self::NAME, 3)
                .with_detail("class_name", file.type_name())
                .with_detail("namespace", file.namespace()),
        )
    }
}
