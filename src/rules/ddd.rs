//! Domain-Driven Design layering rules

use super::{
    forbidden_dependency_violation, implements_from_layer, namespace_matches_any, Rule,
    RuleConfig, RuleContext,
};
use crate::domain::violations::Violation;
use crate::patterns::SourceFile;

const DOMAIN_NAMESPACES: &[&str] = &["Domain", "Model"];
const INFRASTRUCTURE_NAMESPACES: &[&str] = &["Infrastructure", "Infra"];

/// The domain layer may not reach into application or infrastructure code
#[derive(Debug, Default)]
pub struct DomainLayerRule {
    config: RuleConfig,
}

impl DomainLayerRule {
    pub const NAME: &'static str = "ddd.domain_layer";
    const APPLICATION_NAMESPACES: &'static [&'static str] = &["Application"];
}

impl Rule for DomainLayerRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Domain layer must not depend on application or infrastructure layers"
    }

    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn check(&self, file: &SourceFile, _ctx: &RuleContext<'_>) -> Option<Violation> {
        let domain = self.config.list_or("domain_namespaces", DOMAIN_NAMESPACES);
        if !namespace_matches_any(file.namespace(), &domain) {
            return None;
        }

        let application = self
            .config
            .list_or("application_namespaces", Self::APPLICATION_NAMESPACES);
        let infrastructure = self
            .config
            .list_or("infrastructure_namespaces", INFRASTRUCTURE_NAMESPACES);

        let forbidden = file.dependencies().matching(|dep| {
            namespace_matches_any(dep, &application) || namespace_matches_any(dep, &infrastructure)
        });
        if forbidden.is_empty() {
            return None;
        }

        Some(forbidden_dependency_violation(
            Self::NAME,
            file,
            "Domain layer should not depend on application or infrastructure layers.",
            forbidden,
            4,
        ))
    }
}

/// The application layer reaches infrastructure only through interfaces
#[derive(Debug, Default)]
pub struct ApplicationLayerRule {
    config: RuleConfig,
}

impl ApplicationLayerRule {
    pub const NAME: &'static str = "ddd.application_layer";
    const APPLICATION_NAMESPACES: &'static [&'static str] = &["Application", "UseCase"];
}

impl Rule for ApplicationLayerRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Application layer must not depend directly on the infrastructure layer"
    }

    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn check(&self, file: &SourceFile, _ctx: &RuleContext<'_>) -> Option<Violation> {
        let application = self
            .config
            .list_or("application_namespaces", Self::APPLICATION_NAMESPACES);
        if !namespace_matches_any(file.namespace(), &application) {
            return None;
        }

        if self.config.flag_or("can_use_infrastructure", false) {
            return None;
        }

        let infrastructure = self
            .config
            .list_or("infrastructure_namespaces", INFRASTRUCTURE_NAMESPACES);
        let forbidden = file
            .dependencies()
            .matching(|dep| namespace_matches_any(dep, &infrastructure));
        if forbidden.is_empty() {
            return None;
        }

        Some(forbidden_dependency_violation(
            Self::NAME,
            file,
            "Application layer should not depend directly on infrastructure layer but use interfaces.",
            forbidden,
            3,
        ))
    }
}

/// Infrastructure classes that implement interfaces should implement domain ones
#[derive(Debug, Default)]
pub struct InfrastructureLayerRule {
    config: RuleConfig,
}

impl InfrastructureLayerRule {
    pub const NAME: &'static str = "ddd.infrastructure_layer";
}

impl Rule for InfrastructureLayerRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Infrastructure components should implement at least one domain interface"
    }

    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn check(&self, file: &SourceFile, _ctx: &RuleContext<'_>) -> Option<Violation> {
        let infrastructure = self
            .config
            .list_or("infrastructure_namespaces", INFRASTRUCTURE_NAMESPACES);
        if !namespace_matches_any(file.namespace(), &infrastructure) {
            return None;
        }

        let domain = self.config.list_or("domain_namespaces", DOMAIN_NAMESPACES);
        // Classes without an implements clause are not checked
        let implements_domain = implements_from_layer(file, &domain)?;

        if implements_domain || !self.config.flag_or("must_implement_domain_interfaces", true) {
            return None;
        }

        let message = format!(
            "Infrastructure component '{}' should implement at least one domain interface for proper dependency inversion",
            file.type_name()
        );
        Some(
            Violation::new(file.path(), message, Self::NAME, 2)
                .with_detail("class_name", file.type_name())
                .with_detail(
                    "implemented_interfaces",
                    file.implemented_interfaces().unwrap_or_default(),
                ),
        )
    }
}
