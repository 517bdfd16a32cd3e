//! Clean Architecture dependency rules: dependencies point inwards only

use super::{forbidden_dependency_violation, namespace_matches_any, Rule, RuleConfig, RuleContext};
use crate::domain::violations::Violation;
use crate::patterns::SourceFile;

const ENTITY_NAMESPACES: &[&str] = &["Entity", "Domain\\Entity", "Domain\\Model", "Core\\Entity"];
const USE_CASE_NAMESPACES: &[&str] = &["UseCase", "Application", "Domain\\UseCase", "Core\\UseCase"];
const CONTROLLER_NAMESPACES: &[&str] = &["Controller", "Interfaces", "Presentation", "UI"];
const FRAMEWORK_NAMESPACES: &[&str] = &["Framework", "Infrastructure", "External", "Persistence"];

/// Layer pattern lists resolved against a rule's configuration
struct Layers {
    entity: Vec<String>,
    use_case: Vec<String>,
    controller: Vec<String>,
    framework: Vec<String>,
}

impl Layers {
    fn from_config(config: &RuleConfig) -> Self {
        Self {
            entity: config.list_or("entity_namespaces", ENTITY_NAMESPACES),
            use_case: config.list_or("use_case_namespaces", USE_CASE_NAMESPACES),
            controller: config.list_or("controller_namespaces", CONTROLLER_NAMESPACES),
            framework: config.list_or("framework_namespaces", FRAMEWORK_NAMESPACES),
        }
    }
}

/// Entities depend on nothing outside the entity layer
#[derive(Debug, Default)]
pub struct EntityRule {
    config: RuleConfig,
}

impl EntityRule {
    pub const NAME: &'static str = "clean.entity_layer";
}

impl Rule for EntityRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Entities must not depend on use cases, controllers or frameworks"
    }

    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn check(&self, file: &SourceFile, _ctx: &RuleContext<'_>) -> Option<Violation> {
        let layers = Layers::from_config(&self.config);
        if !namespace_matches_any(file.namespace(), &layers.entity) {
            return None;
        }

        let forbidden = file.dependencies().matching(|dep| {
            namespace_matches_any(dep, &layers.use_case)
                || namespace_matches_any(dep, &layers.controller)
                || namespace_matches_any(dep, &layers.framework)
        });
        if forbidden.is_empty() {
            return None;
        }

        Some(forbidden_dependency_violation(
            Self::NAME,
            file,
            "Entity layer should not depend on any other layer (use cases, controllers, frameworks).",
            forbidden,
            5,
        ))
    }
}

/// Use cases may depend on entities but not on delivery or framework code
#[derive(Debug, Default)]
pub struct UseCaseRule {
    config: RuleConfig,
}

impl UseCaseRule {
    pub const NAME: &'static str = "clean.use_case_layer";
}

impl Rule for UseCaseRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Use cases must not depend on controllers or frameworks"
    }

    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn check(&self, file: &SourceFile, _ctx: &RuleContext<'_>) -> Option<Violation> {
        let layers = Layers::from_config(&self.config);
        if !namespace_matches_any(file.namespace(), &layers.use_case) {
            return None;
        }

        let forbidden = file.dependencies().matching(|dep| {
            namespace_matches_any(dep, &layers.controller)
                || namespace_matches_any(dep, &layers.framework)
        });
        if forbidden.is_empty() {
            return None;
        }

        Some(forbidden_dependency_violation(
            Self::NAME,
            file,
            "Use Case layer should not depend on outer layers (controllers, frameworks).",
            forbidden,
            4,
        ))
    }
}

/// Controllers talk to use cases and stay clear of framework internals.
///
/// A framework dependency outranks a missing use-case dependency when both apply.
#[derive(Debug, Default)]
pub struct ControllerRule {
    config: RuleConfig,
}

impl ControllerRule {
    pub const NAME: &'static str = "clean.controller_layer";
}

impl Rule for ControllerRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Controllers should depend on use cases and not on frameworks"
    }

    fn configure(&mut self, config: RuleConfig) {
        self.config = config;
    }

    fn check(&self, file: &SourceFile, _ctx: &RuleContext<'_>) -> Option<Violation> {
        let layers = Layers::from_config(&self.config);
        if !namespace_matches_any(file.namespace(), &layers.controller) {
            return None;
        }

        let dependencies = file.dependencies();
        let forbidden = dependencies.matching(|dep| namespace_matches_any(dep, &layers.framework));
        if !forbidden.is_empty() {
            return Some(forbidden_dependency_violation(
                Self::NAME,
                file,
                "Controller should not depend on framework/infrastructure layer.",
                forbidden,
                3,
            ));
        }

        let uses_use_case = dependencies
            .iter()
            .any(|dep| namespace_matches_any(dep, &layers.use_case));
        if uses_use_case || !self.config.flag_or("should_depend_on_use_cases", true) {
            return None;
        }

        Some(
            Violation::new(
                file.path(),
                "Controller should depend on use cases rather than directly on entities",
                Self::NAME,
                2,
            )
            .with_detail("all_dependencies", dependencies.as_slice().to_vec()),
        )
    }
}
