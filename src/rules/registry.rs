//! Name-to-factory registry for late-bound rules

use super::{clean, custom, ddd, hexagonal, split_rule_name, Rule, RuleConfig};
use crate::domain::violations::{GuardianError, GuardianResult};
use std::collections::BTreeMap;

/// Builds a fresh, unconfigured rule
pub type RuleFactory = fn() -> Box<dyn Rule>;

/// Factory for any default-constructible rule
pub fn boxed<R: Rule + Default + 'static>() -> Box<dyn Rule> {
    Box::<R>::default()
}

/// Registry of every rule that can be instantiated by identifier
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    factories: BTreeMap<String, RuleFactory>,
}

impl RuleRegistry {
    /// Registry without any rules
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry pre-populated with the built-in rules
    pub fn with_builtin_rules() -> Self {
        let mut registry = Self::empty();
        registry.register(ddd::DomainLayerRule::NAME, boxed::<ddd::DomainLayerRule>);
        registry.register(ddd::ApplicationLayerRule::NAME, boxed::<ddd::ApplicationLayerRule>);
        registry.register(ddd::InfrastructureLayerRule::NAME, boxed::<ddd::InfrastructureLayerRule>);
        registry.register(clean::EntityRule::NAME, boxed::<clean::EntityRule>);
        registry.register(clean::UseCaseRule::NAME, boxed::<clean::UseCaseRule>);
        registry.register(clean::ControllerRule::NAME, boxed::<clean::ControllerRule>);
        registry.register(hexagonal::DomainRule::NAME, boxed::<hexagonal::DomainRule>);
        registry.register(hexagonal::PortRule::NAME, boxed::<hexagonal::PortRule>);
        registry.register(hexagonal::AdapterRule::NAME, boxed::<hexagonal::AdapterRule>);
        registry.register(
            custom::NamespaceDependencyRule::NAME,
            boxed::<custom::NamespaceDependencyRule>,
        );
        registry.register(
            custom::NamingConventionRule::NAME,
            boxed::<custom::NamingConventionRule>,
        );
        registry
    }

    /// Register or replace a factory under `id`
    pub fn register(&mut self, id: impl Into<String>, factory: RuleFactory) {
        let id = id.into();
        tracing::debug!("Registering rule factory '{}'", id);
        self.factories.insert(id, factory);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered identifiers in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Instantiate a rule without configuring it
    pub fn instantiate(&self, id: &str) -> GuardianResult<Box<dyn Rule>> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| GuardianError::rule_not_found(id))?;
        Ok(factory())
    }

    /// Instantiate, configure and validate the rule registered under `id`
    pub fn create(&self, id: &str, config: RuleConfig) -> GuardianResult<Box<dyn Rule>> {
        let mut rule = self.instantiate(id)?;

        if split_rule_name(rule.name()).is_none() {
            return Err(GuardianError::invalid_rule(
                id,
                format!("rule name '{}' is not of the form <family>.<policy>", rule.name()),
            ));
        }

        rule.configure(config);
        rule.validate().map_err(|e| match e {
            GuardianError::InvalidRule { .. } => e,
            other => GuardianError::invalid_rule(id, other.to_string()),
        })?;

        Ok(rule)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_builtin_rules()
    }
}
