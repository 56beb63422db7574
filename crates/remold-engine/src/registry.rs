//! Rule registry
//!
//! Provides [`RuleRegistry`], the ordered collection of rule instances a
//! dispatcher consults. Registration order is evaluation order.

use crate::config::RulesConfig;
use crate::error::ConfigError;
use crate::rule::Rule;
use remold_tree::{NodeKind, RuleId};

/// Ordered collection of rules
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule
    ///
    /// Returns `false` and drops the rule if its id is already registered.
    pub fn register(&mut self, rule: impl Rule + 'static) -> bool {
        self.register_boxed(Box::new(rule))
    }

    /// Append an already boxed rule
    pub fn register_boxed(&mut self, rule: Box<dyn Rule>) -> bool {
        if self.contains(rule.id().as_str()) {
            tracing::warn!(rule = %rule.id(), "rule already registered, ignoring");
            return false;
        }
        if rule.interests().is_empty() {
            tracing::warn!(rule = %rule.id(), "rule declares no node kinds, ignoring");
            return false;
        }
        self.rules.push(rule);
        true
    }

    /// Builder form of [`RuleRegistry::register`]
    #[must_use]
    pub fn with(mut self, rule: impl Rule + 'static) -> Self {
        self.register(rule);
        self
    }

    /// Check if a rule id is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.rules.iter().any(|rule| rule.id().as_str() == id)
    }

    /// Rule with the given id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&dyn Rule> {
        self.rules
            .iter()
            .find(|rule| rule.id().as_str() == id)
            .map(|rule| &**rule)
    }

    /// Remove a rule
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|rule| rule.id().as_str() != id);
        self.rules.len() != before
    }

    /// Keep only the rules a configuration enables
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownRule`] if the configuration enables a rule
    /// that is not registered
    pub fn apply_selection(&mut self, config: &RulesConfig) -> Result<(), ConfigError> {
        if let Some(enabled) = &config.enabled {
            if let Some(unknown) = enabled.iter().find(|id| !self.contains(id)) {
                return Err(ConfigError::UnknownRule(unknown.clone()));
            }
        }
        self.rules.retain(|rule| config.is_enabled(rule.id().as_str()));
        Ok(())
    }

    /// Registered rule ids, in evaluation order
    #[must_use]
    pub fn names(&self) -> Vec<RuleId> {
        self.rules.iter().map(|rule| rule.id()).collect()
    }

    /// Rules interested in a node kind, in evaluation order
    pub fn interested_in(&self, kind: NodeKind) -> impl Iterator<Item = &dyn Rule> {
        self.rules
            .iter()
            .filter(move |rule| rule.interests().contains(kind))
            .map(|rule| &**rule)
    }

    /// Iterate over all rules
    pub fn iter(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|rule| &**rule)
    }

    /// Get number of registered rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
