//! Engine configuration
//!
//! Loaded from TOML; every field has a default, so an empty file is a valid
//! configuration.
//!
//! ```toml
//! [traversal]
//! revisit = "reevaluate"
//! max_rewrites_per_node = 4
//!
//! [context]
//! test_base_classes = ["PHPUnit\\Framework\\TestCase"]
//! test_class_pattern = "Test$"
//!
//! [driver]
//! fault_budget = 100
//! deadline_ms = 5000
//!
//! [driver.convergence]
//! mode = "until_stable"
//! max_passes = 5
//!
//! [ownership]
//! vendor_markers = ["/vendor/"]
//!
//! [oracle]
//! cache_capacity = 10000
//!
//! [rules]
//! enabled = ["specific-will-method", "optional-params-after-required"]
//!
//! [rules.specific-will-method]
//! matcher = "equalTo"
//! ```

use crate::error::ConfigError;
use regex::Regex;
use remold_oracle::OwnershipPolicy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// What happens after a rule rewrites a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisitPolicy {
    /// The first rewrite wins; no other rule sees the node on this visit
    #[default]
    SingleWinner,
    /// The rewritten node is offered to every rule again, up to a limit
    Reevaluate,
}

/// Traversal settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraversalConfig {
    /// Revisit policy
    pub revisit: RevisitPolicy,
    /// Upper bound on rewrites of one node per visit under `Reevaluate`
    pub max_rewrites_per_node: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            revisit: RevisitPolicy::SingleWinner,
            max_rewrites_per_node: 8,
        }
    }
}

/// How test classes are recognized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextConfig {
    /// Classes a test class extends directly
    pub test_base_classes: Vec<String>,
    /// Regular expression matched against class names
    pub test_class_pattern: Option<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            test_base_classes: vec![
                "TestCase".to_string(),
                "PHPUnit\\Framework\\TestCase".to_string(),
                "PHPUnit_Framework_TestCase".to_string(),
            ],
            test_class_pattern: Some("Test$".to_string()),
        }
    }
}

/// When a driver stops running passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Convergence {
    /// A single pass
    #[default]
    Once,
    /// Repeat until a pass commits nothing, at most `max_passes` times
    UntilStable {
        /// Pass limit
        max_passes: usize,
    },
}

impl Convergence {
    /// Maximum number of passes
    #[inline]
    #[must_use]
    pub fn max_passes(self) -> usize {
        match self {
            Convergence::Once => 1,
            Convergence::UntilStable { max_passes } => max_passes,
        }
    }
}

/// Driver settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    /// Pass policy
    pub convergence: Convergence,
    /// Abort once more faults than this have been recorded in one run
    pub fault_budget: Option<usize>,
    /// Wall-clock limit per tree, in milliseconds
    pub deadline_ms: Option<u64>,
    /// Process batches on the rayon thread pool
    pub parallel: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            convergence: Convergence::Once,
            fault_budget: None,
            deadline_ms: None,
            parallel: true,
        }
    }
}

impl DriverConfig {
    /// Deadline as a duration
    #[inline]
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

/// Oracle client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OracleConfig {
    /// Cached answers per table
    pub cache_capacity: u64,
    /// Expire cached answers after this many seconds
    pub ttl_secs: Option<u64>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 10_000,
            ttl_secs: None,
        }
    }
}

/// Rule selection and per-rule options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Rule ids to run, in registry order; `None` runs every registered rule
    pub enabled: Option<Vec<String>>,
    /// Options tables keyed by rule id
    #[serde(flatten)]
    pub options: BTreeMap<String, toml::Value>,
}

impl RulesConfig {
    /// Deserialize the options table of one rule, or its defaults when absent
    ///
    /// # Errors
    /// Returns [`ConfigError::RuleOptions`] if the table does not fit `T`
    pub fn options<T: DeserializeOwned + Default>(&self, rule: &str) -> Result<T, ConfigError> {
        match self.options.get(rule) {
            None => Ok(T::default()),
            Some(value) => value
                .clone()
                .try_into()
                .map_err(|source| ConfigError::RuleOptions {
                    rule: rule.to_string(),
                    source,
                }),
        }
    }

    /// Check if a rule is selected
    #[must_use]
    pub fn is_enabled(&self, rule: &str) -> bool {
        self.enabled
            .as_ref()
            .map_or(true, |ids| ids.iter().any(|id| id == rule))
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Traversal settings
    pub traversal: TraversalConfig,
    /// Test-context recognition
    pub context: ContextConfig,
    /// Driver settings
    pub driver: DriverConfig,
    /// Which declarations belong to the project
    pub ownership: OwnershipPolicy,
    /// Oracle client settings
    pub oracle: OracleConfig,
    /// Rule selection and options
    pub rules: RulesConfig,
}

impl EngineConfig {
    /// Parse and validate TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError`] on syntax errors, unknown fields or
    /// out-of-range values
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`EngineConfig::from_toml_str`]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded engine configuration");
        Ok(config)
    }

    /// Check value ranges and compile patterns
    ///
    /// # Errors
    /// Returns the first invalid setting
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.traversal.max_rewrites_per_node == 0 {
            return Err(ConfigError::invalid(
                "traversal.max_rewrites_per_node",
                "must be at least 1",
            ));
        }
        if self.driver.convergence.max_passes() == 0 {
            return Err(ConfigError::invalid(
                "driver.convergence.max_passes",
                "must be at least 1",
            ));
        }
        if self.oracle.cache_capacity == 0 {
            return Err(ConfigError::invalid(
                "oracle.cache_capacity",
                "must be at least 1",
            ));
        }
        TestContext::from_config(&self.context)?;
        Ok(())
    }
}

/// Compiled test-class recognizer
#[derive(Debug, Clone)]
pub struct TestContext {
    base_classes: Vec<String>,
    pattern: Option<Regex>,
}

impl TestContext {
    /// Compile from configuration
    ///
    /// # Errors
    /// Returns [`ConfigError::Pattern`] if the name pattern does not compile
    pub fn from_config(config: &ContextConfig) -> Result<Self, ConfigError> {
        let pattern = config
            .test_class_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()?;
        Ok(Self {
            base_classes: config
                .test_base_classes
                .iter()
                .map(|class| class.trim_start_matches('\\').to_string())
                .collect(),
            pattern,
        })
    }

    /// Recognizer that never matches
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            base_classes: Vec::new(),
            pattern: None,
        }
    }

    /// Check if a class declaration is a test class
    #[must_use]
    pub fn is_test_class(&self, name: &str, extends: Option<&str>) -> bool {
        let by_parent = extends.is_some_and(|parent| {
            let parent = parent.trim_start_matches('\\');
            self.base_classes.iter().any(|base| base == parent)
        });
        by_parent || self.pattern.as_ref().is_some_and(|p| p.is_match(name))
    }
}
