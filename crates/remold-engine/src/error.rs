//! Error types for the engine
//!
//! Provides error handling for:
//! - Rule invocations (faults, caught per node and rule)
//! - Configuration loading
//! - Driver runs (fault budget, invalid input trees)

use remold_oracle::OracleError;
use remold_tree::{RuleId, StructureError};
use std::path::PathBuf;

/// Failure of a single rule invocation
///
/// Faults never abort a traversal: the dispatcher records them and moves on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleFault {
    /// The rule met a tree shape it cannot handle
    #[error("structure error: {0}")]
    Structure(#[from] StructureError),

    /// The rule reported a failure of its own
    #[error("{0}")]
    Failed(String),

    /// The rule panicked
    #[error("panicked: {0}")]
    Panicked(String),
}

impl RuleFault {
    /// Create rule-reported failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Short label for reports
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            RuleFault::Structure(_) => "structure",
            RuleFault::Failed(_) => "error",
            RuleFault::Panicked(_) => "panic",
        }
    }
}

/// Errors while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error during file read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or shape error
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Options table of one rule does not match the rule's options
    #[error("invalid options for rule '{rule}': {source}")]
    RuleOptions {
        /// Rule whose options failed to parse
        rule: String,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// Test-class name pattern is not a valid regular expression
    #[error("invalid test class pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Enabled rule list names a rule that is not registered
    #[error("unknown rule: '{0}'")]
    UnknownRule(String),

    /// Value out of range
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create out-of-range error
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors that stop a driver run
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The input tree violates structural invariants
    #[error("invalid input tree: {0}")]
    InvalidTree(#[from] StructureError),

    /// More rule faults than the configured budget allows
    #[error("fault budget exceeded: {faults} faults, budget {budget}")]
    FaultBudgetExceeded {
        /// Faults recorded so far
        faults: usize,
        /// Configured budget
        budget: usize,
        /// Most frequent offender
        worst: Option<RuleId>,
    },
}

/// Top-level error for setting up an engine from files
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Oracle data error
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// Driver error
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}
