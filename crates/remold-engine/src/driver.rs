//! Driver
//!
//! Runs dispatchers over whole trees: repeated passes until stable, fault
//! budgets, deadlines, and parallel batches (one dispatcher and attribute
//! store per tree, on the rayon pool).

use crate::cancel::CancelToken;
use crate::config::{Convergence, EngineConfig, TestContext};
use crate::dispatcher::Dispatcher;
use crate::error::{DriverError, EngineError};
use crate::registry::RuleRegistry;
use crate::report::{RuleStats, RunReport};
use dashmap::DashMap;
use rayon::prelude::*;
use remold_oracle::{CachedOracle, InMemoryOracle, NullOracle, SemanticOracle};
use remold_tree::{RuleId, Tree};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of a batch run
#[derive(Debug)]
pub struct BatchReport {
    /// One result per input tree, in input order
    pub runs: Vec<Result<RunReport, DriverError>>,
    /// Per-rule counters over every successful run
    pub rule_stats: BTreeMap<RuleId, RuleStats>,
}

impl BatchReport {
    /// Number of trees that failed
    #[must_use]
    pub fn failures(&self) -> usize {
        self.runs.iter().filter(|run| run.is_err()).count()
    }

    /// Rewrites over every successful run
    #[must_use]
    pub fn total_rewrites(&self) -> usize {
        self.rule_stats.values().map(|s| s.rewrites).sum()
    }
}

/// Runs rule passes over trees
pub struct Driver {
    rules: Arc<RuleRegistry>,
    oracle: Arc<dyn SemanticOracle>,
    config: Arc<EngineConfig>,
    test_context: TestContext,
    cancel: CancelToken,
}

impl Driver {
    /// Create driver
    ///
    /// # Errors
    /// Returns [`crate::ConfigError`] if the configuration is invalid
    pub fn new(
        mut rules: RuleRegistry,
        oracle: Arc<dyn SemanticOracle>,
        config: EngineConfig,
    ) -> Result<Self, crate::ConfigError> {
        config.validate()?;
        rules.apply_selection(&config.rules)?;
        let test_context = TestContext::from_config(&config.context)?;
        Ok(Self {
            rules: Arc::new(rules),
            oracle,
            config: Arc::new(config),
            test_context,
            cancel: CancelToken::new(),
        })
    }

    /// Create driver from a configuration file and optional oracle data
    ///
    /// `build_rules` receives the loaded configuration and returns the full
    /// rule catalog; the configuration's selection is applied afterwards.
    /// Oracle answers are cached according to the `[oracle]` section.
    ///
    /// # Errors
    /// Returns [`EngineError`] if either file cannot be loaded
    pub fn from_files<F>(
        config_path: impl AsRef<Path>,
        oracle_path: Option<&Path>,
        build_rules: F,
    ) -> Result<Self, EngineError>
    where
        F: FnOnce(&EngineConfig) -> Result<RuleRegistry, crate::ConfigError>,
    {
        let config = EngineConfig::from_file(config_path)?;
        let oracle: Arc<dyn SemanticOracle> = match oracle_path {
            Some(path) => {
                let data = InMemoryOracle::from_file(path)?;
                let capacity = config.oracle.cache_capacity;
                Arc::new(match config.oracle.ttl_secs {
                    Some(secs) => CachedOracle::with_ttl(data, capacity, Duration::from_secs(secs)),
                    None => CachedOracle::new(data, capacity),
                })
            }
            None => Arc::new(NullOracle),
        };
        let rules = build_rules(&config)?;
        Ok(Self::new(rules, oracle, config)?)
    }

    /// Token that cancels every run of this driver
    #[inline]
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Active rules
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    /// Fresh dispatcher for one tree
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher {
        let traversal = &self.config.traversal;
        Dispatcher::new(Arc::clone(&self.rules), Arc::clone(&self.oracle))
            .with_revisit(traversal.revisit, traversal.max_rewrites_per_node)
            .with_test_context(self.test_context.clone())
            .with_cancel_token(self.cancel.clone())
    }

    /// Run passes over one tree
    ///
    /// # Errors
    /// Returns [`DriverError::InvalidTree`] if the input tree is malformed, or
    /// [`DriverError::FaultBudgetExceeded`] once faults exceed the budget;
    /// rewrites committed before that point stay in the tree.
    pub fn run(&self, tree: &mut Tree) -> Result<RunReport, DriverError> {
        tree.validate()?;
        let mut dispatcher = self.dispatcher();
        dispatcher.set_deadline(self.config.driver.deadline().map(|d| Instant::now() + d));

        let convergence = self.config.driver.convergence;
        let mut report = RunReport {
            file: tree.file().map(Path::to_path_buf),
            ..RunReport::default()
        };
        for pass in 1..=convergence.max_passes() {
            let traversal = dispatcher.traverse(tree);
            let unchanged = traversal.is_unchanged();
            let cancelled = traversal.cancelled;
            report.passes.push(traversal);

            if let Some(budget) = self.config.driver.fault_budget {
                let faults = report.total_faults();
                if faults > budget {
                    let worst = report
                        .rule_stats()
                        .into_iter()
                        .max_by_key(|(_, stats)| stats.faults)
                        .map(|(rule, _)| rule);
                    tracing::warn!(faults, budget, "fault budget exceeded, aborting run");
                    return Err(DriverError::FaultBudgetExceeded {
                        faults,
                        budget,
                        worst,
                    });
                }
            }
            if cancelled {
                break;
            }
            if unchanged {
                report.converged = true;
                break;
            }
            if convergence == Convergence::Once {
                break;
            }
            tracing::debug!(pass, "pass committed rewrites, running again");
        }

        tracing::info!(
            file = ?report.file,
            passes = report.passes.len(),
            rewrites = report.total_rewrites(),
            faults = report.total_faults(),
            converged = report.converged,
            "run finished"
        );
        Ok(report)
    }

    /// Run many trees, in parallel when configured
    ///
    /// Each tree gets its own dispatcher; a failing tree does not affect the
    /// others.
    pub fn run_batch(&self, trees: &mut [Tree]) -> BatchReport {
        let stats: DashMap<RuleId, RuleStats> = DashMap::new();
        let run_one = |tree: &mut Tree| {
            let result = self.run(tree);
            if let Ok(report) = &result {
                for (rule, counts) in report.rule_stats() {
                    let mut entry = stats.entry(rule).or_default();
                    entry.rewrites += counts.rewrites;
                    entry.faults += counts.faults;
                }
            }
            result
        };

        let runs: Vec<Result<RunReport, DriverError>> = if self.config.driver.parallel {
            trees.par_iter_mut().map(run_one).collect()
        } else {
            trees.iter_mut().map(run_one).collect()
        };

        let batch = BatchReport {
            runs,
            rule_stats: stats.into_iter().collect(),
        };
        tracing::info!(
            trees = trees.len(),
            failures = batch.failures(),
            rewrites = batch.total_rewrites(),
            "batch finished"
        );
        batch
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("rules", &self.rules.names())
            .field("oracle", &self.oracle.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
