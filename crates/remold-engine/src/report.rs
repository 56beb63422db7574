//! Traversal and run reports
//!
//! Plain data for the external reporting layer; every type serializes with
//! serde.

use remold_tree::{NodeId, RuleId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One committed rewrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rewrite {
    /// Rule that produced it
    pub rule: RuleId,
    /// Node the rule was dispatched on
    pub node: NodeId,
    /// Node standing in its place afterwards, if any
    pub current: Option<NodeId>,
    /// Kind of change (`replace`, `substitute`, `remove`)
    pub change: &'static str,
}

/// One caught rule fault
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaultRecord {
    /// Faulting rule
    pub rule: RuleId,
    /// Node it was dispatched on
    pub node: NodeId,
    /// Fault category (`error`, `panic`, `structure`)
    pub kind: &'static str,
    /// Fault message
    pub message: String,
}

/// Result of one traversal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraversalReport {
    /// Nodes visited
    pub visited: usize,
    /// Rewrites committed, in traversal order
    pub rewrites: Vec<Rewrite>,
    /// Faults caught, in traversal order
    pub faults: Vec<FaultRecord>,
    /// Nodes where the `Reevaluate` rewrite limit stopped further rules
    pub limited: Vec<NodeId>,
    /// Traversal stopped early on cancellation or deadline
    pub cancelled: bool,
}

impl TraversalReport {
    /// Check if nothing was committed
    #[inline]
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.rewrites.is_empty()
    }

    /// Rewrites committed by one rule
    #[must_use]
    pub fn rewrites_by(&self, rule: RuleId) -> usize {
        self.rewrites.iter().filter(|r| r.rule == rule).count()
    }
}

/// Per-rule counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuleStats {
    /// Rewrites committed
    pub rewrites: usize,
    /// Faults caught
    pub faults: usize,
}

/// Result of a driver run over one tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Source file of the tree
    pub file: Option<PathBuf>,
    /// One report per pass
    pub passes: Vec<TraversalReport>,
    /// The last pass committed nothing
    pub converged: bool,
}

impl RunReport {
    /// Rewrites over all passes
    #[must_use]
    pub fn total_rewrites(&self) -> usize {
        self.passes.iter().map(|p| p.rewrites.len()).sum()
    }

    /// Faults over all passes
    #[must_use]
    pub fn total_faults(&self) -> usize {
        self.passes.iter().map(|p| p.faults.len()).sum()
    }

    /// Check if any pass stopped early
    #[must_use]
    pub fn cancelled(&self) -> bool {
        self.passes.iter().any(|p| p.cancelled)
    }

    /// Per-rule counters over all passes
    #[must_use]
    pub fn rule_stats(&self) -> BTreeMap<RuleId, RuleStats> {
        let mut stats: BTreeMap<RuleId, RuleStats> = BTreeMap::new();
        for pass in &self.passes {
            for rewrite in &pass.rewrites {
                stats.entry(rewrite.rule).or_default().rewrites += 1;
            }
            for fault in &pass.faults {
                stats.entry(fault.rule).or_default().faults += 1;
            }
        }
        stats
    }
}
