//! Rule contract
//!
//! Provides the [`Rule`] trait for pluggable rewrites and [`Outcome`], the
//! single rewrite a rule may request per invocation.

use crate::context::RuleContext;
use crate::error::RuleFault;
use remold_tree::{Change, KindSet, Node, NodeId, RuleId};

/// Rewrite requested by a rule for the node it was dispatched on
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Decline; the node is left as it is
    NoChange,
    /// Replace the node's contents, keeping its handle
    Replace(Node),
    /// Put another node in the node's parent slot
    Substitute(NodeId),
    /// Detach the node from an optional parent slot
    Remove,
}

impl Outcome {
    /// Check if the rule declined
    #[inline]
    #[must_use]
    pub fn is_no_change(&self) -> bool {
        matches!(self, Outcome::NoChange)
    }

    /// Structural change to commit, if any
    #[must_use]
    pub fn into_change(self) -> Option<Change> {
        match self {
            Outcome::NoChange => None,
            Outcome::Replace(node) => Some(Change::Replace(node)),
            Outcome::Substitute(id) => Some(Change::Substitute(id)),
            Outcome::Remove => Some(Change::Remove),
        }
    }
}

/// Independently-authored rewrite rule
///
/// # Contract
/// - `interests()` is finite, non-empty and fixed for the rule's lifetime
/// - `attempt()` depends only on the dispatched node, its surroundings and
///   facts queried through the context; it returns [`Outcome::NoChange`] for
///   kinds outside its interests
/// - the outcome may reuse or discard descendants of the dispatched node but
///   never touches siblings or ancestors
/// - configuration (rename tables, matcher names) is immutable once built
pub trait Rule: Send + Sync + std::fmt::Debug {
    /// Stable identifier, used for processed markers and reports
    fn id(&self) -> RuleId;

    /// Node kinds this rule wants to see
    fn interests(&self) -> KindSet;

    /// Inspect the dispatched node and decide on a rewrite
    ///
    /// # Errors
    /// Returns [`RuleFault`] when the rule cannot make sense of the tree; the
    /// dispatcher records the fault and leaves the node untouched.
    fn attempt(&self, cx: &mut RuleContext<'_>) -> Result<Outcome, RuleFault>;

    /// One-line description for listings
    fn description(&self) -> &'static str {
        ""
    }
}
