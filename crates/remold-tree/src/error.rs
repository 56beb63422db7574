//! Structural error types

use crate::kind::NodeKind;
use crate::node::{ChildRole, NodeId};

/// A tree shape that would break the node model's invariants
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructureError {
    /// Handle was never allocated
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// Handle points at a discarded node
    #[error("node {0} was discarded by an earlier rewrite")]
    DeadNode(NodeId),

    /// Tree has no root
    #[error("tree has no root")]
    NoRoot,

    /// Child kind does not fit the slot
    #[error("{kind} cannot occupy a {role} slot of {parent}")]
    KindMismatch {
        /// Parent kind
        parent: NodeKind,
        /// Slot in the parent
        role: ChildRole,
        /// Offending child kind
        kind: NodeKind,
    },

    /// A node would have two parents
    #[error("node {0} would be owned by more than one parent")]
    SharedChild(NodeId),

    /// A rewrite referenced a node outside the rewritten subtree
    #[error("node {child} is not part of the subtree rooted at {target}")]
    ForeignChild {
        /// Rewritten node
        target: NodeId,
        /// Referenced node
        child: NodeId,
    },

    /// A required identifier is empty
    #[error("{0} node has an empty name")]
    EmptyName(NodeKind),

    /// Removal from a mandatory slot
    #[error("cannot remove {child} from mandatory {role} slot")]
    RequiredSlot {
        /// Child being removed
        child: NodeId,
        /// Mandatory slot
        role: ChildRole,
    },

    /// Removal or substitution of the root without a replacement
    #[error("cannot remove the tree root")]
    RemoveRoot,

    /// Parent link disagrees with the parent's child list
    #[error("node {child} is not a child of {parent}")]
    NotAChild {
        /// Expected parent
        parent: NodeId,
        /// Orphaned child
        child: NodeId,
    },

    /// Staged nodes were prepared against an older tree
    #[error("staged edit expected next handle {expected}, tree is at {found}")]
    StaleStaging {
        /// Base handle of the staging area
        expected: usize,
        /// Current next handle of the tree
        found: usize,
    },
}
