//! Staged edits
//!
//! Provides [`Staged`] and [`Change`] for transactional rewrites of one node.
//! A change is validated against the tree before anything is mutated; an
//! invalid change leaves the tree exactly as it was.
//!
//! # Ownership rules
//! A change rewrites a single *target* node. The new structure it describes may
//! only reference:
//! - nodes staged for this change, and
//! - live nodes strictly below the target,
//!
//! each at most once, and never two nodes where one lies below the other.
//! Siblings and ancestors of the target are out of reach.

use crate::error::StructureError;
use crate::kind::NodeKind;
use crate::node::{Node, NodeId};
use crate::tree::{Slot, Tree};
use std::collections::HashSet;

/// Nodes allocated by a rewrite before it is committed
///
/// Handles returned by [`Staged::alloc`] are the handles the nodes receive in
/// the tree on commit, so they can be referenced from the replacement.
#[derive(Debug, Clone)]
pub struct Staged {
    base: u32,
    nodes: Vec<Node>,
}

impl Staged {
    /// Reserve a node; children must be staged or taken from the target's subtree
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let offset = u32::try_from(self.nodes.len()).unwrap_or(u32::MAX);
        self.nodes.push(node);
        NodeId(self.base.saturating_add(offset))
    }

    /// Staged node behind a handle
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        id.0.checked_sub(self.base)
            .and_then(|offset| self.nodes.get(offset as usize))
    }

    /// Check if a handle was produced by this staging area
    #[inline]
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of staged nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if nothing was staged
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn ids(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        let base = self.base;
        self.nodes
            .iter()
            .enumerate()
            .map(move |(i, node)| (NodeId(base + i as u32), node))
    }
}

/// Structural change applied to one target node
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Replace the target's payload in place; the target keeps its handle
    Replace(Node),
    /// Put another node (staged or from the target's subtree) in the target's slot
    Substitute(NodeId),
    /// Detach the target from an optional slot of its parent
    Remove,
}

impl Change {
    /// Short label for logs and reports
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Change::Replace(_) => "replace",
            Change::Substitute(_) => "substitute",
            Change::Remove => "remove",
        }
    }
}

/// Result of a committed change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    /// Node now standing where the target stood (`None` after a removal)
    pub current: Option<NodeId>,
    /// Handles discarded by the change, now dead
    pub discarded: Vec<NodeId>,
}

impl Tree {
    /// Open a staging area for a change against the current tree
    #[inline]
    #[must_use]
    pub fn stage(&self) -> Staged {
        Staged {
            base: self.next_id().0,
            nodes: Vec::new(),
        }
    }

    /// Validate a change without applying it
    ///
    /// # Errors
    /// Returns the first invariant the change would break
    pub fn check_change(
        &self,
        target: NodeId,
        change: &Change,
        staged: &Staged,
    ) -> Result<(), StructureError> {
        self.live_slot(target)?;
        let found = self.slots.len();
        if staged.base as usize != found {
            return Err(StructureError::StaleStaging {
                expected: staged.base as usize,
                found,
            });
        }

        let kind_of = |id: NodeId| -> Option<NodeKind> {
            staged.get(id).map(Node::kind).or_else(|| self.kind(id))
        };

        // Nodes whose child lists the change defines
        let mut defining: Vec<&Node> = staged.ids().map(|(_, node)| node).collect();
        if let Change::Replace(node) = change {
            defining.push(node);
        }

        let mut referenced = HashSet::new();
        let mut existing = Vec::new();
        for node in &defining {
            self.check_node(node, &kind_of)?;
            for child in node.children() {
                if !referenced.insert(child) {
                    return Err(StructureError::SharedChild(child));
                }
                if !staged.contains(child) {
                    existing.push(child);
                }
            }
        }

        match change {
            Change::Replace(node) => self.check_slot(target, node.kind())?,
            Change::Substitute(with) => {
                if !referenced.insert(*with) {
                    return Err(StructureError::SharedChild(*with));
                }
                if !staged.contains(*with) {
                    existing.push(*with);
                }
                let kind = kind_of(*with).ok_or(StructureError::UnknownNode(*with))?;
                self.check_slot(target, kind)?;
            }
            Change::Remove => {
                let parent = self.parent(target).ok_or(StructureError::RemoveRoot)?;
                let role = self.node(parent)?.role_of(target).ok_or(StructureError::NotAChild {
                    parent,
                    child: target,
                })?;
                if !role.is_optional() {
                    return Err(StructureError::RequiredSlot {
                        child: target,
                        role,
                    });
                }
            }
        }

        // Reused nodes must come from below the target and must not nest
        for child in &existing {
            self.live_slot(*child)?;
            let ancestors = self.ancestors(*child);
            let Some(depth) = ancestors.iter().position(|a| *a == target) else {
                return Err(StructureError::ForeignChild {
                    target,
                    child: *child,
                });
            };
            if ancestors[..depth].iter().any(|a| referenced.contains(a)) {
                return Err(StructureError::SharedChild(*child));
            }
        }
        Ok(())
    }

    /// Check that the slot `target` occupies in its parent accepts `kind`
    fn check_slot(&self, target: NodeId, kind: NodeKind) -> Result<(), StructureError> {
        let Some(parent) = self.parent(target) else {
            return Ok(());
        };
        let parent_node = self.node(parent)?;
        let role = parent_node.role_of(target).ok_or(StructureError::NotAChild {
            parent,
            child: target,
        })?;
        if !role.accepts(kind) {
            return Err(StructureError::KindMismatch {
                parent: parent_node.kind(),
                role,
                kind,
            });
        }
        Ok(())
    }

    /// Validate and apply a change
    ///
    /// # Errors
    /// Returns error if the change would break an invariant; the tree is then
    /// left untouched
    pub fn commit(
        &mut self,
        target: NodeId,
        change: Change,
        staged: Staged,
    ) -> Result<Committed, StructureError> {
        self.check_change(target, &change, &staged)?;

        let before: HashSet<NodeId> = self.subtree(target).into_iter().collect();
        let parent = self.parent(target);

        for node in staged.nodes {
            self.slots.push(Slot {
                node,
                span: None,
                parent: None,
                alive: true,
            });
        }
        let staged_ids = staged.base as usize..self.slots.len();

        let current = match change {
            Change::Replace(node) => {
                self.slots[target.index()].node = node;
                Some(target)
            }
            Change::Substitute(with) => {
                match parent {
                    Some(parent) => {
                        self.slots[parent.index()].node.replace_child(target, with);
                    }
                    None => self.root = Some(with),
                }
                self.slots[with.index()].parent = parent;
                Some(with)
            }
            Change::Remove => {
                if let Some(parent) = parent {
                    self.slots[parent.index()].node.detach_child(target);
                }
                None
            }
        };

        let mut reachable = HashSet::new();
        if let Some(current) = current {
            self.relink(current, &mut reachable);
        }

        let mut discarded: Vec<NodeId> = before
            .into_iter()
            .chain(staged_ids.map(|i| NodeId(i as u32)))
            .filter(|id| !reachable.contains(id))
            .collect();
        discarded.sort_unstable();
        for id in &discarded {
            let slot = &mut self.slots[id.index()];
            slot.alive = false;
            slot.parent = None;
        }

        Ok(Committed { current, discarded })
    }

    /// Point every child below `id` at its parent and collect the subtree
    fn relink(&mut self, id: NodeId, reachable: &mut HashSet<NodeId>) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !reachable.insert(current) {
                continue;
            }
            let children: Vec<NodeId> = self.slots[current.index()].node.children().collect();
            for child in children {
                self.slots[child.index()].parent = Some(current);
                stack.push(child);
            }
        }
    }
}
