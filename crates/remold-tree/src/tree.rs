//! Arena-backed syntax tree
//!
//! Provides [`Tree`], the exclusive owner of every node of one source file.
//! Nodes live in an append-only arena; a discarded node keeps its slot but is
//! marked dead, so its handle can never alias a newer node.

use crate::error::StructureError;
use crate::kind::NodeKind;
use crate::node::{Node, NodeId, Span};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Slot {
    pub(crate) node: Node,
    pub(crate) span: Option<Span>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) alive: bool,
}

/// Syntax tree of one source file
///
/// # Invariants
/// - Every live node reachable from the root has exactly one parent
/// - Every child fits the slot it occupies ([`ChildRole::accepts`](crate::ChildRole::accepts))
/// - Dead handles are never handed out again
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub(crate) slots: Vec<Slot>,
    pub(crate) root: Option<NodeId>,
    file: Option<PathBuf>,
}

impl Tree {
    /// Create empty tree
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty tree for a source file
    #[inline]
    #[must_use]
    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
            ..Self::default()
        }
    }

    /// Source file this tree was parsed from
    #[inline]
    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Allocate a node whose children are already allocated and parentless
    ///
    /// # Errors
    /// Returns error if a child is dead, already owned, or does not fit its slot
    pub fn alloc(&mut self, node: Node) -> Result<NodeId, StructureError> {
        self.alloc_inner(node, None)
    }

    /// Allocate a node with its source span
    ///
    /// # Errors
    /// Same as [`Tree::alloc`]
    pub fn alloc_spanned(&mut self, node: Node, span: Span) -> Result<NodeId, StructureError> {
        self.alloc_inner(node, Some(span))
    }

    fn alloc_inner(&mut self, node: Node, span: Option<Span>) -> Result<NodeId, StructureError> {
        self.check_node(&node, |id| self.kind(id))?;
        let mut seen = HashSet::new();
        for child in node.children() {
            self.live_slot(child)?;
            if self.slots[child.index()].parent.is_some() || !seen.insert(child) {
                return Err(StructureError::SharedChild(child));
            }
        }

        let id = self.next_id();
        for child in node.children() {
            self.slots[child.index()].parent = Some(id);
        }
        self.slots.push(Slot {
            node,
            span,
            parent: None,
            alive: true,
        });
        Ok(id)
    }

    /// Make a parentless node the root
    ///
    /// # Errors
    /// Returns error if the node is dead or already has a parent
    pub fn set_root(&mut self, id: NodeId) -> Result<(), StructureError> {
        let slot = self.live_slot(id)?;
        if slot.parent.is_some() {
            return Err(StructureError::SharedChild(id));
        }
        self.root = Some(id);
        Ok(())
    }

    /// Root handle
    #[inline]
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Live node behind a handle
    #[inline]
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.alive)
            .map(|slot| &slot.node)
    }

    /// Live node behind a handle, with the reason when absent
    ///
    /// # Errors
    /// Returns [`StructureError::UnknownNode`] or [`StructureError::DeadNode`]
    pub fn node(&self, id: NodeId) -> Result<&Node, StructureError> {
        self.live_slot(id).map(|slot| &slot.node)
    }

    /// Kind of a live node
    #[inline]
    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get(id).map(Node::kind)
    }

    /// Parent of a live node
    #[inline]
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.alive)
            .and_then(|slot| slot.parent)
    }

    /// Source span of a live node, if the parser recorded one
    #[inline]
    #[must_use]
    pub fn span(&self, id: NodeId) -> Option<Span> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.alive)
            .and_then(|slot| slot.span)
    }

    /// Check if a handle still points at a live node
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.alive).count()
    }

    /// Check if the tree holds no live node
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handle the next allocation will receive
    #[inline]
    #[must_use]
    pub fn next_id(&self) -> NodeId {
        NodeId(u32::try_from(self.slots.len()).unwrap_or(u32::MAX))
    }

    /// Ancestors of a node, nearest first
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            out.push(parent);
            current = self.parent(parent);
        }
        out
    }

    /// Check if `id` lies strictly below `ancestor`
    #[must_use]
    pub fn is_descendant(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    /// Live nodes strictly below `id`, in pre-order
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = self.subtree(id);
        if !out.is_empty() {
            out.remove(0);
        }
        out
    }

    /// `id` and every live node below it, in pre-order
    #[must_use]
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            out.push(current);
            let children: Vec<NodeId> = node.children().collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Every live node reachable from the root, in pre-order
    #[must_use]
    pub fn preorder(&self) -> Vec<NodeId> {
        self.root.map(|root| self.subtree(root)).unwrap_or_default()
    }

    /// Verify the whole tree against its invariants
    ///
    /// Intended for trees built or deserialized by external collaborators.
    ///
    /// # Errors
    /// Returns the first violation found in pre-order
    pub fn validate(&self) -> Result<(), StructureError> {
        let root = self.root.ok_or(StructureError::NoRoot)?;
        self.live_slot(root)?;
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                return Err(StructureError::SharedChild(id));
            }
            let node = self.node(id)?;
            self.check_node(node, |child| self.kind(child))?;
            for child in node.children() {
                self.live_slot(child)?;
                if self.parent(child) != Some(id) {
                    return Err(StructureError::NotAChild { parent: id, child });
                }
                stack.push(child);
            }
        }
        Ok(())
    }

    /// Check names and child-slot kinds of a single node
    pub(crate) fn check_node(
        &self,
        node: &Node,
        kind_of: impl Fn(NodeId) -> Option<NodeKind>,
    ) -> Result<(), StructureError> {
        if node.required_names().iter().any(|name| name.is_empty()) {
            return Err(StructureError::EmptyName(node.kind()));
        }
        for (role, child) in node.child_slots() {
            let kind = kind_of(child).ok_or(StructureError::UnknownNode(child))?;
            if !role.accepts(kind) {
                return Err(StructureError::KindMismatch {
                    parent: node.kind(),
                    role,
                    kind,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn live_slot(&self, id: NodeId) -> Result<&Slot, StructureError> {
        let slot = self
            .slots
            .get(id.index())
            .ok_or(StructureError::UnknownNode(id))?;
        if slot.alive {
            Ok(slot)
        } else {
            Err(StructureError::DeadNode(id))
        }
    }
}
