//! Invocation context handed to rules
//!
//! A [`RuleContext`] gives read access to the tree, the attribute store and
//! the oracle, and collects what the rule wants to change: newly staged nodes
//! and attribute writes. Nothing reaches the tree or the store until the
//! dispatcher accepts the invocation.

use crate::error::RuleFault;
use remold_oracle::{SemanticOracle, TypeQuery};
use remold_tree::{
    AttrKey, AttrValue, AttributeStore, Node, NodeId, NodeKind, PendingAttributes, RuleId,
    Staged, StructureError, Tree,
};

/// Per-invocation view of the engine state
pub struct RuleContext<'a> {
    id: NodeId,
    node: &'a Node,
    tree: &'a Tree,
    attributes: &'a AttributeStore,
    oracle: &'a dyn SemanticOracle,
    pending: PendingAttributes,
    staged: Staged,
}

impl<'a> RuleContext<'a> {
    /// Create context for a live node
    ///
    /// # Errors
    /// Returns [`RuleFault::Structure`] if `id` is not a live node of `tree`
    pub fn new(
        tree: &'a Tree,
        id: NodeId,
        attributes: &'a AttributeStore,
        oracle: &'a dyn SemanticOracle,
    ) -> Result<Self, RuleFault> {
        let node = tree.node(id)?;
        Ok(Self {
            id,
            node,
            tree,
            attributes,
            oracle,
            pending: PendingAttributes::new(),
            staged: tree.stage(),
        })
    }

    /// Handle of the dispatched node
    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The dispatched node
    #[inline]
    #[must_use]
    pub fn node(&self) -> &'a Node {
        self.node
    }

    /// Kind of the dispatched node
    #[inline]
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.node.kind()
    }

    /// The whole tree, read-only
    #[inline]
    #[must_use]
    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    /// Semantic oracle
    #[inline]
    #[must_use]
    pub fn oracle(&self) -> &'a dyn SemanticOracle {
        self.oracle
    }

    /// Look up a node, staged ones included
    ///
    /// # Errors
    /// Returns [`RuleFault::Structure`] for unknown or dead handles
    pub fn get(&self, id: NodeId) -> Result<&Node, RuleFault> {
        match self.staged.get(id) {
            Some(node) => Ok(node),
            None => Ok(self.tree.node(id)?),
        }
    }

    /// Argument list of a call or instantiation
    ///
    /// # Errors
    /// Returns [`RuleFault::Structure`] for unknown or dead handles and for
    /// nodes without arguments
    pub fn args_of(&self, id: NodeId) -> Result<&[NodeId], RuleFault> {
        self.get(id)?
            .args()
            .ok_or_else(|| RuleFault::Structure(StructureError::UnknownNode(id)))
    }

    /// Attribute of the dispatched node, seeing this invocation's own writes
    #[must_use]
    pub fn attribute(&self, key: AttrKey) -> Option<&AttrValue> {
        self.pending.get(self.attributes, self.id, key)
    }

    /// Attribute of any node, seeing this invocation's own writes
    #[must_use]
    pub fn attribute_of(&self, id: NodeId, key: AttrKey) -> Option<&AttrValue> {
        self.pending.get(self.attributes, id, key)
    }

    /// Boolean attribute of the dispatched node; absent reads as `false`
    #[must_use]
    pub fn flag(&self, key: AttrKey) -> bool {
        self.attribute(key)
            .and_then(AttrValue::as_flag)
            .unwrap_or(false)
    }

    /// Text attribute of the dispatched node
    #[must_use]
    pub fn text(&self, key: AttrKey) -> Option<&str> {
        self.attribute(key).and_then(AttrValue::as_text)
    }

    /// Buffer an attribute write on the dispatched node
    pub fn set_attribute(&mut self, key: AttrKey, value: impl Into<AttrValue>) {
        self.pending.set(self.id, key, value);
    }

    /// Check if `rule` already rewrote the dispatched node
    #[must_use]
    pub fn is_processed_by(&self, rule: RuleId) -> bool {
        self.pending.is_processed_by(self.attributes, self.id, rule)
    }

    /// Record that `rule` rewrote the dispatched node
    pub fn mark_processed(&mut self, rule: RuleId) {
        self.pending.mark_processed(self.id, rule);
    }

    /// Stage a new node for the outcome to reference
    pub fn stage(&mut self, node: Node) -> NodeId {
        self.staged.alloc(node)
    }

    /// Render a node (staged nodes render as dead) as one line of text
    #[must_use]
    pub fn render(&self, id: NodeId) -> String {
        self.tree.render(id)
    }

    /// Type query for an expression below the dispatched node
    #[must_use]
    pub fn type_query(&self, expr: NodeId) -> TypeQuery {
        TypeQuery::new(self.tree.render(expr))
            .in_scope(self.text(AttrKey::EnclosingClass).map(str::to_string))
            .at(
                self.tree.file().map(std::path::Path::to_path_buf),
                self.tree.span(expr),
            )
    }

    /// Split into staged nodes and buffered attribute writes
    #[must_use]
    pub fn into_parts(self) -> (Staged, PendingAttributes) {
        (self.staged, self.pending)
    }
}

impl std::fmt::Debug for RuleContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleContext")
            .field("id", &self.id)
            .field("kind", &self.node.kind())
            .field("oracle", &self.oracle.name())
            .field("staged", &self.staged.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}
