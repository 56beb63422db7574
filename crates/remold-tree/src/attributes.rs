//! Per-node attribute store
//!
//! Provides [`AttributeStore`], metadata keyed by node handle. Two uses:
//! - idempotency markers: [`AttributeStore::mark_processed`] records that a
//!   rule rewrote a node, so a later visit declines early
//! - context propagation: facts derived from ancestors (enclosing class, test
//!   context, resolved file) written once on descent
//!
//! Entries are keyed by [`NodeId`], never by structural equality: two identical
//! nodes have independent entries.

use crate::node::NodeId;
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

/// Stable identifier of a rule, used for processed markers and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RuleId(&'static str);

impl RuleId {
    /// Create new rule identifier
    #[inline]
    #[must_use]
    pub const fn new(id: &'static str) -> Self {
        Self(id)
    }

    /// Identifier text
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Display for RuleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Attribute key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKey {
    /// Name of the class whose body lexically contains the node
    EnclosingClass,
    /// Whether the node lies inside a recognized test class
    InTestContext,
    /// Source file the node was parsed from
    ResolvedFile,
    /// Rule-defined key
    Custom(&'static str),
}

/// Attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// Boolean fact
    Flag(bool),
    /// Textual fact
    Text(String),
    /// Numeric fact
    Int(i64),
}

impl AttrValue {
    /// Boolean payload
    #[inline]
    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            AttrValue::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Text payload
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Numeric payload
    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<bool> for AttrValue {
    fn from(flag: bool) -> Self {
        AttrValue::Flag(flag)
    }
}

impl From<String> for AttrValue {
    fn from(text: String) -> Self {
        AttrValue::Text(text)
    }
}

impl From<&str> for AttrValue {
    fn from(text: &str) -> Self {
        AttrValue::Text(text.to_string())
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Int(n)
    }
}

/// Processing state of a node with respect to one rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// The rule has not rewritten the node
    Unprocessed,
    /// The rule rewrote the node earlier in this run
    Processed(RuleId),
}

#[derive(Debug, Clone, Default)]
struct NodeAttributes {
    values: HashMap<AttrKey, AttrValue>,
    processed: SmallVec<[RuleId; 2]>,
}

/// Attribute store for one tree
#[derive(Debug, Clone, Default)]
pub struct AttributeStore {
    entries: HashMap<NodeId, NodeAttributes>,
}

impl AttributeStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, creating the node's map on first write
    pub fn set(&mut self, node: NodeId, key: AttrKey, value: impl Into<AttrValue>) {
        self.entries
            .entry(node)
            .or_default()
            .values
            .insert(key, value.into());
    }

    /// Read an attribute
    #[must_use]
    pub fn get(&self, node: NodeId, key: AttrKey) -> Option<&AttrValue> {
        self.entries.get(&node)?.values.get(&key)
    }

    /// Read a boolean attribute; absent or non-boolean reads as `false`
    #[inline]
    #[must_use]
    pub fn flag(&self, node: NodeId, key: AttrKey) -> bool {
        self.get(node, key)
            .and_then(AttrValue::as_flag)
            .unwrap_or(false)
    }

    /// Read a textual attribute
    #[inline]
    #[must_use]
    pub fn text(&self, node: NodeId, key: AttrKey) -> Option<&str> {
        self.get(node, key).and_then(AttrValue::as_text)
    }

    /// Remove one attribute
    pub fn remove(&mut self, node: NodeId, key: AttrKey) -> Option<AttrValue> {
        self.entries.get_mut(&node)?.values.remove(&key)
    }

    /// Record that `rule` rewrote `node`
    pub fn mark_processed(&mut self, node: NodeId, rule: RuleId) {
        let processed = &mut self.entries.entry(node).or_default().processed;
        if !processed.contains(&rule) {
            processed.push(rule);
        }
    }

    /// Check if `rule` already rewrote `node`
    #[inline]
    #[must_use]
    pub fn is_processed_by(&self, node: NodeId, rule: RuleId) -> bool {
        self.marker(node, rule) != Marker::Unprocessed
    }

    /// Processing state of `node` for `rule`
    #[must_use]
    pub fn marker(&self, node: NodeId, rule: RuleId) -> Marker {
        match self.entries.get(&node) {
            Some(attrs) if attrs.processed.contains(&rule) => Marker::Processed(rule),
            _ => Marker::Unprocessed,
        }
    }

    /// Drop every attribute of a discarded node
    pub fn forget(&mut self, node: NodeId) {
        self.entries.remove(&node);
    }

    /// Drop the attributes of many discarded nodes
    pub fn forget_all<'a>(&mut self, nodes: impl IntoIterator<Item = &'a NodeId>) {
        for node in nodes {
            self.forget(*node);
        }
    }

    /// Apply buffered writes
    pub fn apply(&mut self, writes: PendingAttributes) {
        for write in writes.writes {
            match write {
                AttrWrite::Set(node, key, value) => self.set(node, key, value),
                AttrWrite::Remove(node, key) => {
                    self.remove(node, key);
                }
                AttrWrite::Mark(node, rule) => self.mark_processed(node, rule),
            }
        }
    }

    /// Number of nodes with at least one entry
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no node has attributes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop everything
    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrWrite {
    Set(NodeId, AttrKey, AttrValue),
    Remove(NodeId, AttrKey),
    Mark(NodeId, RuleId),
}

/// Attribute writes buffered until a rule invocation is accepted
///
/// Reads through [`PendingAttributes::get`] see the buffered writes layered
/// over a store.
#[derive(Debug, Clone, Default)]
pub struct PendingAttributes {
    writes: Vec<AttrWrite>,
}

impl PendingAttributes {
    /// Create empty buffer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer an attribute write
    pub fn set(&mut self, node: NodeId, key: AttrKey, value: impl Into<AttrValue>) {
        self.writes.push(AttrWrite::Set(node, key, value.into()));
    }

    /// Buffer an attribute removal
    pub fn remove(&mut self, node: NodeId, key: AttrKey) {
        self.writes.push(AttrWrite::Remove(node, key));
    }

    /// Buffer a processed marker
    pub fn mark_processed(&mut self, node: NodeId, rule: RuleId) {
        self.writes.push(AttrWrite::Mark(node, rule));
    }

    /// Read an attribute, preferring the latest buffered write
    #[must_use]
    pub fn get<'a>(
        &'a self,
        store: &'a AttributeStore,
        node: NodeId,
        key: AttrKey,
    ) -> Option<&'a AttrValue> {
        for write in self.writes.iter().rev() {
            match write {
                AttrWrite::Set(n, k, value) if *n == node && *k == key => return Some(value),
                AttrWrite::Remove(n, k) if *n == node && *k == key => return None,
                _ => {}
            }
        }
        store.get(node, key)
    }

    /// Check for a processed marker, buffered or stored
    #[must_use]
    pub fn is_processed_by(&self, store: &AttributeStore, node: NodeId, rule: RuleId) -> bool {
        self.writes
            .iter()
            .any(|write| *write == AttrWrite::Mark(node, rule))
            || store.is_processed_by(node, rule)
    }

    /// Number of buffered writes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Check if nothing is buffered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}
