//! Node kinds and kind sets
//!
//! Provides [`NodeKind`], the closed tag of every [`Node`](crate::Node), and
//! [`KindSet`], a bitset used by rules to declare which kinds they handle.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Syntactic kind of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Compilation unit root
    Module,
    /// Class declaration
    Class,
    /// Method declaration inside a class
    Method,
    /// Free function declaration
    Function,
    /// Declared parameter
    Param,
    /// `$receiver->name(args)`
    MethodCall,
    /// `Class::name(args)`
    StaticCall,
    /// `name(args)`
    FuncCall,
    /// `new Class(args)`
    New,
    /// Call argument
    Arg,
    /// `$name`
    Variable,
    /// Scalar literal
    Literal,
    /// `$object->name`
    PropertyFetch,
    /// `Class::NAME`
    ClassConstFetch,
    /// Expression used as a statement
    ExprStmt,
    /// `return expr;`
    Return,
    /// `target = value`
    Assign,
}

impl NodeKind {
    /// Every kind, in declaration order
    pub const ALL: [NodeKind; 17] = [
        NodeKind::Module,
        NodeKind::Class,
        NodeKind::Method,
        NodeKind::Function,
        NodeKind::Param,
        NodeKind::MethodCall,
        NodeKind::StaticCall,
        NodeKind::FuncCall,
        NodeKind::New,
        NodeKind::Arg,
        NodeKind::Variable,
        NodeKind::Literal,
        NodeKind::PropertyFetch,
        NodeKind::ClassConstFetch,
        NodeKind::ExprStmt,
        NodeKind::Return,
        NodeKind::Assign,
    ];

    /// Bit position inside a [`KindSet`]
    #[inline]
    #[must_use]
    const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Check if this kind can stand where an expression is expected
    #[inline]
    #[must_use]
    pub fn is_expression(self) -> bool {
        matches!(
            self,
            NodeKind::MethodCall
                | NodeKind::StaticCall
                | NodeKind::FuncCall
                | NodeKind::New
                | NodeKind::Variable
                | NodeKind::Literal
                | NodeKind::PropertyFetch
                | NodeKind::ClassConstFetch
                | NodeKind::Assign
        )
    }

    /// Check if this kind is a call or instantiation carrying arguments
    #[inline]
    #[must_use]
    pub fn is_call_like(self) -> bool {
        matches!(
            self,
            NodeKind::MethodCall | NodeKind::StaticCall | NodeKind::FuncCall | NodeKind::New
        )
    }

    /// Check if this kind is a callable declaration carrying parameters
    #[inline]
    #[must_use]
    pub fn is_declaration(self) -> bool {
        matches!(self, NodeKind::Method | NodeKind::Function)
    }

    /// Check if this kind can appear as a statement in a body
    #[inline]
    #[must_use]
    pub fn is_statement(self) -> bool {
        matches!(self, NodeKind::ExprStmt | NodeKind::Return)
    }

    /// Stable lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Module => "module",
            NodeKind::Class => "class",
            NodeKind::Method => "method",
            NodeKind::Function => "function",
            NodeKind::Param => "param",
            NodeKind::MethodCall => "method_call",
            NodeKind::StaticCall => "static_call",
            NodeKind::FuncCall => "func_call",
            NodeKind::New => "new",
            NodeKind::Arg => "arg",
            NodeKind::Variable => "variable",
            NodeKind::Literal => "literal",
            NodeKind::PropertyFetch => "property_fetch",
            NodeKind::ClassConstFetch => "class_const_fetch",
            NodeKind::ExprStmt => "expr_stmt",
            NodeKind::Return => "return",
            NodeKind::Assign => "assign",
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of node kinds
///
/// Membership is a single mask test, so the dispatcher can filter rules per
/// node without asking the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KindSet(u32);

impl KindSet {
    /// Empty set
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Set containing every kind
    #[must_use]
    pub fn all() -> Self {
        Self::of(&NodeKind::ALL)
    }

    /// Build a set from a slice of kinds
    #[must_use]
    pub fn of(kinds: &[NodeKind]) -> Self {
        kinds.iter().fold(Self::empty(), |set, kind| set.with(*kind))
    }

    /// Return a copy with `kind` added
    #[inline]
    #[must_use]
    pub const fn with(self, kind: NodeKind) -> Self {
        Self(self.0 | kind.bit())
    }

    /// Check membership
    #[inline]
    #[must_use]
    pub const fn contains(self, kind: NodeKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Check if the set is empty
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of kinds in the set
    #[inline]
    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate over the kinds in declaration order
    pub fn iter(self) -> impl Iterator<Item = NodeKind> {
        NodeKind::ALL.into_iter().filter(move |kind| self.contains(*kind))
    }
}

impl FromIterator<NodeKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = NodeKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), KindSet::with)
    }
}

impl Display for KindSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(NodeKind::as_str).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}
