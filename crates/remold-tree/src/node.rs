//! Syntax nodes
//!
//! Provides [`Node`], the closed set of node payloads, and [`ChildRole`], the
//! slot a child occupies inside its parent. Children are referenced through
//! [`NodeId`] handles owned by a [`Tree`](crate::Tree).

use crate::kind::NodeKind;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt::{self, Display, Formatter};

/// Handle to a node stored in a [`Tree`](crate::Tree)
///
/// Handles are never reused. Once the node behind a handle is discarded by a
/// rewrite, lookups through it report absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Raw arena index
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source span reported by the external parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of the first character
    pub start: u32,
    /// Byte offset one past the last character
    pub end: u32,
    /// 1-based line of `start`
    pub line: u32,
}

impl Span {
    /// Create new span
    #[inline]
    #[must_use]
    pub fn new(start: u32, end: u32, line: u32) -> Self {
        Self { start, end, line }
    }
}

/// Scalar literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Literal {
    /// String literal
    Str(String),
    /// Integer literal
    Int(i64),
    /// Floating point literal
    Float(f64),
    /// Boolean literal
    Bool(bool),
    /// `null`
    Null,
}

/// Syntax node payload
///
/// Every variant stores its children as handles. A node never refers to
/// anything outside its own subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Compilation unit
    Module {
        /// Top-level classes, functions and statements
        items: Vec<NodeId>,
    },
    /// Class declaration
    Class {
        /// Fully qualified class name
        name: String,
        /// Parent class, if any
        extends: Option<String>,
        /// Method declarations
        members: Vec<NodeId>,
    },
    /// Method declaration
    Method {
        /// Method name
        name: String,
        /// Declared parameters
        params: Vec<NodeId>,
        /// Body statements
        body: Vec<NodeId>,
    },
    /// Free function declaration
    Function {
        /// Function name
        name: String,
        /// Declared parameters
        params: Vec<NodeId>,
        /// Body statements
        body: Vec<NodeId>,
    },
    /// Declared parameter
    Param {
        /// Parameter name without sigil
        name: String,
        /// Default value expression
        default: Option<NodeId>,
        /// `...$name`
        variadic: bool,
    },
    /// Method call on a receiver expression
    MethodCall {
        /// Receiver expression
        receiver: NodeId,
        /// Method name
        name: String,
        /// Call arguments
        args: Vec<NodeId>,
    },
    /// Static method call
    StaticCall {
        /// Class the call is made on
        class: String,
        /// Method name
        name: String,
        /// Call arguments
        args: Vec<NodeId>,
    },
    /// Free function call
    FuncCall {
        /// Function name
        name: String,
        /// Call arguments
        args: Vec<NodeId>,
    },
    /// Instantiation
    New {
        /// Instantiated class
        class: String,
        /// Constructor arguments
        args: Vec<NodeId>,
    },
    /// Call argument
    Arg {
        /// Named-argument label
        name: Option<String>,
        /// Argument value expression
        value: NodeId,
        /// `...$value`
        unpack: bool,
    },
    /// Variable reference
    Variable {
        /// Variable name without sigil
        name: String,
    },
    /// Scalar literal
    Literal {
        /// Literal value
        value: Literal,
    },
    /// Property access
    PropertyFetch {
        /// Object expression
        object: NodeId,
        /// Property name
        name: String,
    },
    /// Class constant access
    ClassConstFetch {
        /// Class name
        class: String,
        /// Constant name
        name: String,
    },
    /// Expression statement
    ExprStmt {
        /// Wrapped expression
        expr: NodeId,
    },
    /// Return statement
    Return {
        /// Returned expression
        expr: Option<NodeId>,
    },
    /// Assignment expression
    Assign {
        /// Assigned place
        target: NodeId,
        /// Assigned value
        value: NodeId,
    },
}

/// Slot a child occupies inside its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildRole {
    /// `Module::items`
    Item,
    /// `Class::members`
    Member,
    /// `Method::params` / `Function::params`
    Param,
    /// `Method::body` / `Function::body`
    Statement,
    /// `Param::default`
    Default,
    /// `MethodCall::receiver`
    Receiver,
    /// Argument lists of calls and instantiations
    Arg,
    /// `Arg::value`
    ArgValue,
    /// `PropertyFetch::object`
    Object,
    /// `ExprStmt::expr`
    Expr,
    /// `Return::expr`
    ReturnValue,
    /// `Assign::target`
    AssignTarget,
    /// `Assign::value`
    AssignValue,
}

impl ChildRole {
    /// Check if a node of `kind` may occupy this slot
    #[must_use]
    pub fn accepts(self, kind: NodeKind) -> bool {
        match self {
            ChildRole::Item => {
                matches!(kind, NodeKind::Class | NodeKind::Function) || kind.is_statement()
            }
            ChildRole::Member => kind == NodeKind::Method,
            ChildRole::Param => kind == NodeKind::Param,
            ChildRole::Statement => kind.is_statement(),
            ChildRole::Arg => kind == NodeKind::Arg,
            ChildRole::AssignTarget => {
                matches!(kind, NodeKind::Variable | NodeKind::PropertyFetch)
            }
            ChildRole::Default
            | ChildRole::Receiver
            | ChildRole::ArgValue
            | ChildRole::Object
            | ChildRole::Expr
            | ChildRole::ReturnValue
            | ChildRole::AssignValue => kind.is_expression(),
        }
    }

    /// Check if a child in this slot may be removed without breaking the parent
    #[inline]
    #[must_use]
    pub fn is_optional(self) -> bool {
        matches!(
            self,
            ChildRole::Item
                | ChildRole::Member
                | ChildRole::Param
                | ChildRole::Statement
                | ChildRole::Arg
                | ChildRole::Default
                | ChildRole::ReturnValue
        )
    }
}

impl Display for ChildRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Children of one node paired with their slot, in source order
pub type ChildSlots = SmallVec<[(ChildRole, NodeId); 4]>;

impl Node {
    /// Kind tag of this node
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Module { .. } => NodeKind::Module,
            Node::Class { .. } => NodeKind::Class,
            Node::Method { .. } => NodeKind::Method,
            Node::Function { .. } => NodeKind::Function,
            Node::Param { .. } => NodeKind::Param,
            Node::MethodCall { .. } => NodeKind::MethodCall,
            Node::StaticCall { .. } => NodeKind::StaticCall,
            Node::FuncCall { .. } => NodeKind::FuncCall,
            Node::New { .. } => NodeKind::New,
            Node::Arg { .. } => NodeKind::Arg,
            Node::Variable { .. } => NodeKind::Variable,
            Node::Literal { .. } => NodeKind::Literal,
            Node::PropertyFetch { .. } => NodeKind::PropertyFetch,
            Node::ClassConstFetch { .. } => NodeKind::ClassConstFetch,
            Node::ExprStmt { .. } => NodeKind::ExprStmt,
            Node::Return { .. } => NodeKind::Return,
            Node::Assign { .. } => NodeKind::Assign,
        }
    }

    /// Identifier carried by the node (callable, class, variable or parameter name)
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Class { name, .. }
            | Node::Method { name, .. }
            | Node::Function { name, .. }
            | Node::Param { name, .. }
            | Node::MethodCall { name, .. }
            | Node::StaticCall { name, .. }
            | Node::FuncCall { name, .. }
            | Node::Variable { name }
            | Node::PropertyFetch { name, .. }
            | Node::ClassConstFetch { name, .. } => Some(name.as_str()),
            Node::New { class, .. } => Some(class.as_str()),
            _ => None,
        }
    }

    /// Argument list of a call or instantiation
    #[must_use]
    pub fn args(&self) -> Option<&[NodeId]> {
        match self {
            Node::MethodCall { args, .. }
            | Node::StaticCall { args, .. }
            | Node::FuncCall { args, .. }
            | Node::New { args, .. } => Some(args),
            _ => None,
        }
    }

    /// Mutable argument list of a call or instantiation
    pub fn args_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match self {
            Node::MethodCall { args, .. }
            | Node::StaticCall { args, .. }
            | Node::FuncCall { args, .. }
            | Node::New { args, .. } => Some(args),
            _ => None,
        }
    }

    /// Parameter list of a declaration
    #[must_use]
    pub fn params(&self) -> Option<&[NodeId]> {
        match self {
            Node::Method { params, .. } | Node::Function { params, .. } => Some(params),
            _ => None,
        }
    }

    /// Mutable parameter list of a declaration
    pub fn params_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match self {
            Node::Method { params, .. } | Node::Function { params, .. } => Some(params),
            _ => None,
        }
    }

    /// Ordered list a rule may permute: parameters of declarations, arguments otherwise
    #[must_use]
    pub fn ordered_list(&self) -> Option<&[NodeId]> {
        self.params().or_else(|| self.args())
    }

    /// Mutable counterpart of [`Node::ordered_list`]
    pub fn ordered_list_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        if self.kind().is_declaration() {
            self.params_mut()
        } else {
            self.args_mut()
        }
    }

    /// Set the callable name of a call node
    ///
    /// Returns `false` for nodes that carry no callable name.
    pub fn rename_call(&mut self, new_name: impl Into<String>) -> bool {
        match self {
            Node::MethodCall { name, .. }
            | Node::StaticCall { name, .. }
            | Node::FuncCall { name, .. } => {
                *name = new_name.into();
                true
            }
            _ => false,
        }
    }

    /// Children with their slots, in source order
    #[must_use]
    pub fn child_slots(&self) -> ChildSlots {
        let mut out = ChildSlots::new();
        let list = |role: ChildRole, ids: &[NodeId], out: &mut ChildSlots| {
            out.extend(ids.iter().map(|id| (role, *id)));
        };
        match self {
            Node::Module { items } => list(ChildRole::Item, items, &mut out),
            Node::Class { members, .. } => list(ChildRole::Member, members, &mut out),
            Node::Method { params, body, .. } | Node::Function { params, body, .. } => {
                list(ChildRole::Param, params, &mut out);
                list(ChildRole::Statement, body, &mut out);
            }
            Node::Param { default, .. } => {
                out.extend(default.map(|id| (ChildRole::Default, id)));
            }
            Node::MethodCall { receiver, args, .. } => {
                out.push((ChildRole::Receiver, *receiver));
                list(ChildRole::Arg, args, &mut out);
            }
            Node::StaticCall { args, .. } | Node::FuncCall { args, .. } | Node::New { args, .. } => {
                list(ChildRole::Arg, args, &mut out);
            }
            Node::Arg { value, .. } => out.push((ChildRole::ArgValue, *value)),
            Node::PropertyFetch { object, .. } => out.push((ChildRole::Object, *object)),
            Node::ExprStmt { expr } => out.push((ChildRole::Expr, *expr)),
            Node::Return { expr } => out.extend(expr.map(|id| (ChildRole::ReturnValue, id))),
            Node::Assign { target, value } => {
                out.push((ChildRole::AssignTarget, *target));
                out.push((ChildRole::AssignValue, *value));
            }
            Node::Variable { .. } | Node::Literal { .. } | Node::ClassConstFetch { .. } => {}
        }
        out
    }

    /// Child handles in source order
    pub fn children(&self) -> impl Iterator<Item = NodeId> {
        self.child_slots().into_iter().map(|(_, id)| id)
    }

    /// Slot occupied by `child`, if it is a direct child
    #[must_use]
    pub fn role_of(&self, child: NodeId) -> Option<ChildRole> {
        self.child_slots()
            .into_iter()
            .find(|(_, id)| *id == child)
            .map(|(role, _)| role)
    }

    /// Names that must be non-empty for the node to be well formed
    pub(crate) fn required_names(&self) -> SmallVec<[&str; 2]> {
        let mut out = SmallVec::new();
        match self {
            Node::StaticCall { class, name, .. } | Node::ClassConstFetch { class, name } => {
                out.push(class.as_str());
                out.push(name.as_str());
            }
            Node::New { class, .. } => out.push(class.as_str()),
            Node::Module { .. }
            | Node::Arg { .. }
            | Node::Literal { .. }
            | Node::ExprStmt { .. }
            | Node::Return { .. }
            | Node::Assign { .. } => {}
            other => out.extend(other.name()),
        }
        out
    }

    /// Swap a direct child handle for another
    ///
    /// Returns `false` if `old` is not a direct child.
    pub(crate) fn replace_child(&mut self, old: NodeId, new: NodeId) -> bool {
        let swap = |slot: &mut NodeId| {
            if *slot == old {
                *slot = new;
                true
            } else {
                false
            }
        };
        let swap_in = |ids: &mut Vec<NodeId>| ids.iter_mut().any(|slot| swap(slot));
        match self {
            Node::Module { items } => swap_in(items),
            Node::Class { members, .. } => swap_in(members),
            Node::Method { params, body, .. } | Node::Function { params, body, .. } => {
                swap_in(params) || swap_in(body)
            }
            Node::Param { default, .. } => default.as_mut().is_some_and(|slot| swap(slot)),
            Node::MethodCall { receiver, args, .. } => swap(receiver) || swap_in(args),
            Node::StaticCall { args, .. } | Node::FuncCall { args, .. } | Node::New { args, .. } => {
                swap_in(args)
            }
            Node::Arg { value, .. } => swap(value),
            Node::PropertyFetch { object, .. } => swap(object),
            Node::ExprStmt { expr } => swap(expr),
            Node::Return { expr } => expr.as_mut().is_some_and(|slot| swap(slot)),
            Node::Assign { target, value } => swap(target) || swap(value),
            Node::Variable { .. } | Node::Literal { .. } | Node::ClassConstFetch { .. } => false,
        }
    }

    /// Detach a direct child from an optional slot
    ///
    /// Returns `false` if `child` is not a direct child held in an optional slot.
    pub(crate) fn detach_child(&mut self, child: NodeId) -> bool {
        let remove_from = |ids: &mut Vec<NodeId>| {
            let before = ids.len();
            ids.retain(|id| *id != child);
            ids.len() != before
        };
        let clear = |slot: &mut Option<NodeId>| {
            if *slot == Some(child) {
                *slot = None;
                true
            } else {
                false
            }
        };
        match self {
            Node::Module { items } => remove_from(items),
            Node::Class { members, .. } => remove_from(members),
            Node::Method { params, body, .. } | Node::Function { params, body, .. } => {
                remove_from(params) || remove_from(body)
            }
            Node::Param { default, .. } => clear(default),
            Node::MethodCall { args, .. }
            | Node::StaticCall { args, .. }
            | Node::FuncCall { args, .. }
            | Node::New { args, .. } => remove_from(args),
            Node::Return { expr } => clear(expr),
            _ => false,
        }
    }
}
