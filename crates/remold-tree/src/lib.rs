//! remold Tree
//!
//! Syntax-tree model the rewrite engine operates on.
//!
//! # Core Concepts
//!
//! - [`Tree`]: Arena owning every node of one source file
//! - [`Node`] / [`NodeKind`]: Closed set of node payloads and their tags
//! - [`NodeId`]: Stable handle, never reused after a node is discarded
//! - [`Staged`] / [`Change`]: Transactional single-node rewrites, validated
//!   before commit
//! - [`AttributeStore`]: Per-node metadata keyed by handle
//!
//! # Example
//!
//! ```rust
//! use remold_tree::{Change, Node, Tree};
//!
//! let mut tree = Tree::new();
//! let x = tree.alloc(Node::Variable { name: "x".into() }).unwrap();
//! let stmt = tree.alloc(Node::ExprStmt { expr: x }).unwrap();
//! let module = tree.alloc(Node::Module { items: vec![stmt] }).unwrap();
//! tree.set_root(module).unwrap();
//!
//! // Rename the variable in place
//! let staged = tree.stage();
//! tree.commit(x, Change::Replace(Node::Variable { name: "y".into() }), staged)
//!     .unwrap();
//! assert_eq!(tree.get(x).and_then(Node::name), Some("y"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod attributes;
mod edit;
mod error;
mod kind;
mod node;
mod render;
mod tree;

// Re-exports
pub use attributes::{AttrKey, AttrValue, AttributeStore, Marker, PendingAttributes, RuleId};
pub use edit::{Change, Committed, Staged};
pub use error::StructureError;
pub use kind::{KindSet, NodeKind};
pub use node::{ChildRole, ChildSlots, Literal, Node, NodeId, Span};
pub use tree::Tree;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
