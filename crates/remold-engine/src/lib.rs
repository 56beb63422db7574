//! remold Engine
//!
//! Rule-dispatch and rewrite engine: walks a syntax tree, offers nodes to the
//! rules interested in their kind, and commits at most one validated rewrite
//! per node visit.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌──────────────┐
//! │   Driver   │──▶│ Dispatcher │──▶│ RuleRegistry │
//! │ passes,    │   │ pre-order, │   │ Rule, Rule.. │
//! │ batches    │   │ staging    │   └──────┬───────┘
//! └────────────┘   └─────┬──────┘          │ RuleContext
//!                        │                 ▼
//!                  ┌─────▼──────┐   ┌──────────────┐
//!                  │ Tree +     │   │ Semantic     │
//!                  │ Attributes │   │ Oracle       │
//!                  └────────────┘   └──────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use remold_engine::{Dispatcher, Outcome, Rule, RuleContext, RuleFault, RuleRegistry};
//! use remold_oracle::NullOracle;
//! use remold_tree::{KindSet, Node, NodeKind, RuleId, Tree};
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct RenameFoo;
//!
//! impl Rule for RenameFoo {
//!     fn id(&self) -> RuleId {
//!         RuleId::new("rename-foo")
//!     }
//!
//!     fn interests(&self) -> KindSet {
//!         KindSet::of(&[NodeKind::FuncCall])
//!     }
//!
//!     fn attempt(&self, cx: &mut RuleContext<'_>) -> Result<Outcome, RuleFault> {
//!         let mut node = cx.node().clone();
//!         if node.name() != Some("foo") {
//!             return Ok(Outcome::NoChange);
//!         }
//!         node.rename_call("bar");
//!         Ok(Outcome::Replace(node))
//!     }
//! }
//!
//! let mut tree = Tree::new();
//! let call = tree.alloc(Node::FuncCall { name: "foo".into(), args: vec![] }).unwrap();
//! let stmt = tree.alloc(Node::ExprStmt { expr: call }).unwrap();
//! let module = tree.alloc(Node::Module { items: vec![stmt] }).unwrap();
//! tree.set_root(module).unwrap();
//!
//! let rules = Arc::new(RuleRegistry::new().with(RenameFoo));
//! let mut dispatcher = Dispatcher::new(rules, Arc::new(NullOracle));
//! let report = dispatcher.traverse(&mut tree);
//!
//! assert_eq!(report.rewrites.len(), 1);
//! assert_eq!(tree.render(stmt), "bar();");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod cancel;
mod config;
mod context;
mod dispatcher;
mod driver;
mod error;
mod registry;
mod report;
mod rule;

// Re-exports
pub use cancel::CancelToken;
pub use config::{
    ContextConfig, Convergence, DriverConfig, EngineConfig, OracleConfig, RevisitPolicy,
    RulesConfig, TestContext, TraversalConfig,
};
pub use context::RuleContext;
pub use dispatcher::Dispatcher;
pub use driver::{BatchReport, Driver};
pub use error::{ConfigError, DriverError, EngineError, RuleFault};
pub use registry::RuleRegistry;
pub use report::{FaultRecord, Rewrite, RuleStats, RunReport, TraversalReport};
pub use rule::{Outcome, Rule};

/// Prelude module for rule authors
pub mod prelude {
    //! Common imports for writing rules
    pub use crate::{Outcome, Rule, RuleContext, RuleFault};
    pub use remold_oracle::{CallableRef, Resolution, SemanticOracle, Unresolved};
    pub use remold_tree::{AttrKey, KindSet, Node, NodeId, NodeKind, RuleId};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
