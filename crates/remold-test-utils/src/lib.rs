//! Testing utilities for remold workspace
//!
//! Shared tree builders, oracle fixtures and tracing setup.

#![allow(missing_docs)]

use remold_oracle::{CallableRef, DeclarationSite, InMemoryOracle, ParamSpec, Signature};
use remold_tree::{Literal, Node, NodeId, Tree};
use std::path::PathBuf;

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builds trees bottom-up; panics on invalid structure
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: Tree,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_file(path: &str) -> Self {
        Self {
            tree: Tree::for_file(path),
        }
    }

    pub fn node(&mut self, node: Node) -> NodeId {
        self.tree.alloc(node).expect("valid fixture node")
    }

    pub fn var(&mut self, name: &str) -> NodeId {
        self.node(Node::Variable { name: name.into() })
    }

    pub fn this(&mut self) -> NodeId {
        self.var("this")
    }

    pub fn str(&mut self, value: &str) -> NodeId {
        self.node(Node::Literal {
            value: Literal::Str(value.into()),
        })
    }

    pub fn int(&mut self, value: i64) -> NodeId {
        self.node(Node::Literal {
            value: Literal::Int(value),
        })
    }

    pub fn arg(&mut self, value: NodeId) -> NodeId {
        self.node(Node::Arg {
            name: None,
            value,
            unpack: false,
        })
    }

    pub fn args(&mut self, values: &[NodeId]) -> Vec<NodeId> {
        values.iter().map(|value| self.arg(*value)).collect()
    }

    pub fn prop(&mut self, object: NodeId, name: &str) -> NodeId {
        self.node(Node::PropertyFetch {
            object,
            name: name.into(),
        })
    }

    pub fn method_call(&mut self, receiver: NodeId, name: &str, values: &[NodeId]) -> NodeId {
        let args = self.args(values);
        self.node(Node::MethodCall {
            receiver,
            name: name.into(),
            args,
        })
    }

    pub fn static_call(&mut self, class: &str, name: &str, values: &[NodeId]) -> NodeId {
        let args = self.args(values);
        self.node(Node::StaticCall {
            class: class.into(),
            name: name.into(),
            args,
        })
    }

    pub fn func_call(&mut self, name: &str, values: &[NodeId]) -> NodeId {
        let args = self.args(values);
        self.node(Node::FuncCall {
            name: name.into(),
            args,
        })
    }

    pub fn new_object(&mut self, class: &str, values: &[NodeId]) -> NodeId {
        let args = self.args(values);
        self.node(Node::New {
            class: class.into(),
            args,
        })
    }

    pub fn param(&mut self, name: &str) -> NodeId {
        self.node(Node::Param {
            name: name.into(),
            default: None,
            variadic: false,
        })
    }

    pub fn optional_param(&mut self, name: &str, default: NodeId) -> NodeId {
        self.node(Node::Param {
            name: name.into(),
            default: Some(default),
            variadic: false,
        })
    }

    pub fn method(&mut self, name: &str, params: Vec<NodeId>, body: Vec<NodeId>) -> NodeId {
        self.node(Node::Method {
            name: name.into(),
            params,
            body,
        })
    }

    pub fn function(&mut self, name: &str, params: Vec<NodeId>, body: Vec<NodeId>) -> NodeId {
        self.node(Node::Function {
            name: name.into(),
            params,
            body,
        })
    }

    pub fn class(&mut self, name: &str, extends: Option<&str>, members: Vec<NodeId>) -> NodeId {
        self.node(Node::Class {
            name: name.into(),
            extends: extends.map(str::to_string),
            members,
        })
    }

    pub fn stmt(&mut self, expr: NodeId) -> NodeId {
        self.node(Node::ExprStmt { expr })
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Wrap items in a module root and return the tree
    pub fn finish(mut self, items: Vec<NodeId>) -> Tree {
        let module = self.node(Node::Module { items });
        self.tree.set_root(module).expect("fresh module root");
        self.tree
    }
}

/// Handles of the `Arg` nodes of a call or the `Param` nodes of a declaration
pub fn list_of(tree: &Tree, id: NodeId) -> Vec<NodeId> {
    tree.get(id)
        .and_then(Node::ordered_list)
        .map(<[NodeId]>::to_vec)
        .unwrap_or_default()
}

/// Parameter names of a declaration, in current order
pub fn param_names(tree: &Tree, decl: NodeId) -> Vec<String> {
    list_of(tree, decl)
        .into_iter()
        .filter_map(|id| tree.get(id).and_then(Node::name).map(str::to_string))
        .collect()
}

/// Argument values of a call, rendered, in current order
pub fn rendered_args(tree: &Tree, call: NodeId) -> Vec<String> {
    list_of(tree, call)
        .into_iter()
        .map(|id| tree.render(id))
        .collect()
}

/// Site of a project-owned declaration
pub fn project_site() -> DeclarationSite {
    DeclarationSite::File(PathBuf::from("/app/src/SomeObject.php"))
}

/// Site of a third-party declaration
pub fn vendor_site() -> DeclarationSite {
    DeclarationSite::File(PathBuf::from("/app/vendor/acme/lib/SomeObject.php"))
}

/// Signature from `(name, optional)` pairs in declared order
pub fn signature(params: &[(&str, bool)], site: DeclarationSite) -> Signature {
    let params = params
        .iter()
        .enumerate()
        .map(|(position, (name, optional))| {
            if *optional {
                ParamSpec::optional(*name, position)
            } else {
                ParamSpec::required(*name, position)
            }
        })
        .collect();
    Signature::new(params, site)
}

/// Oracle knowing `SomeObject::run($optional = 1, $required)` at `site`
pub fn run_oracle(site: DeclarationSite) -> InMemoryOracle {
    InMemoryOracle::new().with_signature(
        CallableRef::method("SomeObject", "run"),
        signature(&[("optional", true), ("required", false)], site),
    )
}

/// `class SomeObject { function run($optional = 1, $required) {} }`
///
/// Returns the tree and the method declaration.
pub fn run_declaration_tree() -> (Tree, NodeId) {
    let mut b = TreeBuilder::for_file("/app/src/SomeObject.php");
    let one = b.int(1);
    let optional = b.optional_param("optional", one);
    let required = b.param("required");
    let method = b.method("run", vec![optional, required], vec![]);
    let class = b.class("SomeObject", None, vec![method]);
    (b.finish(vec![class]), method)
}
