//! Compact source-like rendering
//!
//! Not a printer: output is a single line used in logs, reports and oracle
//! queries. Formatting fidelity belongs to the external printer.

use crate::node::{Literal, Node, NodeId};
use crate::tree::Tree;
use std::fmt::Write;

impl Tree {
    /// Render a subtree as one line of PHP-like text
    #[must_use]
    pub fn render(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.render_into(id, &mut out);
        out
    }

    fn render_list(&self, ids: &[NodeId], sep: &str, out: &mut String) {
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                out.push_str(sep);
            }
            self.render_into(*id, out);
        }
    }

    fn render_into(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            let _ = write!(out, "<dead {id}>");
            return;
        };
        match node {
            Node::Module { items } => self.render_list(items, "\n", out),
            Node::Class {
                name,
                extends,
                members,
            } => {
                let _ = write!(out, "class {name}");
                if let Some(parent) = extends {
                    let _ = write!(out, " extends {parent}");
                }
                out.push_str(" { ");
                self.render_list(members, " ", out);
                out.push_str(" }");
            }
            Node::Method { name, params, body } | Node::Function { name, params, body } => {
                let _ = write!(out, "function {name}(");
                self.render_list(params, ", ", out);
                out.push_str(") { ");
                self.render_list(body, " ", out);
                out.push_str(" }");
            }
            Node::Param {
                name,
                default,
                variadic,
            } => {
                if *variadic {
                    out.push_str("...");
                }
                let _ = write!(out, "${name}");
                if let Some(default) = default {
                    out.push_str(" = ");
                    self.render_into(*default, out);
                }
            }
            Node::MethodCall {
                receiver,
                name,
                args,
            } => {
                self.render_into(*receiver, out);
                let _ = write!(out, "->{name}(");
                self.render_list(args, ", ", out);
                out.push(')');
            }
            Node::StaticCall { class, name, args } => {
                let _ = write!(out, "{class}::{name}(");
                self.render_list(args, ", ", out);
                out.push(')');
            }
            Node::FuncCall { name, args } => {
                let _ = write!(out, "{name}(");
                self.render_list(args, ", ", out);
                out.push(')');
            }
            Node::New { class, args } => {
                let _ = write!(out, "new {class}(");
                self.render_list(args, ", ", out);
                out.push(')');
            }
            Node::Arg {
                name,
                value,
                unpack,
            } => {
                if let Some(label) = name {
                    let _ = write!(out, "{label}: ");
                }
                if *unpack {
                    out.push_str("...");
                }
                self.render_into(*value, out);
            }
            Node::Variable { name } => {
                let _ = write!(out, "${name}");
            }
            Node::Literal { value } => match value {
                Literal::Str(s) => {
                    let _ = write!(out, "{s:?}");
                }
                Literal::Int(n) => {
                    let _ = write!(out, "{n}");
                }
                Literal::Float(x) => {
                    let _ = write!(out, "{x:?}");
                }
                Literal::Bool(b) => {
                    let _ = write!(out, "{b}");
                }
                Literal::Null => out.push_str("null"),
            },
            Node::PropertyFetch { object, name } => {
                self.render_into(*object, out);
                let _ = write!(out, "->{name}");
            }
            Node::ClassConstFetch { class, name } => {
                let _ = write!(out, "{class}::{name}");
            }
            Node::ExprStmt { expr } => {
                self.render_into(*expr, out);
                out.push(';');
            }
            Node::Return { expr } => {
                out.push_str("return");
                if let Some(expr) = expr {
                    out.push(' ');
                    self.render_into(*expr, out);
                }
                out.push(';');
            }
            Node::Assign { target, value } => {
                self.render_into(*target, out);
                out.push_str(" = ");
                self.render_into(*value, out);
            }
        }
    }
}
