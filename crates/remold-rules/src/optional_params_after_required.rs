//! Required parameters before optional ones
//!
//! A required parameter declared after an optional one is deprecated. The rule
//! moves required parameters first in project-owned declarations and reorders
//! positional arguments of every call that reaches such a declaration:
//!
//! ```text
//! function run($optional = 1, $required)  =>  function run($required, $optional = 1)
//! $object->run(1, $value)                  =>  $object->run($value, 1)
//! ```
//!
//! The expected order comes from the oracle's signature, never from the local
//! syntax, so declarations and call sites move together. Each rewritten node is
//! marked processed and left alone afterwards.

use remold_engine::prelude::*;
use remold_oracle::{OwnershipPolicy, Signature};

/// Reorders parameters and arguments to required-first order
#[derive(Debug, Clone, Default)]
pub struct OptionalParamsAfterRequired {
    ownership: OwnershipPolicy,
}

impl OptionalParamsAfterRequired {
    /// Rule identifier
    pub const ID: RuleId = RuleId::new("optional-params-after-required");

    /// Create rule with an ownership policy
    #[inline]
    #[must_use]
    pub fn new(ownership: OwnershipPolicy) -> Self {
        Self { ownership }
    }

    /// Callable the dispatched node declares or invokes
    fn callable_of(cx: &RuleContext<'_>) -> Result<Option<CallableRef>, RuleFault> {
        let callable = match cx.node() {
            Node::Function { name, .. } | Node::FuncCall { name, .. } => {
                Some(CallableRef::function(name.as_str()))
            }
            Node::Method { name, .. } => cx
                .text(AttrKey::EnclosingClass)
                .map(|class| CallableRef::method(class, name.as_str())),
            Node::New { class, .. } => {
                class_named(cx, class).map(CallableRef::constructor)
            }
            Node::StaticCall { class, name, .. } => {
                class_named(cx, class).map(|class| CallableRef::method(class, name.as_str()))
            }
            Node::MethodCall { receiver, name, .. } => {
                receiver_class(cx, *receiver)?.map(|class| CallableRef::method(class, name.as_str()))
            }
            _ => None,
        };
        Ok(callable)
    }

    /// Expected order of `list` under `signature`, if it differs from the
    /// current one
    fn reorder(&self, cx: &RuleContext<'_>, list: &[NodeId], signature: &Signature) -> Option<Vec<NodeId>> {
        if !self.ownership.owns(&signature.site) {
            tracing::debug!(node = %cx.id(), site = ?signature.site, "declaration not owned");
            return None;
        }
        if list.len() != signature.arity() {
            tracing::debug!(
                node = %cx.id(),
                local = list.len(),
                arity = signature.arity(),
                "arity mismatch"
            );
            return None;
        }
        if !signature.has_consistent_positions() {
            tracing::debug!(node = %cx.id(), "signature positions inconsistent");
            return None;
        }

        let order = signature.required_first_order();
        if order.iter().copied().eq(0..order.len()) {
            return None;
        }
        order.iter().map(|position| list.get(*position).copied()).collect()
    }
}

/// Class a static call or instantiation names, with `self`/`static`/`parent`
/// resolved against the enclosing class
fn class_named(cx: &RuleContext<'_>, class: &str) -> Option<String> {
    if class.eq_ignore_ascii_case("self") || class.eq_ignore_ascii_case("static") {
        return cx.text(AttrKey::EnclosingClass).map(str::to_string);
    }
    if class.eq_ignore_ascii_case("parent") {
        let tree = cx.tree();
        return tree
            .ancestors(cx.id())
            .into_iter()
            .find_map(|id| match tree.get(id) {
                Some(Node::Class { extends, .. }) => Some(extends.clone()),
                _ => None,
            })
            .flatten();
    }
    Some(class.trim_start_matches('\\').to_string())
}

/// Class of a method call receiver; `$this` is the enclosing class, anything
/// else goes to the oracle
fn receiver_class(cx: &RuleContext<'_>, receiver: NodeId) -> Result<Option<String>, RuleFault> {
    if let Node::Variable { name } = cx.get(receiver)? {
        if name == "this" {
            return Ok(cx.text(AttrKey::EnclosingClass).map(str::to_string));
        }
    }
    match cx.oracle().resolve_type(&cx.type_query(receiver)) {
        Resolution::Resolved(type_name) => Ok(Some(type_name.0)),
        Resolution::Unresolved(reason) => {
            tracing::debug!(node = %cx.id(), receiver = %cx.render(receiver), %reason, "receiver type unresolved");
            Ok(None)
        }
    }
}

/// Named or unpacked arguments do not map onto positions
fn is_positional(cx: &RuleContext<'_>, args: &[NodeId]) -> Result<bool, RuleFault> {
    for arg in args {
        if let Node::Arg { name, unpack, .. } = cx.get(*arg)? {
            if name.is_some() || *unpack {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

impl Rule for OptionalParamsAfterRequired {
    fn id(&self) -> RuleId {
        Self::ID
    }

    fn interests(&self) -> KindSet {
        KindSet::of(&[
            NodeKind::Method,
            NodeKind::Function,
            NodeKind::New,
            NodeKind::MethodCall,
            NodeKind::StaticCall,
            NodeKind::FuncCall,
        ])
    }

    fn attempt(&self, cx: &mut RuleContext<'_>) -> Result<Outcome, RuleFault> {
        if !self.interests().contains(cx.kind()) || cx.is_processed_by(Self::ID) {
            return Ok(Outcome::NoChange);
        }
        let node = cx.node();
        let Some(list) = node.ordered_list() else {
            return Ok(Outcome::NoChange);
        };
        if list.is_empty() {
            return Ok(Outcome::NoChange);
        }
        if !node.kind().is_declaration() && !is_positional(cx, list)? {
            return Ok(Outcome::NoChange);
        }

        let Some(callable) = Self::callable_of(cx)? else {
            return Ok(Outcome::NoChange);
        };
        let signature = match cx.oracle().resolve_signature(&callable) {
            Resolution::Resolved(signature) => signature,
            Resolution::Unresolved(reason) => {
                tracing::debug!(node = %cx.id(), %callable, %reason, "signature unresolved");
                return Ok(Outcome::NoChange);
            }
        };
        let Some(reordered) = self.reorder(cx, list, &signature) else {
            return Ok(Outcome::NoChange);
        };

        let mut node = node.clone();
        if let Some(slot) = node.ordered_list_mut() {
            *slot = reordered;
        }
        cx.mark_processed(Self::ID);
        tracing::debug!(node = %cx.id(), %callable, "moved required parameters first");
        Ok(Outcome::Replace(node))
    }

    fn description(&self) -> &'static str {
        "Move required parameters after optional ones"
    }
}
