//! Specific `will*()` expectation methods
//!
//! Inside test classes, rewrites mock expectations to their dedicated forms:
//!
//! ```text
//! ->with($this->equalTo('x'))           =>  ->with('x')
//! ->will($this->returnValue('y'))       =>  ->willReturn('y')
//! ->will($this->throwException($e))     =>  ->willThrowException($e)
//! ```

use indexmap::IndexMap;
use remold_engine::prelude::*;
use remold_oracle::TypeName;
use serde::{Deserialize, Serialize};

/// Options table `[rules.specific-will-method]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecificWillOptions {
    /// Equality matcher unwrapped inside `with()`
    pub matcher: String,
    /// Nested call name inside `will()` mapped to the specific method
    pub renames: IndexMap<String, String>,
    /// Only rewrite calls whose receiver resolves to this class
    pub receiver_type: Option<String>,
}

impl Default for SpecificWillOptions {
    fn default() -> Self {
        let renames = [
            ("returnArgument", "willReturnArgument"),
            ("returnCallback", "willReturnCallback"),
            ("returnSelf", "willReturnSelf"),
            ("returnValue", "willReturn"),
            ("returnValueMap", "willReturnMap"),
            ("throwException", "willThrowException"),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect();
        Self {
            matcher: "equalTo".to_string(),
            renames,
            receiver_type: None,
        }
    }
}

/// Rewrites `with(equalTo(..))` and `will(returnX(..))` expectations
#[derive(Debug, Clone, Default)]
pub struct SpecificWillMethod {
    options: SpecificWillOptions,
}

impl SpecificWillMethod {
    /// Rule identifier
    pub const ID: RuleId = RuleId::new("specific-will-method");

    /// Create rule with default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create rule with explicit options
    #[inline]
    #[must_use]
    pub fn with_options(options: SpecificWillOptions) -> Self {
        Self { options }
    }

    /// Active options
    #[inline]
    #[must_use]
    pub fn options(&self) -> &SpecificWillOptions {
        &self.options
    }

    fn receiver_matches(cx: &RuleContext<'_>, expected: &str) -> bool {
        match cx.node() {
            Node::MethodCall { receiver, .. } => {
                match cx.oracle().resolve_type(&cx.type_query(*receiver)) {
                    Resolution::Resolved(found) => found.matches(expected),
                    Resolution::Unresolved(reason) => {
                        tracing::debug!(
                            node = %cx.id(),
                            receiver = %cx.render(*receiver),
                            %reason,
                            "receiver type unresolved"
                        );
                        false
                    }
                }
            }
            Node::StaticCall { class, .. } => TypeName(class.clone()).matches(expected),
            _ => false,
        }
    }

    /// `with(equalTo($x), ..)` keeps `$x` in place of each matcher call
    fn unwrap_matchers(&self, cx: &RuleContext<'_>) -> Result<Outcome, RuleFault> {
        let node = cx.node();
        let Some(args) = node.args() else {
            return Ok(Outcome::NoChange);
        };

        let mut new_args = args.to_vec();
        let mut unwrapped = 0;
        for slot in &mut new_args {
            let Node::Arg {
                name: None,
                value,
                unpack: false,
            } = cx.get(*slot)?
            else {
                continue;
            };
            if let Some(inner) = self.matcher_operand(cx, *value)? {
                *slot = inner;
                unwrapped += 1;
            }
        }
        if unwrapped == 0 {
            return Ok(Outcome::NoChange);
        }

        let mut node = node.clone();
        if let Some(args) = node.args_mut() {
            *args = new_args;
        }
        Ok(Outcome::Replace(node))
    }

    /// Sole argument of a matcher call
    fn matcher_operand(&self, cx: &RuleContext<'_>, value: NodeId) -> Result<Option<NodeId>, RuleFault> {
        let call = cx.get(value)?;
        if !is_call(call) || !call.name().is_some_and(|name| name.eq_ignore_ascii_case(&self.options.matcher)) {
            return Ok(None);
        }
        match call.args() {
            Some([only]) => Ok(Some(*only)),
            _ => Ok(None),
        }
    }

    /// `will(returnValue($y))` becomes `willReturn($y)`
    fn rename_will(&self, cx: &RuleContext<'_>) -> Result<Outcome, RuleFault> {
        let node = cx.node();
        let Some(&first) = node.args().and_then(<[NodeId]>::first) else {
            return Ok(Outcome::NoChange);
        };
        let Node::Arg { value, .. } = cx.get(first)? else {
            return Ok(Outcome::NoChange);
        };
        let nested = cx.get(*value)?;
        if !is_call(nested) {
            return Ok(Outcome::NoChange);
        }
        let Some(specific) = nested.name().and_then(|name| self.rename_of(name)) else {
            return Ok(Outcome::NoChange);
        };

        let moved = nested.args().map(<[NodeId]>::to_vec).unwrap_or_default();
        let mut node = node.clone();
        node.rename_call(specific);
        if let Some(args) = node.args_mut() {
            *args = moved;
        }
        Ok(Outcome::Replace(node))
    }

    fn rename_of(&self, nested: &str) -> Option<&str> {
        self.options
            .renames
            .iter()
            .find(|(from, _)| from.eq_ignore_ascii_case(nested))
            .map(|(_, to)| to.as_str())
    }
}

fn is_call(node: &Node) -> bool {
    matches!(
        node,
        Node::MethodCall { .. } | Node::StaticCall { .. } | Node::FuncCall { .. }
    )
}

impl Rule for SpecificWillMethod {
    fn id(&self) -> RuleId {
        Self::ID
    }

    fn interests(&self) -> KindSet {
        KindSet::of(&[NodeKind::MethodCall, NodeKind::StaticCall])
    }

    fn attempt(&self, cx: &mut RuleContext<'_>) -> Result<Outcome, RuleFault> {
        if !self.interests().contains(cx.kind()) || !cx.flag(AttrKey::InTestContext) {
            return Ok(Outcome::NoChange);
        }
        let handler: fn(&Self, &RuleContext<'_>) -> Result<Outcome, RuleFault> = match cx.node().name() {
            Some(name) if name.eq_ignore_ascii_case("with") => Self::unwrap_matchers,
            Some(name) if name.eq_ignore_ascii_case("will") => Self::rename_will,
            _ => return Ok(Outcome::NoChange),
        };
        if let Some(expected) = &self.options.receiver_type {
            if !Self::receiver_matches(cx, expected) {
                return Ok(Outcome::NoChange);
            }
        }
        handler(self, cx)
    }

    fn description(&self) -> &'static str {
        "Changes ->will($this->xxx()) to one specific method"
    }
}
