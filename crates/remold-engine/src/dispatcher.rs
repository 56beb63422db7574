//! Dispatcher / traverser
//!
//! Walks a tree in pre-order, offers each node to the rules interested in its
//! kind and commits the first rewrite one of them requests.
//!
//! # Visit protocol
//! 1. Context attributes (enclosing class, test context, source file) are
//!    written for the node from what its ancestors established.
//! 2. Interested rules run in registry order inside a panic boundary. A
//!    decline commits the rule's attribute writes; a fault drops them and is
//!    recorded.
//! 3. The first requested rewrite is validated and committed. An invalid
//!    rewrite is recorded as a fault and the next rule is tried.
//! 4. Under [`RevisitPolicy::Reevaluate`] the rewritten node is offered to the
//!    whole rule list again, up to `max_rewrites_per_node` rewrites.
//! 5. Traversal continues with the children of whatever node now stands in
//!    the visited node's place.
//!
//! Cancellation and deadlines are checked between node visits only.

use crate::cancel::CancelToken;
use crate::config::{ContextConfig, EngineConfig, RevisitPolicy, TestContext};
use crate::context::RuleContext;
use crate::error::{ConfigError, RuleFault};
use crate::registry::RuleRegistry;
use crate::report::{FaultRecord, Rewrite, TraversalReport};
use crate::rule::Rule;
use remold_oracle::SemanticOracle;
use remold_tree::{AttrKey, AttributeStore, Change, Node, NodeId, PendingAttributes, Staged, Tree};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Context inherited from ancestors
#[derive(Debug, Clone, Default)]
struct Scope {
    class: Option<String>,
    in_test: bool,
}

enum Invocation {
    Declined(PendingAttributes),
    Rewrite(Change, Staged, PendingAttributes),
    Faulted(RuleFault),
}

/// Rule dispatcher for one tree at a time
///
/// Owns the attribute store, so processed markers survive across passes over
/// the same tree. Use one dispatcher per tree.
pub struct Dispatcher {
    rules: Arc<RuleRegistry>,
    oracle: Arc<dyn SemanticOracle>,
    revisit: RevisitPolicy,
    max_rewrites_per_node: usize,
    test_context: TestContext,
    attributes: AttributeStore,
    cancel: CancelToken,
    deadline: Option<Instant>,
}

impl Dispatcher {
    /// Create dispatcher with default settings
    #[must_use]
    pub fn new(rules: Arc<RuleRegistry>, oracle: Arc<dyn SemanticOracle>) -> Self {
        let test_context = TestContext::from_config(&ContextConfig::default())
            .unwrap_or_else(|err| {
                tracing::warn!(%err, "default test-class recognizer did not compile, test context disabled");
                TestContext::disabled()
            });
        Self {
            rules,
            oracle,
            revisit: RevisitPolicy::SingleWinner,
            max_rewrites_per_node: 8,
            test_context,
            attributes: AttributeStore::new(),
            cancel: CancelToken::new(),
            deadline: None,
        }
    }

    /// Create dispatcher from configuration
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the test-class pattern does not compile
    pub fn from_config(
        rules: Arc<RuleRegistry>,
        oracle: Arc<dyn SemanticOracle>,
        config: &EngineConfig,
    ) -> Result<Self, ConfigError> {
        let test_context = TestContext::from_config(&config.context)?;
        Ok(Self::new(rules, oracle)
            .with_revisit(config.traversal.revisit, config.traversal.max_rewrites_per_node)
            .with_test_context(test_context))
    }

    /// Set revisit policy and per-node rewrite bound
    #[must_use]
    pub fn with_revisit(mut self, policy: RevisitPolicy, max_rewrites_per_node: usize) -> Self {
        self.revisit = policy;
        self.max_rewrites_per_node = max_rewrites_per_node.max(1);
        self
    }

    /// Set test-class recognizer
    #[must_use]
    pub fn with_test_context(mut self, test_context: TestContext) -> Self {
        self.test_context = test_context;
        self
    }

    /// Share a cancellation token
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Stop visiting nodes after `deadline`
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    /// Attribute store of the current tree
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    /// Forget everything recorded about the previous tree
    pub fn reset(&mut self) {
        self.attributes.clear();
    }

    /// Run one pass over `tree`
    ///
    /// Never fails: faults are recorded in the report. Handles held before the
    /// call may be dead afterwards.
    pub fn traverse(&mut self, tree: &mut Tree) -> TraversalReport {
        let mut report = TraversalReport::default();
        let Some(root) = tree.root() else {
            return report;
        };
        let file = tree.file().map(|path| path.to_string_lossy().into_owned());

        let mut stack = vec![(root, Scope::default())];
        while let Some((id, scope)) = stack.pop() {
            if self.should_stop() {
                report.cancelled = true;
                tracing::info!(visited = report.visited, "traversal cancelled");
                break;
            }
            if !tree.is_alive(id) {
                continue;
            }
            report.visited += 1;
            self.annotate(id, &scope, file.as_deref());

            let Some(current) = self.visit(tree, id, &mut report) else {
                continue;
            };
            if current != id {
                self.annotate(current, &scope, file.as_deref());
            }
            let Some(node) = tree.get(current) else {
                continue;
            };
            let inner = self.child_scope(node, &scope);
            let children: Vec<NodeId> = node.children().collect();
            stack.extend(children.into_iter().rev().map(|child| (child, inner.clone())));
        }

        tracing::info!(
            file = file.as_deref().unwrap_or("<memory>"),
            visited = report.visited,
            rewrites = report.rewrites.len(),
            faults = report.faults.len(),
            "traversal finished"
        );
        report
    }

    fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn annotate(&mut self, id: NodeId, scope: &Scope, file: Option<&str>) {
        match &scope.class {
            Some(class) => self.attributes.set(id, AttrKey::EnclosingClass, class.as_str()),
            None => {
                self.attributes.remove(id, AttrKey::EnclosingClass);
            }
        }
        self.attributes.set(id, AttrKey::InTestContext, scope.in_test);
        if let Some(file) = file {
            self.attributes.set(id, AttrKey::ResolvedFile, file);
        }
    }

    fn child_scope(&self, node: &Node, scope: &Scope) -> Scope {
        match node {
            Node::Class { name, extends, .. } => Scope {
                class: Some(name.clone()),
                in_test: self.test_context.is_test_class(name, extends.as_deref()),
            },
            _ => scope.clone(),
        }
    }

    /// Offer a node to its rules; returns the node now in its place
    fn visit(&mut self, tree: &mut Tree, id: NodeId, report: &mut TraversalReport) -> Option<NodeId> {
        let rules = Arc::clone(&self.rules);
        let mut current = id;
        let mut rewrites = 0;

        'offer: loop {
            let kind = tree.kind(current)?;
            for rule in rules.interested_in(kind) {
                match self.invoke(rule, tree, current) {
                    Invocation::Declined(pending) => self.attributes.apply(pending),
                    Invocation::Faulted(fault) => Self::record_fault(rule, current, &fault, report),
                    Invocation::Rewrite(change, staged, pending) => {
                        let label = change.label();
                        let committed = match tree.commit(current, change, staged) {
                            Ok(committed) => committed,
                            Err(error) => {
                                Self::record_fault(rule, current, &RuleFault::Structure(error), report);
                                continue;
                            }
                        };
                        self.attributes.apply(pending);
                        self.attributes.forget_all(&committed.discarded);
                        tracing::debug!(
                            rule = %rule.id(),
                            node = %current,
                            change = label,
                            discarded = committed.discarded.len(),
                            "rewrite committed"
                        );
                        report.rewrites.push(Rewrite {
                            rule: rule.id(),
                            node: current,
                            current: committed.current,
                            change: label,
                        });
                        rewrites += 1;

                        current = committed.current?;
                        if self.revisit == RevisitPolicy::SingleWinner {
                            return Some(current);
                        }
                        if rewrites >= self.max_rewrites_per_node {
                            tracing::debug!(node = %current, rewrites, "rewrite limit reached");
                            report.limited.push(current);
                            return Some(current);
                        }
                        continue 'offer;
                    }
                }
            }
            return Some(current);
        }
    }

    fn invoke(&self, rule: &dyn Rule, tree: &Tree, id: NodeId) -> Invocation {
        let mut cx = match RuleContext::new(tree, id, &self.attributes, &*self.oracle) {
            Ok(cx) => cx,
            Err(fault) => return Invocation::Faulted(fault),
        };
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| rule.attempt(&mut cx))) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(fault)) => return Invocation::Faulted(fault),
            Err(payload) => return Invocation::Faulted(RuleFault::Panicked(panic_message(&*payload))),
        };
        let (staged, pending) = cx.into_parts();
        match outcome.into_change() {
            None => Invocation::Declined(pending),
            Some(change) => Invocation::Rewrite(change, staged, pending),
        }
    }

    fn record_fault(rule: &dyn Rule, node: NodeId, fault: &RuleFault, report: &mut TraversalReport) {
        tracing::warn!(rule = %rule.id(), node = %node, kind = fault.label(), error = %fault, "rule fault");
        report.faults.push(FaultRecord {
            rule: rule.id(),
            node,
            kind: fault.label(),
            message: fault.to_string(),
        });
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("rules", &self.rules.names())
            .field("oracle", &self.oracle.name())
            .field("revisit", &self.revisit)
            .field("max_rewrites_per_node", &self.max_rewrites_per_node)
            .field("attributes", &self.attributes.len())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Outcome;
    use pretty_assertions::assert_eq;
    use remold_oracle::NullOracle;
    use remold_tree::{KindSet, Literal, NodeKind, RuleId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Renames variables `from` to `to`
    #[derive(Debug)]
    struct RenameVar {
        id: &'static str,
        from: &'static str,
        to: &'static str,
    }

    impl Rule for RenameVar {
        fn id(&self) -> RuleId {
            RuleId::new(self.id)
        }

        fn interests(&self) -> KindSet {
            KindSet::of(&[NodeKind::Variable])
        }

        fn attempt(&self, cx: &mut RuleContext<'_>) -> Result<Outcome, RuleFault> {
            match cx.node() {
                Node::Variable { name } if name == self.from => Ok(Outcome::Replace(Node::Variable {
                    name: self.to.into(),
                })),
                _ => Ok(Outcome::NoChange),
            }
        }
    }

    fn rename(id: &'static str, from: &'static str, to: &'static str) -> RenameVar {
        RenameVar { id, from, to }
    }

    /// Counts invocations and always declines
    #[derive(Debug, Default)]
    struct Counter {
        calls: AtomicUsize,
    }

    impl Rule for Counter {
        fn id(&self) -> RuleId {
            RuleId::new("counter")
        }

        fn interests(&self) -> KindSet {
            KindSet::of(&[NodeKind::Variable])
        }

        fn attempt(&self, _cx: &mut RuleContext<'_>) -> Result<Outcome, RuleFault> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Outcome::NoChange)
        }
    }

    /// Panics on every variable
    #[derive(Debug)]
    struct Panics;

    impl Rule for Panics {
        fn id(&self) -> RuleId {
            RuleId::new("panics")
        }

        fn interests(&self) -> KindSet {
            KindSet::of(&[NodeKind::Variable])
        }

        fn attempt(&self, cx: &mut RuleContext<'_>) -> Result<Outcome, RuleFault> {
            cx.set_attribute(AttrKey::Custom("touched"), true);
            panic!("rule bug");
        }
    }

    /// Writes an attribute, then fails or declines
    #[derive(Debug)]
    struct Marks {
        fail: bool,
    }

    impl Rule for Marks {
        fn id(&self) -> RuleId {
            RuleId::new(if self.fail { "marks-and-fails" } else { "marks" })
        }

        fn interests(&self) -> KindSet {
            KindSet::of(&[NodeKind::Variable])
        }

        fn attempt(&self, cx: &mut RuleContext<'_>) -> Result<Outcome, RuleFault> {
            cx.set_attribute(AttrKey::Custom("seen"), true);
            if self.fail {
                Err(RuleFault::failed("cannot handle"))
            } else {
                Ok(Outcome::NoChange)
            }
        }
    }

    /// `id($x)` becomes `$x`
    #[derive(Debug)]
    struct InlineIdentity;

    impl Rule for InlineIdentity {
        fn id(&self) -> RuleId {
            RuleId::new("inline-identity")
        }

        fn interests(&self) -> KindSet {
            KindSet::of(&[NodeKind::FuncCall])
        }

        fn attempt(&self, cx: &mut RuleContext<'_>) -> Result<Outcome, RuleFault> {
            let Node::FuncCall { name, args } = cx.node() else {
                return Ok(Outcome::NoChange);
            };
            if name != "id" || args.len() != 1 {
                return Ok(Outcome::NoChange);
            }
            match cx.get(args[0])? {
                Node::Arg { value, .. } => Ok(Outcome::Substitute(*value)),
                _ => Ok(Outcome::NoChange),
            }
        }
    }

    /// Substitutes a node from outside its own subtree
    #[derive(Debug)]
    struct StealsSibling;

    impl Rule for StealsSibling {
        fn id(&self) -> RuleId {
            RuleId::new("steals-sibling")
        }

        fn interests(&self) -> KindSet {
            KindSet::of(&[NodeKind::ExprStmt])
        }

        fn attempt(&self, cx: &mut RuleContext<'_>) -> Result<Outcome, RuleFault> {
            let parent = cx.tree().parent(cx.id()).ok_or_else(|| RuleFault::failed("no parent"))?;
            let sibling = cx
                .tree()
                .node(parent)?
                .children()
                .find(|child| *child != cx.id());
            Ok(sibling.map_or(Outcome::NoChange, Outcome::Substitute))
        }
    }

    /// Drops `null` return values
    #[derive(Debug)]
    struct DropNullReturn;

    impl Rule for DropNullReturn {
        fn id(&self) -> RuleId {
            RuleId::new("drop-null-return")
        }

        fn interests(&self) -> KindSet {
            KindSet::of(&[NodeKind::Literal])
        }

        fn attempt(&self, cx: &mut RuleContext<'_>) -> Result<Outcome, RuleFault> {
            let is_return_value = cx
                .tree()
                .parent(cx.id())
                .and_then(|parent| cx.tree().kind(parent))
                == Some(NodeKind::Return);
            match cx.node() {
                Node::Literal {
                    value: Literal::Null,
                } if is_return_value => Ok(Outcome::Remove),
                _ => Ok(Outcome::NoChange),
            }
        }
    }

    /// `$a; $b;`
    fn two_vars() -> (Tree, NodeId, NodeId) {
        let mut tree = Tree::for_file("src/a.php");
        let a = tree.alloc(Node::Variable { name: "a".into() }).unwrap();
        let b = tree.alloc(Node::Variable { name: "b".into() }).unwrap();
        let sa = tree.alloc(Node::ExprStmt { expr: a }).unwrap();
        let sb = tree.alloc(Node::ExprStmt { expr: b }).unwrap();
        let module = tree.alloc(Node::Module { items: vec![sa, sb] }).unwrap();
        tree.set_root(module).unwrap();
        (tree, a, b)
    }

    fn dispatcher(registry: RuleRegistry) -> Dispatcher {
        Dispatcher::new(Arc::new(registry), Arc::new(NullOracle))
    }

    fn name_of(tree: &Tree, id: NodeId) -> Option<&str> {
        tree.get(id).and_then(Node::name)
    }

    #[test]
    fn first_rewrite_wins() {
        let (mut tree, a, _) = two_vars();
        let registry = RuleRegistry::new()
            .with(rename("first", "a", "x"))
            .with(rename("second", "a", "y"));
        let mut d = dispatcher(registry);

        let report = d.traverse(&mut tree);
        assert_eq!(name_of(&tree, a), Some("x"));
        assert_eq!(report.rewrites.len(), 1);
        assert_eq!(report.rewrites[0].rule, RuleId::new("first"));
        assert_eq!(report.visited, 5);
    }

    #[test]
    fn later_rules_not_invoked_after_rewrite() {
        let (mut tree, _, _) = two_vars();
        let counter = Arc::new(Counter::default());

        #[derive(Debug)]
        struct Shared(Arc<Counter>);
        impl Rule for Shared {
            fn id(&self) -> RuleId {
                self.0.id()
            }
            fn interests(&self) -> KindSet {
                self.0.interests()
            }
            fn attempt(&self, cx: &mut RuleContext<'_>) -> Result<Outcome, RuleFault> {
                self.0.attempt(cx)
            }
        }

        let registry = RuleRegistry::new()
            .with(rename("first", "a", "x"))
            .with(Shared(Arc::clone(&counter)));
        dispatcher(registry).traverse(&mut tree);

        // `$a` was rewritten by the first rule; only `$b` reached the counter
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reevaluate_offers_rewritten_node_again() {
        let registry = || {
            RuleRegistry::new()
                .with(rename("a-to-b", "a", "b"))
                .with(rename("b-to-c", "b", "c"))
        };

        let (mut tree, a, b) = two_vars();
        dispatcher(registry()).traverse(&mut tree);
        assert_eq!(name_of(&tree, a), Some("b"));
        assert_eq!(name_of(&tree, b), Some("c"));

        let (mut tree, a, _) = two_vars();
        let mut d = dispatcher(registry()).with_revisit(RevisitPolicy::Reevaluate, 8);
        let report = d.traverse(&mut tree);
        assert_eq!(name_of(&tree, a), Some("c"));
        assert_eq!(report.rewrites.len(), 3);
        assert!(report.limited.is_empty());
    }

    #[test]
    fn reevaluate_is_bounded() {
        let (mut tree, a, _) = two_vars();
        let registry = RuleRegistry::new()
            .with(rename("a-to-z", "a", "z"))
            .with(rename("z-to-a", "z", "a"));
        let mut d = dispatcher(registry).with_revisit(RevisitPolicy::Reevaluate, 3);

        let report = d.traverse(&mut tree);
        assert_eq!(report.rewrites_by(RuleId::new("a-to-z")), 2);
        assert_eq!(report.rewrites_by(RuleId::new("z-to-a")), 1);
        assert_eq!(report.limited, vec![a]);
        assert_eq!(name_of(&tree, a), Some("z"));
    }

    #[test]
    fn panics_are_caught_and_writes_dropped() {
        let (mut tree, a, b) = two_vars();
        let registry = RuleRegistry::new()
            .with(Panics)
            .with(rename("after", "b", "y"));
        let mut d = dispatcher(registry);

        let report = d.traverse(&mut tree);
        assert_eq!(report.faults.len(), 2);
        assert_eq!(report.faults[0].kind, "panic");
        assert!(report.faults[0].message.contains("rule bug"));
        assert_eq!(report.faults[0].node, a);
        // Later rules still run on the faulting node
        assert_eq!(name_of(&tree, b), Some("y"));
        assert_eq!(d.attributes().get(a, AttrKey::Custom("touched")), None);
        tree.validate().unwrap();
    }

    #[test]
    fn decline_commits_writes_fault_drops_them() {
        let (mut tree, a, _) = two_vars();
        let mut d = dispatcher(RuleRegistry::new().with(Marks { fail: false }));
        d.traverse(&mut tree);
        assert!(d.attributes().flag(a, AttrKey::Custom("seen")));

        let (mut tree, a, _) = two_vars();
        let mut d = dispatcher(RuleRegistry::new().with(Marks { fail: true }));
        let report = d.traverse(&mut tree);
        assert!(!d.attributes().flag(a, AttrKey::Custom("seen")));
        assert_eq!(report.faults.len(), 2);
        assert_eq!(report.faults[0].kind, "error");
        assert_eq!(report.faults[0].message, "cannot handle");
    }

    #[test]
    fn invalid_outcome_is_a_fault_and_tree_is_untouched() {
        let (mut tree, _, _) = two_vars();
        let before = tree.clone();
        let mut d = dispatcher(RuleRegistry::new().with(StealsSibling));

        let report = d.traverse(&mut tree);
        assert_eq!(report.faults.len(), 2);
        assert!(report.faults.iter().all(|f| f.kind == "structure"));
        assert!(report.rewrites.is_empty());
        assert_eq!(tree, before);
    }

    #[test]
    fn substitute_descends_into_current_node() {
        // id($a);
        let mut tree = Tree::new();
        let a = tree.alloc(Node::Variable { name: "a".into() }).unwrap();
        let arg = tree
            .alloc(Node::Arg {
                name: None,
                value: a,
                unpack: false,
            })
            .unwrap();
        let call = tree
            .alloc(Node::FuncCall {
                name: "id".into(),
                args: vec![arg],
            })
            .unwrap();
        let stmt = tree.alloc(Node::ExprStmt { expr: call }).unwrap();
        let module = tree.alloc(Node::Module { items: vec![stmt] }).unwrap();
        tree.set_root(module).unwrap();
        let fresh = tree.clone();

        let registry = || {
            RuleRegistry::new()
                .with(InlineIdentity)
                .with(rename("a-to-b", "a", "b"))
        };

        // The substitute is not itself revisited under single-winner
        let report = dispatcher(registry()).traverse(&mut tree);
        assert_eq!(tree.render(stmt), "$a;");
        assert!(!tree.is_alive(call));
        assert!(!tree.is_alive(arg));
        assert_eq!(report.rewrites[0].current, Some(a));

        // Under reevaluate it is offered to every rule
        let mut tree = fresh;
        let report = dispatcher(registry())
            .with_revisit(RevisitPolicy::Reevaluate, 4)
            .traverse(&mut tree);
        assert_eq!(tree.render(stmt), "$b;");
        assert_eq!(report.rewrites.len(), 2);
        tree.validate().unwrap();
    }

    #[test]
    fn remove_detaches_optional_child() {
        let mut tree = Tree::new();
        let null = tree
            .alloc(Node::Literal {
                value: Literal::Null,
            })
            .unwrap();
        let ret = tree.alloc(Node::Return { expr: Some(null) }).unwrap();
        let module = tree.alloc(Node::Module { items: vec![ret] }).unwrap();
        tree.set_root(module).unwrap();

        let report = dispatcher(RuleRegistry::new().with(DropNullReturn)).traverse(&mut tree);
        assert_eq!(tree.render(ret), "return;");
        assert!(!tree.is_alive(null));
        assert_eq!(report.rewrites[0].current, None);
        assert_eq!(report.rewrites[0].change, "remove");
    }

    #[test]
    fn context_attributes_written_on_descent() {
        let mut tree = Tree::for_file("tests/FooTest.php");
        let this = tree.alloc(Node::Variable { name: "this".into() }).unwrap();
        let stmt = tree.alloc(Node::ExprStmt { expr: this }).unwrap();
        let method = tree
            .alloc(Node::Method {
                name: "testRun".into(),
                params: vec![],
                body: vec![stmt],
            })
            .unwrap();
        let class = tree
            .alloc(Node::Class {
                name: "FooTest".into(),
                extends: Some("TestCase".into()),
                members: vec![method],
            })
            .unwrap();
        let module = tree.alloc(Node::Module { items: vec![class] }).unwrap();
        tree.set_root(module).unwrap();

        let mut d = dispatcher(RuleRegistry::new());
        d.traverse(&mut tree);
        let attrs = d.attributes();

        assert_eq!(attrs.text(this, AttrKey::EnclosingClass), Some("FooTest"));
        assert!(attrs.flag(this, AttrKey::InTestContext));
        assert_eq!(attrs.text(method, AttrKey::EnclosingClass), Some("FooTest"));
        assert_eq!(attrs.text(class, AttrKey::EnclosingClass), None);
        assert!(!attrs.flag(class, AttrKey::InTestContext));
        assert_eq!(attrs.text(this, AttrKey::ResolvedFile), Some("tests/FooTest.php"));
    }

    #[test]
    fn non_test_classes_are_not_test_context() {
        let mut tree = Tree::new();
        let this = tree.alloc(Node::Variable { name: "this".into() }).unwrap();
        let stmt = tree.alloc(Node::ExprStmt { expr: this }).unwrap();
        let class = tree
            .alloc(Node::Class {
                name: "Service".into(),
                extends: None,
                members: vec![],
            })
            .unwrap();
        let module = tree.alloc(Node::Module { items: vec![class, stmt] }).unwrap();
        tree.set_root(module).unwrap();

        let mut d = dispatcher(RuleRegistry::new());
        d.traverse(&mut tree);
        assert!(!d.attributes().flag(this, AttrKey::InTestContext));
        assert_eq!(d.attributes().text(this, AttrKey::EnclosingClass), None);
    }

    #[test]
    fn cancellation_stops_at_node_boundary() {
        let (mut tree, a, _) = two_vars();
        let token = CancelToken::new();
        token.cancel();
        let mut d = dispatcher(RuleRegistry::new().with(rename("r", "a", "x"))).with_cancel_token(token);

        let report = d.traverse(&mut tree);
        assert!(report.cancelled);
        assert_eq!(report.visited, 0);
        assert_eq!(name_of(&tree, a), Some("a"));
    }

    #[test]
    fn expired_deadline_stops_traversal() {
        let (mut tree, _, _) = two_vars();
        let mut d = dispatcher(RuleRegistry::new());
        d.set_deadline(Some(Instant::now()));
        assert!(d.traverse(&mut tree).cancelled);
    }

    #[test]
    fn empty_tree_is_a_no_op() {
        let mut tree = Tree::new();
        let report = dispatcher(RuleRegistry::new().with(Panics)).traverse(&mut tree);
        assert_eq!(report, TraversalReport::default());
    }

    #[test]
    fn panic_payloads_are_described() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "non-string panic payload");
    }
}
