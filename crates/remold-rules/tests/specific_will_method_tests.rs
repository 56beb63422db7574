use mockall::mock;
use pretty_assertions::assert_eq;
use remold_engine::prelude::*;
use remold_engine::{Convergence, Dispatcher, Driver, EngineConfig, RuleRegistry, TraversalReport};
use remold_oracle::{InMemoryOracle, NullOracle, Signature, TypeName, TypeQuery};
use remold_rules::{default_registry, SpecificWillMethod, SpecificWillOptions};
use remold_test_utils::{init_tracing, TreeBuilder};
use remold_tree::Tree;
use std::sync::Arc;

const MOCKER: &str = "PHPUnit\\Framework\\MockObject\\Builder\\InvocationMocker";

mock! {
    Oracle {}

    impl SemanticOracle for Oracle {
        fn resolve_signature(&self, callable: &CallableRef) -> Resolution<Signature>;
        fn resolve_type(&self, query: &TypeQuery) -> Resolution<TypeName>;
        fn name(&self) -> &str;
    }
}

/// `class <class> [extends <parent>] { function testMock() { <expr>; } }`
fn in_class(mut b: TreeBuilder, expr: NodeId, class: &str, parent: Option<&str>) -> (Tree, NodeId) {
    let stmt = b.stmt(expr);
    let method = b.method("testMock", vec![], vec![stmt]);
    let class = b.class(class, parent, vec![method]);
    (b.finish(vec![class]), stmt)
}

fn builder() -> TreeBuilder {
    TreeBuilder::for_file("/app/tests/FooTest.php")
}

/// `$this->mock`
fn mock_prop(b: &mut TreeBuilder) -> NodeId {
    let this = b.this();
    b.prop(this, "mock")
}

/// `$this-><name>(<values>)`
fn helper(b: &mut TreeBuilder, name: &str, values: &[NodeId]) -> NodeId {
    let this = b.this();
    b.method_call(this, name, values)
}

fn run_default(tree: &mut Tree) -> TraversalReport {
    init_tracing();
    let registry = default_registry(&EngineConfig::default()).unwrap();
    Dispatcher::new(Arc::new(registry), Arc::new(NullOracle)).traverse(tree)
}

fn run_rule(tree: &mut Tree, rule: SpecificWillMethod, oracle: Arc<dyn SemanticOracle>) -> TraversalReport {
    Dispatcher::new(Arc::new(RuleRegistry::new().with(rule)), oracle).traverse(tree)
}

#[test]
fn with_equal_to_is_unwrapped() {
    let mut b = builder();
    let mock = mock_prop(&mut b);
    let x = b.str("x");
    let matcher = helper(&mut b, "equalTo", &[x]);
    let with = b.method_call(mock, "with", &[matcher]);
    let (mut tree, stmt) = in_class(b, with, "FooTest", Some("PHPUnit\\Framework\\TestCase"));

    let report = run_default(&mut tree);

    assert_eq!(tree.render(stmt), r#"$this->mock->with("x");"#);
    assert_eq!(report.rewrites.len(), 1);
    assert_eq!(report.rewrites[0].rule, SpecificWillMethod::ID);
    assert!(!tree.is_alive(matcher));
    tree.validate().unwrap();
}

#[test]
fn will_return_value_becomes_will_return() {
    let mut b = builder();
    let mock = mock_prop(&mut b);
    let once = helper(&mut b, "once", &[]);
    let expects = b.method_call(mock, "expects", &[once]);
    let y = b.str("y");
    let nested = helper(&mut b, "returnValue", &[y]);
    let will = b.method_call(expects, "will", &[nested]);
    let (mut tree, stmt) = in_class(b, will, "FooTest", Some("TestCase"));

    let report = run_default(&mut tree);

    assert_eq!(
        tree.render(stmt),
        r#"$this->mock->expects($this->once())->willReturn("y");"#
    );
    assert_eq!(report.rewrites.len(), 1);
    assert!(!tree.is_alive(nested));
    tree.validate().unwrap();
}

#[test]
fn every_default_rename_applies() {
    let cases = [
        ("returnArgument", "willReturnArgument"),
        ("returnCallback", "willReturnCallback"),
        ("returnSelf", "willReturnSelf"),
        ("returnValue", "willReturn"),
        ("returnValueMap", "willReturnMap"),
        ("throwException", "willThrowException"),
    ];
    for (nested_name, expected) in cases {
        let mut b = builder();
        let mock = mock_prop(&mut b);
        let e = b.var("e");
        let nested = helper(&mut b, nested_name, &[e]);
        let will = b.method_call(mock, "will", &[nested]);
        let (mut tree, stmt) = in_class(b, will, "FooTest", None);

        run_default(&mut tree);
        assert_eq!(tree.render(stmt), format!("$this->mock->{expected}($e);"));
    }
}

#[test]
fn unknown_nested_call_is_left_alone() {
    let mut b = builder();
    let mock = mock_prop(&mut b);
    let e = b.var("e");
    let nested = helper(&mut b, "returnException", &[e]);
    let will = b.method_call(mock, "will", &[nested]);
    let (mut tree, _) = in_class(b, will, "FooTest", Some("TestCase"));
    let before = tree.clone();

    let report = run_default(&mut tree);

    assert!(report.rewrites.is_empty());
    assert_eq!(tree, before);
}

#[test]
fn will_without_call_argument_declines() {
    let mut b = builder();
    let mock = mock_prop(&mut b);
    let empty = b.method_call(mock, "will", &[]);
    let stmt_empty = b.stmt(empty);
    let mock = mock_prop(&mut b);
    let value = b.var("value");
    let plain = b.method_call(mock, "will", &[value]);
    let stmt_plain = b.stmt(plain);
    let method = b.method("testMock", vec![], vec![stmt_empty, stmt_plain]);
    let class = b.class("FooTest", Some("TestCase"), vec![method]);
    let mut tree = b.finish(vec![class]);
    let before = tree.clone();

    assert!(run_default(&mut tree).rewrites.is_empty());
    assert_eq!(tree, before);
}

#[test]
fn only_single_argument_matchers_unwrap() {
    let mut b = builder();
    let mock = mock_prop(&mut b);
    let one = b.int(1);
    let first = helper(&mut b, "equalTo", &[one]);
    let anything = helper(&mut b, "anything", &[]);
    let (two, three) = (b.int(2), b.int(3));
    let pair = helper(&mut b, "equalTo", &[two, three]);
    let z = b.str("z");
    let free = b.func_call("EqualTo", &[z]);
    let with = b.method_call(mock, "with", &[first, anything, pair, free]);
    let (mut tree, stmt) = in_class(b, with, "FooTest", Some("TestCase"));

    run_default(&mut tree);

    assert_eq!(
        tree.render(stmt),
        r#"$this->mock->with(1, $this->anything(), $this->equalTo(2, 3), "z");"#
    );
    tree.validate().unwrap();
}

#[test]
fn static_with_call_is_rewritten() {
    let mut b = builder();
    let x = b.var("x");
    let matcher = b.static_call("self", "equalTo", &[x]);
    let with = b.static_call("Expectation", "with", &[matcher]);
    let (mut tree, stmt) = in_class(b, with, "FooTest", Some("TestCase"));

    run_default(&mut tree);
    assert_eq!(tree.render(stmt), "Expectation::with($x);");
}

#[test]
fn outside_test_classes_nothing_changes() {
    let mut b = TreeBuilder::for_file("/app/src/Service.php");
    let mock = mock_prop(&mut b);
    let x = b.str("x");
    let matcher = helper(&mut b, "equalTo", &[x]);
    let with = b.method_call(mock, "with", &[matcher]);
    let (mut tree, _) = in_class(b, with, "Service", None);
    let before = tree.clone();

    assert!(run_default(&mut tree).rewrites.is_empty());
    assert_eq!(tree, before);
}

#[test]
fn test_class_recognized_by_name() {
    let mut b = builder();
    let mock = mock_prop(&mut b);
    let x = b.str("x");
    let matcher = helper(&mut b, "equalTo", &[x]);
    let with = b.method_call(mock, "with", &[matcher]);
    let (mut tree, stmt) = in_class(b, with, "ServiceTest", Some("BaseFixture"));

    run_default(&mut tree);
    assert_eq!(tree.render(stmt), r#"$this->mock->with("x");"#);
}

#[test]
fn receiver_type_guard_consults_oracle() {
    let build = || {
        let mut b = builder();
        let mock = mock_prop(&mut b);
        let y = b.str("y");
        let nested = helper(&mut b, "returnValue", &[y]);
        let will = b.method_call(mock, "will", &[nested]);
        in_class(b, will, "FooTest", Some("TestCase"))
    };
    let rule = |receiver_type: &str| {
        SpecificWillMethod::with_options(SpecificWillOptions {
            receiver_type: Some(receiver_type.to_string()),
            ..SpecificWillOptions::default()
        })
    };
    let oracle: Arc<dyn SemanticOracle> =
        Arc::new(InMemoryOracle::new().with_type(Some("FooTest"), "$this->mock", MOCKER));

    let (mut tree, stmt) = build();
    run_rule(&mut tree, rule(&format!("\\{MOCKER}")), Arc::clone(&oracle));
    assert_eq!(tree.render(stmt), r#"$this->mock->willReturn("y");"#);

    let (mut tree, _) = build();
    let before = tree.clone();
    run_rule(&mut tree, rule("Some\\Other\\Builder"), Arc::clone(&oracle));
    assert_eq!(tree, before);

    // Unresolved receiver declines
    let (mut tree, _) = build();
    let before = tree.clone();
    run_rule(&mut tree, rule(MOCKER), Arc::new(NullOracle));
    assert_eq!(tree, before);
}

#[test]
fn oracle_not_consulted_outside_test_context() {
    let build = |class: &str| {
        let mut b = builder();
        let mock = mock_prop(&mut b);
        let x = b.str("x");
        let matcher = helper(&mut b, "equalTo", &[x]);
        let with = b.method_call(mock, "with", &[matcher]);
        in_class(b, with, class, None).0
    };
    let rule = || {
        SpecificWillMethod::with_options(SpecificWillOptions {
            receiver_type: Some(MOCKER.to_string()),
            ..SpecificWillOptions::default()
        })
    };

    let mut oracle = MockOracle::new();
    oracle.expect_resolve_type().never();
    oracle.expect_resolve_signature().never();
    let mut tree = build("Service");
    run_rule(&mut tree, rule(), Arc::new(oracle));

    let mut oracle = MockOracle::new();
    oracle
        .expect_resolve_type()
        .withf(|query| query.expr == "$this->mock" && query.scope.as_deref() == Some("FooTest"))
        .times(1)
        .returning(|_| Resolution::Resolved(TypeName(MOCKER.to_string())));
    let mut tree = build("FooTest");
    let report = run_rule(&mut tree, rule(), Arc::new(oracle));
    assert_eq!(report.rewrites.len(), 1);
}

#[test]
fn second_pass_changes_nothing() {
    let mut b = builder();
    let mock = mock_prop(&mut b);
    let x = b.str("x");
    let matcher = helper(&mut b, "equalTo", &[x]);
    let with = b.method_call(mock, "with", &[matcher]);
    let stmt = b.stmt(with);
    let mock = mock_prop(&mut b);
    let y = b.str("y");
    let nested = helper(&mut b, "returnValue", &[y]);
    let will = b.method_call(mock, "will", &[nested]);
    let stmt2 = b.stmt(will);
    let method = b.method("testMock", vec![], vec![stmt, stmt2]);
    let class = b.class("FooTest", Some("TestCase"), vec![method]);
    let mut tree = b.finish(vec![class]);

    let mut config = EngineConfig::default();
    config.driver.convergence = Convergence::UntilStable { max_passes: 5 };
    let registry = default_registry(&config).unwrap();
    let driver = Driver::new(registry, Arc::new(NullOracle), config).unwrap();
    let report = driver.run(&mut tree).unwrap();

    assert!(report.converged);
    assert_eq!(report.passes.len(), 2);
    assert_eq!(report.passes[0].rewrites.len(), 2);
    assert!(report.passes[1].is_unchanged());
    assert_eq!(tree.render(stmt), r#"$this->mock->with("x");"#);
    assert_eq!(tree.render(stmt2), r#"$this->mock->willReturn("y");"#);
}
