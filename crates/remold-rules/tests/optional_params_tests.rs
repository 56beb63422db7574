use pretty_assertions::assert_eq;
use proptest::prelude::*;
use remold_engine::prelude::*;
use remold_engine::{Convergence, Dispatcher, Driver, EngineConfig, RuleRegistry, TraversalReport};
use remold_oracle::{DeclarationSite, InMemoryOracle, NullOracle, OwnershipPolicy};
use remold_rules::{default_registry, OptionalParamsAfterRequired};
use remold_test_utils::{
    init_tracing, param_names, project_site, run_declaration_tree, run_oracle, signature,
    vendor_site, TreeBuilder,
};
use remold_tree::Tree;
use std::sync::Arc;

fn dispatcher(oracle: InMemoryOracle) -> Dispatcher {
    init_tracing();
    let registry = RuleRegistry::new().with(OptionalParamsAfterRequired::default());
    Dispatcher::new(Arc::new(registry), Arc::new(oracle))
}

fn run(tree: &mut Tree, oracle: InMemoryOracle) -> TraversalReport {
    dispatcher(oracle).traverse(tree)
}

#[test]
fn declaration_is_reordered_once() {
    let (mut tree, method) = run_declaration_tree();

    let mut config = EngineConfig::default();
    config.driver.convergence = Convergence::UntilStable { max_passes: 4 };
    let registry = default_registry(&config).unwrap();
    let driver = Driver::new(registry, Arc::new(run_oracle(project_site())), config).unwrap();
    let report = driver.run(&mut tree).unwrap();

    assert_eq!(param_names(&tree, method), vec!["required", "optional"]);
    assert_eq!(tree.render(method), "function run($required, $optional = 1) {  }");
    assert!(report.converged);
    assert_eq!(report.passes.len(), 2);
    assert_eq!(report.passes[0].rewrites_by(OptionalParamsAfterRequired::ID), 1);
    assert!(report.passes[1].is_unchanged());
}

#[test]
fn processed_marker_blocks_repeat_rewrites() {
    let (mut tree, method) = run_declaration_tree();
    let mut d = dispatcher(run_oracle(project_site()));

    assert_eq!(d.traverse(&mut tree).rewrites.len(), 1);
    assert!(d
        .attributes()
        .is_processed_by(method, OptionalParamsAfterRequired::ID));

    let sorted = tree.clone();
    assert!(d.traverse(&mut tree).is_unchanged());
    assert_eq!(tree, sorted);
}

#[test]
fn vendor_declaration_is_protected() {
    let (mut tree, method) = run_declaration_tree();
    let before = tree.clone();

    let report = run(&mut tree, run_oracle(vendor_site()));
    assert!(report.rewrites.is_empty());
    assert_eq!(tree, before);
    assert_eq!(param_names(&tree, method), vec!["optional", "required"]);
}

#[test]
fn internal_declaration_is_protected() {
    let (mut tree, _) = run_declaration_tree();
    let before = tree.clone();

    run(&mut tree, run_oracle(DeclarationSite::Internal));
    assert_eq!(tree, before);
}

#[test]
fn unresolved_declaration_is_left_alone() {
    let (mut tree, _) = run_declaration_tree();
    let before = tree.clone();

    let registry = RuleRegistry::new().with(OptionalParamsAfterRequired::default());
    let report = Dispatcher::new(Arc::new(registry), Arc::new(NullOracle)).traverse(&mut tree);
    assert!(report.rewrites.is_empty());
    assert!(report.faults.is_empty());
    assert_eq!(tree, before);
}

#[test]
fn custom_vendor_markers_apply() {
    let (mut tree, method) = run_declaration_tree();
    let ownership = OwnershipPolicy {
        vendor_markers: vec!["/src/".to_string()],
        ..OwnershipPolicy::default()
    };
    let registry = RuleRegistry::new().with(OptionalParamsAfterRequired::new(ownership));
    Dispatcher::new(Arc::new(registry), Arc::new(run_oracle(project_site()))).traverse(&mut tree);

    assert_eq!(param_names(&tree, method), vec!["optional", "required"]);
}

/// Calls to `SomeObject::run` from inside the class and from top level
fn call_sites() -> (Tree, Vec<NodeId>) {
    let mut b = TreeBuilder::for_file("/app/src/Caller.php");
    let mut stmts = Vec::new();

    let this = b.this();
    let (one, value) = (b.int(1), b.var("value"));
    let call = b.method_call(this, "run", &[one, value]);
    stmts.push(b.stmt(call));

    let (one, value) = (b.int(1), b.var("value"));
    let call = b.static_call("self", "run", &[one, value]);
    stmts.push(b.stmt(call));

    let (one, value) = (b.int(1), b.var("value"));
    let call = b.new_object("SomeObject", &[one, value]);
    stmts.push(b.stmt(call));

    let method = b.method("other", vec![], stmts.clone());
    let class = b.class("SomeObject", None, vec![method]);

    let object = b.var("object");
    let (one, value) = (b.int(1), b.var("value"));
    let call = b.method_call(object, "run", &[one, value]);
    let outside = b.stmt(call);
    stmts.push(outside);

    (b.finish(vec![class, outside]), stmts)
}

#[test]
fn call_sites_follow_the_declaration() {
    let (mut tree, stmts) = call_sites();
    let oracle = run_oracle(project_site())
        .with_signature(
            CallableRef::constructor("SomeObject"),
            signature(&[("optional", true), ("required", false)], project_site()),
        )
        .with_type(None, "$object", "SomeObject");

    let report = run(&mut tree, oracle);

    let rendered: Vec<String> = stmts.iter().map(|s| tree.render(*s)).collect();
    assert_eq!(
        rendered,
        vec![
            "$this->run($value, 1);",
            "self::run($value, 1);",
            "new SomeObject($value, 1);",
            "$object->run($value, 1);",
        ]
    );
    assert_eq!(report.rewrites.len(), 4);
    tree.validate().unwrap();
}

#[test]
fn call_site_declines() {
    let mut b = TreeBuilder::for_file("/app/src/Caller.php");
    let mut stmts = Vec::new();

    // Arity differs from the declaration
    let this = b.this();
    let one = b.int(1);
    let call = b.method_call(this, "run", &[one]);
    stmts.push(b.stmt(call));

    // Named argument
    let this = b.this();
    let (one, value) = (b.int(1), b.var("value"));
    let named = b.node(Node::Arg {
        name: Some("required".into()),
        value,
        unpack: false,
    });
    let first = b.arg(one);
    let call = b.node(Node::MethodCall {
        receiver: this,
        name: "run".into(),
        args: vec![first, named],
    });
    stmts.push(b.stmt(call));

    // Receiver type unknown
    let object = b.var("unknown");
    let (one, value) = (b.int(1), b.var("value"));
    let call = b.method_call(object, "run", &[one, value]);
    stmts.push(b.stmt(call));

    // No arguments at all
    let call = b.func_call("helper", &[]);
    stmts.push(b.stmt(call));

    let method = b.method("other", vec![], stmts);
    let class = b.class("SomeObject", None, vec![method]);
    let mut tree = b.finish(vec![class]);
    let before = tree.clone();

    let report = run(&mut tree, run_oracle(project_site()));
    assert!(report.rewrites.is_empty());
    assert!(report.faults.is_empty());
    assert_eq!(tree, before);
}

#[test]
fn function_declaration_and_call_reordered_together() {
    let mut b = TreeBuilder::for_file("/app/src/functions.php");
    let null = b.node(Node::Literal {
        value: remold_tree::Literal::Null,
    });
    let a = b.optional_param("a", null);
    let c = b.param("c");
    let function = b.function("build", vec![a, c], vec![]);
    let (x, y) = (b.var("x"), b.var("y"));
    let call = b.func_call("build", &[x, y]);
    let stmt = b.stmt(call);
    let mut tree = b.finish(vec![function, stmt]);

    let oracle = InMemoryOracle::new().with_signature(
        CallableRef::function("build"),
        signature(&[("a", true), ("c", false)], project_site()),
    );
    run(&mut tree, oracle);

    assert_eq!(param_names(&tree, function), vec!["c", "a"]);
    assert_eq!(tree.render(stmt), "build($y, $x);");
}

/// Declaration `function f(...)` with the given optional flags, and its oracle
fn generated(flags: &[bool]) -> (Tree, NodeId, Vec<NodeId>, InMemoryOracle) {
    let mut b = TreeBuilder::for_file("/app/src/generated.php");
    let names: Vec<String> = (0..flags.len()).map(|i| format!("p{i}")).collect();
    let params: Vec<NodeId> = names
        .iter()
        .zip(flags)
        .enumerate()
        .map(|(i, (name, optional))| {
            if *optional {
                let default = b.int(i64::try_from(i).unwrap_or_default());
                b.optional_param(name, default)
            } else {
                b.param(name)
            }
        })
        .collect();
    let function = b.function("f", params.clone(), vec![]);
    let tree = b.finish(vec![function]);

    let pairs: Vec<(&str, bool)> = names.iter().map(String::as_str).zip(flags.iter().copied()).collect();
    let oracle = InMemoryOracle::new()
        .with_signature(CallableRef::function("f"), signature(&pairs, project_site()));
    (tree, function, params, oracle)
}

proptest! {
    #[test]
    fn prop_reorder_preserves_arity_and_sorts(flags in prop::collection::vec(any::<bool>(), 1..7)) {
        let (mut tree, function, params, oracle) = generated(&flags);
        let mut d = dispatcher(oracle);
        d.traverse(&mut tree);

        let after = tree.get(function).and_then(Node::params).map(<[NodeId]>::to_vec).unwrap_or_default();
        prop_assert_eq!(after.len(), params.len());
        let mut sorted_after = after.clone();
        sorted_after.sort();
        let mut sorted_before = params.clone();
        sorted_before.sort();
        prop_assert_eq!(sorted_after, sorted_before);

        // Required parameters first, each group in declared order
        let optional_of = |id: &NodeId| flags[params.iter().position(|p| p == id).unwrap()];
        let expected: Vec<NodeId> = params.iter().filter(|id| !optional_of(id))
            .chain(params.iter().filter(|id| optional_of(id)))
            .copied()
            .collect();
        prop_assert_eq!(&after, &expected);

        // Same dispatcher, second pass: nothing moves
        let settled = tree.clone();
        prop_assert!(d.traverse(&mut tree).is_unchanged());
        prop_assert_eq!(tree, settled);
    }
}
