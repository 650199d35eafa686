//! Integration tests for batch validation: code generation, compilation and
//! mapping diagnostics back to activities.

mod helpers;

use std::sync::Arc;

use expr_validator::diagnostics::DiagnosticCurator;
use expr_validator::error::ValidatorError;
use expr_validator::model::*;
use expr_validator::validate::Validator;
use helpers::*;

// =============================================================================
// Basic outcomes
// =============================================================================

#[test]
fn empty_scope_has_no_errors() {
    let validator = Validator::flow();
    let mut scope = ValidationScope::new();
    let errors = validator.validate(&root(), Some(&mut scope)).unwrap();
    assert!(errors.is_empty());
}

#[test]
fn valid_expression_has_no_errors() {
    let validator = Validator::flow();
    let env = Arc::new(Environment::new());
    let assign = activity("assign");
    let mut scope = scope_of(vec![value("e1", "1 + 1", core_type(&validator, "Core.Int"), &env, &assign)]);

    let errors = validator.validate(&root(), Some(&mut scope)).unwrap();
    assert!(errors.is_empty(), "{:?}", errors);
}

#[test]
fn undeclared_name_is_attributed_to_its_activity() {
    let validator = Validator::flow();
    let env = Arc::new(Environment::new());
    let assign = activity("assign");
    let mut scope = scope_of(vec![value(
        "e1",
        "missing + 1",
        core_type(&validator, "Core.Int"),
        &env,
        &assign,
    )]);

    let errors = validator.validate(&root(), Some(&mut scope)).unwrap();

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].activity_id(), Some("assign"));
    assert_eq!(errors[0].expression_id.as_deref(), Some("e1"));
    assert!(!errors[0].is_warning);
    assert_eq!(
        errors[0].message,
        "The name 'missing' does not exist in the current context"
    );
}

#[test]
fn syntax_error_stays_with_its_expression() {
    let validator = Validator::flow();
    let env = Arc::new(Environment::new());
    let first = activity("first");
    let second = activity("second");
    let int = core_type(&validator, "Core.Int");
    let mut scope = scope_of(vec![
        value("e1", "2 * 3", int.clone(), &env, &first),
        value("e2", "1 +", int.clone(), &env, &second),
        value("e3", "4", int, &env, &first),
    ]);

    let errors = validator.validate(&root(), Some(&mut scope)).unwrap();

    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert_eq!(errors[0].activity_id(), Some("second"));
    assert_eq!(errors[0].expression_id.as_deref(), Some("e2"));
}

#[test]
fn overly_nested_expressions_fail_alone() {
    let validator = Validator::flow();
    let env = Arc::new(Environment::new());
    let a = activity("a");
    let int = core_type(&validator, "Core.Int");
    let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
    let negations = format!("{}1", "-".repeat(10_000));
    let mut scope = scope_of(vec![
        value("e1", &parens, int.clone(), &env, &a),
        value("e2", "1 + 2", int.clone(), &env, &a),
        value("e3", &negations, int, &env, &a),
    ]);

    let errors = validator.validate(&root(), Some(&mut scope)).unwrap();

    let ids: Vec<_> = errors.iter().map(|e| e.expression_id.as_deref()).collect();
    assert_eq!(ids, vec![Some("e1"), Some("e3")], "{:?}", errors);
    assert!(errors.iter().all(|e| e.message == "An expression is too long or complex to compile"));
}

#[test]
fn every_broken_expression_reports() {
    let validator = Validator::flow();
    let mut env = Environment::new();
    env.declare("flag", core_type(&validator, "Core.Bool"));
    let env = Arc::new(env);
    let a = activity("a");
    let b = activity("b");
    let mut scope = scope_of(vec![
        value("e1", "flag - 1", core_type(&validator, "Core.Int"), &env, &a),
        value("e2", "\"text\"", core_type(&validator, "Core.Int"), &env, &b),
    ]);

    let errors = validator.validate(&root(), Some(&mut scope)).unwrap();

    let attributed: Vec<_> = errors
        .iter()
        .map(|e| (e.activity_id(), e.expression_id.as_deref()))
        .collect();
    assert_eq!(
        attributed,
        vec![(Some("a"), Some("e1")), (Some("b"), Some("e2"))]
    );
    assert_eq!(
        errors[1].message,
        "Cannot implicitly convert type 'Core.String' to 'Core.Int'"
    );
}

#[test]
fn warnings_are_not_reported() {
    let validator = Validator::flow();
    let env = Arc::new(Environment::new());
    let a = activity("a");
    let mut scope = scope_of(vec![value("e1", "true ? 1 : 2", core_type(&validator, "Core.Int"), &env, &a)]);
    assert!(validator.validate(&root(), Some(&mut scope)).unwrap().is_empty());
}

#[test]
fn multi_line_expression_text() {
    let validator = Validator::flow();
    let env = Arc::new(Environment::new());
    let a = activity("a");
    let b = activity("b");
    let int = core_type(&validator, "Core.Int");
    let mut scope = scope_of(vec![
        value("e1", "1 +\n  missing", int.clone(), &env, &a),
        value("e2", "2", int, &env, &b),
    ]);

    let errors = validator.validate(&root(), Some(&mut scope)).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].activity_id(), Some("a"));
}

// =============================================================================
// Variables, references and linked modules
// =============================================================================

#[test]
fn variables_resolve_through_nested_environments() {
    let validator = Validator::flow();
    let mut outer = Environment::new();
    outer.declare("rate", core_type(&validator, "Core.Float"));
    let mut inner = Environment::child(Arc::new(outer));
    inner.declare("count", core_type(&validator, "Core.Int"));
    let inner = Arc::new(inner);
    let a = activity("a");
    let mut scope = scope_of(vec![value(
        "e1",
        "count * rate",
        core_type(&validator, "Core.Float"),
        &inner,
        &a,
    )]);

    assert!(validator.validate(&root(), Some(&mut scope)).unwrap().is_empty());
}

#[test]
fn reference_expressions_must_be_assignable() {
    let validator = Validator::flow();
    let mut env = Environment::new();
    env.declare("total", core_type(&validator, "Core.Float"));
    let env = Arc::new(env);
    let a = activity("a");
    let b = activity("b");
    let float = core_type(&validator, "Core.Float");
    let mut scope = scope_of(vec![
        reference("to", "total", float.clone(), &env, &a),
        reference("bad", "total + 1", float, &env, &b),
    ]);

    let errors = validator.validate(&root(), Some(&mut scope)).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].expression_id.as_deref(), Some("bad"));
}

#[test]
fn result_type_links_its_module() {
    let validator = Validator::flow();
    let orders = orders_module(ModuleKind::Static);
    let order = TypeDescriptor::new("Orders.Order", orders.clone());
    let mut env = Environment::new();
    env.declare("order", order.clone());
    let env = Arc::new(env);
    let a = activity("a");
    let mut scope = scope_of(vec![value("e1", "order", order, &env, &a)]);

    assert!(validator.validate(&root(), Some(&mut scope)).unwrap().is_empty());
    assert!(validator.cache().contains(orders.id()));
}

#[test]
fn variable_types_need_a_linked_module() {
    let validator = Validator::flow();
    let orders = orders_module(ModuleKind::Static);
    let mut env = Environment::new();
    env.declare("order", TypeDescriptor::new("Orders.Order", orders.clone()));
    let env = Arc::new(env);
    let a = activity("a");
    let float = core_type(&validator, "Core.Float");

    let mut unlinked = scope_of(vec![value("e1", "order.total", float.clone(), &env, &a)]);
    let errors = validator.validate(&root(), Some(&mut unlinked)).unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("'Orders.Order' could not be found"), "{}", errors[0].message);

    let mut linked = scope_of(vec![value("e1", "order.total", float, &env, &a)]);
    linked.declare_module(ModuleDeclaration::Loaded(orders));
    assert!(validator.validate(&root(), Some(&mut linked)).unwrap().is_empty());
}

#[test]
fn named_declarations_go_through_the_loader() {
    let mut registry = ModuleRegistry::new();
    let orders = orders_module(ModuleKind::Static);
    registry.register(orders.clone());
    let validator = Validator::flow().with_loader(Arc::new(registry));

    let mut env = Environment::new();
    env.declare("order", TypeDescriptor::new("Orders.Order", orders));
    let env = Arc::new(env);
    let a = activity("a");
    let mut scope = scope_of(vec![value(
        "e1",
        "order.customer",
        core_type(&validator, "Core.String"),
        &env,
        &a,
    )]);
    scope.declare_module(ModuleDeclaration::Named("Orders".into()));
    scope.declare_module(ModuleDeclaration::Named("NotThere".into()));

    assert!(validator.validate(&root(), Some(&mut scope)).unwrap().is_empty());
}

// =============================================================================
// Scope lifecycle and caching
// =============================================================================

#[test]
fn absent_scope_never_touches_the_cache() {
    let (validator, provider) = counting_validator();
    let errors = validator.validate(&root(), None).unwrap();
    assert!(errors.is_empty());
    assert!(validator.cache().is_empty());
    assert_eq!(provider.calls(validator.language().core_module().id()), 0);
}

#[test]
fn scope_is_empty_after_validation() {
    let validator = Validator::flow();
    let env = Arc::new(Environment::new());
    let a = activity("a");
    let mut scope = scope_of(vec![value("e1", "missing", core_type(&validator, "Core.Int"), &env, &a)]);
    scope.import_namespace("Orders");

    validator.validate(&root(), Some(&mut scope)).unwrap();

    assert!(scope.is_empty());
    assert!(scope.namespaces().is_empty());
    assert!(scope.modules().is_empty());
}

#[test]
fn references_are_reused_across_batches() {
    let (validator, provider) = counting_validator();
    let core_id = validator.language().core_module().id();
    let env = Arc::new(Environment::new());
    let a = activity("a");

    for round in 0..3 {
        let mut scope = scope_of(vec![value(
            &format!("e{}", round),
            "1",
            core_type(&validator, "Core.Int"),
            &env,
            &a,
        )]);
        assert!(validator.validate(&root(), Some(&mut scope)).unwrap().is_empty());
    }

    assert_eq!(provider.calls(core_id), 1);
    assert_eq!(validator.cache().len(), 1);
}

#[test]
fn module_is_produced_once_per_batch() {
    let (validator, provider) = counting_validator();
    let orders = orders_module(ModuleKind::Dynamic);
    let order = TypeDescriptor::new("Orders.Order", orders.clone());
    let mut env = Environment::new();
    env.declare("order", order.clone());
    let env = Arc::new(env);
    let a = activity("a");

    let mut scope = scope_of(vec![
        value("e1", "order", order.clone(), &env, &a),
        value("e2", "order", order, &env, &a),
    ]);
    scope.declare_module(ModuleDeclaration::Loaded(orders.clone()));
    validator.validate(&root(), Some(&mut scope)).unwrap();

    assert_eq!(provider.calls(orders.id()), 1);
}

#[test]
fn dynamic_modules_are_never_cached() {
    let (validator, provider) = counting_validator();
    let orders = orders_module(ModuleKind::Dynamic);
    let order = TypeDescriptor::new("Orders.Order", orders.clone());
    let env = Arc::new(Environment::new());
    let a = activity("a");

    for _ in 0..2 {
        let mut scope = scope_of(vec![value("e1", "null", order.clone(), &env, &a)]);
        assert!(validator.validate(&root(), Some(&mut scope)).unwrap().is_empty());
    }

    assert!(!validator.cache().contains(orders.id()));
    assert_eq!(provider.calls(orders.id()), 2);
}

#[test]
fn concurrent_validations_share_the_cache() {
    let (validator, _) = counting_validator();
    let env = Arc::new(Environment::new());

    std::thread::scope(|s| {
        for i in 0..8 {
            let validator = &validator;
            let env = env.clone();
            s.spawn(move || {
                let owner = activity(&format!("a{}", i));
                let text = if i % 2 == 0 { "1 + 1" } else { "nope" };
                let mut scope = scope_of(vec![value(
                    "e1",
                    text,
                    core_type(validator, "Core.Int"),
                    &env,
                    &owner,
                )]);
                let errors = validator.validate(&root(), Some(&mut scope)).unwrap();
                assert_eq!(errors.len(), i % 2);
                if let Some(error) = errors.first() {
                    assert_eq!(error.activity_id(), Some(owner.id.as_str()));
                }
            });
        }
    });

    assert_eq!(validator.cache().len(), 1);
}

// =============================================================================
// Curation
// =============================================================================

struct DropUnattributed;

impl DiagnosticCurator for DropUnattributed {
    fn curate(&self, errors: Vec<(ValidationError, Diagnostic)>) -> Vec<ValidationError> {
        errors
            .into_iter()
            .filter(|(error, _)| error.source.is_some())
            .map(|(mut error, diagnostic)| {
                error.message = format!("{}: {}", diagnostic.code, error.message);
                error
            })
            .collect()
    }
}

#[test]
fn curator_rewrites_messages() {
    let validator = Validator::flow().with_curator(DropUnattributed);
    let env = Arc::new(Environment::new());
    let a = activity("a");
    let mut scope = scope_of(vec![value("e1", "missing", core_type(&validator, "Core.Int"), &env, &a)]);

    let errors = validator.validate(&root(), Some(&mut scope)).unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.starts_with("FX0103: "));
}

// =============================================================================
// Fatal errors
// =============================================================================

fn failing_scope(validator: &Validator<FailingFlow>) -> ValidationScope {
    let env = Arc::new(Environment::new());
    let a = activity("a");
    let int = TypeDescriptor::new("Core.Int", validator.language().core_module().clone());
    scope_of(vec![
        value("e1", "1 + 1", int.clone(), &env, &a),
        value("e2", "missing", int, &env, &a),
    ])
}

#[test]
fn parser_failures_propagate_and_keep_the_scope() {
    for stage in [FailAt::Expression, FailAt::Batch] {
        let validator = failing_validator(stage);
        let mut scope = failing_scope(&validator);

        let err = validator.validate(&root(), Some(&mut scope)).unwrap_err();

        assert!(matches!(err, ValidatorError::Syntax { .. }), "{:?}", err);
        assert!(err.to_string().starts_with("Failing parser failed: "));
        assert_eq!(scope.len(), 2);
    }
}

#[test]
fn compiler_failure_propagates_and_keeps_the_scope() {
    let validator = failing_validator(FailAt::Diagnostics);
    let mut scope = failing_scope(&validator);

    let err = validator.validate(&root(), Some(&mut scope)).unwrap_err();

    assert_eq!(
        err,
        ValidatorError::compiler("Failing", "backend unavailable")
    );
    assert_eq!(scope.len(), 2);
    assert!(scope.find("e2").is_some());
}
