use pretty_assertions::assert_eq;

use iota_core::ast::{AstKind, AstNode, Argument, ObjectNode};
use iota_core::builtins::BuiltinEnv;
use iota_core::ctx::{BuilderContext, ResolveMode};
use iota_core::span::{Location, Span};

fn spans() -> impl FnMut() -> Location {
    let mut line = 0;
    move || {
        line += 1;
        Location::Source(Span::new("test.iota", line, 0, 1))
    }
}

fn ctx() -> BuilderContext {
    BuilderContext::with_builtin_scope(BuiltinEnv::new_shared())
}

fn num(loc: Location, value: f64) -> AstNode {
    AstNode::number(loc, value)
}

fn op(loc: Location, text: &str, left: AstNode, right: AstNode) -> AstNode {
    AstNode::new(
        loc,
        AstKind::Operator {
            text: text.to_string(),
            left: Box::new(left),
            right: Box::new(right),
        },
    )
}

fn call(loc: Location, left: AstNode, arg: AstNode) -> AstNode {
    AstNode::new(
        loc,
        AstKind::Call {
            left: Box::new(left),
            arg: Box::new(arg),
        },
    )
}

fn func(loc: Location, arg_loc: Location, name: &str, ty: AstNode, body: Vec<AstNode>) -> AstNode {
    AstNode::new(
        loc,
        AstKind::Function {
            arg: Argument {
                location: arg_loc,
                name: name.to_string(),
                ty: Box::new(ty),
            },
            body,
            only_resolve_on_full_call: false,
        },
    )
}

/// `@x(Float64) x + 1` with distinct spans for every node.
fn add_one_function(next: &mut impl FnMut() -> Location) -> AstNode {
    let body = op(
        next(),
        "+",
        AstNode::identifier(next(), "x"),
        num(next(), 1.0),
    );
    func(
        next(),
        next(),
        "x",
        AstNode::identifier(next(), "Float64"),
        vec![body],
    )
}

#[test]
fn adding_two_literals_prints_three() {
    let mut next = spans();
    let mut ctx = ctx();
    let sum = op(next(), "+", num(next(), 1.0), num(next(), 2.0));
    assert_eq!(sum.evaluate(&mut ctx).print(), "3");
}

#[test]
fn literal_arithmetic_types_as_float64() {
    let mut next = spans();
    let mut ctx = ctx();
    let sum = op(next(), "+", num(next(), 1.0), num(next(), 2.0));
    let ty = sum.get_type(&mut ctx);
    let float64 = ctx.builtins.builtin_type("Float64").clone();
    assert!(ty.type_equals(&float64), "got {}", ty.print());
}

#[test]
fn string_concat_reduces() {
    let mut next = spans();
    let mut ctx = ctx();
    let sum = op(
        next(),
        "+",
        AstNode::string(next(), "foo"),
        AstNode::string(next(), "bar"),
    );
    assert_eq!(sum.evaluate(&mut ctx).print(), "\"foobar\"");
}

#[test]
fn function_types_without_being_called() {
    let mut next = spans();
    let mut ctx = ctx();
    let function = add_one_function(&mut next);
    let ty = function.get_type(&mut ctx);
    let AstKind::FunctionType {
        arg_type,
        return_type,
    } = &ty.kind
    else {
        panic!("expected a function type, got {}", ty.print());
    };
    let float64 = ctx.builtins.builtin_type("Float64").clone();
    assert!(arg_type.type_equals(&float64), "arg: {}", arg_type.print());
    assert!(
        return_type.type_equals(&float64),
        "return: {}",
        return_type.print()
    );
}

#[test]
fn applying_a_function_reduces_fully() {
    let mut next = spans();
    let mut ctx = ctx();
    let function = add_one_function(&mut next);
    let applied = call(next(), function, num(next(), 5.0));
    assert_eq!(applied.evaluate(&mut ctx).print(), "6");
}

#[test]
fn unbound_identifier_is_a_type_error() {
    let mut next = spans();
    let mut ctx = ctx();
    let location = next();
    let identifier = AstNode::identifier(location.clone(), "nope");
    let ty = identifier.get_type(&mut ctx);
    let AstKind::Error(Some(diagnostic)) = &ty.kind else {
        panic!("expected an error, got {}", ty.print());
    };
    assert!(diagnostic.message.contains("nope"), "{}", diagnostic.message);
    assert_eq!(diagnostic.indicators.len(), 1);
    assert!(diagnostic.indicators[0].location.same_span(&location));
}

#[test]
fn if_branch_type_mismatch_names_both_branches() {
    let mut next = spans();
    let mut ctx = ctx();
    let true_loc = next();
    let false_loc = next();
    let branchy = AstNode::new(
        next(),
        AstKind::If {
            condition: Box::new(AstNode::bool(next(), true)),
            true_body: vec![num(true_loc.clone(), 1.0)],
            false_body: vec![AstNode::bool(false_loc.clone(), false)],
        },
    );
    let ty = branchy.get_type(&mut ctx);
    let AstKind::Error(Some(diagnostic)) = &ty.kind else {
        panic!("expected an error, got {}", ty.print());
    };
    assert!(
        diagnostic.message.contains("expected type"),
        "{}",
        diagnostic.message
    );
    let spans: Vec<_> = diagnostic
        .indicators
        .iter()
        .map(|indicator| indicator.location.clone())
        .collect();
    assert!(spans.iter().any(|s| s.same_span(&true_loc)));
    assert!(spans.iter().any(|s| s.same_span(&false_loc)));
}

#[test]
fn if_on_concrete_condition_takes_one_branch() {
    let mut next = spans();
    let mut ctx = ctx();
    let branchy = AstNode::new(
        next(),
        AstKind::If {
            condition: Box::new(AstNode::bool(next(), false)),
            true_body: vec![num(next(), 1.0)],
            false_body: vec![num(next(), 2.0)],
        },
    );
    assert_eq!(branchy.evaluate(&mut ctx).print(), "2");
}

#[test]
fn forced_resolution_is_idempotent() {
    let mut next = spans();
    let mut ctx = ctx();
    ctx.resolve = ResolveMode::Force;
    let function = add_one_function(&mut next);
    let applied = call(next(), function, num(next(), 5.0));
    let once = applied.evaluate(&mut ctx);
    let twice = once.evaluate(&mut ctx);
    assert_eq!(once.print(), twice.print());
}

#[test]
fn residual_forms_are_fixed_points_too() {
    let mut next = spans();
    let mut ctx = ctx();
    ctx.resolve = ResolveMode::Force;
    let function = add_one_function(&mut next);
    let once = function.evaluate(&mut ctx);
    let twice = once.evaluate(&mut ctx);
    assert_eq!(once.print(), twice.print());
}

#[test]
fn dead_end_propagates_through_calls() {
    let mut next = spans();
    let mut ctx = ctx();
    let function = add_one_function(&mut next);
    let applied = call(next(), function, AstNode::unknown(next(), None));
    let result = applied.evaluate(&mut ctx);
    assert!(result.dead_end, "got {}", result.print());
}

#[test]
fn dead_end_propagates_through_operators() {
    let mut next = spans();
    let mut ctx = ctx();
    let float64 = ctx.builtins.builtin_type("Float64").clone();
    let sum = op(
        next(),
        "+",
        AstNode::unknown(next(), Some(float64)),
        num(next(), 2.0),
    );
    let result = sum.evaluate(&mut ctx);
    assert!(result.dead_end, "got {}", result.print());
}

#[test]
fn dead_end_propagates_through_member_access() {
    let mut next = spans();
    let mut ctx = ctx();
    let access = AstNode::new(
        next(),
        AstKind::MemberAccess {
            left: Box::new(AstNode::unknown(next(), None)),
            name: "x".to_string(),
        },
    );
    let result = access.evaluate(&mut ctx);
    assert!(result.dead_end, "got {}", result.print());
}

#[test]
fn dead_end_propagates_through_if_conditions() {
    let mut next = spans();
    let mut ctx = ctx();
    let bool_type = ctx.builtins.builtin_type("Bool").clone();
    let branchy = AstNode::new(
        next(),
        AstKind::If {
            condition: Box::new(AstNode::unknown(next(), Some(bool_type))),
            true_body: vec![num(next(), 1.0)],
            false_body: vec![num(next(), 2.0)],
        },
    );
    let result = branchy.evaluate(&mut ctx);
    assert!(result.dead_end, "got {}", result.print());
    assert!(matches!(result.kind, AstKind::If { .. }));
}

#[test]
fn self_referential_function_terminates() {
    let mut next = spans();
    let mut ctx = ctx();
    // f = @x(Float64) (f x)
    let body = call(
        next(),
        AstNode::identifier(next(), "f"),
        AstNode::identifier(next(), "x"),
    );
    let function = func(
        next(),
        next(),
        "x",
        AstNode::identifier(next(), "Float64"),
        vec![body],
    );
    let binding = AstNode::alias(next(), "f", function.clone(), false);
    ctx.push_scope(vec![binding]);
    // must terminate rather than unfold forever
    let evaluated = function.evaluate(&mut ctx);
    assert!(matches!(evaluated.kind, AstKind::Function { .. }));
    let ty = function.get_type(&mut ctx);
    assert!(
        matches!(ty.kind, AstKind::FunctionType { .. })
            || matches!(ty.kind, AstKind::Error(_) | AstKind::Unknown(_)),
        "got {}",
        ty.print()
    );
}

#[test]
fn nested_application_reduces_all_the_way() {
    let mut next = spans();
    let mut ctx = ctx();
    let mut expr = num(next(), 0.0);
    // argument re-evaluation makes deep chains cost 2^n steps, so keep
    // the nesting moderate
    for _ in 0..12 {
        let function = add_one_function(&mut next);
        expr = call(next(), function, expr);
    }
    let result = expr.evaluate(&mut ctx);
    assert_eq!(result.print(), "12");
}

#[test]
fn innermost_scope_shadows_and_pops_cleanly() {
    let mut next = spans();
    let mut ctx = ctx();
    ctx.push_scope(vec![AstNode::alias(next(), "x", num(next(), 1.0), false)]);
    ctx.push_scope(vec![AstNode::alias(next(), "x", num(next(), 2.0), false)]);
    let inner = ctx.get_alias("x").expect("inner binding");
    let AstKind::Alias { value, .. } = &inner.kind else {
        panic!("not an alias");
    };
    assert_eq!(value.print(), "2");
    ctx.pop_scope();
    let outer = ctx.get_alias("x").expect("outer binding");
    let AstKind::Alias { value, .. } = &outer.kind else {
        panic!("not an alias");
    };
    assert_eq!(value.print(), "1");
}

#[test]
fn operator_desugars_to_member_call() {
    let mut next = spans();
    let mut ctx = ctx();
    let sugared = op(next(), "+", num(next(), 2.0), num(next(), 3.0));

    let float64 = ctx.builtins.builtin_type("Float64").clone();
    let AstKind::Object(object) = &float64.kind else {
        panic!("Float64 is not an object");
    };
    let plus = object.get_member("+").expect("operator member").clone();
    let explicit = call(next(), call(next(), plus, num(next(), 2.0)), num(next(), 3.0));

    assert_eq!(
        sugared.evaluate(&mut ctx).print(),
        explicit.evaluate(&mut ctx).print()
    );
}

#[test]
fn import_builtin_resolves_to_the_builtin_module() {
    let mut next = spans();
    let mut ctx = ctx();
    let imported = call(
        next(),
        AstNode::identifier(next(), "#import"),
        AstNode::string(next(), "builtin"),
    );
    let result = imported.evaluate(&mut ctx);
    assert_eq!(result.print(), ctx.builtins.root().print());
}

#[test]
fn member_access_on_the_builtin_module_projects_types() {
    let mut next = spans();
    let mut ctx = ctx();
    let imported = call(
        next(),
        AstNode::identifier(next(), "#import"),
        AstNode::string(next(), "builtin"),
    );
    let access = AstNode::new(
        next(),
        AstKind::MemberAccess {
            left: Box::new(imported),
            name: "Float64".to_string(),
        },
    );
    let result = access.evaluate(&mut ctx);
    let float64 = ctx.builtins.builtin_type("Float64").clone();
    assert!(result.type_equals(&float64), "got {}", result.print());
}

#[test]
fn number_to_string_task_fires_on_literals() {
    let mut next = spans();
    let mut ctx = ctx();
    let converted = call(
        next(),
        AstNode::identifier(next(), "numberToString"),
        num(next(), 3.5),
    );
    assert_eq!(converted.evaluate(&mut ctx).print(), "\"3.5\"");
}

#[test]
fn call_argument_type_mismatch_carries_three_indicators() {
    let mut next = spans();
    let mut ctx = ctx();
    let function = add_one_function(&mut next);
    let applied = call(next(), function, AstNode::bool(next(), true));
    let ty = applied.get_type(&mut ctx);
    let AstKind::Error(Some(diagnostic)) = &ty.kind else {
        panic!("expected an error, got {}", ty.print());
    };
    assert_eq!(
        diagnostic.message,
        "expected type Float64, but got type Bool"
    );
    assert_eq!(diagnostic.indicators.len(), 3);
}

/// Deep inputs get a dedicated thread so the depth under test is about
/// the engine, not the harness stack.
fn on_deep_stack(f: impl FnOnce() + Send + 'static) {
    std::thread::Builder::new()
        .stack_size(32 * 1024 * 1024)
        .spawn(f)
        .unwrap()
        .join()
        .unwrap();
}

#[test]
fn object_prototypes_written_as_names_type_cleanly() {
    let mut next = spans();
    let mut ctx = ctx();
    // &Float64{} straight from the parser: the prototype is still a name
    let typed = AstNode::new(
        next(),
        AstKind::Object(ObjectNode::new(
            "",
            Some(AstNode::identifier(next(), "Float64")),
        )),
    );
    let type_type = ctx.builtins.builtin_type("Type").clone();
    let ty = typed.get_type(&mut ctx);
    assert!(ty.type_equals(&type_type), "got {}", ty.print());
    // evaluation reduces the prototype to the object it names
    let evaluated = typed.evaluate(&mut ctx);
    let AstKind::Object(object) = &evaluated.kind else {
        panic!("expected an object, got {}", evaluated.print());
    };
    let float64 = ctx.builtins.builtin_type("Float64").clone();
    let prototype = object.prototype.as_ref().unwrap();
    assert!(
        prototype.type_equals(&float64),
        "got {}",
        prototype.print()
    );
}

#[test]
fn objects_on_a_plain_value_prototype_are_plain_values() {
    let mut next = spans();
    let mut ctx = ctx();
    let binding = AstNode::alias(next(), "p", num(next(), 5.0), false);
    ctx.push_scope(vec![binding]);
    let plain = AstNode::new(
        next(),
        AstKind::Object(ObjectNode::new(
            "",
            Some(AstNode::identifier(next(), "p")),
        )),
    );
    let any_type = ctx.builtins.builtin_type("Any").clone();
    let ty = plain.get_type(&mut ctx);
    assert!(ty.type_equals(&any_type), "got {}", ty.print());
}

#[test]
fn unbound_object_prototypes_are_diagnostics() {
    let mut next = spans();
    let mut ctx = ctx();
    let orphan = AstNode::new(
        next(),
        AstKind::Object(ObjectNode::new(
            "",
            Some(AstNode::identifier(next(), "nope")),
        )),
    );
    let ty = orphan.get_type(&mut ctx);
    let AstKind::Error(Some(diagnostic)) = &ty.kind else {
        panic!("expected an error, got {}", ty.print());
    };
    assert_eq!(diagnostic.message, "alias 'nope' does not exist");
}

#[test]
fn non_type_annotations_accept_any_argument() {
    let mut next = spans();
    let mut ctx = ctx();
    // ((@x(5) x) 1): the annotation is a number, so x accepts anything
    let function = func(
        next(),
        next(),
        "x",
        num(next(), 5.0),
        vec![AstNode::identifier(next(), "x")],
    );
    let applied = call(next(), function, num(next(), 1.0));
    let float64 = ctx.builtins.builtin_type("Float64").clone();
    let ty = applied.get_type(&mut ctx);
    assert!(ty.type_equals(&float64), "got {}", ty.print());
    assert_eq!(applied.evaluate(&mut ctx).print(), "1");
}

#[test]
fn deep_alias_cycles_error_instead_of_unfolding_forever() {
    on_deep_stack(|| {
        let mut next = spans();
        let mut ctx = ctx();
        let depth = 1000;
        let mut scope = Vec::with_capacity(depth);
        for i in 0..depth {
            let target = format!("a{}", (i + 1) % depth);
            scope.push(AstNode::alias(
                next(),
                &format!("a{i}"),
                AstNode::identifier(next(), target),
                false,
            ));
        }
        ctx.push_scope(scope);
        let root = AstNode::identifier(next(), "a0");
        let ty = root.get_type(&mut ctx);
        let AstKind::Error(Some(diagnostic)) = &ty.kind else {
            panic!("expected an error, got {}", ty.print());
        };
        assert_eq!(diagnostic.message, "recursive definition!");
    });
}

#[test]
fn deep_alias_chains_resolve_to_the_final_value() {
    on_deep_stack(|| {
        let mut next = spans();
        let mut ctx = ctx();
        let depth = 1000;
        let mut scope = Vec::with_capacity(depth);
        for i in 0..depth - 1 {
            scope.push(AstNode::alias(
                next(),
                &format!("a{i}"),
                AstNode::identifier(next(), format!("a{}", i + 1)),
                false,
            ));
        }
        scope.push(AstNode::alias(
            next(),
            &format!("a{}", depth - 1),
            num(next(), 42.0),
            false,
        ));
        ctx.push_scope(scope);
        let root = AstNode::identifier(next(), "a0");
        assert_eq!(root.evaluate(&mut ctx).print(), "42");
        let float64 = ctx.builtins.builtin_type("Float64").clone();
        let ty = root.get_type(&mut ctx);
        assert!(ty.type_equals(&float64), "got {}", ty.print());
    });
}

#[test]
fn deep_mutual_function_references_terminate() {
    on_deep_stack(|| {
        let mut next = spans();
        let mut ctx = ctx();
        let depth = 1000;
        let mut scope = Vec::with_capacity(depth);
        // f0 = @x(Float64) (f1 x), ..., f999 = @x(Float64) (f0 x)
        for i in 0..depth {
            let callee = format!("f{}", (i + 1) % depth);
            let body = call(
                next(),
                AstNode::identifier(next(), callee),
                AstNode::identifier(next(), "x"),
            );
            let function = func(
                next(),
                next(),
                "x",
                AstNode::identifier(next(), "Float64"),
                vec![body],
            );
            scope.push(AstNode::alias(next(), &format!("f{i}"), function, false));
        }
        ctx.push_scope(scope);
        let root = AstNode::identifier(next(), "f0");
        let evaluated = root.evaluate(&mut ctx);
        assert!(
            matches!(evaluated.kind, AstKind::Function { .. }),
            "got {}",
            evaluated.print()
        );
        let ty = root.get_type(&mut ctx);
        assert!(
            matches!(
                ty.kind,
                AstKind::FunctionType { .. } | AstKind::Error(_) | AstKind::Unknown(_)
            ),
            "got {}",
            ty.print()
        );
    });
}

#[test]
fn if_with_one_unknown_branch_takes_the_other_branchs_type() {
    let mut next = spans();
    let mut ctx = ctx();
    let bool_type = ctx.builtins.builtin_type("Bool").clone();
    let condition_binding = AstNode::alias(
        next(),
        "c",
        AstNode::unknown(next(), Some(bool_type)),
        false,
    );
    let unknown_binding = AstNode::alias(next(), "u", AstNode::unknown(next(), None), false);
    ctx.push_scope(vec![condition_binding, unknown_binding]);
    let float64 = ctx.builtins.builtin_type("Float64").clone();
    let branchy = AstNode::new(
        next(),
        AstKind::If {
            condition: Box::new(AstNode::identifier(next(), "c")),
            true_body: vec![AstNode::identifier(next(), "u")],
            false_body: vec![num(next(), 2.0)],
        },
    );
    let ty = branchy.get_type(&mut ctx);
    assert!(ty.type_equals(&float64), "got {}", ty.print());
    let mirrored = AstNode::new(
        next(),
        AstKind::If {
            condition: Box::new(AstNode::identifier(next(), "c")),
            true_body: vec![num(next(), 2.0)],
            false_body: vec![AstNode::identifier(next(), "u")],
        },
    );
    let ty = mirrored.get_type(&mut ctx);
    assert!(ty.type_equals(&float64), "got {}", ty.print());
}

#[test]
fn if_with_both_branches_unknown_is_a_diagnostic() {
    let mut next = spans();
    let mut ctx = ctx();
    let bool_type = ctx.builtins.builtin_type("Bool").clone();
    let condition_binding = AstNode::alias(
        next(),
        "c",
        AstNode::unknown(next(), Some(bool_type)),
        false,
    );
    let unknown_binding = AstNode::alias(next(), "u", AstNode::unknown(next(), None), false);
    ctx.push_scope(vec![condition_binding, unknown_binding]);
    let foggy = AstNode::new(
        next(),
        AstKind::If {
            condition: Box::new(AstNode::identifier(next(), "c")),
            true_body: vec![AstNode::identifier(next(), "u")],
            false_body: vec![AstNode::identifier(next(), "u")],
        },
    );
    let ty = foggy.get_type(&mut ctx);
    let AstKind::Error(Some(diagnostic)) = &ty.kind else {
        panic!("expected an error, got {}", ty.print());
    };
    assert_eq!(
        diagnostic.message,
        "can not determine the type of this if expression"
    );
}
