use pretty_assertions::assert_eq;

use iota_core::ast::{evaluate_list, AstKind, AstNode};
use iota_core::builtins::BuiltinEnv;
use iota_core::ctx::BuilderContext;
use iota_lang::parse_source;

fn parse_one(text: &str) -> AstNode {
    let mut nodes = parse_source("test.iota", text).expect("parse failed");
    assert_eq!(nodes.len(), 1, "expected exactly one node from {text:?}");
    nodes.pop().unwrap()
}

fn printed(text: &str) -> String {
    parse_one(text).print()
}

#[test]
fn operator_precedence_shapes_the_tree() {
    assert_eq!(printed("1 + 2"), "(1 + 2)");
    assert_eq!(printed("1 + 2 * 3"), "(1 + (2 * 3))");
    assert_eq!(printed("2 * 3 + 1"), "((2 * 3) + 1)");
    assert_eq!(printed("1 - 2 - 3"), "((1 - 2) - 3)");
    assert_eq!(printed("a || b && c"), "(a || (b && c))");
}

#[test]
fn parentheses_override_precedence() {
    assert_eq!(printed("(1 + 2) * 3"), "((1 + 2) * 3)");
}

#[test]
fn aliases_capture_the_whole_right_side() {
    assert_eq!(printed("x = 5"), "x = 5");
    assert_eq!(printed("y = 1 + 2"), "y = (1 + 2)");
}

#[test]
fn application_is_left_associative_and_same_line_only() {
    assert_eq!(printed("f 1 2"), "((f 1) 2)");
    let nodes = parse_source("test.iota", "f\n1\n").expect("parse failed");
    assert_eq!(nodes.len(), 2);
}

#[test]
fn member_access_binds_tighter_than_application() {
    assert_eq!(printed("a.b"), "a.b");
    assert_eq!(printed("a.b 1"), "(a.b 1)");
    assert_eq!(printed("a.b.c"), "a.b.c");
}

#[test]
fn functions_round_trip() {
    assert_eq!(printed("@x(Float64) x + 1"), "@x(Float64) (x + 1)");
    assert_eq!(
        printed("@x(Float64) @y(Float64) x + y"),
        "@x(Float64) @y(Float64) (x + y)"
    );
}

#[test]
fn function_body_ends_at_dedent() {
    let nodes = parse_source("test.iota", "f = @x(Float64)\n\tx + 1\ny = 2\n")
        .expect("parse failed");
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].print(), "f = @x(Float64) (x + 1)");
    assert_eq!(nodes[1].print(), "y = 2");
}

#[test]
fn function_types_round_trip() {
    assert_eq!(
        printed("\\(Float64) -> String"),
        "\\(Float64) -> String"
    );
    assert_eq!(
        printed("\\(Float64) -> \\(Float64) -> Bool"),
        "\\(Float64) -> \\(Float64) -> Bool"
    );
}

#[test]
fn if_expressions_round_trip() {
    let text = "if true then\n\t1\nelse\n\t2";
    assert_eq!(printed(text), text);
}

#[test]
fn else_binds_to_the_nearest_if() {
    let node = parse_one("if a then\n\tif b then\n\t\t1\n\telse\n\t\t2\nelse\n\t3");
    let AstKind::If { false_body, .. } = &node.kind else {
        panic!("expected an if expression, got {node}");
    };
    assert_eq!(false_body.len(), 1);
    assert_eq!(false_body[0].print(), "3");
}

#[test]
fn objects_round_trip() {
    assert_eq!(printed("{\n\tx = 1\n}"), "{\n\tx = 1\n}");
    assert_eq!(printed("&(Float64){}"), "&(Float64){}");
    assert_eq!(printed("&proto{\n\tx = 1\n}"), "&(proto){\n\tx = 1\n}");
}

#[test]
fn object_members_must_be_named() {
    let err = parse_source("test.iota", "{\n\t1 + 2\n}").unwrap_err();
    assert!(err.message.contains("name = value"), "got: {}", err.message);
}

#[test]
fn bare_operators_are_identifiers() {
    assert_eq!(printed("(+)"), "(+)");
    let node = parse_one("(+)");
    assert!(matches!(node.kind, AstKind::Identifier(ref name) if name == "+"));
}

#[test]
fn hash_words_are_single_identifiers() {
    assert_eq!(printed("#import \"builtin\""), "(#import \"builtin\")");
}

#[test]
fn commands_parse_as_statements() {
    let nodes = parse_source("test.iota", ">debug on\nx = 1\n").expect("parse failed");
    assert_eq!(nodes.len(), 2);
    assert!(matches!(nodes[0].kind, AstKind::Command(ref text) if text == "debug on"));
}

#[test]
fn comments_are_skipped() {
    let nodes = parse_source("test.iota", "// a comment\n// more\nx = 1\n").expect("parse failed");
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].print(), "x = 1");
}

#[test]
fn unclosed_parenthesis_is_an_error() {
    let err = parse_source("test.iota", "(1 + 2").unwrap_err();
    assert!(err.message.contains("')'"), "got: {}", err.message);
    assert_eq!(err.indicators.len(), 1);
}

#[test]
fn missing_function_body_is_an_error() {
    let err = parse_source("test.iota", "@x(Float64)").unwrap_err();
    assert!(err.message.contains("body"), "got: {}", err.message);
}

#[test]
fn empty_if_branch_is_an_error() {
    let err = parse_source("test.iota", "if a then\nelse\n\t2").unwrap_err();
    assert!(err.message.contains("'then' branch"), "got: {}", err.message);
}

#[test]
fn dangling_expression_end_is_an_error() {
    let err = parse_source("test.iota", "x = ").unwrap_err();
    assert!(err.message.contains("end of the file"), "got: {}", err.message);
}

#[test]
fn parsed_source_evaluates() {
    let nodes = parse_source("test.iota", "((@x(Float64) x + 1) 5)").expect("parse failed");
    let mut ctx = BuilderContext::with_builtin_scope(BuiltinEnv::new_shared());
    let results = evaluate_list(&mut ctx, &nodes);
    assert_eq!(results.last().unwrap().print(), "6");
}

#[test]
fn parsed_aliases_resolve_across_statements() {
    let nodes = parse_source("test.iota", "y = 1 + 2\ny * 2\n").expect("parse failed");
    let mut ctx = BuilderContext::with_builtin_scope(BuiltinEnv::new_shared());
    let results = evaluate_list(&mut ctx, &nodes);
    assert_eq!(results.last().unwrap().print(), "6");
}

#[test]
fn parsed_prototyped_objects_type_check() {
    let typed = parse_one("&Float64{}");
    let mut ctx = BuilderContext::with_builtin_scope(BuiltinEnv::new_shared());
    let type_type = ctx.builtins.builtin_type("Type").clone();
    let ty = typed.get_type(&mut ctx);
    assert!(ty.type_equals(&type_type), "got {}", ty.print());
}
