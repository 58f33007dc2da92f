//! The fixed builtin environment: primitive type objects, the import and
//! numberToString tasks, and the operator methods on Float64 and String.
//!
//! Assembly is two-phase: objects are mutated freely in here, then frozen
//! into an immutable root shared behind `Arc`. Nothing global; every
//! context carries its own handle.

use std::sync::Arc;

use crate::ast::{
    Argument, AstKind, AstNode, ObjectNode, TaskDependency, TaskNode, TaskOutcome,
};
use crate::ctx::BuilderContext;
use crate::span::Location;

pub const BUILTIN_PREFIX: &str = "__builtin__";

const BUILTIN_TYPE_NAMES: &[&str] = &[
    "Bool", "Float64", "String", "Effect", "Function", "Any", "Void",
];

pub struct BuiltinEnv {
    root: AstNode,
}

impl BuiltinEnv {
    pub fn new() -> BuiltinEnv {
        let type_type = make_type_object("Type", None);
        let mut float64 = make_type_object("Float64", Some(type_type.clone()));
        let mut string = make_type_object("String", Some(type_type.clone()));

        for (name, op) in [
            ("+", std::ops::Add::add as fn(f64, f64) -> f64),
            ("-", std::ops::Sub::sub),
            ("*", std::ops::Mul::mul),
            ("/", std::ops::Div::div),
        ] {
            let task = number_operator_task(
                format!("{BUILTIN_PREFIX}.Float64.{name}"),
                float64.clone(),
                op,
            );
            let fn_node = make_function(&[("left", float64.clone()), ("right", float64.clone())], task);
            add_member(&mut float64, name, fn_node);
        }
        {
            let task = string_concat_task(string.clone());
            let fn_node = make_function(&[("left", string.clone()), ("right", string.clone())], task);
            add_member(&mut string, "+", fn_node);
        }

        let mut root = AstNode::new(
            Location::Builtin,
            AstKind::Object(ObjectNode::new(BUILTIN_PREFIX, None)),
        );
        add_member(&mut root, "Type", type_type.clone());
        for name in BUILTIN_TYPE_NAMES {
            let object = match *name {
                "Float64" => float64.clone(),
                "String" => string.clone(),
                _ => make_type_object(name, Some(type_type.clone())),
            };
            add_member(&mut root, name, object);
        }

        let any = match &root.kind {
            AstKind::Object(object) => match object.get_member("Any") {
                Some(any) => any.clone(),
                None => unreachable!(),
            },
            _ => unreachable!(),
        };
        add_member(
            &mut root,
            "import",
            make_function(&[("path", string.clone())], import_task(any)),
        );
        add_member(
            &mut root,
            "numberToString",
            make_function(
                &[("number", float64.clone())],
                number_to_string_task(string.clone()),
            ),
        );

        BuiltinEnv { root }
    }

    pub fn new_shared() -> Arc<BuiltinEnv> {
        Arc::new(BuiltinEnv::new())
    }

    /// The builtin module object, as returned by `#import "builtin"`.
    pub fn root(&self) -> &AstNode {
        &self.root
    }

    pub fn get(&self, name: &str) -> Option<&AstNode> {
        match &self.root.kind {
            AstKind::Object(object) => object.get_member(name),
            _ => unreachable!(),
        }
    }

    /// A builtin type object by bare name. Missing names are a malformed
    /// builtin table, not a user error.
    pub fn builtin_type(&self, name: &str) -> &AstNode {
        match self.get(name) {
            Some(node) => node,
            None => unreachable!("no builtin type named '{name}'"),
        }
    }
}

impl Default for BuiltinEnv {
    fn default() -> Self {
        BuiltinEnv::new()
    }
}

fn make_type_object(name: &str, prototype: Option<AstNode>) -> AstNode {
    let mut object = ObjectNode::new(format!("{BUILTIN_PREFIX}.{name}"), prototype);
    object.add_member("builtinTag", AstNode::string(Location::Builtin, name));
    AstNode::new(Location::Builtin, AstKind::Object(object))
}

fn add_member(node: &mut AstNode, name: &str, value: AstNode) {
    match &mut node.kind {
        AstKind::Object(object) => object.add_member(name, value),
        _ => unreachable!(),
    }
}

/// Wraps a task in a chain of single-argument functions, recording each
/// parameter as a task dependency so the task sees the bound arguments.
fn make_function(args: &[(&str, AstNode)], mut task: TaskNode) -> AstNode {
    for (name, _) in args {
        task.dependencies.push(TaskDependency {
            name: (*name).to_string(),
            value: AstNode::identifier(Location::Builtin, *name),
        });
    }
    let mut last = AstNode::new(Location::Builtin, AstKind::BuiltinTask(task));
    for (name, ty) in args.iter().rev() {
        last = AstNode::new(
            Location::Builtin,
            AstKind::Function {
                arg: Argument {
                    location: Location::Builtin,
                    name: (*name).to_string(),
                    ty: Box::new(ty.clone()),
                },
                body: vec![last],
                only_resolve_on_full_call: true,
            },
        );
    }
    last
}

fn number_operator_task(
    codegen_id: String,
    output_type: AstNode,
    op: fn(f64, f64) -> f64,
) -> TaskNode {
    TaskNode {
        codegen_id,
        dependencies: Vec::new(),
        type_fn: Arc::new(move |_ctx| output_type.clone()),
        eval_fn: Arc::new(move |ctx, task| {
            ctx.with_resolve(|ctx| {
                let left = task.eval_dependency(ctx, "left");
                let right = task.eval_dependency(ctx, "right");
                match (&left.kind, &right.kind) {
                    (AstKind::Number(l), AstKind::Number(r)) if ctx.resolve.do_resolve() => {
                        TaskOutcome::Done(AstNode::number(Location::Builtin, op(*l, *r)))
                    }
                    _ => TaskOutcome::Pending,
                }
            })
        }),
    }
}

fn string_concat_task(string_type: AstNode) -> TaskNode {
    TaskNode {
        codegen_id: format!("{BUILTIN_PREFIX}.String.+"),
        dependencies: Vec::new(),
        type_fn: Arc::new(move |_ctx| string_type.clone()),
        eval_fn: Arc::new(|ctx, task| {
            ctx.with_resolve(|ctx| {
                let left = task.eval_dependency(ctx, "left");
                let right = task.eval_dependency(ctx, "right");
                match (&left.kind, &right.kind) {
                    (AstKind::String(l), AstKind::String(r)) if ctx.resolve.do_resolve() => {
                        TaskOutcome::Done(AstNode::string(
                            Location::Builtin,
                            format!("{l}{r}"),
                        ))
                    }
                    _ => TaskOutcome::Pending,
                }
            })
        }),
    }
}

fn number_to_string_task(string_type: AstNode) -> TaskNode {
    TaskNode {
        codegen_id: "numberToString".to_string(),
        dependencies: Vec::new(),
        type_fn: Arc::new(move |_ctx| string_type.clone()),
        eval_fn: Arc::new(|ctx, task| {
            ctx.with_resolve(|ctx| {
                let number = task.eval_dependency(ctx, "number");
                match &number.kind {
                    AstKind::Number(value) => TaskOutcome::Done(AstNode::string(
                        Location::Builtin,
                        value.to_string(),
                    )),
                    _ => TaskOutcome::Pending,
                }
            })
        }),
    }
}

/// `import "builtin"` yields the builtin module object itself; other
/// paths stay pending here and are handled by the module driver.
fn import_task(any_type: AstNode) -> TaskNode {
    TaskNode {
        codegen_id: String::new(),
        dependencies: Vec::new(),
        type_fn: Arc::new(move |_ctx| any_type.clone()),
        eval_fn: Arc::new(|ctx: &mut BuilderContext, task| {
            ctx.with_resolve(|ctx| {
                let path = task.eval_dependency(ctx, "path");
                match &path.kind {
                    AstKind::String(path) if path == "builtin" => {
                        TaskOutcome::Done(ctx.builtins.root().clone())
                    }
                    AstKind::String(_) => TaskOutcome::Pending,
                    _ => TaskOutcome::Pending,
                }
            })
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_objects_sit_on_the_type_prototype_chain() {
        let env = BuiltinEnv::new();
        let ctx = BuilderContext::new(BuiltinEnv::new_shared());
        for name in BUILTIN_TYPE_NAMES {
            assert!(env.builtin_type(name).is_type(&ctx), "{name} must be a type");
        }
        assert!(env.builtin_type("Type").is_type(&ctx));
    }

    #[test]
    fn float64_carries_arithmetic_operators() {
        let env = BuiltinEnv::new();
        let AstKind::Object(float64) = &env.builtin_type("Float64").kind else {
            panic!("Float64 is not an object");
        };
        for op in ["+", "-", "*", "/"] {
            assert!(float64.get_member(op).is_some(), "missing operator {op}");
        }
    }

    #[test]
    fn environments_are_independent() {
        let a = BuiltinEnv::new();
        let b = BuiltinEnv::new();
        assert_ne!(a.root().id, b.root().id);
    }
}
