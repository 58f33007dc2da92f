//! Type inference. `get_type` returns either a type value (an object on
//! the `Type` prototype chain, or a function type) or a dead end; it must
//! never panic on syntactically valid input. Panics here mean the builtin
//! table or an earlier pass is broken.

use super::{AstKind, AstNode};
use crate::ctx::BuilderContext;
use crate::diagnostics::CompileError;
use crate::span::Location;

impl AstNode {
    /// True when this node is a type value.
    pub fn is_type(&self, ctx: &BuilderContext) -> bool {
        match &self.kind {
            AstKind::FunctionType { .. } => true,
            AstKind::Object(_) => {
                let type_type = ctx.builtins.builtin_type("Type");
                self.type_equals(type_type) || self.has_prototype(type_type)
            }
            _ => false,
        }
    }

    /// Nominal equality for type objects. Builtin types all carry unique
    /// names; unnamed objects fall back to comparing printed form.
    pub fn type_equals(&self, other: &AstNode) -> bool {
        match (&self.kind, &other.kind) {
            (AstKind::Object(a), AstKind::Object(b)) => {
                if !a.name.is_empty() && !b.name.is_empty() {
                    a.name == b.name
                } else {
                    a.name == b.name && self.print() == other.print()
                }
            }
            _ => false,
        }
    }

    /// Walks the prototype chain looking for `other`. A prototype that is
    /// still unevaluated surface syntax (a name, say) ends the walk.
    pub fn has_prototype(&self, other: &AstNode) -> bool {
        let AstKind::Object(object) = &self.kind else {
            return false;
        };
        let Some(prototype) = &object.prototype else {
            return false;
        };
        if !matches!(prototype.kind, AstKind::Object(_)) {
            return false;
        }
        prototype.type_equals(other) || prototype.has_prototype(other)
    }

    pub fn get_type(&self, ctx: &mut BuilderContext) -> AstNode {
        let builtins = ctx.builtins.clone();
        match &self.kind {
            AstKind::Bool(_) => builtins.builtin_type("Bool").clone(),
            AstKind::Number(_) => builtins.builtin_type("Float64").clone(),
            AstKind::String(_) => builtins.builtin_type("String").clone(),
            AstKind::Object(object) => {
                let type_type = builtins.builtin_type("Type");
                let is_type = match &object.prototype {
                    // a prototype written as a name has not been evaluated
                    // into an object yet; resolve it here
                    Some(prototype) if !matches!(prototype.kind, AstKind::Object(_)) => {
                        let prototype_type = prototype.get_type(ctx);
                        if prototype_type.is_error() {
                            return prototype_type;
                        }
                        if prototype_type.dead_end {
                            false
                        } else {
                            let prototype = ctx.with_resolve(|ctx| prototype.evaluate(ctx));
                            prototype.type_equals(type_type) || prototype.has_prototype(type_type)
                        }
                    }
                    _ => self.is_type(ctx),
                };
                if is_type {
                    type_type.clone()
                } else {
                    builtins.builtin_type("Any").clone()
                }
            }
            AstKind::FunctionType {
                arg_type,
                return_type,
            } => {
                let type_type = builtins.builtin_type("Type");
                for side in [arg_type, return_type] {
                    let side_type = side.get_type(ctx);
                    if !side_type.is_type(ctx) {
                        return side_type;
                    }
                    if let Some(error) = expect_type(ctx, type_type, &side_type) {
                        return AstNode::error(
                            self.location.clone(),
                            error.indicator(self.location.clone(), "here"),
                        );
                    }
                }
                type_type.clone()
            }
            AstKind::Alias { value, .. } => {
                let value_type = value.get_type(ctx);
                if !value_type.is_type(ctx) {
                    return value_type;
                }
                value_type
            }
            AstKind::Identifier(name) => {
                if ctx.is_on_eval_stack_only_identifiers(self) {
                    return AstNode::error(
                        self.location.clone(),
                        CompileError::new("recursive definition!")
                            .indicator(self.location.clone(), "here"),
                    );
                }
                let Some(alias) = ctx.get_alias(name) else {
                    return AstNode::error(
                        self.location_with_origin(),
                        CompileError::new(format!("alias '{name}' does not exist"))
                            .indicator(self.location.clone(), "here"),
                    );
                };
                let AstKind::Alias { value, .. } = alias.kind else {
                    unreachable!("scope entries must be aliases");
                };
                ctx.push_eval(self);
                let output = value.get_type(ctx);
                ctx.pop_eval();
                output
            }
            AstKind::Function { arg, body, .. } => {
                if ctx.is_on_eval_stack(self) {
                    return AstNode::unknown(self.location_with_origin(), None);
                }
                let arg_type_type = arg.ty.get_type(ctx);
                if !arg_type_type.is_type(ctx) {
                    return arg_type_type;
                }
                let mut argument_type = ctx.with_resolve(|ctx| arg.ty.evaluate(ctx));
                if !argument_type.is_type(ctx) {
                    argument_type = builtins.builtin_type("Any").clone();
                }
                ctx.push_scope(vec![make_alias_with_type(
                    arg.location.clone(),
                    &arg.name,
                    argument_type.clone(),
                )]);
                ctx.push_eval(self);
                let result = get_type_from_list(ctx, body);
                ctx.pop_eval();
                ctx.pop_scope();
                match result {
                    Ok(mut types) => {
                        let Some(return_type) = types.pop() else {
                            unreachable!("function bodies are never empty");
                        };
                        AstNode::new(
                            self.location_with_origin(),
                            AstKind::FunctionType {
                                arg_type: Box::new(argument_type),
                                return_type: Box::new(return_type),
                            },
                        )
                    }
                    Err(dead_end) => dead_end,
                }
            }
            AstKind::Call { left, arg } => {
                let left_type = left.get_type(ctx);
                if left_type.is_error() {
                    return left_type;
                }
                if !matches!(left_type.kind, AstKind::FunctionType { .. }) {
                    return AstNode::error(
                        self.location_with_origin(),
                        CompileError::new(format!("can not call type {}", left_type.print()))
                            .indicator(left.location.clone(), "here"),
                    );
                }
                let function_to_call = ctx.with_resolve(|ctx| left.evaluate(ctx));
                let AstKind::Function { arg: fn_arg, .. } = &function_to_call.kind else {
                    // opaque value of function type: fall back to the
                    // declared return type
                    let AstKind::FunctionType { return_type, .. } = &left_type.kind else {
                        unreachable!();
                    };
                    if return_type.is_type(ctx) {
                        return return_type.as_ref().clone();
                    }
                    return builtins.builtin_type("Type").clone();
                };
                let mut fn_arg_type = ctx.with_resolve(|ctx| fn_arg.ty.evaluate(ctx));
                if !fn_arg_type.is_type(ctx) {
                    // same fallback as typing the function literal itself:
                    // an annotation that is not a type means Any
                    fn_arg_type = builtins.builtin_type("Any").clone();
                }
                let actual_arg_type = arg.get_type(ctx);
                if !actual_arg_type.is_type(ctx) {
                    return actual_arg_type;
                }
                if let Some(error) = expect_type(ctx, &fn_arg_type, &actual_arg_type) {
                    let error = error
                        .indicator(self.location.clone(), "for function call here")
                        .indicator(arg.location.clone(), "(this argument)")
                        .indicator(function_to_call.location.clone(), "function from here");
                    return AstNode::error(self.location_with_origin(), error);
                }
                // Evaluating the call can narrow the result type past the
                // declared signature, so type the resolved form when it
                // reduced all the way.
                let resolved = ctx.with_resolve(|ctx| self.evaluate(ctx));
                if resolved.dead_end {
                    let function_type = function_to_call.get_type(ctx);
                    let AstKind::FunctionType { return_type, .. } = &function_type.kind else {
                        unreachable!("function literal did not type as a function type");
                    };
                    if !return_type.is_type(ctx) {
                        unreachable!("function return type is not a type");
                    }
                    return return_type.as_ref().clone();
                }
                let binding = make_unalias_with_type(arg.location.clone(), &fn_arg.name, fn_arg_type);
                ctx.push_scope(vec![binding]);
                let return_type = resolved.get_type(ctx);
                ctx.pop_scope();
                return_type
            }
            AstKind::Operator { .. } => match self.get_as_call(ctx) {
                Ok(call) => call.get_type(ctx),
                Err(dead_end) => dead_end,
            },
            AstKind::MemberAccess { left, name } => {
                let left = ctx.with_resolve(|ctx| left.evaluate(ctx));
                if left.dead_end {
                    return AstNode::unknown(self.location.clone(), None);
                }
                let AstKind::Object(object) = &left.kind else {
                    return AstNode::error(
                        self.location_with_origin(),
                        CompileError::new(format!(
                            "can not access member '{name}' on a non-object value"
                        ))
                        .indicator(self.location.clone(), "here"),
                    );
                };
                let Some(value) = object.get_member(name) else {
                    return AstNode::error(
                        self.location_with_origin(),
                        CompileError::new(format!("member '{name}' does not exist"))
                            .indicator(self.location.clone(), "here"),
                    );
                };
                let value = value.clone();
                value.get_type(ctx)
            }
            AstKind::If {
                condition,
                true_body,
                false_body,
            } => {
                let condition_type = condition.get_type(ctx);
                if !condition_type.is_type(ctx) {
                    return condition_type;
                }
                let bool_type = builtins.builtin_type("Bool");
                if let Some(error) = expect_type(ctx, bool_type, &condition_type) {
                    return AstNode::error(
                        self.location_with_origin(),
                        error.indicator(condition.location.clone(), "here"),
                    );
                }
                // a branch whose type is still unknown defers to the other
                // branch; only hard errors stop the check
                let true_type = match get_type_from_list(ctx, true_body) {
                    Ok(mut types) => match types.pop() {
                        Some(ty) => ty,
                        None => unreachable!("if bodies are never empty"),
                    },
                    Err(dead_end) => {
                        if dead_end.is_error() {
                            return dead_end;
                        }
                        dead_end
                    }
                };
                let false_type = match get_type_from_list(ctx, false_body) {
                    Ok(mut types) => match types.pop() {
                        Some(ty) => ty,
                        None => unreachable!("if bodies are never empty"),
                    },
                    Err(dead_end) => {
                        if dead_end.is_error() {
                            return dead_end;
                        }
                        dead_end
                    }
                };
                if true_type.is_unknown() && false_type.is_unknown() {
                    return AstNode::error(
                        self.location_with_origin(),
                        CompileError::new("can not determine the type of this if expression")
                            .indicator(self.location.clone(), "here"),
                    );
                }
                if true_type.is_unknown() {
                    return false_type;
                }
                if false_type.is_unknown() {
                    return true_type;
                }
                if let Some(error) = expect_type(ctx, &true_type, &false_type) {
                    let true_location = body_end_location(true_body);
                    let false_location = body_end_location(false_body);
                    let error = error
                        .indicator(
                            true_location,
                            format!("expected same type as trueBody ({})", true_type.print()),
                        )
                        .indicator(
                            false_location,
                            format!("but got type {}", false_type.print()),
                        );
                    return AstNode::error(self.location_with_origin(), error);
                }
                true_type
            }
            AstKind::BuiltinTask(task) => (task.type_fn.as_ref())(ctx),
            AstKind::Error(_) => self.clone(),
            AstKind::Unknown(ty) => match ty {
                Some(ty) => ty.as_ref().clone(),
                None => AstNode::unknown(self.location.clone(), None),
            },
            AstKind::Command(_) => {
                unreachable!("commands are handled by the module driver")
            }
        }
    }
}

/// A short human name for a type in messages: the last segment of a named
/// object's dotted name, or the printed form.
pub(crate) fn describe_type(node: &AstNode) -> String {
    if let AstKind::Object(object) = &node.kind {
        if !object.name.is_empty() {
            if let Some(last) = object.name.rsplit('.').next() {
                return last.to_string();
            }
        }
    }
    node.print()
}

/// Unifies an actual type against an expected one. `None` means they are
/// compatible; `Some` carries the mismatch diagnostic without indicators.
pub fn expect_type(
    ctx: &BuilderContext,
    expected: &AstNode,
    actual: &AstNode,
) -> Option<CompileError> {
    let any_type = ctx.builtins.builtin_type("Any");
    if expected.type_equals(any_type) || actual.type_equals(any_type) {
        return None;
    }
    // a value typed as the builtin Function accepts any function type
    let function_type = ctx.builtins.builtin_type("Function");
    if expected.type_equals(function_type) && matches!(actual.kind, AstKind::FunctionType { .. }) {
        return None;
    }
    match (&expected.kind, &actual.kind) {
        (
            AstKind::FunctionType {
                arg_type: expected_arg,
                return_type: expected_return,
            },
            AstKind::FunctionType {
                arg_type: actual_arg,
                return_type: actual_return,
            },
        ) => {
            if expect_type(ctx, expected_arg, actual_arg).is_some()
                || expect_type(ctx, expected_return, actual_return).is_some()
            {
                return Some(mismatch(expected, actual));
            }
            None
        }
        (AstKind::Object(_), AstKind::Object(_)) => {
            if expected.type_equals(actual) {
                None
            } else {
                Some(mismatch(expected, actual))
            }
        }
        _ => Some(mismatch(expected, actual)),
    }
}

fn mismatch(expected: &AstNode, actual: &AstNode) -> CompileError {
    CompileError::new(format!(
        "expected type {}, but got type {}",
        describe_type(expected),
        describe_type(actual)
    ))
}

/// A scope binding of `name` to an Unknown of the given type.
pub fn make_alias_with_type(location: Location, name: &str, ty: AstNode) -> AstNode {
    let value = AstNode::unknown(location.clone(), Some(ty));
    AstNode::alias(location, name, value, false)
}

fn make_unalias_with_type(location: Location, name: &str, ty: AstNode) -> AstNode {
    let value = AstNode::unknown(location.clone(), Some(ty));
    AstNode::alias(location, name, value, true)
}

fn body_end_location(body: &[AstNode]) -> Location {
    match body.last() {
        Some(node) => node.location.clone(),
        None => Location::Builtin,
    }
}

/// Types a node sequence with the sequence itself in scope, stopping at
/// the first dead end.
pub fn get_type_from_list(
    ctx: &mut BuilderContext,
    nodes: &[AstNode],
) -> Result<Vec<AstNode>, AstNode> {
    ctx.push_scope(nodes.to_vec());
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        let value = node.get_type(ctx);
        if !value.is_type(ctx) {
            ctx.pop_scope();
            return Err(value);
        }
        out.push(value);
    }
    ctx.pop_scope();
    Ok(out)
}
