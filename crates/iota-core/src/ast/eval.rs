//! Partial evaluation. `evaluate` always terminates and always returns a
//! node: a fully reduced value, a residual expression with evaluated
//! children, or a dead end. It never produces `Error` nodes of its own;
//! reaching a state the type checker should have rejected is a panic.

use tracing::debug;

use super::{AstKind, AstNode, Argument, TaskDependency, TaskNode, TaskOutcome};
use crate::ctx::BuilderContext;
use crate::diagnostics::CompileError;

impl AstNode {
    pub fn evaluate(&self, ctx: &mut BuilderContext) -> AstNode {
        match &self.kind {
            AstKind::Bool(_)
            | AstKind::Number(_)
            | AstKind::String(_)
            | AstKind::Error(_)
            | AstKind::Unknown(_) => self.clone(),
            AstKind::Object(object) => {
                if ctx.is_on_eval_stack(self) {
                    return self.clone();
                }
                ctx.push_scope(object.members.clone());
                ctx.push_eval(self);
                let mut members = Vec::with_capacity(object.members.len());
                for member in &object.members {
                    let AstKind::Alias { left, value, unalias } = &member.kind else {
                        unreachable!("object members must be aliases");
                    };
                    let value = value.evaluate(ctx);
                    members.push(member.rebuilt(AstKind::Alias {
                        left: left.clone(),
                        value: Box::new(value),
                        unalias: *unalias,
                    }));
                }
                ctx.pop_eval();
                ctx.pop_scope();
                let prototype = match &object.prototype {
                    // a prototype written as a name reduces to the object
                    // it refers to; keep the written form on a dead end
                    Some(prototype) if !matches!(prototype.kind, AstKind::Object(_)) => {
                        let value = ctx.with_resolve(|ctx| prototype.evaluate(ctx));
                        Some(Box::new(if value.dead_end {
                            (**prototype).clone()
                        } else {
                            value
                        }))
                    }
                    other => other.clone(),
                };
                let mut out = self.rebuilt(AstKind::Object(super::ObjectNode {
                    name: object.name.clone(),
                    prototype,
                    members,
                }));
                out.last_alias_name = self.last_alias_name.clone();
                out
            }
            AstKind::FunctionType {
                arg_type,
                return_type,
            } => {
                let arg_type = arg_type.evaluate(ctx);
                let return_type = return_type.evaluate(ctx);
                self.rebuilt(AstKind::FunctionType {
                    arg_type: Box::new(arg_type),
                    return_type: Box::new(return_type),
                })
            }
            AstKind::Alias {
                left,
                value,
                unalias,
            } => {
                let mut value = ctx.with_resolve(|ctx| value.evaluate(ctx));
                value.last_alias_name = Some(left.print());
                self.rebuilt(AstKind::Alias {
                    left: left.clone(),
                    value: Box::new(value),
                    unalias: *unalias,
                })
            }
            AstKind::Identifier(name) => {
                let Some(alias) = ctx.get_alias(name) else {
                    unreachable!("unresolved identifier '{name}' reached evaluate");
                };
                let AstKind::Alias { value, unalias, .. } = alias.kind else {
                    unreachable!("scope entries must be aliases");
                };
                let value = value.evaluate(ctx);
                if ctx.resolve.force_resolve() {
                    return value;
                }
                if value.dead_end {
                    return self.rebuilt(AstKind::Identifier(name.clone())).with_dead_end(true);
                }
                if ctx.resolve.do_resolve() || unalias {
                    debug!(target: "resolve", "resolved {name} to {}", value.print());
                    return value;
                }
                self.rebuilt(AstKind::Identifier(name.clone())).with_dead_end(true)
            }
            AstKind::Function {
                arg,
                body,
                only_resolve_on_full_call,
            } => {
                // self-application during this occurrence's own body
                if ctx.is_on_eval_stack(self) {
                    return AstNode::unknown(self.location_with_origin(), None);
                }
                let argument_type = ctx.with_resolve(|ctx| arg.ty.evaluate(ctx));
                let arg_value = if argument_type.is_type(ctx) {
                    AstNode::unknown(arg.location.clone(), Some(argument_type.clone()))
                } else {
                    AstNode::unknown(arg.location.clone(), None)
                };
                ctx.push_scope(vec![AstNode::alias(
                    arg.location.clone(),
                    &arg.name,
                    arg_value,
                    false,
                )]);
                let saved_set_unalias = ctx.set_unalias;
                ctx.set_unalias = false;
                ctx.push_eval(self);
                let body = evaluate_list(ctx, body);
                ctx.pop_eval();
                ctx.set_unalias = saved_set_unalias;
                ctx.pop_scope();
                self.rebuilt(AstKind::Function {
                    arg: Argument {
                        location: arg.location.clone(),
                        name: arg.name.clone(),
                        ty: Box::new(argument_type),
                    },
                    body,
                    only_resolve_on_full_call: *only_resolve_on_full_call,
                })
            }
            AstKind::Call { left, arg } => {
                let mut function_to_call = left.evaluate(ctx);
                let mut arg_value = arg.evaluate(ctx);
                let mut resolve = ctx.resolve.do_resolve();
                let has_dead_end = function_to_call.dead_end || arg_value.dead_end;
                {
                    // late type-driven specialization: a type-valued
                    // argument forces the callee open even under weaker
                    // modes
                    let resolved_arg = ctx.with_resolve(|ctx| arg.evaluate(ctx));
                    if ctx.resolve.resolve_types() && resolved_arg.is_type(ctx) {
                        resolve = true;
                        function_to_call = ctx.with_resolve(|ctx| left.evaluate(ctx));
                        arg_value = resolved_arg;
                    }
                }
                if let AstKind::Function {
                    only_resolve_on_full_call: true,
                    ..
                } = &function_to_call.kind
                {
                    if arg_value.dead_end {
                        resolve = false;
                    }
                }
                if !has_dead_end && !ctx.is_on_eval_stack(&function_to_call) {
                    if let AstKind::Function {
                        arg: fn_arg, body, ..
                    } = &function_to_call.kind
                    {
                        let saved_set_unalias = ctx.set_unalias;
                        ctx.set_unalias = true;
                        ctx.push_scope(vec![AstNode::alias(
                            fn_arg.location.clone(),
                            &fn_arg.name,
                            arg_value.clone(),
                            true,
                        )]);
                        if !resolve {
                            ctx.push_eval(&function_to_call);
                        }
                        let mut result_list = evaluate_list(ctx, body);
                        if !resolve {
                            ctx.pop_eval();
                        }
                        ctx.pop_scope();
                        ctx.set_unalias = saved_set_unalias;
                        let Some(mut result) = result_list.pop() else {
                            unreachable!("function bodies are never empty");
                        };
                        if resolve {
                            if !self.location.is_builtin() {
                                result.location = self.location_with_origin();
                            }
                            return result;
                        }
                    }
                }
                debug!(
                    target: "resolve",
                    "call stays symbolic under {:?}: {}",
                    ctx.resolve,
                    function_to_call.print()
                );
                self.rebuilt(AstKind::Call {
                    left: Box::new(function_to_call),
                    arg: Box::new(arg_value),
                })
                .with_dead_end(has_dead_end)
            }
            AstKind::Operator { text, left, right } => match self.get_as_call(ctx) {
                Ok(call) => call.evaluate(ctx),
                Err(dead_end) => {
                    if dead_end.is_error() {
                        return dead_end;
                    }
                    let left = left.evaluate(ctx);
                    let right = right.evaluate(ctx);
                    self.rebuilt(AstKind::Operator {
                        text: text.clone(),
                        left: Box::new(left),
                        right: Box::new(right),
                    })
                    .with_dead_end(true)
                }
            },
            AstKind::MemberAccess { left, name } => {
                let left = left.evaluate(ctx);
                if left.dead_end {
                    let dead_end = ctx.resolve.do_resolve();
                    return self
                        .rebuilt(AstKind::MemberAccess {
                            left: Box::new(left),
                            name: name.clone(),
                        })
                        .with_dead_end(dead_end);
                }
                let AstKind::Object(object) = &left.kind else {
                    unreachable!("member access on non-object {}", left.print());
                };
                let Some(value) = object.get_member(name) else {
                    unreachable!("member '{name}' missing from {}", left.print());
                };
                value.clone()
            }
            AstKind::If {
                condition,
                true_body,
                false_body,
            } => {
                let condition = condition.evaluate(ctx);
                let AstKind::Bool(condition_value) = condition.kind else {
                    let dead_end = condition.dead_end;
                    let true_body = evaluate_list(ctx, true_body);
                    let false_body = evaluate_list(ctx, false_body);
                    return self
                        .rebuilt(AstKind::If {
                            condition: Box::new(condition),
                            true_body,
                            false_body,
                        })
                        .with_dead_end(dead_end);
                };
                let taken = if condition_value { true_body } else { false_body };
                let mut result_list = evaluate_list(ctx, taken);
                match result_list.pop() {
                    Some(result) => result,
                    None => unreachable!("if bodies are never empty"),
                }
            }
            AstKind::BuiltinTask(task) => match (task.eval_fn.as_ref())(ctx, task) {
                TaskOutcome::Done(node) => node,
                TaskOutcome::Pending => {
                    let mut dependencies = Vec::with_capacity(task.dependencies.len());
                    for dependency in &task.dependencies {
                        let value = dependency.value.evaluate(ctx);
                        // a dependency that went dead keeps its prior
                        // symbolic form
                        let value = if value.dead_end {
                            dependency.value.clone()
                        } else {
                            value
                        };
                        dependencies.push(TaskDependency {
                            name: dependency.name.clone(),
                            value,
                        });
                    }
                    self.rebuilt(AstKind::BuiltinTask(TaskNode {
                        codegen_id: task.codegen_id.clone(),
                        dependencies,
                        type_fn: task.type_fn.clone(),
                        eval_fn: task.eval_fn.clone(),
                    }))
                }
            },
            AstKind::Command(_) => {
                unreachable!("commands are handled by the module driver")
            }
        }
    }

    /// Lowers `a op b` to `((typeof a).op a) b`. `Err` carries either an
    /// error (operator unusable) or an unknown (left type not yet known).
    pub(crate) fn get_as_call(&self, ctx: &mut BuilderContext) -> Result<AstNode, AstNode> {
        let AstKind::Operator { text, left, right } = &self.kind else {
            unreachable!("get_as_call on a non-operator node");
        };
        let left_type = left.get_type(ctx);
        if left_type.is_error() {
            return Err(left_type);
        }
        let AstKind::Object(object) = &left_type.kind else {
            if left_type.dead_end {
                return Err(AstNode::unknown(self.location.clone(), None));
            }
            return Err(AstNode::error(
                self.location_with_origin(),
                CompileError::new(format!(
                    "can not use operator '{text}' on type {}",
                    super::typecheck::describe_type(&left_type)
                ))
                .indicator(self.location.clone(), "here"),
            ));
        };
        let operator_fn = match object.get_member(text) {
            Some(member) if matches!(member.kind, AstKind::Function { .. }) => member.clone(),
            _ => {
                return Err(AstNode::error(
                    self.location_with_origin(),
                    CompileError::new(format!(
                        "type {} does not implement operator '{text}'",
                        super::typecheck::describe_type(&left_type)
                    ))
                    .indicator(self.location.clone(), "here"),
                ));
            }
        };
        let inner = AstNode::new(
            self.location.clone(),
            AstKind::Call {
                left: Box::new(operator_fn),
                arg: left.clone(),
            },
        );
        Ok(AstNode::new(
            self.location.clone(),
            AstKind::Call {
                left: Box::new(inner),
                arg: right.clone(),
            },
        ))
    }
}

impl TaskNode {
    /// Evaluates the named dependency in the current context. A missing
    /// name means the builtin table is malformed.
    pub fn eval_dependency(&self, ctx: &mut BuilderContext, name: &str) -> AstNode {
        match self.dependency(name) {
            Some(value) => value.evaluate(ctx),
            None => unreachable!("builtin task has no dependency named '{name}'"),
        }
    }
}

/// Evaluates a node sequence with the sequence itself in scope.
pub fn evaluate_list(ctx: &mut BuilderContext, nodes: &[AstNode]) -> Vec<AstNode> {
    ctx.push_scope(nodes.to_vec());
    let out = nodes.iter().map(|node| node.evaluate(ctx)).collect();
    ctx.pop_scope();
    out
}
