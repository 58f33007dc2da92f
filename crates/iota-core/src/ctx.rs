//! The builder context threaded through `get_type` and `evaluate`: the
//! resolve mode, the lexical scope stack and the eval stack used for
//! cycle detection.

use std::sync::Arc;

use crate::ast::{AstKind, AstNode};
use crate::builtins::BuiltinEnv;
use crate::span::{Location, NodeId};

/// How far evaluation is allowed to reduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Leave everything symbolic.
    None,
    /// Resolve only what is needed to compute types.
    Types,
    /// Resolve everything that can be resolved.
    All,
    /// Resolve everything, substituting identifiers even when their value
    /// is a dead end.
    Force,
}

impl ResolveMode {
    pub fn do_resolve(self) -> bool {
        matches!(self, ResolveMode::All | ResolveMode::Force)
    }

    pub fn resolve_types(self) -> bool {
        matches!(self, ResolveMode::Types) || self.do_resolve()
    }

    pub fn force_resolve(self) -> bool {
        matches!(self, ResolveMode::Force)
    }
}

/// One entry of the eval stack. Source nodes are identified by span,
/// builtin nodes (which all share the builtin location) by occurrence id.
#[derive(Debug, Clone)]
struct StackEntry {
    id: NodeId,
    location: Location,
    is_identifier: bool,
}

impl StackEntry {
    fn matches(&self, node: &AstNode) -> bool {
        if self.location.is_builtin() || node.location.is_builtin() {
            self.id == node.id
        } else {
            self.location.same_span(&node.location)
        }
    }
}

pub struct BuilderContext {
    pub builtins: Arc<BuiltinEnv>,
    pub resolve: ResolveMode,
    /// When set, the next function-parameter binding is marked `unalias`
    /// so the argument value substitutes unconditionally.
    pub set_unalias: bool,
    scopes: Vec<Vec<AstNode>>,
    eval_stack: Vec<StackEntry>,
}

impl BuilderContext {
    pub fn new(builtins: Arc<BuiltinEnv>) -> BuilderContext {
        BuilderContext {
            builtins,
            resolve: ResolveMode::All,
            set_unalias: false,
            scopes: Vec::new(),
            eval_stack: Vec::new(),
        }
    }

    /// A context with every builtin member in scope by bare name.
    pub fn with_builtin_scope(builtins: Arc<BuiltinEnv>) -> BuilderContext {
        let mut ctx = BuilderContext::new(builtins);
        let prelude = match &ctx.builtins.root().kind {
            AstKind::Object(object) => object.members.clone(),
            _ => unreachable!("builtin root must be an object"),
        };
        ctx.scopes.push(prelude);
        ctx
    }

    /// Runs `f` under full resolution, restoring the previous mode after.
    pub fn with_resolve<T>(&mut self, f: impl FnOnce(&mut BuilderContext) -> T) -> T {
        self.with_resolve_mode(ResolveMode::All, f)
    }

    pub fn with_resolve_mode<T>(
        &mut self,
        mode: ResolveMode,
        f: impl FnOnce(&mut BuilderContext) -> T,
    ) -> T {
        let saved = self.resolve;
        self.resolve = mode;
        let out = f(self);
        self.resolve = saved;
        out
    }

    pub fn push_scope(&mut self, aliases: Vec<AstNode>) {
        self.scopes.push(aliases);
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Innermost-first alias lookup. `#import` always resolves to the
    /// builtin import function, bypassing the scope stack.
    pub fn get_alias(&self, name: &str) -> Option<AstNode> {
        if name == "#import" {
            let import = self.builtins.get("import")?.clone();
            return Some(AstNode::alias(Location::Builtin, "#import", import, true));
        }
        for scope in self.scopes.iter().rev() {
            for alias in scope.iter().rev() {
                if let AstKind::Alias { left, .. } = &alias.kind {
                    if left.print() == name {
                        return Some(alias.clone());
                    }
                }
            }
        }
        None
    }

    pub fn push_eval(&mut self, node: &AstNode) {
        self.eval_stack.push(StackEntry {
            id: node.id,
            location: node.location.clone(),
            is_identifier: matches!(node.kind, AstKind::Identifier(_)),
        });
    }

    pub fn pop_eval(&mut self) {
        self.eval_stack.pop();
    }

    pub fn is_on_eval_stack(&self, node: &AstNode) -> bool {
        self.eval_stack.iter().any(|entry| entry.matches(node))
    }

    /// True when `node` is on the eval stack with nothing but identifiers
    /// in between, which is how a directly recursive definition looks.
    pub fn is_on_eval_stack_only_identifiers(&self, node: &AstNode) -> bool {
        for entry in self.eval_stack.iter().rev() {
            if entry.matches(node) {
                return true;
            }
            if !entry.is_identifier {
                return false;
            }
        }
        false
    }
}
