//! The AST node family. One closed union carries the whole pipeline: a
//! node knows how to print itself, report its type and evaluate itself,
//! and partially evaluated output is again made of these nodes.

mod eval;
mod print;
mod typecheck;

use std::fmt;
use std::sync::Arc;

use crate::ctx::BuilderContext;
use crate::diagnostics::CompileError;
use crate::span::{Location, NodeId, Span};

pub use eval::evaluate_list;
pub use typecheck::{expect_type, get_type_from_list, make_alias_with_type};

/// Binary operators with their parse precedence. `=` is the alias form,
/// `.` the member access form; the rest desugar to member calls.
pub const OPERATOR_PRECEDENCE: &[(&str, u8)] = &[
    ("=", 1),
    ("||", 2),
    ("&&", 3),
    ("==", 4),
    ("!=", 4),
    ("<=", 4),
    (">=", 4),
    ("<", 4),
    (">", 4),
    ("+", 5),
    ("-", 5),
    ("*", 6),
    ("/", 6),
    ("%", 6),
    (".", 8),
];

pub fn operator_precedence(text: &str) -> Option<u8> {
    OPERATOR_PRECEDENCE
        .iter()
        .find(|(op, _)| *op == text)
        .map(|(_, prec)| *prec)
}

pub fn is_operator_text(text: &str) -> bool {
    operator_precedence(text).is_some()
}

#[derive(Debug, Clone)]
pub struct AstNode {
    /// Occurrence identity, preserved by `Clone`. See [`NodeId`].
    pub id: NodeId,
    pub location: Location,
    /// A dead end is a value evaluation could not finish: an `Error`, an
    /// `Unknown`, or any node left symbolic because an input was one.
    pub dead_end: bool,
    /// The printed name of the last alias this value was resolved out of,
    /// kept for diagnostics.
    pub last_alias_name: Option<String>,
    pub kind: AstKind,
}

#[derive(Debug, Clone)]
pub enum AstKind {
    Bool(bool),
    Number(f64),
    String(String),
    Object(ObjectNode),
    FunctionType {
        arg_type: Box<AstNode>,
        return_type: Box<AstNode>,
    },
    Alias {
        left: Box<AstNode>,
        value: Box<AstNode>,
        /// When true, resolving an identifier through this alias always
        /// substitutes the value, whatever the resolve mode.
        unalias: bool,
    },
    Identifier(String),
    Function {
        arg: Argument,
        body: Vec<AstNode>,
        /// Builtin curried functions set this so a partial application
        /// with a dead-end argument stays symbolic instead of splicing.
        only_resolve_on_full_call: bool,
    },
    Call {
        left: Box<AstNode>,
        arg: Box<AstNode>,
    },
    Operator {
        text: String,
        left: Box<AstNode>,
        right: Box<AstNode>,
    },
    MemberAccess {
        left: Box<AstNode>,
        name: String,
    },
    If {
        condition: Box<AstNode>,
        true_body: Vec<AstNode>,
        false_body: Vec<AstNode>,
    },
    BuiltinTask(TaskNode),
    /// A hard failure. Carries its diagnostic once; clones of an already
    /// reported error carry `None`.
    Error(Option<CompileError>),
    /// A soft dead end, optionally remembering the type it would have had.
    Unknown(Option<Box<AstNode>>),
    Command(String),
}

/// A function parameter: name plus (unevaluated) type expression.
#[derive(Debug, Clone)]
pub struct Argument {
    pub location: Location,
    pub name: String,
    pub ty: Box<AstNode>,
}

/// An object literal value. Members are alias nodes, looked up by the
/// printed name of their left side.
#[derive(Debug, Clone)]
pub struct ObjectNode {
    pub name: String,
    pub prototype: Option<Box<AstNode>>,
    pub members: Vec<AstNode>,
}

impl ObjectNode {
    pub fn new(name: impl Into<String>, prototype: Option<AstNode>) -> ObjectNode {
        ObjectNode {
            name: name.into(),
            prototype: prototype.map(Box::new),
            members: Vec::new(),
        }
    }

    /// The *value* of the member alias with this name, if present.
    pub fn get_member(&self, name: &str) -> Option<&AstNode> {
        self.members.iter().find_map(|member| match &member.kind {
            AstKind::Alias { left, value, .. } if left.print() == name => Some(value.as_ref()),
            _ => None,
        })
    }

    pub fn add_member(&mut self, name: &str, value: AstNode) {
        let mut value = value;
        value.last_alias_name = Some(name.to_string());
        self.members
            .push(AstNode::alias(Location::Builtin, name, value, false));
    }

    pub fn set_member(&mut self, name: &str, value: AstNode) {
        for member in &mut self.members {
            if let AstKind::Alias { left, value: slot, .. } = &mut member.kind {
                if left.print() == name {
                    *slot = Box::new(value);
                    return;
                }
            }
        }
        self.add_member(name, value);
    }
}

/// Outcome of running a builtin task: either a finished value, or the task
/// could not complete yet because a dependency is still symbolic.
pub enum TaskOutcome {
    Pending,
    Done(AstNode),
}

pub type TaskTypeFn = Arc<dyn Fn(&mut BuilderContext) -> AstNode + Send + Sync>;
pub type TaskEvalFn = Arc<dyn Fn(&mut BuilderContext, &TaskNode) -> TaskOutcome + Send + Sync>;

/// A builtin operation embedded in the tree. Dependencies are ordinary
/// nodes (usually identifiers naming the enclosing function's parameters)
/// that get re-evaluated each time the task is reached.
#[derive(Clone)]
pub struct TaskNode {
    pub codegen_id: String,
    pub dependencies: Vec<TaskDependency>,
    pub type_fn: TaskTypeFn,
    pub eval_fn: TaskEvalFn,
}

#[derive(Debug, Clone)]
pub struct TaskDependency {
    pub name: String,
    pub value: AstNode,
}

impl TaskNode {
    pub fn dependency(&self, name: &str) -> Option<&AstNode> {
        self.dependencies
            .iter()
            .find(|dep| dep.name == name)
            .map(|dep| &dep.value)
    }
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskNode")
            .field("codegen_id", &self.codegen_id)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl AstNode {
    pub fn new(location: Location, kind: AstKind) -> AstNode {
        let dead_end = matches!(kind, AstKind::Error(_) | AstKind::Unknown(_));
        AstNode {
            id: NodeId::next(),
            location,
            dead_end,
            last_alias_name: None,
            kind,
        }
    }

    /// A fresh node standing in for this one after a reduction step: same
    /// location, new occurrence identity.
    pub fn rebuilt(&self, kind: AstKind) -> AstNode {
        AstNode::new(self.location.clone(), kind)
    }

    pub fn bool(location: Location, value: bool) -> AstNode {
        AstNode::new(location, AstKind::Bool(value))
    }

    pub fn number(location: Location, value: f64) -> AstNode {
        AstNode::new(location, AstKind::Number(value))
    }

    pub fn string(location: Location, value: impl Into<String>) -> AstNode {
        AstNode::new(location, AstKind::String(value.into()))
    }

    pub fn identifier(location: Location, name: impl Into<String>) -> AstNode {
        AstNode::new(location, AstKind::Identifier(name.into()))
    }

    pub fn alias(location: Location, name: &str, value: AstNode, unalias: bool) -> AstNode {
        let left = AstNode::identifier(location.clone(), name);
        AstNode::new(
            location,
            AstKind::Alias {
                left: Box::new(left),
                value: Box::new(value),
                unalias,
            },
        )
    }

    pub fn error(location: Location, diagnostic: CompileError) -> AstNode {
        AstNode::new(location, AstKind::Error(Some(diagnostic)))
    }

    pub fn unknown(location: Location, ty: Option<AstNode>) -> AstNode {
        AstNode::new(location, AstKind::Unknown(ty.map(Box::new)))
    }

    pub fn with_dead_end(mut self, dead_end: bool) -> AstNode {
        self.dead_end = dead_end;
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, AstKind::Error(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.kind, AstKind::Unknown(_))
    }

    /// The alias name of this node if it is an alias.
    pub fn alias_name(&self) -> Option<String> {
        match &self.kind {
            AstKind::Alias { left, .. } => Some(left.print()),
            _ => None,
        }
    }

    /// A location pointing at this node's span but remembering the node
    /// itself as the origin of whatever replaces it.
    pub fn location_with_origin(&self) -> Location {
        match &self.location {
            Location::Builtin => Location::Builtin,
            Location::Source(span) => {
                let mut span: Span = span.clone();
                span.origin = Some(Arc::new(self.clone()));
                Location::Source(span)
            }
        }
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print())
    }
}

pub fn has_dead_end(nodes: &[&AstNode]) -> bool {
    nodes.iter().any(|node| node.dead_end)
}
