//! Deterministic printing. Printed output is valid surface syntax for
//! everything that has one; internal values print as `__`-bracketed
//! placeholders.

use itertools::Itertools;

use super::{is_operator_text, AstKind, AstNode};
use crate::span::NodeId;

impl AstNode {
    pub fn print(&self) -> String {
        self.print_guarded(&mut Vec::new())
    }

    fn print_guarded(&self, seen: &mut Vec<NodeId>) -> String {
        match &self.kind {
            AstKind::Bool(value) => value.to_string(),
            AstKind::Number(value) => value.to_string(),
            AstKind::String(value) => format!("\"{}\"", escape_string(value)),
            AstKind::Object(object) => {
                if seen.contains(&self.id) {
                    return "__bad__".into();
                }
                seen.push(self.id);
                let prototype = match &object.prototype {
                    Some(prototype) => format!("&({})", prototype.print_guarded(seen)),
                    None => String::new(),
                };
                let text = if object.members.is_empty() {
                    format!("{prototype}{{}}")
                } else {
                    format!("{prototype}{{{}\n}}", join_body(&object.members, seen))
                };
                seen.pop();
                text
            }
            AstKind::FunctionType {
                arg_type,
                return_type,
            } => format!(
                "\\({}) -> {}",
                arg_type.print_guarded(seen),
                return_type.print_guarded(seen)
            ),
            AstKind::Alias { left, value, .. } => format!(
                "{} = {}",
                left.print_guarded(seen),
                value.print_guarded(seen)
            ),
            AstKind::Identifier(name) => {
                if is_operator_text(name) {
                    format!("({name})")
                } else {
                    name.clone()
                }
            }
            AstKind::Function { arg, body, .. } => {
                let header = format!("@{}({})", arg.name, arg.ty.print_guarded(seen));
                let printed = body.iter().map(|node| node.print_guarded(seen)).join("\n");
                let starts_with_function =
                    matches!(body.first().map(|node| &node.kind), Some(AstKind::Function { .. }));
                if starts_with_function || !printed.contains('\n') {
                    format!("{header} {printed}")
                } else {
                    format!("{header}{}", indent_block(&printed))
                }
            }
            AstKind::Call { left, arg } => format!(
                "({} {})",
                left.print_guarded(seen),
                arg.print_guarded(seen)
            ),
            AstKind::Operator { text, left, right } => format!(
                "({} {text} {})",
                left.print_guarded(seen),
                right.print_guarded(seen)
            ),
            AstKind::MemberAccess { left, name } => {
                format!("{}.{name}", left.print_guarded(seen))
            }
            AstKind::If {
                condition,
                true_body,
                false_body,
            } => format!(
                "if {} then{}\nelse{}",
                condition.print_guarded(seen),
                join_body(true_body, seen),
                join_body(false_body, seen)
            ),
            AstKind::BuiltinTask(_) => "__builtinTask__".into(),
            AstKind::Error(diagnostic) => match diagnostic {
                Some(diagnostic) => {
                    format!("__compileError__(\"{}\")", escape_string(&diagnostic.message))
                }
                None => "__compileError__()".into(),
            },
            AstKind::Unknown(ty) => match ty {
                Some(ty) => format!("__unknown__({})", ty.print_guarded(seen)),
                None => "__unknown__()".into(),
            },
            AstKind::Command(text) => format!(">{text}"),
        }
    }
}

/// Prints each node on its own line, indented one tab, with a leading
/// newline. Multi-line node prints stay aligned by indenting every line.
fn join_body(nodes: &[AstNode], seen: &mut Vec<NodeId>) -> String {
    let body = nodes.iter().map(|node| node.print_guarded(seen)).join("\n");
    indent_block(&body)
}

fn indent_block(text: &str) -> String {
    format!("\n{text}").replace('\n', "\n\t")
}

fn escape_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
