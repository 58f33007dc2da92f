//! Recursive descent parser. Blocks are delimited by indentation: an
//! expression list ends when a token starts a new line with less
//! indentation than the block requires, or at an explicit closing
//! separator. Application is juxtaposition (`f x`) and only continues on
//! the same line; binary operators are parsed by precedence climbing over
//! [`iota_core::ast::OPERATOR_PRECEDENCE`].

use tracing::debug;

use iota_core::ast::{operator_precedence, Argument, AstKind, AstNode, ObjectNode};
use iota_core::diagnostics::CompileError;
use iota_core::span::Location;

use crate::lexer::{Token, TokenKind};

/// Parses a full token stream into a list of top level nodes.
pub fn parse(tokens: &[Token]) -> Result<Vec<AstNode>, CompileError> {
    let mut state = ParseState::new(tokens);
    let nodes = parse_block(&mut state, 0, None)?;
    if let Some(next) = state.peek().cloned() {
        return Err(
            CompileError::new(format!("unexpected '{}'", next.text))
                .indicator(next.location, "nothing is open here"),
        );
    }
    debug!(target: "parse", "parsed {} top level nodes", nodes.len());
    Ok(nodes)
}

struct ParseState<'t> {
    tokens: &'t [Token],
    i: usize,
}

impl<'t> ParseState<'t> {
    fn new(tokens: &'t [Token]) -> ParseState<'t> {
        ParseState { tokens, i: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        let mut i = self.i;
        let mut seen = 0;
        while let Some(token) = self.tokens.get(i) {
            if token.kind != TokenKind::Comment {
                if seen == n {
                    return Some(token);
                }
                seen += 1;
            }
            i += 1;
        }
        None
    }

    fn advance(&mut self) -> Option<Token> {
        while let Some(token) = self.tokens.get(self.i) {
            self.i += 1;
            if token.kind != TokenKind::Comment {
                return Some(token.clone());
            }
        }
        None
    }

    /// Line of the most recently consumed token, 0 before the first one.
    fn prev_line(&self) -> u32 {
        self.tokens[..self.i]
            .iter()
            .rev()
            .find(|token| token.kind != TokenKind::Comment)
            .map(|token| token.end_line)
            .unwrap_or(0)
    }

    fn last_location(&self) -> Location {
        self.tokens[..self.i]
            .iter()
            .next_back()
            .map(|token| token.location.clone())
            .unwrap_or(Location::Builtin)
    }
}

fn expect_kind(
    state: &mut ParseState,
    kind: TokenKind,
    text: &str,
    what: &str,
) -> Result<Token, CompileError> {
    match state.advance() {
        Some(token) if token.kind == kind && token.text == text => Ok(token),
        Some(token) => Err(CompileError::new(format!(
            "expected {what} but got '{}'",
            token.text
        ))
        .indicator(token.location, "here")),
        None => Err(
            CompileError::new(format!("expected {what} but got the end of the file"))
                .indicator(state.last_location(), "file ends after this"),
        ),
    }
}

fn expect_separator(state: &mut ParseState, text: &str) -> Result<Token, CompileError> {
    expect_kind(state, TokenKind::Separator, text, &format!("'{text}'"))
}

fn expect_word(state: &mut ParseState, text: &str) -> Result<Token, CompileError> {
    expect_kind(state, TokenKind::Word, text, &format!("'{text}'"))
}

fn expect_name(state: &mut ParseState, what: &str) -> Result<Token, CompileError> {
    match state.advance() {
        Some(token) if token.kind == TokenKind::Word => Ok(token),
        Some(token) => Err(CompileError::new(format!(
            "expected {what} but got '{}'",
            token.text
        ))
        .indicator(token.location, "here")),
        None => Err(
            CompileError::new(format!("expected {what} but got the end of the file"))
                .indicator(state.last_location(), "file ends after this"),
        ),
    }
}

fn is_stop_word(token: &Token) -> bool {
    token.kind == TokenKind::Word && (token.text == "then" || token.text == "else")
}

fn is_closing(token: &Token) -> bool {
    token.kind == TokenKind::Separator && matches!(token.text.as_str(), ")" | "}" | "]")
}

/// True when `next` starts a new line with less indentation than the
/// current block requires.
fn cancels_block(state: &ParseState, next: &Token, indentation: u32) -> bool {
    let prev = state.prev_line();
    prev != 0 && next.line() != prev && next.indentation() < indentation
}

fn parse_block(
    state: &mut ParseState,
    indentation: u32,
    end_at: Option<&str>,
) -> Result<Vec<AstNode>, CompileError> {
    let mut nodes = Vec::new();
    loop {
        let Some(next) = state.peek().cloned() else {
            if let Some(end) = end_at {
                return Err(CompileError::new(format!(
                    "expected '{end}' but got the end of the file"
                ))
                .indicator(state.last_location(), "file ends after this"));
            }
            break;
        };
        if is_closing(&next) {
            match end_at {
                Some(end) if next.text == end => {
                    state.advance();
                    break;
                }
                Some(end) => {
                    return Err(CompileError::new(format!(
                        "expected '{end}' but got '{}'",
                        next.text
                    ))
                    .indicator(next.location, "here"));
                }
                // leave it for the enclosing block
                None => break,
            }
        }
        if next.kind == TokenKind::Separator && matches!(next.text.as_str(), ";" | ",") {
            state.advance();
            continue;
        }
        if is_stop_word(&next) || cancels_block(state, &next, indentation) {
            break;
        }
        nodes.push(parse_expression(state, indentation)?);
    }
    Ok(nodes)
}

fn parse_expression(state: &mut ParseState, indentation: u32) -> Result<AstNode, CompileError> {
    let left = parse_application(state, indentation)?;
    parse_operators(state, left, 0, indentation)
}

fn parse_operators(
    state: &mut ParseState,
    mut left: AstNode,
    min_precedence: u8,
    indentation: u32,
) -> Result<AstNode, CompileError> {
    loop {
        let Some(next) = state.peek().cloned() else {
            break;
        };
        if next.kind != TokenKind::Operator {
            break;
        }
        let Some(precedence) = operator_precedence(&next.text) else {
            break;
        };
        if precedence <= min_precedence {
            break;
        }
        state.advance();
        let right = parse_application(state, indentation)?;
        let right = parse_operators(state, right, precedence, indentation)?;
        left = if next.text == "=" {
            AstNode::new(
                next.location.clone(),
                AstKind::Alias {
                    left: Box::new(left),
                    value: Box::new(right),
                    unalias: false,
                },
            )
        } else {
            AstNode::new(
                next.location.clone(),
                AstKind::Operator {
                    text: next.text.clone(),
                    left: Box::new(left),
                    right: Box::new(right),
                },
            )
        };
    }
    Ok(left)
}

/// Parses a primary followed by member accesses and same-line call
/// arguments.
fn parse_application(state: &mut ParseState, indentation: u32) -> Result<AstNode, CompileError> {
    let mut left = parse_primary(state, indentation)?;
    loop {
        let Some(next) = state.peek().cloned() else {
            break;
        };
        if next.kind == TokenKind::Operator && next.text == "." {
            state.advance();
            let name = expect_name(state, "a member name after '.'")?;
            left = AstNode::new(
                next.location.clone(),
                AstKind::MemberAccess {
                    left: Box::new(left),
                    name: name.text,
                },
            );
            continue;
        }
        if next.kind == TokenKind::Operator
            || next.kind == TokenKind::Command
            || is_closing(&next)
            || is_stop_word(&next)
        {
            break;
        }
        if next.kind == TokenKind::Separator && matches!(next.text.as_str(), ";" | ",") {
            break;
        }
        // call by juxtaposition, arguments must stay on the same line
        if next.line() != state.prev_line() {
            break;
        }
        let arg = parse_primary(state, indentation)?;
        left = AstNode::new(
            left.location.clone(),
            AstKind::Call {
                left: Box::new(left),
                arg: Box::new(arg),
            },
        );
    }
    Ok(left)
}

fn parse_primary(state: &mut ParseState, indentation: u32) -> Result<AstNode, CompileError> {
    let Some(token) = state.advance() else {
        return Err(CompileError::new("expected an expression but got the end of the file")
            .indicator(state.last_location(), "file ends after this"));
    };
    let location = token.location.clone();
    let body_indentation = token.indentation() + 1;
    match token.kind {
        TokenKind::Command => Ok(AstNode::new(location, AstKind::Command(token.text))),
        TokenKind::Number => match token.text.parse::<f64>() {
            Ok(value) => Ok(AstNode::number(location, value)),
            Err(_) => Err(CompileError::new(format!(
                "invalid number literal '{}'",
                token.text
            ))
            .indicator(location, "here")),
        },
        TokenKind::String => Ok(AstNode::string(location, token.text)),
        TokenKind::Word => match token.text.as_str() {
            "true" => Ok(AstNode::bool(location, true)),
            "false" => Ok(AstNode::bool(location, false)),
            "if" => parse_if(state, location, body_indentation),
            _ => Ok(AstNode::identifier(location, token.text)),
        },
        TokenKind::Separator => match token.text.as_str() {
            "(" => parse_parenthesized(state, body_indentation),
            "{" => parse_object(state, location, None, body_indentation),
            "@" => parse_function(state, location, body_indentation),
            "\\" => parse_function_type(state, location, body_indentation),
            "#" => {
                let word = expect_name(state, "a name after '#'")?;
                Ok(AstNode::identifier(location, format!("#{}", word.text)))
            }
            other => Err(CompileError::new(format!("unexpected separator '{other}'"))
                .indicator(location, "here")),
        },
        TokenKind::Operator => {
            if token.text == "&" {
                let prototype = match state.peek() {
                    Some(next) if next.kind == TokenKind::Separator && next.text == "{" => None,
                    _ => Some(parse_primary(state, indentation)?),
                };
                expect_separator(state, "{")?;
                return parse_object(state, location, prototype, body_indentation);
            }
            // a leading operator names the operator itself, as in (+)
            Ok(AstNode::identifier(location, token.text))
        }
        TokenKind::Comment => unreachable!("comments are skipped by advance"),
    }
}

fn parse_parenthesized(
    state: &mut ParseState,
    indentation: u32,
) -> Result<AstNode, CompileError> {
    // (+) and friends name the bare operator
    let names_bare_operator = matches!(
        (state.peek_nth(0), state.peek_nth(1)),
        (Some(op), Some(close))
            if op.kind == TokenKind::Operator
                && close.kind == TokenKind::Separator
                && close.text == ")"
    );
    if names_bare_operator {
        if let Some(op) = state.advance() {
            state.advance();
            return Ok(AstNode::identifier(op.location, op.text));
        }
    }
    let node = parse_expression(state, indentation)?;
    expect_separator(state, ")")?;
    Ok(node)
}

fn parse_if(
    state: &mut ParseState,
    location: Location,
    indentation: u32,
) -> Result<AstNode, CompileError> {
    let condition = parse_expression(state, indentation)?;
    let then_token = expect_word(state, "then")?;
    let true_body = parse_block(state, indentation, None)?;
    if true_body.is_empty() {
        return Err(CompileError::new("this if expression has an empty 'then' branch")
            .indicator(then_token.location, "nothing follows this"));
    }
    let else_token = expect_word(state, "else")?;
    let false_body = parse_block(state, indentation, None)?;
    if false_body.is_empty() {
        return Err(CompileError::new("this if expression has an empty 'else' branch")
            .indicator(else_token.location, "nothing follows this"));
    }
    Ok(AstNode::new(
        location,
        AstKind::If {
            condition: Box::new(condition),
            true_body,
            false_body,
        },
    ))
}

fn parse_function(
    state: &mut ParseState,
    location: Location,
    indentation: u32,
) -> Result<AstNode, CompileError> {
    let name = expect_name(state, "an argument name after '@'")?;
    expect_separator(state, "(")?;
    let ty = parse_expression(state, indentation)?;
    expect_separator(state, ")")?;
    let body = parse_block(state, indentation, None)?;
    if body.is_empty() {
        return Err(CompileError::new("this function is missing a body")
            .indicator(name.location, "function starts here"));
    }
    Ok(AstNode::new(
        location,
        AstKind::Function {
            arg: Argument {
                location: name.location,
                name: name.text,
                ty: Box::new(ty),
            },
            body,
            only_resolve_on_full_call: false,
        },
    ))
}

fn parse_function_type(
    state: &mut ParseState,
    location: Location,
    indentation: u32,
) -> Result<AstNode, CompileError> {
    expect_separator(state, "(")?;
    let arg_type = parse_expression(state, indentation)?;
    expect_separator(state, ")")?;
    expect_kind(state, TokenKind::Operator, "->", "'->'")?;
    let return_type = parse_application(state, indentation)?;
    Ok(AstNode::new(
        location,
        AstKind::FunctionType {
            arg_type: Box::new(arg_type),
            return_type: Box::new(return_type),
        },
    ))
}

fn parse_object(
    state: &mut ParseState,
    location: Location,
    prototype: Option<AstNode>,
    indentation: u32,
) -> Result<AstNode, CompileError> {
    let members = parse_block(state, indentation, Some("}"))?;
    for member in &members {
        if !matches!(member.kind, AstKind::Alias { .. }) {
            return Err(
                CompileError::new("object members must be aliases, like 'name = value'")
                    .indicator(member.location.clone(), "this member has no name"),
            );
        }
    }
    Ok(AstNode::new(
        location,
        AstKind::Object(ObjectNode {
            name: String::new(),
            prototype: prototype.map(Box::new),
            members,
        }),
    ))
}
