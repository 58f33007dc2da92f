//! Surface syntax for iota: the lexer and the recursive descent parser
//! producing `iota-core` AST nodes. Parse failures are `CompileError`
//! values, never panics.

pub mod lexer;
pub mod parser;

use iota_core::ast::AstNode;
use iota_core::diagnostics::CompileError;

/// Lexes and parses a whole source text.
pub fn parse_source(path: &str, text: &str) -> Result<Vec<AstNode>, CompileError> {
    let tokens = lexer::lex(path, text);
    parser::parse(&tokens)
}
