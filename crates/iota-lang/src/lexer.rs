//! Tokenizer. Tracks line, column and leading indentation for every token
//! so the parser can do indentation based block canceling, and merges
//! comment lines that sit directly on top of each other into one token.

use iota_core::span::{Location, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A `>name args` line starting in the first column.
    Command,
    Comment,
    Number,
    String,
    Word,
    Separator,
    Operator,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub location: Location,
    /// Last source line this token covers. Only differs from the starting
    /// line for merged comments.
    pub end_line: u32,
}

impl Token {
    pub fn line(&self) -> u32 {
        self.location.span().map(|span| span.line).unwrap_or(0)
    }

    pub fn indentation(&self) -> u32 {
        self.location
            .span()
            .map(|span| span.indentation)
            .unwrap_or(0)
    }
}

const TWO_CHAR_OPERATORS: &[&str] = &["==", "!=", "<=", ">=", "||", "&&", "->"];
const ONE_CHAR_OPERATORS: &[char] = &['>', '<', '=', '+', '-', '*', '/', '%', '.', '&'];
const SEPARATORS: &[char] = &['(', ')', '{', '}', '[', ']', ';', ',', '@', '#', ':', '\\'];

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_word_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Splits `text` into tokens. Lexing never fails: characters that fit no
/// token class are skipped.
pub fn lex(path: &str, text: &str) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut i = 0;
    let mut line: u32 = 1;
    let mut column: u32 = 1;
    let mut indentation: u32 = 0;
    let mut in_margin = true;

    let make_location = |line: u32, start: u32, end: u32, indentation: u32| {
        Location::Source(Span::new(path, line, start, end).with_indentation(indentation))
    };

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            i += 1;
            line += 1;
            column = 1;
            indentation = 0;
            in_margin = true;
            continue;
        }
        if c == ' ' || c == '\t' {
            if in_margin {
                indentation += 1;
            }
            i += 1;
            column += 1;
            continue;
        }
        in_margin = false;
        let start = i;
        let start_column = column;

        // comments before the '/' operator
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            i += 2;
            if chars.get(i) == Some(&' ') {
                i += 1;
            }
            let mut comment = String::new();
            while i < chars.len() && chars[i] != '\n' {
                comment.push(chars[i]);
                i += 1;
            }
            column += (i - start) as u32;
            // a comment directly below another comment extends it
            if let Some(last) = tokens.last_mut() {
                if last.kind == TokenKind::Comment && last.end_line + 1 == line {
                    last.text.push('\n');
                    last.text.push_str(&comment);
                    last.end_line = line;
                    continue;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Comment,
                text: comment,
                location: make_location(line, start_column, start_column, indentation),
                end_line: line,
            });
            continue;
        }

        // commands only exist in the first column
        if c == '>' && start_column == 1 {
            i += 1;
            let mut command = String::new();
            while i < chars.len() && chars[i] != '\n' {
                command.push(chars[i]);
                i += 1;
            }
            column += (i - start) as u32;
            tokens.push(Token {
                kind: TokenKind::Command,
                text: command,
                location: make_location(line, start_column, start_column, indentation),
                end_line: line,
            });
            continue;
        }

        // numbers before the '-' operator so negative literals lex whole
        if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit()))
        {
            let mut number = String::new();
            number.push(c);
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                number.push(chars[i]);
                i += 1;
            }
            column += (i - start) as u32;
            tokens.push(Token {
                kind: TokenKind::Number,
                location: make_location(line, start_column, column - 1, indentation),
                text: number,
                end_line: line,
            });
            continue;
        }

        if c == '"' {
            i += 1;
            let mut string = String::new();
            while i < chars.len() && chars[i] != '"' {
                if chars[i] == '\\' && i + 1 < chars.len() {
                    string.push(match chars[i + 1] {
                        'n' => '\n',
                        't' => '\t',
                        '"' => '"',
                        '\\' => '\\',
                        other => other,
                    });
                    i += 2;
                } else {
                    string.push(chars[i]);
                    i += 1;
                }
            }
            if i < chars.len() {
                i += 1; // closing quote
            }
            column += (i - start) as u32;
            tokens.push(Token {
                kind: TokenKind::String,
                location: make_location(line, start_column, column - 1, indentation),
                text: string,
                end_line: line,
            });
            continue;
        }

        if let Some(two) = chars.get(i..i + 2) {
            let two: String = two.iter().collect();
            if TWO_CHAR_OPERATORS.contains(&two.as_str()) {
                i += 2;
                column += 2;
                tokens.push(Token {
                    kind: TokenKind::Operator,
                    location: make_location(line, start_column, column - 1, indentation),
                    text: two,
                    end_line: line,
                });
                continue;
            }
        }
        if ONE_CHAR_OPERATORS.contains(&c) {
            i += 1;
            column += 1;
            tokens.push(Token {
                kind: TokenKind::Operator,
                text: c.to_string(),
                location: make_location(line, start_column, start_column, indentation),
                end_line: line,
            });
            continue;
        }
        if SEPARATORS.contains(&c) {
            i += 1;
            column += 1;
            tokens.push(Token {
                kind: TokenKind::Separator,
                text: c.to_string(),
                location: make_location(line, start_column, start_column, indentation),
                end_line: line,
            });
            continue;
        }
        if is_word_start(c) {
            let mut word = String::new();
            word.push(c);
            i += 1;
            while i < chars.len() && is_word_part(chars[i]) {
                word.push(chars[i]);
                i += 1;
            }
            column += (i - start) as u32;
            tokens.push(Token {
                kind: TokenKind::Word,
                location: make_location(line, start_column, column - 1, indentation),
                text: word,
                end_line: line,
            });
            continue;
        }

        i += 1;
        column += 1;
    }

    tokens
}
