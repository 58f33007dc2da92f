//! Diagnostic rendering. Plain output is one `path:line -> message` line
//! per indicator; fancy output shows a source window with the span
//! underlined.

use std::collections::HashMap;
use std::sync::Arc;

use iota_core::diagnostics::{CompileError, Indicator};
use iota_core::span::Location;

const LINE_NUMBER_WIDTH: usize = 4;
const WINDOW_SIZE: u32 = 2;
const BEFORE_MARKER: char = '-';
const UNDER_MARKER: char = '^';
const COLOR_RED: &str = "\x1B[31m";
const COLOR_RESET: &str = "\x1B[0m";

/// Source text keyed by path, so rendering two indicators into the same
/// file does not read it twice.
#[derive(Debug, Default)]
pub struct SourceCache {
    files: HashMap<Arc<str>, String>,
}

impl SourceCache {
    pub fn new() -> SourceCache {
        SourceCache::default()
    }

    pub fn insert(&mut self, path: &str, text: impl Into<String>) {
        self.files.insert(Arc::from(path), text.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }
}

/// Renders one indicator. `start_at_next_line` puts the message on its own
/// line under the markers, for multi-line messages.
pub fn indicator_text(
    indicator: &Indicator,
    print_path: bool,
    fancy: bool,
    start_at_next_line: bool,
    sources: &SourceCache,
) -> String {
    let Location::Source(span) = &indicator.location else {
        return if fancy {
            "at builtin\n\n".into()
        } else {
            format!("builtin -> {}", indicator.message)
        };
    };
    if !fancy {
        return if print_path {
            format!("{}:{} -> {}", span.path, span.line, indicator.message)
        } else {
            format!("line:{} -> {}", span.line, indicator.message)
        };
    }
    let Some(text) = sources.get(&span.path) else {
        // no cached source, degrade to the plain form
        return format!("at {}:{} -> {}", span.path, span.line, indicator.message);
    };

    let mut out = if print_path {
        format!("at {}:{}\n", span.path, span.line)
    } else {
        format!("{}\n", span.line)
    };
    for (index, line_text) in text.lines().enumerate() {
        let line = index as u32 + 1;
        if line + WINDOW_SIZE < span.line || line > span.line + WINDOW_SIZE {
            continue;
        }
        let mut rendered = format!("{:0>width$} |", line, width = LINE_NUMBER_WIDTH);
        let mut marker_offset = rendered.chars().count();
        for (column, c) in line_text.chars().enumerate() {
            if c == '\t' {
                rendered.push_str("    ");
            } else {
                rendered.push(c);
            }
            if column as u32 + 1 == span.start_column {
                marker_offset = rendered.chars().count() - 1;
            }
        }
        out.push_str(&rendered);
        out.push('\n');
        if line == span.line {
            for _ in 0..marker_offset {
                out.push(BEFORE_MARKER);
            }
            let width = span.end_column.saturating_sub(span.start_column) + 1;
            for _ in 0..width {
                out.push(UNDER_MARKER);
            }
            let mut tail = String::new();
            tail.push(if start_at_next_line { '\n' } else { ' ' });
            tail.push_str(&indicator.message);
            if start_at_next_line {
                tail = tail.replace('\n', "\n ");
            }
            out.push_str(&tail);
            out.push('\n');
        }
    }
    out.push('\n');
    out
}

/// Renders a whole error: headline plus every source indicator.
pub fn error_text(
    error: &CompileError,
    print_path: bool,
    fancy: bool,
    sources: &SourceCache,
) -> String {
    let mut text = String::new();
    if fancy {
        text.push_str(COLOR_RED);
    }
    text.push_str(&format!("error: {}\n", error.message));
    if fancy {
        text.push_str(COLOR_RESET);
    }
    for (i, indicator) in error.indicators.iter().enumerate() {
        if indicator.location.is_builtin() {
            continue;
        }
        text.push_str(&indicator_text(indicator, print_path, fancy, false, sources));
        if !fancy && i + 1 < error.indicators.len() {
            text.push('\n');
        }
    }
    text
}

/// Drops errors whose plain rendering matches a later error, keeping the
/// last occurrence of each.
pub fn remove_duplicate_errors(
    errors: &[CompileError],
    sources: &SourceCache,
) -> Vec<CompileError> {
    errors
        .iter()
        .enumerate()
        .filter(|(i, error)| {
            let rendered = error_text(error, false, false, sources);
            !errors[i + 1..]
                .iter()
                .any(|other| error_text(other, false, false, sources) == rendered)
        })
        .map(|(_, error)| error.clone())
        .collect()
}
