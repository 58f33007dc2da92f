use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::ast::AstNode;

/// Process-unique identity of a node *occurrence*.
///
/// Ids are assigned at construction and preserved by `Clone`, so a clone is
/// "the same occurrence" while a freshly built node never is. Builtin nodes
/// (which have no source span) are compared on the eval stack by this id;
/// source nodes are compared by span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    pub fn next() -> NodeId {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        NodeId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Where a node came from: a fixed builtin, or a concrete source span.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Builtin,
    Source(Span),
}

impl Location {
    /// Occurrence equality for cycle detection: same file, line and columns.
    /// Always false when either side is builtin (builtins compare by id).
    pub fn same_span(&self, other: &Location) -> bool {
        match (self, other) {
            (Location::Source(a), Location::Source(b)) => a.same_span(b),
            _ => false,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Location::Builtin)
    }

    pub fn span(&self) -> Option<&Span> {
        match self {
            Location::Builtin => None,
            Location::Source(span) => Some(span),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Builtin => write!(f, "builtin"),
            Location::Source(span) => write!(f, "{}:{}", span.path, span.line),
        }
    }
}

/// A concrete source span. `origin` optionally records the node a reduced
/// value was produced from (e.g. the call site a result was spliced into)
/// and never participates in equality.
#[derive(Clone)]
pub struct Span {
    pub path: Arc<str>,
    pub line: u32,
    pub start_column: u32,
    pub end_column: u32,
    pub indentation: u32,
    pub origin: Option<Arc<AstNode>>,
}

impl Span {
    pub fn new(path: impl Into<Arc<str>>, line: u32, start_column: u32, end_column: u32) -> Span {
        Span {
            path: path.into(),
            line,
            start_column,
            end_column,
            indentation: 0,
            origin: None,
        }
    }

    pub fn with_indentation(mut self, indentation: u32) -> Span {
        self.indentation = indentation;
        self
    }

    pub fn same_span(&self, other: &Span) -> bool {
        self.path == other.path
            && self.line == other.line
            && self.start_column == other.start_column
            && self.end_column == other.end_column
    }
}

impl PartialEq for Span {
    fn eq(&self, other: &Span) -> bool {
        self.same_span(other)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Span({}:{}:{}-{})",
            self.path, self.line, self.start_column, self.end_column
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(line: u32, start: u32, end: u32) -> Location {
        Location::Source(Span::new("test.iota", line, start, end))
    }

    #[test]
    fn same_span_ignores_origin_and_indentation() {
        let a = span(1, 2, 5);
        let b = Location::Source(Span::new("test.iota", 1, 2, 5).with_indentation(4));
        assert!(a.same_span(&b));
    }

    #[test]
    fn builtin_never_matches_by_span() {
        assert!(!Location::Builtin.same_span(&Location::Builtin));
        assert!(!span(1, 1, 1).same_span(&Location::Builtin));
    }

    #[test]
    fn node_ids_are_unique() {
        assert_ne!(NodeId::next(), NodeId::next());
    }
}
