use std::fmt;

use crate::span::Location;

/// A user-facing diagnostic: a headline message plus any number of source
/// indicators pointing at the locations that explain it.
///
/// Rendering with source windows lives in `iota-module`; here we only keep
/// the structure and a plain `Display` for logs and engine errors.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub message: String,
    pub indicators: Vec<Indicator>,
}

/// One location annotation attached to a [`CompileError`] or to a
/// top-level evaluation result.
#[derive(Debug, Clone, PartialEq)]
pub struct Indicator {
    pub location: Location,
    pub message: String,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> CompileError {
        CompileError {
            message: message.into(),
            indicators: Vec::new(),
        }
    }

    pub fn indicator(mut self, location: Location, message: impl Into<String>) -> CompileError {
        self.indicators.push(Indicator {
            location,
            message: message.into(),
        });
        self
    }
}

impl Indicator {
    pub fn new(location: Location, message: impl Into<String>) -> Indicator {
        Indicator {
            location,
            message: message.into(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for indicator in &self.indicators {
            write!(f, "\n  at {}: {}", indicator.location, indicator.message)?;
        }
        Ok(())
    }
}
