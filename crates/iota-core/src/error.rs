use std::result;

use thiserror::Error;

use crate::diagnostics::CompileError;

/// Engine-level failures. User-facing type errors are never this enum;
/// they travel through the tree as `AstKind::Error` nodes carrying a
/// [`CompileError`] diagnostic.
#[derive(Error, Debug)]
pub enum Error {
    #[error("compile error: {0}")]
    Compile(CompileError),
    #[error("generic error: {0}")]
    Generic(String),
}

pub type Result<T> = result::Result<T, Error>;

impl From<eyre::Report> for Error {
    fn from(err: eyre::Report) -> Self {
        Error::Generic(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Generic(e.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Generic(s)
    }
}

impl From<CompileError> for Error {
    fn from(e: CompileError) -> Self {
        Error::Compile(e)
    }
}
