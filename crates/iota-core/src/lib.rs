//! Core of the iota language: the AST node family (which is at once the
//! syntax tree, the type checker and a partial evaluator), the builder
//! context that threads the staged `ResolveMode` through every operation,
//! and the built-in environment.
//!
//! Nothing in this crate does I/O; file access and report rendering live
//! in `iota-module`, surface syntax in `iota-lang`.

pub mod ast;
pub mod builtins;
pub mod ctx;
pub mod diagnostics;
pub mod error;
mod macros;
pub mod span;

pub use error::{Error, Result};
