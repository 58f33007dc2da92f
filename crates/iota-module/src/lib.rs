//! The module driver: top level definitions, the eval queue, command
//! handling, diagnostic rendering and on-disk persistence.

pub mod module;
pub mod persist;
pub mod report;

pub use module::{Module, ModuleImport, TopLevelDef, PATH_SEPARATOR};
pub use report::SourceCache;
