//! A module: named top level definitions plus everything observed while
//! loading source into it. Definitions type check and evaluate through an
//! eval queue under `ResolveMode::None`, so they keep their symbolic shape
//! until something concrete asks for them.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use iota_core::ast::{AstKind, AstNode};
use iota_core::builtins::BuiltinEnv;
use iota_core::ctx::{BuilderContext, ResolveMode};
use iota_core::diagnostics::{CompileError, Indicator};
use iota_core::span::Location;
use iota_lang::parse_source;

use crate::report::{error_text, indicator_text, remove_duplicate_errors, SourceCache};

/// Separator inside definition paths, as in `util/helper`.
pub const PATH_SEPARATOR: char = '/';

#[derive(Debug, Clone)]
pub struct TopLevelDef {
    /// Fully qualified: `module:directory/name`.
    pub name: String,
    pub value: AstNode,
    /// Directory the value's identifiers resolve relative to.
    pub value_relative_to: String,
    pub dependencies: Vec<String>,
}

impl TopLevelDef {
    /// Path inside the module, without the `module:` prefix.
    pub fn local_path<'a>(&'a self, module_name: &str) -> &'a str {
        self.name
            .strip_prefix(module_name)
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(&self.name)
    }

    /// The bare definition name, without module or directory.
    pub fn base_name(&self) -> &str {
        let local = self.name.rsplit(':').next().unwrap_or(&self.name);
        local.rsplit(PATH_SEPARATOR).next().unwrap_or(local)
    }

    fn directory(&self, module_name: &str) -> &str {
        let local = self.local_path(module_name);
        match local.rfind(PATH_SEPARATOR) {
            Some(split) => &local[..split],
            None => "",
        }
    }
}

/// A recorded `module_import`, remembered for `meta.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleImport {
    pub root_path: String,
    pub name: String,
}

pub struct Module {
    pub name: String,
    pub fs_base_path: Option<PathBuf>,
    pub defs: Vec<TopLevelDef>,
    pub top_level_evaluations: Vec<Indicator>,
    pub errors: Vec<CompileError>,
    pub current_directory: String,
    pub sources: SourceCache,
    pub(crate) imports: Vec<ModuleImport>,
    eval_queue: Vec<String>,
    builtins: Arc<BuiltinEnv>,
}

impl Module {
    pub fn new(fs_base_path: Option<PathBuf>, name: impl Into<String>) -> Module {
        let name = name.into();
        debug!(target: "module", "made new module {fs_base_path:?} {name}");
        Module {
            name,
            fs_base_path,
            defs: Vec::new(),
            top_level_evaluations: Vec::new(),
            errors: Vec::new(),
            current_directory: String::new(),
            sources: SourceCache::new(),
            imports: Vec::new(),
            eval_queue: Vec::new(),
            builtins: BuiltinEnv::new_shared(),
        }
    }

    pub fn imports(&self) -> &[ModuleImport] {
        &self.imports
    }

    pub fn get_def(&self, name: &str) -> Option<&TopLevelDef> {
        self.defs.iter().find(|def| def.name == name)
    }

    fn set_def(&mut self, def: TopLevelDef) {
        debug!(target: "module", "setDef {}", def.name);
        match self.defs.iter_mut().find(|existing| existing.name == def.name) {
            Some(existing) => *existing = def,
            None => self.defs.push(def),
        }
    }

    fn add_to_eval_queue(&mut self, name: String) {
        if !self.eval_queue.contains(&name) {
            debug!(target: "module", "added to eval queue: {name}");
            self.eval_queue.push(name);
        }
    }

    /// Only the builtin module can be imported.
    pub fn import_module(&mut self, module_path: &str, location: Location) {
        let name = module_path
            .rsplit(PATH_SEPARATOR)
            .next()
            .unwrap_or(module_path);
        if name == "builtin" {
            self.imports.push(ModuleImport {
                root_path: self.current_directory.clone(),
                name: name.to_string(),
            });
        } else {
            self.errors.push(
                CompileError::new(format!("can not import module '{name}'"))
                    .indicator(location, "imported here"),
            );
        }
    }

    /// Aliases visible from `from_directory`: every def whose directory is
    /// that directory or one of its ancestors, deeper directories last so
    /// they shadow on lookup.
    fn scope_aliases(&self, from_directory: &str) -> Vec<AstNode> {
        let mut visible: Vec<(&TopLevelDef, usize)> = self
            .defs
            .iter()
            .filter_map(|def| {
                let directory = def.directory(&self.name);
                let depth = if directory.is_empty() {
                    0
                } else {
                    directory.split(PATH_SEPARATOR).count()
                };
                let reachable = directory.is_empty()
                    || from_directory == directory
                    || from_directory.starts_with(&format!("{directory}{PATH_SEPARATOR}"));
                reachable.then_some((def, depth))
            })
            .collect();
        visible.sort_by_key(|(_, depth)| *depth);
        visible
            .into_iter()
            .map(|(def, _)| {
                AstNode::alias(
                    def.value.location.clone(),
                    def.base_name(),
                    def.value.clone(),
                    false,
                )
            })
            .collect()
    }

    fn context_for(&self, from_directory: &str) -> BuilderContext {
        let mut ctx = BuilderContext::with_builtin_scope(self.builtins.clone());
        ctx.push_scope(self.scope_aliases(from_directory));
        ctx
    }

    /// Type checks and evaluates every queued definition, in queue order.
    /// Stops at the first definition with a hard type error.
    pub fn run_eval_queue(&mut self) {
        let queue = std::mem::take(&mut self.eval_queue);
        debug!(target: "module", "run eval queue, length {}", queue.len());
        for name in queue {
            let Some(def) = self.get_def(&name).cloned() else {
                continue;
            };
            let mut ctx = self.context_for(&def.value_relative_to);
            ctx.resolve = ResolveMode::None;
            let ty = def.value.get_type(&mut ctx);
            if let AstKind::Error(diagnostic) = &ty.kind {
                if let Some(diagnostic) = diagnostic {
                    self.errors.push(diagnostic.clone());
                }
                break;
            }
            let value = def.value.evaluate(&mut ctx);
            if let Some(def) = self.defs.iter_mut().find(|def| def.name == name) {
                def.value = value;
            }
        }
    }

    /// Feeds parsed nodes into the module: commands run, aliases become
    /// definitions, anything else is a top level evaluation.
    pub fn add_ast(&mut self, nodes: Vec<AstNode>) {
        for node in nodes {
            match &node.kind {
                AstKind::Command(text) => {
                    let args: Vec<&str> = text.split(' ').filter(|arg| !arg.is_empty()).collect();
                    self.run_command(&args, node.location.clone());
                }
                AstKind::Alias { left, value, .. } => {
                    let mut local = left.print();
                    if !self.current_directory.is_empty() {
                        local = format!("{}{PATH_SEPARATOR}{local}", self.current_directory);
                    }
                    let name = format!("{}:{local}", self.name);
                    self.set_def(TopLevelDef {
                        name: name.clone(),
                        value: (**value).clone(),
                        value_relative_to: self.current_directory.clone(),
                        dependencies: Vec::new(),
                    });
                    self.add_to_eval_queue(name);
                }
                _ => {
                    debug!(target: "module", "top level evaluation at {}", node.location);
                    self.run_eval_queue();
                    let mut ctx = self.context_for(&self.current_directory.clone());
                    let ty = node.get_type(&mut ctx);
                    if let AstKind::Error(diagnostic) = &ty.kind {
                        if let Some(diagnostic) = diagnostic {
                            self.errors.push(diagnostic.clone());
                        }
                        continue;
                    }
                    let mut ctx = self.context_for(&self.current_directory.clone());
                    let result = node.evaluate(&mut ctx);
                    self.top_level_evaluations
                        .push(Indicator::new(node.location.clone(), result.print()));
                }
            }
        }
    }

    /// Lexes, parses and adds a whole source text. Parse errors are
    /// collected like any other.
    pub fn add_text(&mut self, file_path: &str, text: &str) {
        self.sources.insert(file_path, text);
        let start = Instant::now();
        match parse_source(file_path, text) {
            Ok(nodes) => {
                debug!(target: "module", elapsed = ?start.elapsed(), "parsed {file_path}");
                self.add_ast(nodes);
            }
            Err(error) => self.errors.push(error),
        }
    }

    fn run_command(&mut self, args: &[&str], location: Location) {
        let Some(&command) = args.first() else {
            self.errors
                .push(CompileError::new("empty command").indicator(location, "here"));
            return;
        };
        let argument = args.get(1).copied();
        let needs_argument = matches!(command, "module_import" | "cd" | "includeFile");
        if needs_argument && argument.is_none() {
            self.errors.push(
                CompileError::new(format!("command '{command}' needs an argument"))
                    .indicator(location, "here"),
            );
            return;
        }
        match (command, argument) {
            ("module_import", Some(module_path)) => {
                self.import_module(module_path, location);
            }
            ("cd", Some(path)) => match path.strip_prefix('~') {
                Some(rest) => {
                    self.current_directory = rest.trim_start_matches(PATH_SEPARATOR).to_string();
                }
                None => self.errors.push(
                    CompileError::new("cd paths must start with '~'").indicator(location, "here"),
                ),
            },
            ("debug", _) => {
                self.run_eval_queue();
                debug!(
                    target: "module",
                    name = %self.name,
                    directory = %self.current_directory,
                    defs = %self.print_defs(false),
                    "module state"
                );
            }
            ("includeFile", Some(file_path)) => match std::fs::read_to_string(file_path) {
                Ok(text) => {
                    let saved = self.current_directory.clone();
                    self.add_text(file_path, &text);
                    self.current_directory = saved;
                }
                Err(_) => self.errors.push(
                    CompileError::new(format!("can not read file '{file_path}'"))
                        .indicator(location, "included here"),
                ),
            },
            (other, _) => self.errors.push(
                CompileError::new(format!("unknown command '{other}'")).indicator(location, "here"),
            ),
        }
    }

    /// All definitions as source text, one per line with its dependency
    /// list in a comment above.
    pub fn print_defs(&self, extra_lines: bool) -> String {
        let mut lines: Vec<String> = Vec::new();
        for def in &self.defs {
            lines.push(format!("// [{}]", def.dependencies.join(", ")));
            lines.push(format!(
                "{} = {}",
                def.local_path(&self.name),
                def.value.print()
            ));
            if extra_lines {
                lines.push(String::new());
            }
        }
        lines.join("\n")
    }

    /// Errors (deduplicated) or, when there are none, the top level
    /// evaluation results. The flag is true when errors remain, so callers
    /// can exit nonzero.
    pub fn render_output(&self, fancy: bool) -> (String, bool) {
        let errors = remove_duplicate_errors(&self.errors, &self.sources);
        let mut out = String::new();
        if !errors.is_empty() {
            for error in &errors {
                out.push_str(&error_text(error, true, fancy, &self.sources));
                out.push('\n');
            }
            return (out, true);
        }
        if !self.top_level_evaluations.is_empty() {
            out.push_str("top level evaluations:\n");
        }
        for evaluation in &self.top_level_evaluations {
            let multi_line = evaluation.message.contains('\n');
            out.push_str(&indicator_text(
                evaluation,
                true,
                fancy,
                multi_line,
                &self.sources,
            ));
            out.push('\n');
        }
        (out, false)
    }
}
