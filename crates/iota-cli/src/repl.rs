//! Line based interactive session. Every entry goes through the same
//! module, so aliases defined earlier stay available.

use std::io::{self, BufRead, Write};

use iota_core::Result;
use iota_module::Module;

const PROMPT: &str = "(*)";

pub fn start(fancy_errors: bool) -> Result<bool> {
    let mut module = Module::new(None, "repl");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut entry = 0u32;

    write!(stdout, "{PROMPT} ")?;
    stdout.flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed == "exit" || trimmed == "quit" {
            break;
        }
        if !trimmed.is_empty() {
            entry += 1;
            module.add_text(&format!("repl-{entry}"), &line);
            module.run_eval_queue();
            let (output, _) = module.render_output(fancy_errors);
            if !output.is_empty() {
                print!("{output}");
            }
            // diagnostics and results are per entry, not cumulative
            module.errors.clear();
            module.top_level_evaluations.clear();
        }
        write!(stdout, "{PROMPT} ")?;
        stdout.flush()?;
    }
    Ok(true)
}
