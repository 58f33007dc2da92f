//! The `iota` command line front end: run or check source files, evaluate
//! one-off expressions, or start an interactive session.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use iota_core::Result;
use iota_module::Module;

mod repl;

#[derive(Parser)]
#[command(
    name = "iota",
    version = env!("CARGO_PKG_VERSION"),
    about = "A small staged language where evaluation is partial by default"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Set log level (overrides --verbose/--quiet)
    #[arg(long, global = true, value_enum)]
    log: Option<LogLevel>,

    /// Render errors with source windows and color
    #[arg(long, global = true)]
    fancy_errors: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a source file and print its top level evaluations
    Run {
        file: PathBuf,
    },
    /// Type check a source file, printing only errors
    Check {
        file: PathBuf,
    },
    /// Evaluate a single expression
    Eval {
        #[arg(short, long)]
        expr: String,
    },
    /// Start an interactive session
    Repl,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet, cli.log);

    let result = match cli.command {
        Commands::Run { file } => run_file(&file, cli.fancy_errors, true),
        Commands::Check { file } => run_file(&file, cli.fancy_errors, false),
        Commands::Eval { expr } => eval_expr(&expr, cli.fancy_errors),
        Commands::Repl => repl::start(cli.fancy_errors),
    };
    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Loads one file into a fresh module. Returns false when errors remain.
fn run_file(file: &Path, fancy_errors: bool, print_evaluations: bool) -> Result<bool> {
    let text = std::fs::read_to_string(file)?;
    let name = file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".into());
    let mut module = Module::new(None, name);
    module.add_text(&file.to_string_lossy(), &text);
    module.run_eval_queue();
    debug!(target: "cli", "loaded {} defs from {}", module.defs.len(), file.display());

    let (output, has_errors) = module.render_output(fancy_errors);
    if has_errors || print_evaluations {
        print!("{output}");
    }
    Ok(!has_errors)
}

fn eval_expr(expr: &str, fancy_errors: bool) -> Result<bool> {
    let mut module = Module::new(None, "eval");
    module.sources.insert("<expr>", expr);
    module.add_text("<expr>", expr);
    module.run_eval_queue();
    let (output, has_errors) = module.render_output(fancy_errors);
    print!("{output}");
    Ok(!has_errors)
}

fn setup_logging(verbose: u8, quiet: bool, log_level: Option<LogLevel>) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if let Some(level) = log_level {
        EnvFilter::new(match level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    } else if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let formatter = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_level(true);

    tracing_subscriber::registry()
        .with(formatter)
        .with(filter)
        .init();
}
