//! O-language compiler front end
//!
//! Usage: olc [OPTIONS] <input>

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use olang_compiler::common::DiagnosticReporter;
use olang_compiler::frontend::{CompileContext, Frontend, FrontendConfig, OFrontend, Prelude};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser, Debug)]
#[command(name = "olc")]
#[command(author = "O-Language Team")]
#[command(version)]
#[command(about = "Lexer, parser and semantic analyzer for the O-language", long_about = None)]
struct Args {
    /// Input source file (.ol)
    #[arg(required = true)]
    input: PathBuf,

    /// Prelude to register before the program (defaults to the bundled library)
    #[arg(long, conflicts_with = "no_prelude")]
    prelude: Option<PathBuf>,

    /// Analyze without any prelude
    #[arg(long)]
    no_prelude: bool,

    /// Dump tokens (for debugging)
    #[arg(long)]
    dump_tokens: bool,

    /// Dump AST (for debugging)
    #[arg(long)]
    dump_ast: bool,

    /// Dump the symbol table after analysis
    #[arg(long)]
    dump_symbols: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let filename = args.input.display().to_string();

    let mut reporter = DiagnosticReporter::new();
    let file_id = reporter.add_file(&filename, &source);

    let prelude = match (&args.prelude, args.no_prelude) {
        (_, true) => Prelude::None,
        (Some(path), false) => Prelude::File(path.clone()),
        (None, false) => Prelude::Standard,
    };

    let config = FrontendConfig {
        prelude,
        dump_tokens: args.dump_tokens,
        dump_ast: args.dump_ast,
        dump_symbols: args.dump_symbols,
    };

    let frontend = OFrontend::new();
    if !frontend
        .extensions()
        .iter()
        .any(|ext| filename.ends_with(ext))
    {
        tracing::warn!(
            frontend = frontend.name(),
            file = %filename,
            "unrecognized extension, compiling anyway"
        );
    }

    let ctx = CompileContext::new(filename.clone(), file_id, &reporter);
    let unit = match frontend.compile(&source, &ctx, &config) {
        Ok(unit) => unit,
        Err(e) if e.is_prelude() => return Err(e).context("failed to load prelude"),
        // Already rendered by the reporter
        Err(_) => return Ok(ExitCode::FAILURE),
    };

    tracing::info!(
        classes = unit.symbols.len(),
        file = %filename,
        "compiled successfully"
    );
    Ok(ExitCode::SUCCESS)
}
