//! O-language frontend
//!
//! The frontend is responsible for:
//! 1. Lexing source code into tokens
//! 2. Parsing tokens into an AST
//! 3. Registering types and checking method bodies
//!
//! Its output, a [`CompiledUnit`], is what a code generator consumes.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod sema;

pub use lexer::Lexer;
pub use parser::Parser;
pub use sema::SemanticAnalyzer;

use crate::common::{CompileError, CompileResult, DiagnosticReporter};
use ast::Node;
use sema::SymbolTable;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::info;

/// Library unit registered before the program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Prelude {
    /// Only the built-in type names
    None,
    /// The bundled `Library.ol`
    #[default]
    Standard,
    /// A prelude read from disk
    File(PathBuf),
}

/// Configuration options passed to the frontend
#[derive(Debug, Clone, Default)]
pub struct FrontendConfig {
    pub prelude: Prelude,
    pub dump_tokens: bool,
    pub dump_ast: bool,
    pub dump_symbols: bool,
}

/// Compilation context providing access to diagnostics and file info
pub struct CompileContext<'a> {
    pub filename: String,
    pub file_id: usize,
    pub reporter: &'a DiagnosticReporter,
}

impl<'a> CompileContext<'a> {
    pub fn new(filename: String, file_id: usize, reporter: &'a DiagnosticReporter) -> Self {
        Self { filename, file_id, reporter }
    }
}

/// A validated program together with the symbols it declares
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    pub program: Node,
    pub symbols: SymbolTable,
}

/// Trait for language frontends
pub trait Frontend {
    /// The name of this frontend
    fn name(&self) -> &'static str;

    /// File extensions this frontend handles
    fn extensions(&self) -> &'static [&'static str];

    /// Lex, parse and analyze `source`, reporting the first error through `ctx`
    fn compile(
        &self,
        source: &str,
        ctx: &CompileContext,
        config: &FrontendConfig,
    ) -> CompileResult<CompiledUnit>;

    fn dump_tokens(&self, source: &str) -> CompileResult<String>;

    fn dump_ast(&self, source: &str) -> CompileResult<String>;
}

/// O-language frontend
#[derive(Debug, Default)]
pub struct OFrontend;

impl OFrontend {
    pub fn new() -> Self {
        Self
    }

    /// Analyzer with `prelude` already registered; failures come back as
    /// [`CompileError::Prelude`]
    pub fn analyzer(prelude: &Prelude) -> CompileResult<SemanticAnalyzer> {
        let analyzer = match prelude {
            Prelude::None => Ok(SemanticAnalyzer::new()),
            Prelude::Standard => SemanticAnalyzer::with_standard_library(),
            Prelude::File(path) => {
                let mut analyzer = SemanticAnalyzer::new();
                analyzer.analyze_predefined_libraries(path).map(|()| analyzer)
            }
        };
        analyzer.map_err(CompileError::prelude)
    }

    /// Parse and analyze `source` without reporting diagnostics
    pub fn compile_unit(source: &str, prelude: &Prelude) -> CompileResult<CompiledUnit> {
        let mut analyzer = Self::analyzer(prelude)?;
        let program = Parser::new(source).parse_program()?;
        analyzer.analyze(&program)?;
        Ok(CompiledUnit {
            program,
            symbols: analyzer.into_table(),
        })
    }
}

impl Frontend for OFrontend {
    fn name(&self) -> &'static str {
        "o"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".ol", ".o"]
    }

    fn compile(
        &self,
        source: &str,
        ctx: &CompileContext,
        config: &FrontendConfig,
    ) -> CompileResult<CompiledUnit> {
        // Prelude errors are left to the caller; their spans are not in this file
        let mut analyzer = Self::analyzer(&config.prelude)?;
        info!(classes = analyzer.table().len(), prelude = ?config.prelude, "prelude ready");

        // Phase 1: Lexing (optional token dump)
        if config.dump_tokens {
            match self.dump_tokens(source) {
                Ok(tokens) => {
                    eprintln!("=== Tokens ===");
                    eprint!("{tokens}");
                    eprintln!("=== End Tokens ===\n");
                }
                Err(e) => {
                    ctx.reporter.report_error(ctx.file_id, &e);
                    return Err(e);
                }
            }
        }

        // Phase 2: Parsing
        info!(file = %ctx.filename, "parsing");
        let program = match Parser::new(source).parse_program() {
            Ok(program) => program,
            Err(e) => {
                ctx.reporter.report_error(ctx.file_id, &e);
                return Err(e);
            }
        };

        if config.dump_ast {
            eprintln!("=== AST ===");
            eprint!("{}", program.outline());
            eprintln!("=== End AST ===\n");
        }

        // Phase 3: Semantic Analysis
        info!(file = %ctx.filename, "analyzing");
        if let Err(e) = analyzer.analyze(&program) {
            ctx.reporter.report_error(ctx.file_id, &e);
            return Err(e);
        }

        let symbols = analyzer.into_table();
        if config.dump_symbols {
            eprintln!("=== Symbols ===");
            eprint!("{symbols}");
            eprintln!("=== End Symbols ===\n");
        }

        Ok(CompiledUnit { program, symbols })
    }

    fn dump_tokens(&self, source: &str) -> CompileResult<String> {
        let tokens = Lexer::new(source).tokenize_all()?;
        let mut output = String::new();
        for token in &tokens {
            let _ = writeln!(
                output,
                "{}:{} {:?} {:?}",
                token.line(),
                token.column(),
                token.kind,
                token.lexeme
            );
        }
        Ok(output)
    }

    fn dump_ast(&self, source: &str) -> CompileResult<String> {
        let program = Parser::new(source).parse_program()?;
        Ok(program.outline())
    }
}
