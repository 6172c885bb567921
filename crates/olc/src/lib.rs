//! O-language compiler front end
//!
//! This library turns O-language source into a validated syntax tree and
//! the symbol table a code generator needs.
//!
//! ## Architecture
//!
//! - **Common** (`common/`): errors, spans and diagnostic rendering
//! - **Frontend** (`frontend/`): lexer, parser, AST and semantic analysis
//!
//! ```no_run
//! use olang_compiler::frontend::{OFrontend, Prelude};
//!
//! let unit = OFrontend::compile_unit("class A is end", &Prelude::Standard)?;
//! assert!(unit.symbols.class_id("A").is_some());
//! # Ok::<(), olang_compiler::CompileError>(())
//! ```

pub mod common;
pub mod frontend;

// Re-exports for convenience
pub use common::{CompileError, CompileResult, DiagnosticReporter, Span};
pub use frontend::{CompileContext, CompiledUnit, Frontend, FrontendConfig, OFrontend, Prelude};
