//! Error types and diagnostic reporting

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use thiserror::Error;
use super::Span;

/// Compile error with source location
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Lexical error: {message}. {span}")]
    Lexer { message: String, span: Span },

    #[error("Syntax error: {message}. {span}")]
    Syntax { message: String, span: Span },

    #[error("Semantic error: {message}. {span}")]
    Semantic { message: String, span: Span },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure while registering the prelude unit; its spans point into
    /// the prelude, not the program being compiled
    #[error("Prelude error: {0}")]
    Prelude(#[source] Box<CompileError>),
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::Syntax {
            message: message.into(),
            span,
        }
    }

    /// `Unexpected "<lexeme>"`
    pub fn unexpected(lexeme: &str, span: Span) -> Self {
        Self::syntax(format!("Unexpected \"{lexeme}\""), span)
    }

    /// `Expected <expected> but got "<lexeme>"`
    pub fn expected(expected: impl std::fmt::Display, got: &str, span: Span) -> Self {
        Self::syntax(format!("Expected {expected} but got \"{got}\""), span)
    }

    pub fn semantic(message: impl Into<String>, span: Span) -> Self {
        Self::Semantic {
            message: message.into(),
            span,
        }
    }

    pub fn prelude(inner: CompileError) -> Self {
        Self::Prelude(Box::new(inner))
    }

    /// Message without the position suffix
    pub fn message(&self) -> String {
        match self {
            Self::Lexer { message, .. }
            | Self::Syntax { message, .. }
            | Self::Semantic { message, .. } => message.clone(),
            Self::Io(err) => err.to_string(),
            Self::Prelude(inner) => inner.message(),
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lexer { span, .. } | Self::Syntax { span, .. } | Self::Semantic { span, .. } => {
                Some(*span)
            }
            Self::Io(_) | Self::Prelude(_) => None,
        }
    }

    pub fn is_semantic(&self) -> bool {
        matches!(self, Self::Semantic { .. })
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }

    pub fn is_prelude(&self) -> bool {
        matches!(self, Self::Prelude(_))
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Diagnostic reporter for pretty error output
pub struct DiagnosticReporter {
    files: SimpleFiles<String, String>,
    writer: StandardStream,
    config: term::Config,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self {
            files: SimpleFiles::new(),
            writer: StandardStream::stderr(ColorChoice::Auto),
            config: term::Config::default(),
        }
    }

    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> usize {
        self.files.add(name.into(), source.into())
    }

    pub fn report_error(&self, file_id: usize, error: &CompileError) {
        let labelled = |title: &str, message: &str, span: &Span| {
            Diagnostic::error()
                .with_message(title.to_string())
                .with_labels(vec![
                    Label::primary(file_id, span.range()).with_message(message.to_string())
                ])
        };

        let diagnostic = match error {
            CompileError::Lexer { message, span } => labelled("Lexical error", message, span),
            CompileError::Syntax { message, span } => labelled("Syntax error", message, span),
            CompileError::Semantic { message, span } => labelled("Semantic error", message, span),
            CompileError::Io(err) => {
                Diagnostic::error().with_message(format!("IO error: {err}"))
            }
            CompileError::Prelude(inner) => {
                Diagnostic::error().with_message(format!("Prelude error: {inner}"))
            }
        };

        let _ = term::emit(&mut self.writer.lock(), &self.config, &self.files, &diagnostic);
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}
