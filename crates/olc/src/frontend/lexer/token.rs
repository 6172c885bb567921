//! O-language token definitions

use crate::common::Span;
use std::fmt;

/// A lexeme-token pair: the token kind, the matched text and its location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }

    pub fn line(&self) -> usize {
        self.span.line
    }

    pub fn column(&self) -> usize {
        self.span.column
    }
}

/// O-language token kinds.
///
/// Matching tries kinds in the order of [`TokenKind::ALL`] and the first
/// kind whose rule matches the remaining input wins, regardless of match
/// length. Keywords therefore precede `Identifier`, `RealLiteral` precedes
/// `IntegerLiteral` and two-character operators precede their one-character
/// prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Keywords
    Class,
    Extends,
    Integer,
    Real,
    Array,
    Mod,
    Is,
    End,
    Var,
    Method,
    This,
    While,
    Loop,
    If,
    Then,
    Else,
    Return,

    // Identifiers and literals
    BooleanLiteral,
    Identifier,
    RealLiteral,
    IntegerLiteral,

    // Punctuation
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    Assign,
    Neq,
    Exclamation,
    Colon,
    Comma,
    Dot,

    // Operators (lexed, never accepted by the grammar)
    Plus,
    Minus,
    Mul,
    Lte,
    Gte,
    Lt,
    Gt,
    Div,
    Eq,
}

impl TokenKind {
    /// Every kind, in matching order
    pub const ALL: [TokenKind; 42] = [
        TokenKind::Class,
        TokenKind::Extends,
        TokenKind::Integer,
        TokenKind::Real,
        TokenKind::Array,
        TokenKind::Mod,
        TokenKind::Is,
        TokenKind::End,
        TokenKind::Var,
        TokenKind::Method,
        TokenKind::This,
        TokenKind::While,
        TokenKind::Loop,
        TokenKind::If,
        TokenKind::Then,
        TokenKind::Else,
        TokenKind::Return,
        TokenKind::BooleanLiteral,
        TokenKind::Identifier,
        TokenKind::RealLiteral,
        TokenKind::IntegerLiteral,
        TokenKind::OpenBracket,
        TokenKind::CloseBracket,
        TokenKind::OpenBrace,
        TokenKind::CloseBrace,
        TokenKind::OpenParen,
        TokenKind::CloseParen,
        TokenKind::Assign,
        TokenKind::Neq,
        TokenKind::Exclamation,
        TokenKind::Colon,
        TokenKind::Comma,
        TokenKind::Dot,
        TokenKind::Plus,
        TokenKind::Minus,
        TokenKind::Mul,
        TokenKind::Lte,
        TokenKind::Gte,
        TokenKind::Lt,
        TokenKind::Gt,
        TokenKind::Div,
        TokenKind::Eq,
    ];

    /// Fixed spelling for kinds that match a single literal string
    pub fn text(self) -> Option<&'static str> {
        let text = match self {
            TokenKind::Class => "class",
            TokenKind::Extends => "extends",
            TokenKind::Integer => "Integer",
            TokenKind::Real => "Real",
            TokenKind::Array => "Array",
            TokenKind::Mod => "mod",
            TokenKind::Is => "is",
            TokenKind::End => "end",
            TokenKind::Var => "var",
            TokenKind::Method => "method",
            TokenKind::This => "this",
            TokenKind::While => "while",
            TokenKind::Loop => "loop",
            TokenKind::If => "if",
            TokenKind::Then => "then",
            TokenKind::Else => "else",
            TokenKind::Return => "return",
            TokenKind::OpenBracket => "[",
            TokenKind::CloseBracket => "]",
            TokenKind::OpenBrace => "{",
            TokenKind::CloseBrace => "}",
            TokenKind::OpenParen => "(",
            TokenKind::CloseParen => ")",
            TokenKind::Assign => ":=",
            TokenKind::Neq => "!=",
            TokenKind::Exclamation => "!",
            TokenKind::Colon => ":",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Mul => "*",
            TokenKind::Lte => "<=",
            TokenKind::Gte => ">=",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Div => "/",
            TokenKind::Eq => "==",
            TokenKind::BooleanLiteral
            | TokenKind::Identifier
            | TokenKind::RealLiteral
            | TokenKind::IntegerLiteral => return None,
        };
        Some(text)
    }

    /// Length in bytes of this kind's match anchored at the start of `input`
    pub fn match_len(self, input: &str) -> Option<usize> {
        match self {
            TokenKind::BooleanLiteral => ["true", "false"]
                .into_iter()
                .find(|word| input.starts_with(word))
                .map(str::len),
            TokenKind::Identifier => {
                let bytes = input.as_bytes();
                let first = *bytes.first()?;
                if !(first.is_ascii_alphabetic() || first == b'_') {
                    return None;
                }
                Some(1 + ascii_run(&bytes[1..], |b| b.is_ascii_alphanumeric() || b == b'_'))
            }
            TokenKind::RealLiteral => {
                let bytes = input.as_bytes();
                let whole = ascii_run(bytes, |b| b.is_ascii_digit());
                if whole == 0 || bytes.get(whole) != Some(&b'.') {
                    return None;
                }
                let fraction = ascii_run(&bytes[whole + 1..], |b| b.is_ascii_digit());
                (fraction > 0).then_some(whole + 1 + fraction)
            }
            TokenKind::IntegerLiteral => {
                let digits = ascii_run(input.as_bytes(), |b| b.is_ascii_digit());
                (digits > 0).then_some(digits)
            }
            _ => self
                .text()
                .filter(|text| input.starts_with(text))
                .map(str::len),
        }
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::BooleanLiteral | TokenKind::RealLiteral | TokenKind::IntegerLiteral
        )
    }

    /// Built-in words accepted where a class name is expected
    pub fn is_builtin_type_word(self) -> bool {
        matches!(self, TokenKind::Integer | TokenKind::Real | TokenKind::Array)
    }
}

fn ascii_run(bytes: &[u8], accept: impl Fn(u8) -> bool) -> usize {
    bytes.iter().take_while(|&&b| accept(b)).count()
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.text() {
            Some(text) => write!(f, "'{text}'"),
            None => match self {
                TokenKind::BooleanLiteral => write!(f, "boolean literal"),
                TokenKind::Identifier => write!(f, "identifier"),
                TokenKind::RealLiteral => write!(f, "real literal"),
                _ => write!(f, "integer literal"),
            },
        }
    }
}
