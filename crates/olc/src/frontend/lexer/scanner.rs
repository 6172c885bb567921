//! Ordered first-match lexer

use super::token::{Token, TokenKind};
use crate::common::{CompileError, CompileResult, Span};
use tracing::trace;

/// Lexer for O-language source code.
///
/// Holds exactly one recognized token (the "current" pair). Advancing
/// discards it and recognizes the next one; when the input is exhausted or a
/// lexical error occurs there is no current token. Errors are sticky: the
/// lexer stays exhausted and the error is kept for the parser to report.
pub struct Lexer<'a> {
    source: &'a str,
    /// Byte offset of the unconsumed remainder
    cursor: usize,
    line: usize,
    column: usize,
    current: Option<Token>,
    error: Option<CompileError>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer positioned on the first token
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Self {
            source,
            cursor: 0,
            line: 1,
            column: 1,
            current: None,
            error: None,
        };
        lexer.advance();
        lexer
    }

    /// Discard the current token and recognize the next one
    pub fn advance(&mut self) {
        self.current = None;
        if self.error.is_some() {
            return;
        }

        self.skip_whitespace();
        let rest = &self.source[self.cursor..];
        if rest.is_empty() {
            return;
        }

        let matched = TokenKind::ALL
            .iter()
            .find_map(|&kind| kind.match_len(rest).map(|len| (kind, len)));

        match matched {
            Some((kind, len)) => {
                let span = Span::new(self.cursor, self.cursor + len, self.line, self.column);
                let token = Token::new(kind, &rest[..len], span);
                trace!(
                    kind = ?token.kind,
                    lexeme = %token.lexeme,
                    line = span.line,
                    column = span.column,
                    "token"
                );
                self.cursor += len;
                self.column += len;
                self.current = Some(token);
            }
            None => {
                let symbol = rest.chars().next().unwrap_or_default();
                let span = Span::new(
                    self.cursor,
                    self.cursor + symbol.len_utf8(),
                    self.line,
                    self.column,
                );
                self.error = Some(CompileError::lexer(
                    format!("Unexpected symbol: '{symbol}'"),
                    span,
                ));
            }
        }
    }

    fn skip_whitespace(&mut self) {
        for byte in self.source[self.cursor..].bytes() {
            match byte {
                b'\n' => {
                    self.line += 1;
                    self.column = 1;
                }
                b'\r' | b'\t' | 0x0B | 0x0C | b' ' => self.column += 1,
                _ => break,
            }
            self.cursor += 1;
        }
    }

    /// The token at the cursor, without consuming it
    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// Same as [`Lexer::current`]; the parser reads it as one-token lookahead
    pub fn peek(&self) -> Option<&Token> {
        self.current()
    }

    /// Kind of the token at the cursor
    pub fn peek_kind(&self) -> Option<TokenKind> {
        self.current.as_ref().map(|token| token.kind)
    }

    /// Whether no further tokens will be produced
    pub fn is_exhausted(&self) -> bool {
        self.current.is_none()
    }

    /// The lexical error that stopped the stream, if any
    pub fn error(&self) -> Option<&CompileError> {
        self.error.as_ref()
    }

    /// Take ownership of the recorded lexical error
    pub fn take_error(&mut self) -> Option<CompileError> {
        self.error.take()
    }

    /// Position just past the last consumed character
    pub fn end_span(&self) -> Span {
        Span::new(self.cursor, self.cursor, self.line, self.column)
    }

    /// Tokenize the entire source and return all tokens
    pub fn tokenize_all(mut self) -> CompileResult<Vec<Token>> {
        let tokens: Vec<Token> = self.by_ref().collect();
        match self.take_error() {
            Some(err) => Err(err),
            None => Ok(tokens),
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    /// Return the current token and advance past it
    fn next(&mut self) -> Option<Token> {
        let token = self.current.take()?;
        self.advance();
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize_all()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn lexemes(source: &str) -> Vec<String> {
        Lexer::new(source)
            .tokenize_all()
            .unwrap()
            .into_iter()
            .map(|t| t.lexeme)
            .collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("class extends is end var method this while loop if then else return mod"),
            vec![
                TokenKind::Class,
                TokenKind::Extends,
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
                TokenKind::Mod,
            ]
        );
    }

    #[test]
    fn test_keyword_never_lexes_as_identifier() {
        let mut lexer = Lexer::new("class");
        let token = lexer.next().unwrap();
        assert_eq!(token.kind, TokenKind::Class);
        assert_eq!(token.lexeme, "class");
        assert!(lexer.next().is_none());
    }

    #[test]
    fn test_keyword_prefix_splits_identifier() {
        assert_eq!(kinds("classA"), vec![TokenKind::Class, TokenKind::Identifier]);
        assert_eq!(lexemes("variable"), vec!["var", "iable"]);
        assert_eq!(kinds("Integers"), vec![TokenKind::Integer, TokenKind::Identifier]);
    }

    #[test]
    fn test_builtin_type_words() {
        assert_eq!(
            kinds("Integer Real Array Boolean"),
            vec![
                TokenKind::Integer,
                TokenKind::Real,
                TokenKind::Array,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_literals() {
        let tokens = Lexer::new("42 3.14 true false 7.").tokenize_all().unwrap();
        let pairs: Vec<(TokenKind, &str)> =
            tokens.iter().map(|t| (t.kind, t.lexeme.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                (TokenKind::IntegerLiteral, "42"),
                (TokenKind::RealLiteral, "3.14"),
                (TokenKind::BooleanLiteral, "true"),
                (TokenKind::BooleanLiteral, "false"),
                (TokenKind::IntegerLiteral, "7"),
                (TokenKind::Dot, "."),
            ]
        );
    }

    #[test]
    fn test_two_char_operators_before_one_char() {
        assert_eq!(
            kinds(":= : != ! <= < >= > == + - * /"),
            vec![
                TokenKind::Assign,
                TokenKind::Colon,
                TokenKind::Neq,
                TokenKind::Exclamation,
                TokenKind::Lte,
                TokenKind::Lt,
                TokenKind::Gte,
                TokenKind::Gt,
                TokenKind::Eq,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Mul,
                TokenKind::Div,
            ]
        );
    }

    #[test]
    fn test_method_call_chain() {
        assert_eq!(
            kinds("x.Plus(1)"),
            vec![
                TokenKind::Identifier,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::OpenParen,
                TokenKind::IntegerLiteral,
                TokenKind::CloseParen,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("class A is\n  var x: 1\nend").tokenize_all().unwrap();
        let positions: Vec<(usize, usize)> =
            tokens.iter().map(|t| (t.line(), t.column())).collect();
        assert_eq!(
            positions,
            vec![(1, 1), (1, 7), (1, 9), (2, 3), (2, 7), (2, 8), (2, 10), (3, 1)]
        );
    }

    #[test]
    fn test_positions_are_monotonic() {
        let source = concat!(
            "class Counter is\n",
            "\tvar n: 0\r\n",
            "\tmethod inc(): Integer is\n",
            "\t\tn := n.Plus(1)\n",
            "\t\treturn n\n",
            "\tend\nend\n",
        );
        let tokens = Lexer::new(source).tokenize_all().unwrap();
        for pair in tokens.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                (b.line(), b.column()) > (a.line(), a.column()),
                "{:?} is not after {:?}",
                b,
                a
            );
            assert!(b.span.start >= a.span.end);
        }
    }

    #[test]
    fn test_whitespace_only_is_exhausted() {
        let lexer = Lexer::new(" \t\r\n\x0B\x0C ");
        assert!(lexer.is_exhausted());
        assert!(lexer.error().is_none());
    }

    #[test]
    fn test_unknown_symbol_is_sticky_error() {
        let mut lexer = Lexer::new("var x @ y");
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::Var));
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::Identifier));
        assert!(lexer.next().is_none());
        assert!(lexer.next().is_none());

        let err = lexer.error().unwrap();
        assert_eq!(err.message(), "Unexpected symbol: '@'");
        assert_eq!(err.span().map(|s| (s.line, s.column)), Some((1, 7)));
    }

    #[test]
    fn test_tokenize_all_reports_error() {
        let err = Lexer::new("class A is end $").tokenize_all().unwrap_err();
        assert!(matches!(err, CompileError::Lexer { .. }));
    }

    #[test]
    fn test_advance_discards_current() {
        let mut lexer = Lexer::new("if then");
        assert_eq!(lexer.peek_kind(), Some(TokenKind::If));
        lexer.advance();
        assert_eq!(lexer.current().map(|t| t.lexeme.as_str()), Some("then"));
        lexer.advance();
        assert!(lexer.is_exhausted());
    }
}
