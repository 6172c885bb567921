//! Source locations

use std::fmt;

/// A region of source text.
///
/// `start`/`end` are byte offsets used for diagnostic labels; `line` and
/// `column` are the 1-based position of the first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self { start, end, line, column }
    }

    /// Extend this span so that it ends where `other` ends
    pub fn to(self, other: Span) -> Self {
        Self {
            end: self.end.max(other.end),
            ..self
        }
    }

    /// Byte range, for diagnostic labels
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

impl Default for Span {
    fn default() -> Self {
        Self { start: 0, end: 0, line: 1, column: 1 }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line: {}, Column: {}", self.line, self.column)
    }
}
