//! O-language AST definitions
//!
//! The tree is a uniform two-variant node: leaves carry the token they were
//! built from, inner nodes carry a grammar tag and their ordered children.
//! Children appear in the order of the grammar rule that produced them.

use crate::common::Span;
use crate::frontend::lexer::{Token, TokenKind};
use std::fmt;

/// Grammar tag of a nonterminal node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxComponent {
    Program,
    ClassDeclaration,
    ClassName,
    MemberDeclarations,
    MemberDeclaration,
    VariableDeclaration,
    MethodDeclaration,
    ConstructorDeclaration,
    Parameters,
    Statements,
    Statement,
    Assignment,
    IfStatement,
    WhileLoop,
    ReturnStatement,
    Expression,
    Arguments,
    // Reserved, never produced by the parser
    ArrayType,
    Term,
    Factor,
}

impl fmt::Display for SyntaxComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// AST node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Terminal(Token),
    Nonterminal(Nonterminal),
}

/// Inner node: a grammar tag and the children it owns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonterminal {
    pub component: SyntaxComponent,
    pub children: Vec<Node>,
    pub span: Span,
}

impl Nonterminal {
    /// Empty node anchored at `span`
    pub fn new(component: SyntaxComponent, span: Span) -> Self {
        Self {
            component,
            children: Vec::new(),
            span,
        }
    }

    /// Append a child, growing the span to cover it
    pub fn push(&mut self, child: Node) {
        if self.children.is_empty() {
            self.span = child.span();
        } else {
            self.span = self.span.to(child.span());
        }
        self.children.push(child);
    }

    pub fn push_token(&mut self, token: Token) {
        self.push(Node::Terminal(token));
    }
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Terminal(token) => token.span,
            Node::Nonterminal(inner) => inner.span,
        }
    }

    pub fn component(&self) -> Option<SyntaxComponent> {
        match self {
            Node::Terminal(_) => None,
            Node::Nonterminal(inner) => Some(inner.component),
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Terminal(_) => &[],
            Node::Nonterminal(inner) => &inner.children,
        }
    }

    pub fn token(&self) -> Option<&Token> {
        match self {
            Node::Terminal(token) => Some(token),
            Node::Nonterminal(_) => None,
        }
    }

    pub fn token_kind(&self) -> Option<TokenKind> {
        self.token().map(|token| token.kind)
    }

    /// Lexeme of a terminal, empty for nonterminals
    pub fn lexeme(&self) -> &str {
        self.token().map_or("", |token| token.lexeme.as_str())
    }

    pub fn is(&self, component: SyntaxComponent) -> bool {
        self.component() == Some(component)
    }

    pub fn is_token(&self, kind: TokenKind) -> bool {
        self.token_kind() == Some(kind)
    }

    /// First child tagged `component`
    pub fn child(&self, component: SyntaxComponent) -> Option<&Node> {
        self.children().iter().find(|node| node.is(component))
    }

    /// Text of a ClassName subtree, e.g. `Array[Integer]`
    pub fn class_name_text(&self) -> String {
        let mut text = String::new();
        self.write_class_name(&mut text);
        text
    }

    fn write_class_name(&self, out: &mut String) {
        match self {
            Node::Terminal(token) => out.push_str(&token.lexeme),
            Node::Nonterminal(inner) => {
                for child in &inner.children {
                    child.write_class_name(out);
                }
            }
        }
    }

    /// Render the tree as an indented outline
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(&mut out, 0);
        out
    }

    fn write_outline(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        match self {
            Node::Terminal(token) => {
                out.push_str(&format!("{indent}{:?} {:?}\n", token.kind, token.lexeme));
            }
            Node::Nonterminal(inner) => {
                out.push_str(&format!("{indent}{} ({})\n", inner.component, inner.span));
                for child in &inner.children {
                    child.write_outline(out, depth + 1);
                }
            }
        }
    }
}

impl From<Token> for Node {
    fn from(token: Token) -> Self {
        Node::Terminal(token)
    }
}

impl From<Nonterminal> for Node {
    fn from(inner: Nonterminal) -> Self {
        Node::Nonterminal(inner)
    }
}
