//! Built-in types and type-name helpers

use crate::frontend::lexer::TokenKind;

/// Types every program may name without declaring them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Integer,
    Real,
    Boolean,
}

impl BuiltinType {
    pub const ALL: [BuiltinType; 3] = [
        BuiltinType::Integer,
        BuiltinType::Real,
        BuiltinType::Boolean,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinType::Integer => "Integer",
            BuiltinType::Real => "Real",
            BuiltinType::Boolean => "Boolean",
        }
    }

    /// Type of a literal token
    pub fn from_literal(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::IntegerLiteral => Some(BuiltinType::Integer),
            TokenKind::RealLiteral => Some(BuiltinType::Real),
            TokenKind::BooleanLiteral => Some(BuiltinType::Boolean),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.name() == name)
    }

    pub fn is_builtin(name: &str) -> bool {
        Self::from_name(name).is_some()
    }
}

/// Name of the generic array type
pub const ARRAY: &str = "Array";

/// Split `Name[Arg]` into `("Name", Some("Arg"))`
pub fn split_generic(name: &str) -> (&str, Option<&str>) {
    match name.split_once('[') {
        Some((base, rest)) => (base, rest.strip_suffix(']')),
        None => (name, None),
    }
}

/// Name used for a missing type in messages
pub fn display_type(ty: Option<&str>) -> &str {
    ty.unwrap_or("void")
}
