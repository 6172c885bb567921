//! O-language semantic analysis module

mod analyzer;
mod scope;
mod symbols;
mod types;

pub use analyzer::{SemanticAnalyzer, STANDARD_LIBRARY};
pub use scope::Scope;
pub use symbols::{
    ClassId, ClassSymbol, ConstructorSymbol, MethodSymbol, ParameterSymbol, SymbolTable,
    VariableSymbol,
};
pub use types::BuiltinType;
