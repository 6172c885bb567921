//! Lexical scopes for method and constructor bodies

use super::symbols::VariableSymbol;
use std::collections::BTreeMap;

/// A chained table of local variables.
///
/// A child scope borrows its parent for as long as the block it belongs to
/// is being analyzed, and is dropped with it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scope<'p> {
    variables: BTreeMap<String, VariableSymbol>,
    parent: Option<&'p Scope<'p>>,
}

impl<'p> Scope<'p> {
    pub fn new() -> Self {
        Self {
            variables: BTreeMap::new(),
            parent: None,
        }
    }

    /// New empty scope nested in `parent`
    pub fn child(parent: &'p Scope<'p>) -> Self {
        Self {
            variables: BTreeMap::new(),
            parent: Some(parent),
        }
    }

    /// Define a variable in this scope
    pub fn define(&mut self, symbol: VariableSymbol) -> Result<(), String> {
        if self.variables.contains_key(&symbol.name) {
            return Err(format!("Variable {} already exists", symbol.name));
        }
        self.variables.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Look up a variable here or in any enclosing scope
    pub fn lookup(&self, name: &str) -> Option<&VariableSymbol> {
        if let Some(symbol) = self.variables.get(name) {
            Some(symbol)
        } else if let Some(parent) = self.parent {
            parent.lookup(name)
        } else {
            None
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Variables defined directly in this scope
    pub fn variables(&self) -> impl Iterator<Item = &VariableSymbol> {
        self.variables.values()
    }
}
