//! Class, member and variable symbols

use super::scope::Scope;
use super::types::{split_generic, BuiltinType, ARRAY};
use crate::common::{CompileError, CompileResult, Span};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Index of a class in the [`SymbolTable`]
pub type ClassId = usize;

/// A local variable or field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSymbol {
    pub name: String,
    pub ty: String,
}

impl VariableSymbol {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// A method or constructor parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSymbol {
    pub name: String,
    pub ty: String,
}

impl ParameterSymbol {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

impl From<&ParameterSymbol> for VariableSymbol {
    fn from(param: &ParameterSymbol) -> Self {
        VariableSymbol::new(param.name.clone(), param.ty.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSymbol {
    pub name: String,
    pub params: Vec<ParameterSymbol>,
    /// `None` for methods without a declared result
    pub return_type: Option<String>,
    /// Parameters and top-level locals, filled in once the body is analyzed
    pub scope: Scope<'static>,
    pub span: Span,
}

impl MethodSymbol {
    pub fn new(
        name: impl Into<String>,
        params: Vec<ParameterSymbol>,
        return_type: Option<String>,
        span: Span,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            scope: Scope::new(),
            span,
        }
    }

    pub fn accepts(&self, arg_types: &[String]) -> bool {
        same_types(&self.params, arg_types)
    }

    /// `name(T1, T2)`
    pub fn signature(&self) -> String {
        signature(&self.name, &self.params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorSymbol {
    pub params: Vec<ParameterSymbol>,
    pub scope: Scope<'static>,
    pub span: Span,
}

impl ConstructorSymbol {
    pub fn new(params: Vec<ParameterSymbol>, span: Span) -> Self {
        Self {
            params,
            scope: Scope::new(),
            span,
        }
    }

    pub fn accepts(&self, arg_types: &[String]) -> bool {
        same_types(&self.params, arg_types)
    }
}

fn same_types(params: &[ParameterSymbol], arg_types: &[String]) -> bool {
    params.len() == arg_types.len()
        && params.iter().zip(arg_types).all(|(param, arg)| param.ty == *arg)
}

fn signature(name: &str, params: &[ParameterSymbol]) -> String {
    let types: Vec<&str> = params.iter().map(|p| p.ty.as_str()).collect();
    format!("{name}({})", types.join(", "))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSymbol {
    pub name: String,
    pub parent_name: Option<String>,
    /// Set by [`SymbolTable::resolve_parents`]
    pub parent: Option<ClassId>,
    pub span: Span,
    /// Overload sets by method name
    pub methods: BTreeMap<String, Vec<MethodSymbol>>,
    pub constructors: Vec<ConstructorSymbol>,
    pub fields: BTreeMap<String, VariableSymbol>,
}

impl ClassSymbol {
    pub fn new(name: impl Into<String>, parent_name: Option<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            parent_name,
            parent: None,
            span,
            methods: BTreeMap::new(),
            constructors: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Register an overload; rejects a duplicate parameter-type list
    pub fn add_method(&mut self, method: MethodSymbol) -> Result<usize, String> {
        let overloads = self.methods.entry(method.name.clone()).or_default();
        let types: Vec<String> = method.params.iter().map(|p| p.ty.clone()).collect();
        if overloads.iter().any(|existing| existing.accepts(&types)) {
            return Err(format!("Method {} already exists", method.signature()));
        }
        overloads.push(method);
        Ok(overloads.len() - 1)
    }

    pub fn add_constructor(&mut self, constructor: ConstructorSymbol) -> Result<usize, String> {
        let types: Vec<String> = constructor.params.iter().map(|p| p.ty.clone()).collect();
        if self.constructors.iter().any(|existing| existing.accepts(&types)) {
            return Err(format!(
                "Constructor {} already exists",
                signature(&self.name, &constructor.params)
            ));
        }
        self.constructors.push(constructor);
        Ok(self.constructors.len() - 1)
    }

    pub fn add_field(&mut self, field: VariableSymbol) -> Result<(), String> {
        if self.fields.contains_key(&field.name) {
            return Err(format!(
                "Variable {} already exists in class {}",
                field.name, self.name
            ));
        }
        self.fields.insert(field.name.clone(), field);
        Ok(())
    }
}

/// Every class known to one analyzer, indexed by [`ClassId`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SymbolTable {
    classes: Vec<ClassSymbol>,
    by_name: HashMap<String, ClassId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class name; names are globally unique
    pub fn declare_class(
        &mut self,
        name: &str,
        parent_name: Option<String>,
        span: Span,
    ) -> CompileResult<ClassId> {
        if self.by_name.contains_key(name) {
            return Err(CompileError::semantic(
                format!("Class {name} already exists"),
                span,
            ));
        }
        let id = self.classes.len();
        self.classes.push(ClassSymbol::new(name, parent_name, span));
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn class(&self, id: ClassId) -> &ClassSymbol {
        &self.classes[id]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassSymbol {
        &mut self.classes[id]
    }

    /// Class behind a type name; `Name[T]` resolves to `Name`
    pub fn lookup_class(&self, ty: &str) -> Option<ClassId> {
        let (base, _) = split_generic(ty);
        self.class_id(base)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Whether `ty` names a built-in, a declared class, or a generic over known types
    pub fn is_known_type(&self, ty: &str) -> bool {
        match split_generic(ty) {
            (base, Some(arg)) => {
                (base == ARRAY || self.class_id(base).is_some()) && self.is_known_type(arg)
            }
            (name, None) => BuiltinType::is_builtin(name) || self.class_id(name).is_some(),
        }
    }

    /// Bind every parent name to its class and reject inheritance cycles
    pub fn resolve_parents(&mut self) -> CompileResult<()> {
        for id in 0..self.classes.len() {
            let class = &self.classes[id];
            let Some(parent_name) = &class.parent_name else {
                continue;
            };
            let Some(parent) = self.lookup_class(parent_name) else {
                let (base, _) = split_generic(parent_name);
                // Built-in names are only extendable once a prelude declares them as classes
                let message = if base == ARRAY || BuiltinType::is_builtin(base) {
                    format!("Cannot extend built-in type {parent_name} without a prelude class")
                } else {
                    format!("Type {parent_name} is not defined")
                };
                return Err(CompileError::semantic(message, class.span));
            };
            self.classes[id].parent = Some(parent);
        }

        for id in 0..self.classes.len() {
            let mut current = self.classes[id].parent;
            for _ in 0..self.classes.len() {
                match current {
                    Some(ancestor) if ancestor == id => {
                        let class = &self.classes[id];
                        return Err(CompileError::semantic(
                            format!("Inheritance cycle detected for class {}", class.name),
                            class.span,
                        ));
                    }
                    Some(ancestor) => current = self.classes[ancestor].parent,
                    None => break,
                }
            }
        }
        Ok(())
    }

    /// The class itself followed by its parents, nearest first
    pub fn ancestors(&self, id: ClassId) -> impl Iterator<Item = &ClassSymbol> {
        std::iter::successors(Some(&self.classes[id]), |class| {
            class.parent.map(|parent| &self.classes[parent])
        })
        .take(self.classes.len())
    }

    /// Field of `id` or of one of its parents
    pub fn field_lookup(&self, id: ClassId, name: &str) -> Option<&VariableSymbol> {
        self.ancestors(id).find_map(|class| class.fields.get(name))
    }

    /// Overload of `name` whose parameter types equal `arg_types` exactly,
    /// searching the class first and then its parents
    pub fn method_lookup(
        &self,
        id: ClassId,
        name: &str,
        arg_types: &[String],
    ) -> Option<&MethodSymbol> {
        self.ancestors(id).find_map(|class| {
            class
                .methods
                .get(name)
                .and_then(|overloads| overloads.iter().find(|m| m.accepts(arg_types)))
        })
    }

    pub fn constructor_lookup(
        &self,
        id: ClassId,
        arg_types: &[String],
    ) -> Option<&ConstructorSymbol> {
        self.ancestors(id)
            .find_map(|class| class.constructors.iter().find(|c| c.accepts(arg_types)))
    }

    /// No constructor is declared anywhere in the chain
    pub fn has_implicit_constructor(&self, id: ClassId) -> bool {
        self.ancestors(id).all(|class| class.constructors.is_empty())
    }
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for class in &self.classes {
            match &class.parent_name {
                Some(parent) => writeln!(f, "class {} extends {}", class.name, parent)?,
                None => writeln!(f, "class {}", class.name)?,
            }
            for field in class.fields.values() {
                writeln!(f, "  var {}: {}", field.name, field.ty)?;
            }
            for constructor in &class.constructors {
                writeln!(f, "  {}", signature("this", &constructor.params))?;
            }
            for method in class.methods.values().flatten() {
                match &method.return_type {
                    Some(ty) => writeln!(f, "  method {}: {}", method.signature(), ty)?,
                    None => writeln!(f, "  method {}", method.signature())?,
                }
            }
        }
        Ok(())
    }
}
