//! Two-pass semantic analyzer for O-language programs

use super::scope::Scope;
use super::symbols::{
    ClassId, ConstructorSymbol, MethodSymbol, ParameterSymbol, SymbolTable, VariableSymbol,
};
use super::types::{display_type, BuiltinType};
use crate::common::{CompileError, CompileResult, Span};
use crate::frontend::ast::{Node, SyntaxComponent};
use crate::frontend::lexer::TokenKind;
use crate::frontend::parser::Parser;
use std::path::Path;
use tracing::{debug, info, trace};

/// Source of the standard prelude
pub const STANDARD_LIBRARY: &str = include_str!("../../../stdlib/Library.ol");

/// Semantic analyzer.
///
/// Owns the symbol table. Units analyzed one after another (a prelude, then
/// the user program) register into the same table.
#[derive(Debug, Default)]
pub struct SemanticAnalyzer {
    table: SymbolTable,
}

/// A method or constructor whose body still has to be checked
struct PendingBody<'n> {
    class: ClassId,
    member: MemberRef,
    node: &'n Node,
}

enum MemberRef {
    Method { name: String, index: usize },
    Constructor { index: usize },
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyzer with the standard prelude already registered
    pub fn with_standard_library() -> CompileResult<Self> {
        let mut analyzer = Self::new();
        analyzer.analyze_predefined_source(STANDARD_LIBRARY)?;
        Ok(analyzer)
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn into_table(self) -> SymbolTable {
        self.table
    }

    /// Parse the unit at `path` and register it into this analyzer's table
    pub fn analyze_predefined_libraries(&mut self, path: &Path) -> CompileResult<()> {
        info!(path = %path.display(), "loading prelude");
        let source = std::fs::read_to_string(path)?;
        self.analyze_predefined_source(&source)
    }

    /// Parse `source` and register it into this analyzer's table
    pub fn analyze_predefined_source(&mut self, source: &str) -> CompileResult<()> {
        let program = Parser::new(source).parse_program()?;
        self.analyze(&program)
    }

    /// Analyze a program, stopping at the first error
    pub fn analyze(&mut self, program: &Node) -> CompileResult<()> {
        if !program.is(SyntaxComponent::Program) {
            return Err(CompileError::semantic("Expected a program", program.span()));
        }

        let classes = self.fetch_types(program)?;
        self.table.resolve_parents()?;
        debug!(classes = classes.len(), "registered types");

        let mut pending = Vec::new();
        for &(id, decl) in &classes {
            self.register_signatures(id, decl, &mut pending)?;
        }

        // Parents first, so inherited fields have types when children read them
        let mut by_depth = classes.clone();
        by_depth.sort_by_key(|&(id, _)| self.table.ancestors(id).count());
        for &(id, decl) in &by_depth {
            self.analyze_fields(id, decl)?;
        }

        for body in &pending {
            let scope = self.analyze_body(body)?;
            let class = self.table.class_mut(body.class);
            match &body.member {
                MemberRef::Method { name, index } => {
                    let overloads = class.methods.get_mut(name);
                    if let Some(method) = overloads.and_then(|m| m.get_mut(*index)) {
                        method.scope = scope;
                    }
                }
                MemberRef::Constructor { index } => {
                    if let Some(constructor) = class.constructors.get_mut(*index) {
                        constructor.scope = scope;
                    }
                }
            }
        }

        info!(bodies = pending.len(), "semantic analysis complete");
        Ok(())
    }

    // ==================== Pass 1: types ====================

    fn fetch_types<'n>(&mut self, program: &'n Node) -> CompileResult<Vec<(ClassId, &'n Node)>> {
        let mut classes = Vec::new();
        for decl in program.children() {
            if !decl.is(SyntaxComponent::ClassDeclaration) {
                return Err(CompileError::semantic("Expected a class declaration", decl.span()));
            }

            let mut names = decl
                .children()
                .iter()
                .filter(|node| node.is(SyntaxComponent::ClassName));
            let name_node = names
                .next()
                .ok_or_else(|| CompileError::semantic("Class name is missing", decl.span()))?;
            let parent = names.next().map(Node::class_name_text);

            let name = base_name(name_node);
            let id = self.table.declare_class(name, parent, name_node.span())?;
            debug!(class = name, "declared class");
            classes.push((id, decl));
        }
        Ok(classes)
    }

    // ==================== Pass 2a: signatures ====================

    fn register_signatures<'n>(
        &mut self,
        id: ClassId,
        decl: &'n Node,
        pending: &mut Vec<PendingBody<'n>>,
    ) -> CompileResult<()> {
        for member in members(decl) {
            match member.component() {
                Some(SyntaxComponent::MethodDeclaration) => {
                    let name = part(member, 1)?.lexeme().to_string();
                    let params = self.parameters(member)?;
                    let return_type = match return_type_node(member) {
                        Some(node) => {
                            let ty = node.lexeme().to_string();
                            if !self.table.is_known_type(&ty) {
                                return Err(CompileError::semantic(
                                    format!("Type {ty} is not defined"),
                                    node.span(),
                                ));
                            }
                            Some(ty)
                        }
                        None => None,
                    };

                    let symbol =
                        MethodSymbol::new(name.clone(), params, return_type, member.span());
                    trace!(
                        class = %self.table.class(id).name,
                        method = %symbol.signature(),
                        "registered method"
                    );
                    let index = self
                        .table
                        .class_mut(id)
                        .add_method(symbol)
                        .map_err(|message| CompileError::semantic(message, member.span()))?;
                    pending.push(PendingBody {
                        class: id,
                        member: MemberRef::Method { name, index },
                        node: member,
                    });
                }
                Some(SyntaxComponent::ConstructorDeclaration) => {
                    let params = self.parameters(member)?;
                    let index = self
                        .table
                        .class_mut(id)
                        .add_constructor(ConstructorSymbol::new(params, member.span()))
                        .map_err(|message| CompileError::semantic(message, member.span()))?;
                    pending.push(PendingBody {
                        class: id,
                        member: MemberRef::Constructor { index },
                        node: member,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn parameters(&self, member: &Node) -> CompileResult<Vec<ParameterSymbol>> {
        let Some(list) = member.child(SyntaxComponent::Parameters) else {
            return Ok(Vec::new());
        };

        let mut params: Vec<ParameterSymbol> = Vec::new();
        for param in list.children().iter().filter(|n| n.is(SyntaxComponent::VariableDeclaration)) {
            let name_node = part(param, 0)?;
            let type_node = param
                .child(SyntaxComponent::ClassName)
                .ok_or_else(|| CompileError::semantic("Parameter type is missing", param.span()))?;

            let name = name_node.lexeme();
            if params.iter().any(|p| p.name == name) {
                return Err(CompileError::semantic(
                    format!("Parameter {name} already exists"),
                    name_node.span(),
                ));
            }

            let ty = type_node.class_name_text();
            if !self.table.is_known_type(&ty) {
                return Err(CompileError::semantic(
                    format!("Type {ty} is not defined"),
                    type_node.span(),
                ));
            }
            params.push(ParameterSymbol::new(name, ty));
        }
        Ok(params)
    }

    // ==================== Pass 2b: fields ====================

    fn analyze_fields(&mut self, id: ClassId, decl: &Node) -> CompileResult<()> {
        for member in members(decl) {
            if !member.is(SyntaxComponent::VariableDeclaration) {
                continue;
            }
            let name_node = part(member, 1)?;
            let name = name_node.lexeme();
            let class = self.table.class(id);
            if class.fields.contains_key(name) {
                return Err(CompileError::semantic(
                    format!("Variable {name} already exists in class {}", class.name),
                    name_node.span(),
                ));
            }

            let ctx = BodyContext {
                table: &self.table,
                class: id,
                member: Member::Field,
            };
            let ty = ctx.resolve_expression(initializer(member)?, &Scope::new())?;
            trace!(class = %class.name, field = name, ty = %ty, "registered field");

            self.table
                .class_mut(id)
                .add_field(VariableSymbol::new(name, ty))
                .map_err(|message| CompileError::semantic(message, name_node.span()))?;
        }
        Ok(())
    }

    // ==================== Pass 2c: bodies ====================

    fn analyze_body(&self, body: &PendingBody<'_>) -> CompileResult<Scope<'static>> {
        let class = self.table.class(body.class);
        let (params, member) = match &body.member {
            MemberRef::Method { name, index } => {
                let method = &class.methods[name][*index];
                (
                    &method.params,
                    Member::Method {
                        return_type: method.return_type.as_deref(),
                    },
                )
            }
            MemberRef::Constructor { index } => {
                (&class.constructors[*index].params, Member::Constructor)
            }
        };

        let mut scope = Scope::new();
        for param in params {
            scope
                .define(param.into())
                .map_err(|message| CompileError::semantic(message, body.node.span()))?;
        }

        let statements = body
            .node
            .child(SyntaxComponent::Statements)
            .ok_or_else(|| CompileError::semantic("Body is missing", body.node.span()))?;

        let ctx = BodyContext {
            table: &self.table,
            class: body.class,
            member,
        };
        ctx.analyze_statements(statements, &mut scope)?;
        Ok(scope)
    }
}

/// The kind of member whose code is being checked
#[derive(Debug, Clone, Copy)]
enum Member<'t> {
    Field,
    Method { return_type: Option<&'t str> },
    Constructor,
}

/// Read-only view used while checking one member
struct BodyContext<'t> {
    table: &'t SymbolTable,
    class: ClassId,
    member: Member<'t>,
}

impl BodyContext<'_> {
    fn class_name(&self) -> &str {
        &self.table.class(self.class).name
    }

    // ==================== Statements ====================

    fn analyze_statements<'p>(
        &self,
        statements: &Node,
        scope: &mut Scope<'p>,
    ) -> CompileResult<()> {
        for statement in statements.children() {
            let inner = part(statement, 0)?;
            match inner.component() {
                Some(SyntaxComponent::VariableDeclaration) => self.analyze_local(inner, scope)?,
                Some(SyntaxComponent::Assignment) => self.analyze_assignment(inner, scope)?,
                Some(SyntaxComponent::ReturnStatement) => self.analyze_return(inner, scope)?,
                Some(SyntaxComponent::IfStatement) => {
                    self.analyze_conditional(inner, scope, "if statement")?;
                }
                Some(SyntaxComponent::WhileLoop) => {
                    self.analyze_conditional(inner, scope, "while loop")?;
                }
                _ => {
                    return Err(CompileError::semantic("Unknown statement", inner.span()));
                }
            }
        }
        Ok(())
    }

    fn analyze_local(&self, decl: &Node, scope: &mut Scope<'_>) -> CompileResult<()> {
        let name_node = part(decl, 1)?;
        let name = name_node.lexeme();
        if scope.contains(name) || self.table.field_lookup(self.class, name).is_some() {
            return Err(CompileError::semantic(
                format!("Variable {name} already exists"),
                name_node.span(),
            ));
        }

        let ty = self.resolve_expression(initializer(decl)?, scope)?;
        scope
            .define(VariableSymbol::new(name, ty))
            .map_err(|message| CompileError::semantic(message, name_node.span()))
    }

    fn analyze_assignment(&self, assignment: &Node, scope: &Scope<'_>) -> CompileResult<()> {
        let target = part(assignment, 0)?;
        let value = self.resolve_expression(initializer(assignment)?, scope)?;

        let name = target.lexeme();
        let expected = scope
            .lookup(name)
            .or_else(|| self.table.field_lookup(self.class, name))
            .map(|variable| variable.ty.as_str())
            .ok_or_else(|| {
                CompileError::semantic(format!("Variable {name} is not defined"), target.span())
            })?;

        if value != expected {
            return Err(CompileError::semantic(
                format!("Unexpected type {value} for variable {name}, expected {expected}"),
                assignment.span(),
            ));
        }
        Ok(())
    }

    fn analyze_return(&self, statement: &Node, scope: &Scope<'_>) -> CompileResult<()> {
        let value = statement
            .child(SyntaxComponent::Expression)
            .map(|expr| self.resolve_expression(expr, scope))
            .transpose()?;

        match self.member {
            Member::Method {
                return_type: Some(expected),
            } if value.as_deref() != Some(expected) => Err(CompileError::semantic(
                format!(
                    "Unexpected return type {}, expected {expected}",
                    display_type(value.as_deref())
                ),
                statement.span(),
            )),
            Member::Constructor if value.is_some() => Err(CompileError::semantic(
                "Constructor cannot return a value",
                statement.span(),
            )),
            _ => Ok(()),
        }
    }

    /// `if` and `while`: Boolean condition, body in a child scope
    fn analyze_conditional(&self, node: &Node, scope: &Scope<'_>, what: &str) -> CompileResult<()> {
        let condition = node
            .child(SyntaxComponent::Expression)
            .ok_or_else(|| CompileError::semantic("Condition is missing", node.span()))?;

        let mut inner = Scope::child(scope);
        let ty = self.resolve_expression(condition, &inner)?;
        if ty != BuiltinType::Boolean.name() {
            return Err(CompileError::semantic(
                format!("Condition of {what} must be Boolean, got {ty}"),
                condition.span(),
            ));
        }

        let mut branches = node
            .children()
            .iter()
            .filter(|child| child.is(SyntaxComponent::Statements));
        if let Some(body) = branches.next() {
            self.analyze_statements(body, &mut inner)?;
        }
        if let Some(otherwise) = branches.next() {
            let mut else_scope = Scope::child(scope);
            self.analyze_statements(otherwise, &mut else_scope)?;
        }
        Ok(())
    }

    // ==================== Expressions ====================

    fn resolve_expression(&self, expr: &Node, scope: &Scope<'_>) -> CompileResult<String> {
        self.resolve_chain(expr.children(), scope, expr.span())
    }

    /// Resolve the primary, then each `.name(args)` selector left to right,
    /// threading the type so far
    fn resolve_chain(&self, nodes: &[Node], scope: &Scope<'_>, at: Span) -> CompileResult<String> {
        let (mut carry, mut rest, mut at) = self.resolve_primary(nodes, scope, at)?;

        loop {
            match rest {
                [] => return carry.ok_or_else(|| CompileError::semantic("Invalid expression", at)),
                [dot, name_node, args, tail @ ..] if dot.is_token(TokenKind::Dot) => {
                    let name = name_node.lexeme();
                    let unresolved = || {
                        CompileError::semantic(
                            format!("Cannot resolve method {name}"),
                            name_node.span(),
                        )
                    };

                    let receiver = carry.ok_or_else(unresolved)?;
                    let arg_types = self.argument_types(args, scope)?;
                    let method = self
                        .table
                        .lookup_class(&receiver)
                        .and_then(|id| self.table.method_lookup(id, name, &arg_types))
                        .ok_or_else(unresolved)?;
                    trace!(receiver = %receiver, method = %method.signature(), "resolved call");

                    carry = method.return_type.clone();
                    at = name_node.span();
                    rest = tail;
                }
                [other, ..] => {
                    return Err(CompileError::semantic("Invalid expression", other.span()));
                }
            }
        }
    }

    /// Type of the leading primary and the selectors that follow it
    fn resolve_primary<'n>(
        &self,
        nodes: &'n [Node],
        scope: &Scope<'_>,
        at: Span,
    ) -> CompileResult<(Option<String>, &'n [Node], Span)> {
        let Some((head, rest)) = nodes.split_first() else {
            return Err(CompileError::semantic("Invalid expression", at));
        };

        match head {
            Node::Nonterminal(inner) if inner.component == SyntaxComponent::ClassName => {
                match rest.split_first() {
                    Some((args, tail)) if args.is(SyntaxComponent::Arguments) => {
                        let ty = self.resolve_constructor_call(head, args, scope)?;
                        Ok((Some(ty), tail, head.span()))
                    }
                    _ => {
                        let ty = self.resolve_name(head, scope)?;
                        Ok((Some(ty), rest, head.span()))
                    }
                }
            }
            // A selector with nothing before it has no receiver
            Node::Terminal(token) if token.kind == TokenKind::Dot => Ok((None, nodes, at)),
            Node::Terminal(token) if token.kind == TokenKind::This => {
                Ok((Some(self.class_name().to_string()), rest, token.span))
            }
            Node::Terminal(token) => match BuiltinType::from_literal(token.kind) {
                Some(ty) => Ok((Some(ty.name().to_string()), rest, token.span)),
                None => Err(CompileError::semantic("Invalid expression", token.span)),
            },
            Node::Nonterminal(inner) => {
                Err(CompileError::semantic("Invalid expression", inner.span))
            }
        }
    }

    /// A bare name: a type, then a local or parameter, then a field
    fn resolve_name(&self, class_name: &Node, scope: &Scope<'_>) -> CompileResult<String> {
        let text = class_name.class_name_text();
        if self.table.is_known_type(&text) {
            return Ok(text);
        }
        if class_name.children().len() > 1 {
            return Err(CompileError::semantic(
                format!("Type {text} is not defined"),
                class_name.span(),
            ));
        }

        scope
            .lookup(&text)
            .or_else(|| self.table.field_lookup(self.class, &text))
            .map(|variable| variable.ty.clone())
            .ok_or_else(|| {
                CompileError::semantic(format!("Variable {text} is not defined"), class_name.span())
            })
    }

    /// `Name(args)`: an exact constructor match through the parent chain
    fn resolve_constructor_call(
        &self,
        class_name: &Node,
        args: &Node,
        scope: &Scope<'_>,
    ) -> CompileResult<String> {
        let ty = class_name.class_name_text();
        if !self.table.is_known_type(&ty) {
            return Err(CompileError::semantic(
                format!("Type {ty} is not defined"),
                class_name.span(),
            ));
        }

        let arg_types = self.argument_types(args, scope)?;
        let found = match self.table.lookup_class(&ty) {
            Some(id) => {
                (arg_types.is_empty() && self.table.has_implicit_constructor(id))
                    || self.table.constructor_lookup(id, &arg_types).is_some()
            }
            None => arg_types.is_empty(),
        };

        if found {
            Ok(ty)
        } else {
            Err(CompileError::semantic(
                format!("Cannot resolve constructor {ty}({})", arg_types.join(", ")),
                class_name.span(),
            ))
        }
    }

    fn argument_types(&self, args: &Node, scope: &Scope<'_>) -> CompileResult<Vec<String>> {
        args.children()
            .iter()
            .filter(|node| node.is(SyntaxComponent::Expression))
            .map(|expr| self.resolve_expression(expr, scope))
            .collect()
    }
}

// ==================== Tree access ====================

/// Declarations inside a class body, unwrapped from their MemberDeclaration
fn members(decl: &Node) -> impl Iterator<Item = &Node> {
    decl.child(SyntaxComponent::MemberDeclarations)
        .map(Node::children)
        .unwrap_or_default()
        .iter()
        .filter_map(|member| member.children().first())
}

fn part(node: &Node, index: usize) -> CompileResult<&Node> {
    node.children()
        .get(index)
        .ok_or_else(|| CompileError::semantic("Malformed syntax tree", node.span()))
}

fn initializer(node: &Node) -> CompileResult<&Node> {
    node.child(SyntaxComponent::Expression)
        .ok_or_else(|| CompileError::semantic("Expression is missing", node.span()))
}

/// The declared-type terminal after `:` in a method header
fn return_type_node(method: &Node) -> Option<&Node> {
    let children = method.children();
    let colon = children.iter().position(|n| n.is_token(TokenKind::Colon))?;
    children.get(colon + 1)
}

/// Name a class is registered under; `Box[T]` registers `Box`
fn base_name(class_name: &Node) -> &str {
    class_name.children().first().map_or("", Node::lexeme)
}
