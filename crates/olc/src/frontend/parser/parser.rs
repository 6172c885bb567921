//! O-language recursive descent parser

use crate::common::{CompileError, CompileResult};
use crate::frontend::ast::{Node, Nonterminal, SyntaxComponent};
use crate::frontend::lexer::{Lexer, Token, TokenKind};
use tracing::debug;

/// Predictive parser with one token of lookahead
pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
        }
    }

    /// Parse a complete compilation unit
    pub fn parse_program(&mut self) -> CompileResult<Node> {
        let mut program = self.open(SyntaxComponent::Program);

        while !self.lexer.is_exhausted() {
            let class = self.parse_class_declaration()?;
            program.push(class);
        }

        if let Some(err) = self.lexer.take_error() {
            return Err(err);
        }

        debug!(classes = program.children.len(), "parsed program");
        Ok(program.into())
    }

    // ==================== Declarations ====================

    fn parse_class_declaration(&mut self) -> CompileResult<Node> {
        let mut node = self.open(SyntaxComponent::ClassDeclaration);
        self.expect(&mut node, TokenKind::Class)?;
        node.push(self.parse_class_name()?);

        if self.check(TokenKind::Extends) {
            self.expect(&mut node, TokenKind::Extends)?;
            node.push(self.parse_class_name()?);
        }

        self.expect(&mut node, TokenKind::Is)?;
        node.push(self.parse_member_declarations()?);
        self.expect(&mut node, TokenKind::End)?;
        Ok(node.into())
    }

    fn parse_class_name(&mut self) -> CompileResult<Node> {
        let mut node = self.open(SyntaxComponent::ClassName);
        let token = self.next_token()?;
        if token.kind != TokenKind::Identifier && !token.kind.is_builtin_type_word() {
            return Err(CompileError::unexpected(&token.lexeme, token.span));
        }
        node.push_token(token);

        if self.check(TokenKind::OpenBracket) {
            self.expect(&mut node, TokenKind::OpenBracket)?;
            node.push(self.parse_class_name()?);
            self.expect(&mut node, TokenKind::CloseBracket)?;
        }
        Ok(node.into())
    }

    fn parse_member_declarations(&mut self) -> CompileResult<Node> {
        let mut node = self.open(SyntaxComponent::MemberDeclarations);
        while !self.check(TokenKind::End) {
            node.push(self.parse_member_declaration()?);
        }
        Ok(node.into())
    }

    fn parse_member_declaration(&mut self) -> CompileResult<Node> {
        let mut node = self.open(SyntaxComponent::MemberDeclaration);
        let member = match self.lexer.peek_kind() {
            Some(TokenKind::Var) => self.parse_variable_declaration()?,
            Some(TokenKind::Method) => self.parse_method_declaration()?,
            Some(TokenKind::This) => self.parse_constructor_declaration()?,
            _ => return Err(self.unexpected()),
        };
        node.push(member);
        Ok(node.into())
    }

    fn parse_variable_declaration(&mut self) -> CompileResult<Node> {
        let mut node = self.open(SyntaxComponent::VariableDeclaration);
        self.expect_sequence(
            &mut node,
            &[TokenKind::Var, TokenKind::Identifier, TokenKind::Colon],
        )?;
        node.push(self.parse_expression()?);
        Ok(node.into())
    }

    fn parse_method_declaration(&mut self) -> CompileResult<Node> {
        let mut node = self.open(SyntaxComponent::MethodDeclaration);
        self.expect_sequence(
            &mut node,
            &[TokenKind::Method, TokenKind::Identifier, TokenKind::OpenParen],
        )?;
        if !self.check(TokenKind::CloseParen) {
            node.push(self.parse_parameters()?);
        }
        self.expect(&mut node, TokenKind::CloseParen)?;

        if self.check(TokenKind::Colon) {
            self.expect(&mut node, TokenKind::Colon)?;
            let token = self.next_token()?;
            if token.kind != TokenKind::Identifier && !token.kind.is_builtin_type_word() {
                return Err(CompileError::unexpected(&token.lexeme, token.span));
            }
            node.push_token(token);
        }

        self.expect(&mut node, TokenKind::Is)?;
        node.push(self.parse_statements()?);
        self.expect(&mut node, TokenKind::End)?;
        Ok(node.into())
    }

    fn parse_constructor_declaration(&mut self) -> CompileResult<Node> {
        let mut node = self.open(SyntaxComponent::ConstructorDeclaration);
        self.expect_sequence(&mut node, &[TokenKind::This, TokenKind::OpenParen])?;
        if !self.check(TokenKind::CloseParen) {
            node.push(self.parse_parameters()?);
        }
        self.expect_sequence(&mut node, &[TokenKind::CloseParen, TokenKind::Is])?;
        node.push(self.parse_statements()?);
        self.expect(&mut node, TokenKind::End)?;
        Ok(node.into())
    }

    fn parse_parameters(&mut self) -> CompileResult<Node> {
        let mut node = self.open(SyntaxComponent::Parameters);
        node.push(self.parse_parameter()?);
        while self.check(TokenKind::Comma) {
            self.expect(&mut node, TokenKind::Comma)?;
            node.push(self.parse_parameter()?);
        }
        Ok(node.into())
    }

    /// `name: Type`, tagged as a variable declaration
    fn parse_parameter(&mut self) -> CompileResult<Node> {
        let mut node = self.open(SyntaxComponent::VariableDeclaration);
        self.expect_sequence(&mut node, &[TokenKind::Identifier, TokenKind::Colon])?;
        node.push(self.parse_class_name()?);
        Ok(node.into())
    }

    // ==================== Statements ====================

    fn parse_statements(&mut self) -> CompileResult<Node> {
        let mut node = self.open(SyntaxComponent::Statements);
        while !self.check(TokenKind::End) && !self.check(TokenKind::Else) {
            node.push(self.parse_statement()?);
        }
        Ok(node.into())
    }

    fn parse_statement(&mut self) -> CompileResult<Node> {
        let mut node = self.open(SyntaxComponent::Statement);
        let statement = match self.lexer.peek_kind() {
            Some(TokenKind::Var) => self.parse_variable_declaration()?,
            Some(TokenKind::While) => self.parse_while_loop()?,
            Some(TokenKind::If) => self.parse_if_statement()?,
            Some(TokenKind::Return) => self.parse_return_statement()?,
            Some(TokenKind::Identifier) => self.parse_assignment()?,
            _ => return Err(self.unexpected()),
        };
        node.push(statement);
        Ok(node.into())
    }

    fn parse_assignment(&mut self) -> CompileResult<Node> {
        let mut node = self.open(SyntaxComponent::Assignment);
        self.expect_sequence(&mut node, &[TokenKind::Identifier, TokenKind::Assign])?;
        node.push(self.parse_expression()?);
        Ok(node.into())
    }

    fn parse_if_statement(&mut self) -> CompileResult<Node> {
        let mut node = self.open(SyntaxComponent::IfStatement);
        self.expect(&mut node, TokenKind::If)?;
        node.push(self.parse_expression()?);
        self.expect(&mut node, TokenKind::Then)?;
        node.push(self.parse_statements()?);

        if self.check(TokenKind::Else) {
            self.expect(&mut node, TokenKind::Else)?;
            node.push(self.parse_statements()?);
        }

        self.expect(&mut node, TokenKind::End)?;
        Ok(node.into())
    }

    fn parse_while_loop(&mut self) -> CompileResult<Node> {
        let mut node = self.open(SyntaxComponent::WhileLoop);
        self.expect(&mut node, TokenKind::While)?;
        node.push(self.parse_expression()?);
        self.expect(&mut node, TokenKind::Loop)?;
        node.push(self.parse_statements()?);
        self.expect(&mut node, TokenKind::End)?;
        Ok(node.into())
    }

    fn parse_return_statement(&mut self) -> CompileResult<Node> {
        let mut node = self.open(SyntaxComponent::ReturnStatement);
        self.expect(&mut node, TokenKind::Return)?;
        if self.lexer.peek_kind().is_some_and(starts_primary) {
            node.push(self.parse_expression()?);
        }
        Ok(node.into())
    }

    // ==================== Expressions ====================

    fn parse_expression(&mut self) -> CompileResult<Node> {
        let mut node = self.open(SyntaxComponent::Expression);

        match self.lexer.peek_kind() {
            Some(kind) if kind.is_literal() || kind == TokenKind::This => {
                let token = self.next_token()?;
                node.push_token(token);
            }
            Some(kind) if kind == TokenKind::Identifier || kind.is_builtin_type_word() => {
                node.push(self.parse_class_name()?);
                // `Name(...)` is a constructor call
                if self.check(TokenKind::OpenParen) {
                    node.push(self.parse_arguments()?);
                }
            }
            _ => return Err(self.unexpected()),
        }

        while self.check(TokenKind::Dot) {
            self.expect_sequence(&mut node, &[TokenKind::Dot, TokenKind::Identifier])?;
            node.push(self.parse_arguments()?);
        }
        Ok(node.into())
    }

    fn parse_arguments(&mut self) -> CompileResult<Node> {
        let mut node = self.open(SyntaxComponent::Arguments);
        self.expect(&mut node, TokenKind::OpenParen)?;
        if !self.check(TokenKind::CloseParen) {
            node.push(self.parse_expression()?);
            while self.check(TokenKind::Comma) {
                self.expect(&mut node, TokenKind::Comma)?;
                node.push(self.parse_expression()?);
            }
        }
        self.expect(&mut node, TokenKind::CloseParen)?;
        Ok(node.into())
    }

    // ==================== Helpers ====================

    /// Empty node anchored at the current token
    fn open(&self, component: SyntaxComponent) -> Nonterminal {
        let span = self
            .lexer
            .current()
            .map_or_else(|| self.lexer.end_span(), |token| token.span);
        Nonterminal::new(component, span)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.lexer.peek_kind() == Some(kind)
    }

    fn next_token(&mut self) -> CompileResult<Token> {
        match self.lexer.next() {
            Some(token) => Ok(token),
            None => Err(self.end_of_input()),
        }
    }

    /// Consume a token of `kind` and append it to `node`
    fn expect(&mut self, node: &mut Nonterminal, kind: TokenKind) -> CompileResult<()> {
        let token = self.next_token()?;
        if token.kind != kind {
            return Err(CompileError::expected(kind, &token.lexeme, token.span));
        }
        node.push_token(token);
        Ok(())
    }

    fn expect_sequence(
        &mut self,
        node: &mut Nonterminal,
        kinds: &[TokenKind],
    ) -> CompileResult<()> {
        for &kind in kinds {
            self.expect(node, kind)?;
        }
        Ok(())
    }

    /// Error for a token no alternative accepts
    fn unexpected(&mut self) -> CompileError {
        match self.lexer.current() {
            Some(token) => CompileError::unexpected(&token.lexeme, token.span),
            None => self.end_of_input(),
        }
    }

    /// The lexer's recorded error, or a plain end-of-input error
    fn end_of_input(&mut self) -> CompileError {
        self.lexer.take_error().unwrap_or_else(|| {
            CompileError::syntax("Unexpected end of input", self.lexer.end_span())
        })
    }
}

fn starts_primary(kind: TokenKind) -> bool {
    kind.is_literal()
        || kind.is_builtin_type_word()
        || matches!(kind, TokenKind::This | TokenKind::Identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Node {
        Parser::new(source).parse_program().unwrap()
    }

    fn parse_err(source: &str) -> CompileError {
        Parser::new(source).parse_program().unwrap_err()
    }

    /// Shape of a node's children: component names or token lexemes
    fn shape(node: &Node) -> Vec<String> {
        node.children()
            .iter()
            .map(|child| match child {
                Node::Terminal(token) => token.lexeme.clone(),
                Node::Nonterminal(inner) => inner.component.to_string(),
            })
            .collect()
    }

    /// Body statements of the first member of the first class
    fn first_member_statements(program: &Node) -> &Node {
        let class = &program.children()[0];
        let members = class.child(SyntaxComponent::MemberDeclarations).unwrap();
        let member = &members.children()[0].children()[0];
        member.child(SyntaxComponent::Statements).unwrap()
    }

    #[test]
    fn test_parse_empty_class() {
        let program = parse("class A is end");
        assert!(program.is(SyntaxComponent::Program));
        assert_eq!(program.children().len(), 1);

        let class = &program.children()[0];
        assert_eq!(
            shape(class),
            vec!["class", "ClassName", "is", "MemberDeclarations", "end"]
        );
        assert_eq!(class.children()[1].class_name_text(), "A");
        assert!(class.children()[3].children().is_empty());
    }

    #[test]
    fn test_parse_empty_program() {
        let program = parse("  \n ");
        assert!(program.children().is_empty());
    }

    #[test]
    fn test_parse_extends_and_generic_name() {
        let program = parse("class Box extends Array[Integer] is end");
        let class = &program.children()[0];
        assert_eq!(
            shape(class),
            vec!["class", "ClassName", "extends", "ClassName", "is", "MemberDeclarations", "end"]
        );
        let parent = &class.children()[3];
        assert_eq!(shape(parent), vec!["Array", "[", "ClassName", "]"]);
        assert_eq!(parent.class_name_text(), "Array[Integer]");
    }

    #[test]
    fn test_parse_members() {
        let program = parse(
            "class Point is
                var x: 0
                this(a: Integer, b: Real) is end
                method get(): Integer is return x end
             end",
        );
        let members = program.children()[0]
            .child(SyntaxComponent::MemberDeclarations)
            .unwrap();
        let kinds: Vec<SyntaxComponent> = members
            .children()
            .iter()
            .map(|member| member.children()[0].component().unwrap())
            .collect();
        assert_eq!(
            kinds,
            vec![
                SyntaxComponent::VariableDeclaration,
                SyntaxComponent::ConstructorDeclaration,
                SyntaxComponent::MethodDeclaration,
            ]
        );

        let field = &members.children()[0].children()[0];
        assert_eq!(shape(field), vec!["var", "x", ":", "Expression"]);

        let ctor = &members.children()[1].children()[0];
        assert_eq!(
            shape(ctor),
            vec!["this", "(", "Parameters", ")", "is", "Statements", "end"]
        );
        let params = ctor.child(SyntaxComponent::Parameters).unwrap();
        assert_eq!(shape(params), vec!["VariableDeclaration", ",", "VariableDeclaration"]);
        assert_eq!(shape(&params.children()[0]), vec!["a", ":", "ClassName"]);

        let method = &members.children()[2].children()[0];
        assert_eq!(
            shape(method),
            vec!["method", "get", "(", ")", ":", "Integer", "is", "Statements", "end"]
        );
    }

    #[test]
    fn test_parse_control_flow() {
        let program = parse(
            "class A is
                method m(flag: Boolean) is
                    var i: 0
                    while flag loop
                        i := i.Plus(1)
                    end
                    if flag then return else return end
                end
             end",
        );
        let statements = first_member_statements(&program);
        let kinds: Vec<SyntaxComponent> = statements
            .children()
            .iter()
            .map(|statement| statement.children()[0].component().unwrap())
            .collect();
        assert_eq!(
            kinds,
            vec![
                SyntaxComponent::VariableDeclaration,
                SyntaxComponent::WhileLoop,
                SyntaxComponent::IfStatement,
            ]
        );

        let while_loop = &statements.children()[1].children()[0];
        assert_eq!(
            shape(while_loop),
            vec!["while", "Expression", "loop", "Statements", "end"]
        );

        let if_statement = &statements.children()[2].children()[0];
        assert_eq!(
            shape(if_statement),
            vec!["if", "Expression", "then", "Statements", "else", "Statements", "end"]
        );
        let then_branch = &if_statement.children()[3];
        assert_eq!(shape(&then_branch.children()[0].children()[0]), vec!["return"]);
    }

    #[test]
    fn test_parse_call_chain_and_constructor_call() {
        let program = parse(
            "class A is
                method m() is
                    x := Integer(5).Plus(y, 2.5).Less(this)
                end
             end",
        );
        let statements = first_member_statements(&program);
        let assignment = &statements.children()[0].children()[0];
        assert_eq!(shape(assignment), vec!["x", ":=", "Expression"]);

        let expression = &assignment.children()[2];
        assert_eq!(
            shape(expression),
            vec!["ClassName", "Arguments", ".", "Plus", "Arguments", ".", "Less", "Arguments"]
        );
        let plus_args = &expression.children()[4];
        assert_eq!(shape(plus_args), vec!["(", "Expression", ",", "Expression", ")"]);
        assert_eq!(shape(&expression.children()[7].children()[1]), vec!["this"]);
    }

    #[test]
    fn test_return_value_is_optional() {
        let program = parse(
            "class A is method m(): Integer is return 1 end method n() is return end end",
        );
        let members = program.children()[0]
            .child(SyntaxComponent::MemberDeclarations)
            .unwrap();
        let returns: Vec<usize> = members
            .children()
            .iter()
            .map(|member| {
                let statements = member.children()[0]
                    .child(SyntaxComponent::Statements)
                    .unwrap();
                statements.children()[0].children()[0].children().len()
            })
            .collect();
        assert_eq!(returns, vec![2, 1]);
    }

    #[test]
    fn test_node_span_starts_at_first_token() {
        let program = parse("\n  class A is end");
        let class = &program.children()[0];
        assert_eq!((class.span().line, class.span().column), (2, 3));
        assert_eq!((program.span().line, program.span().column), (2, 3));
    }

    #[test]
    fn test_expected_token_error() {
        let err = parse_err("class A end");
        assert!(err.is_syntax());
        assert_eq!(err.message(), "Expected 'is' but got \"end\"");
        assert_eq!(err.span().map(|s| (s.line, s.column)), Some((1, 9)));
    }

    #[test]
    fn test_top_level_must_be_class() {
        let err = parse_err("var x: 1");
        assert_eq!(err.message(), "Expected 'class' but got \"var\"");
    }

    #[test]
    fn test_unexpected_token_at_choice_point() {
        let err = parse_err("class A is return end");
        assert_eq!(err.message(), "Unexpected \"return\"");
    }

    #[test]
    fn test_operators_are_rejected() {
        let err = parse_err("class A is method m() is x := 1 + 2 end end");
        assert_eq!(err.message(), "Unexpected \"+\"");
    }

    #[test]
    fn test_unexpected_end_of_input() {
        let err = parse_err("class A is method m() is");
        assert!(err.is_syntax());
        assert_eq!(err.message(), "Unexpected end of input");
    }

    #[test]
    fn test_lexer_error_surfaces_mid_rule() {
        let err = parse_err("class A is var x: @ end");
        assert!(matches!(err, CompileError::Lexer { .. }));
        assert_eq!(err.message(), "Unexpected symbol: '@'");
    }

    #[test]
    fn test_lexer_error_after_last_class() {
        let err = parse_err("class A is end #");
        assert!(matches!(err, CompileError::Lexer { .. }));
    }
}
