// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The main parser implementation.

use crate::Error;
use crate::ast::*;
use crate::lexer::{Scanner, Span, Token, TokenKind};
use num_bigint::BigInt;

/// A recursive descent parser for Lox.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    current: Token,
    previous: Token,
}

/// Saved parser position for speculative parsing.
struct Checkpoint<'a> {
    scanner: Scanner<'a>,
    current: Token,
    previous: Token,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source code.
    pub fn new(source: &'a str) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Self {
            scanner,
            current,
            previous: Token::new(TokenKind::Eof, Span::new(0, 0)),
        }
    }

    /// Parses the source code into a Program AST node.
    pub fn parse_program(&mut self) -> Result<Program, Error> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_declaration()?);
        }

        Ok(Program { body })
    }

    /// Parses a declaration or statement.
    pub fn parse_declaration(&mut self) -> Result<Statement, Error> {
        match &self.current.kind {
            TokenKind::Var => {
                let declaration = self.parse_var_declaration_no_semi()?;
                self.expect(&TokenKind::Semicolon)?;
                Ok(Statement::VarDeclaration(declaration))
            }
            TokenKind::Fun => self.parse_function_declaration(),
            TokenKind::Identifier(_) if self.peek_kind() == TokenKind::ColonEqual => {
                self.parse_short_declaration()
            }
            _ => self.parse_statement(),
        }
    }

    /// Parses a single statement.
    pub fn parse_statement(&mut self) -> Result<Statement, Error> {
        match &self.current.kind {
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::LeftBrace => {
                let body = self.parse_block()?;
                Ok(Statement::Block(BlockStatement { body }))
            }
            TokenKind::Semicolon => {
                self.advance();
                Ok(Statement::Empty)
            }
            _ => self.parse_simple_statement(),
        }
    }

    /// Parses a statement that may carry a postfix `if`/`unless` guard.
    fn parse_simple_statement(&mut self) -> Result<Statement, Error> {
        let statement = match &self.current.kind {
            TokenKind::Print => {
                self.advance();
                let argument = self.parse_expression()?;
                Statement::Print(PrintStatement { argument })
            }
            TokenKind::Return => {
                self.advance();
                let argument = if self.check(&TokenKind::Semicolon) || self.at_guard() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                Statement::Return(ReturnStatement { argument })
            }
            TokenKind::Break => {
                self.advance();
                Statement::Break(self.previous.span)
            }
            TokenKind::Continue => {
                self.advance();
                Statement::Continue(self.previous.span)
            }
            _ => {
                let expression = self.parse_expression()?;
                Statement::Expression(ExpressionStatement { expression })
            }
        };

        let statement = self.parse_guard(statement)?;
        self.expect(&TokenKind::Semicolon)?;
        Ok(statement)
    }

    fn at_guard(&self) -> bool {
        self.check(&TokenKind::If) || self.check(&TokenKind::Unless)
    }

    fn parse_guard(&mut self, statement: Statement) -> Result<Statement, Error> {
        let guard = match self.current.kind {
            TokenKind::If => Guard::If,
            TokenKind::Unless => Guard::Unless,
            _ => return Ok(statement),
        };
        self.advance();
        self.expect(&TokenKind::LeftParen)?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        Ok(Statement::Guarded(GuardedStatement {
            statement: Box::new(statement),
            guard,
            condition,
        }))
    }

    fn parse_var_declaration_no_semi(&mut self) -> Result<VarDeclaration, Error> {
        self.expect(&TokenKind::Var)?;
        let name = self.expect_identifier()?;
        let init = if self.check(&TokenKind::Equal) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(VarDeclaration { name, init })
    }

    fn parse_short_declaration(&mut self) -> Result<Statement, Error> {
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::ColonEqual)?;
        let init = self.parse_expression()?;
        self.expect(&TokenKind::Semicolon)?;
        Ok(Statement::VarDeclaration(VarDeclaration {
            name,
            init: Some(init),
        }))
    }

    fn parse_function_declaration(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'fun'
        let id = self.expect_identifier()?;
        self.expect(&TokenKind::LeftParen)?;
        let (params, rest) = self.parse_parameters()?;
        self.expect(&TokenKind::RightParen)?;
        let body = self.parse_block()?;
        Ok(Statement::FunctionDeclaration(FunctionDeclaration {
            id,
            function: Function {
                params,
                rest,
                body: FunctionBody::Block(body),
            },
        }))
    }

    /// Parses `a, b, ...rest` up to but not including the closing paren.
    fn parse_parameters(&mut self) -> Result<(Vec<Identifier>, Option<Identifier>), Error> {
        let mut params = Vec::new();
        let mut rest = None;

        if self.check(&TokenKind::RightParen) {
            return Ok((params, rest));
        }

        loop {
            if self.check(&TokenKind::Ellipsis) {
                self.advance();
                rest = Some(self.expect_identifier()?);
                // the rest parameter must be last
                break;
            }
            params.push(self.expect_identifier()?);
            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok((params, rest))
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, Error> {
        self.expect(&TokenKind::LeftBrace)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            body.push(self.parse_declaration()?);
        }
        self.expect(&TokenKind::RightBrace)?;
        Ok(body)
    }

    fn parse_if_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'if'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.check(&TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If(IfStatement {
            test,
            consequent,
            alternate,
        }))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'while'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While(WhileStatement { test, body }))
    }

    fn parse_for_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'for'
        self.expect(&TokenKind::LeftParen)?;

        // for (var x in/of e) and for (x in/of e)
        let declare = self.check(&TokenKind::Var);
        let each_kind = if declare {
            self.peek_kinds(2).get(1).cloned()
        } else if matches!(self.current.kind, TokenKind::Identifier(_)) {
            Some(self.peek_kind())
        } else {
            None
        };
        let each_kind = match each_kind {
            Some(TokenKind::In) => Some(ForEachKind::In),
            Some(TokenKind::Of) => Some(ForEachKind::Of),
            _ => None,
        };
        if let Some(kind) = each_kind {
            if declare {
                self.advance();
            }
            let variable = self.expect_identifier()?;
            self.advance(); // consume 'in' / 'of'
            let iterable = self.parse_expression()?;
            self.expect(&TokenKind::RightParen)?;
            let body = Box::new(self.parse_statement()?);
            return Ok(Statement::ForEach(ForEachStatement {
                kind,
                declare,
                variable,
                iterable,
                body,
            }));
        }

        let init = if self.check(&TokenKind::Semicolon) {
            None
        } else if declare {
            Some(ForInit::Declaration(self.parse_var_declaration_no_semi()?))
        } else {
            Some(ForInit::Expression(self.parse_expression()?))
        };
        self.expect(&TokenKind::Semicolon)?;

        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;

        let update = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RightParen)?;

        let body = Box::new(self.parse_statement()?);
        Ok(Statement::For(ForStatement {
            init,
            test,
            update,
            body,
        }))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Parses an expression.
    pub fn parse_expression(&mut self) -> Result<Expression, Error> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        let left = self.parse_or()?;

        if !self.check(&TokenKind::Equal) {
            return Ok(left);
        }
        self.advance();
        let value = Box::new(self.parse_assignment()?);

        let target = match left {
            Expression::Identifier(id) => AssignmentTarget::Identifier(id),
            Expression::Index(index) => AssignmentTarget::Index(index),
            _ => {
                return Err(Error::syntax(
                    "Invalid assignment target",
                    start.to(self.previous.span),
                ));
            }
        };
        Ok(Expression::Assignment(AssignmentExpression { target, value }))
    }

    fn parse_or(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_and()?;
        while self.check(&TokenKind::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expression::Logical(LogicalExpression {
                operator: LogicalOperator::Or,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_equality()?;
        while self.check(&TokenKind::And) {
            self.advance();
            let right = self.parse_equality()?;
            left = Expression::Logical(LogicalExpression {
                operator: LogicalOperator::And,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_comparison()?;
        loop {
            let operator = match self.current.kind {
                TokenKind::EqualEqual => BinaryOperator::Equal,
                TokenKind::BangEqual => BinaryOperator::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = binary(operator, left, right);
        }
        Ok(left)
    }

    /// Parses a comparison, turning chains like `a < b < c` into
    /// `(a < b) and (b < c)`.
    fn parse_comparison(&mut self) -> Result<Expression, Error> {
        let first = self.parse_term()?;
        let mut operands = vec![first];
        let mut operators = Vec::new();

        while let Some(operator) = comparison_operator(&self.current.kind) {
            self.advance();
            operators.push(operator);
            operands.push(self.parse_term()?);
        }

        if operators.is_empty() {
            return Ok(operands.remove(0));
        }

        let mut comparisons = operators
            .iter()
            .enumerate()
            .map(|(i, operator)| binary(*operator, operands[i].clone(), operands[i + 1].clone()));
        let mut chain = match comparisons.next() {
            Some(first) => first,
            None => return Err(Error::internal("empty comparison chain")),
        };
        for next in comparisons {
            chain = Expression::Logical(LogicalExpression {
                operator: LogicalOperator::And,
                left: Box::new(chain),
                right: Box::new(next),
            });
        }
        Ok(chain)
    }

    fn parse_term(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_factor()?;
        loop {
            let operator = match self.current.kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = binary(operator, left, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_unary()?;
        loop {
            let operator = match self.current.kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(operator, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, Error> {
        let operator = match self.current.kind {
            TokenKind::Bang => UnaryOperator::Not,
            TokenKind::Minus => UnaryOperator::Minus,
            _ => return self.parse_call(),
        };
        self.advance();
        let argument = Box::new(self.parse_unary()?);
        Ok(Expression::Unary(UnaryExpression { operator, argument }))
    }

    fn parse_call(&mut self) -> Result<Expression, Error> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current.kind {
                TokenKind::LeftParen => {
                    self.advance();
                    let arguments = self.parse_arguments()?;
                    self.expect(&TokenKind::RightParen)?;
                    expr = Expression::Call(CallExpression {
                        callee: Box::new(expr),
                        arguments,
                    });
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(&TokenKind::RightBracket)?;
                    expr = Expression::Index(IndexExpression {
                        object: Box::new(expr),
                        index: Box::new(index),
                    });
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, Error> {
        let mut arguments = Vec::new();
        if self.check(&TokenKind::RightParen) {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_expression()?);
            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        Ok(arguments)
    }

    fn parse_primary(&mut self) -> Result<Expression, Error> {
        let token = self.current.clone();
        match token.kind {
            TokenKind::Number(text) => {
                self.advance();
                Ok(Expression::Literal(parse_number(&text, token.span)?))
            }
            TokenKind::String(text) => {
                self.advance();
                // literal body as written, between the quotes
                let raw = self
                    .scanner
                    .source()
                    .get(token.span.start + 1..token.span.end.saturating_sub(1))
                    .unwrap_or(text.as_str());
                parse_string(&text, raw, token.span)
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(false)))
            }
            TokenKind::Nil => {
                self.advance();
                Ok(Expression::Literal(Literal::Nil))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                let id = Identifier::new(name, token.span);
                if self.check(&TokenKind::Arrow) {
                    return self.parse_lambda_body(vec![id], None);
                }
                Ok(Expression::Identifier(id))
            }
            TokenKind::LeftParen => self.parse_parenthesized_or_lambda(),
            TokenKind::LeftBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(&TokenKind::RightBracket) {
                    loop {
                        elements.push(self.parse_expression()?);
                        if !self.check(&TokenKind::Comma) {
                            break;
                        }
                        self.advance();
                    }
                }
                self.expect(&TokenKind::RightBracket)?;
                Ok(Expression::Array(ArrayExpression { elements }))
            }
            TokenKind::Invalid(message) => Err(Error::syntax(message, token.span)),
            other => Err(Error::syntax(
                format!("Unexpected token {:?}", other),
                token.span,
            )),
        }
    }

    /// Parses `( ... )` as a lambda parameter list when an arrow follows,
    /// and as a grouping otherwise.
    fn parse_parenthesized_or_lambda(&mut self) -> Result<Expression, Error> {
        let checkpoint = self.checkpoint();
        self.advance(); // consume '('

        if let Ok((params, rest)) = self.parse_parameters() {
            if self.check(&TokenKind::RightParen) {
                self.advance();
                if self.check(&TokenKind::Arrow) {
                    return self.parse_lambda_body(params, rest);
                }
            }
        }

        self.restore(checkpoint);
        self.advance(); // consume '('
        let expr = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        Ok(expr)
    }

    fn parse_lambda_body(
        &mut self,
        params: Vec<Identifier>,
        rest: Option<Identifier>,
    ) -> Result<Expression, Error> {
        self.expect(&TokenKind::Arrow)?;
        let body = if self.check(&TokenKind::LeftBrace) {
            FunctionBody::Block(self.parse_block()?)
        } else {
            FunctionBody::Expression(Box::new(self.parse_assignment()?))
        };
        Ok(Expression::Lambda(Box::new(Function { params, rest, body })))
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, self.scanner.next_token());
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), Error> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else if let TokenKind::Invalid(message) = &self.current.kind {
            Err(Error::syntax(message.clone(), self.current.span))
        } else {
            Err(Error::syntax(
                format!("Expected {:?}, found {:?}", kind, self.current.kind),
                self.current.span,
            ))
        }
    }

    fn expect_identifier(&mut self) -> Result<Identifier, Error> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            let id = Identifier::new(name.clone(), self.current.span);
            self.advance();
            Ok(id)
        } else {
            Err(Error::syntax(
                format!("Expected identifier, found {:?}", self.current.kind),
                self.current.span,
            ))
        }
    }

    /// Kind of the token after `current`.
    fn peek_kind(&self) -> TokenKind {
        self.scanner.clone().next_token().kind
    }

    /// Kinds of the next `n` tokens after `current`.
    fn peek_kinds(&self, n: usize) -> Vec<TokenKind> {
        let mut scanner = self.scanner.clone();
        (0..n).map(|_| scanner.next_token().kind).collect()
    }

    fn checkpoint(&self) -> Checkpoint<'a> {
        Checkpoint {
            scanner: self.scanner.clone(),
            current: self.current.clone(),
            previous: self.previous.clone(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint<'a>) {
        self.scanner = checkpoint.scanner;
        self.current = checkpoint.current;
        self.previous = checkpoint.previous;
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    /// Returns true once every token has been consumed.
    pub fn is_finished(&self) -> bool {
        self.is_at_end()
    }
}

fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary(BinaryExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn comparison_operator(kind: &TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Less => Some(BinaryOperator::LessThan),
        TokenKind::LessEqual => Some(BinaryOperator::LessThanEqual),
        TokenKind::Greater => Some(BinaryOperator::GreaterThan),
        TokenKind::GreaterEqual => Some(BinaryOperator::GreaterThanEqual),
        _ => None,
    }
}

/// Picks a representation for a number literal: a dot means float,
/// otherwise a 64-bit integer when it fits and a big integer when not.
fn parse_number(text: &str, span: Span) -> Result<Literal, Error> {
    if text.contains('.') {
        return text
            .parse::<f64>()
            .map(Literal::Float)
            .map_err(|_| Error::syntax(format!("Invalid number {}", text), span));
    }
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Literal::Integer(n));
    }
    text.parse::<BigInt>()
        .map(Literal::BigInteger)
        .map_err(|_| Error::syntax(format!("Invalid number {}", text), span))
}

/// Splits a string literal at `${...}` segments.
///
/// The scan does not nest: a segment ends at the first `}` after its
/// `${`. Each segment is parsed as a standalone expression. `text` is the
/// unescaped body and `raw` the body as written, which error spans point
/// into.
fn parse_string(text: &str, raw: &str, span: Span) -> Result<Expression, Error> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = text;
    // byte offset of `rest` within `text`
    let mut consumed_total = 0;
    // content starts after the opening quote
    let body_start = span.start + 1;

    while let Some(open) = rest.find("${") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find('}') else {
            break;
        };
        literal.push_str(&rest[..open]);
        if !literal.is_empty() {
            parts.push(InterpolationPart::Literal(std::mem::take(&mut literal)));
        }
        let source = &after_open[..close];
        let segment_start = consumed_total + open + 2;
        let to_source = |offset: usize| body_start + raw_offset(raw, segment_start + offset);
        let expression = parse_embedded(source, to_source)?;
        parts.push(InterpolationPart::Expression(expression));

        let consumed = open + 2 + close + 1;
        consumed_total += consumed;
        rest = &rest[consumed..];
    }

    if parts.is_empty() {
        return Ok(Expression::Literal(Literal::String(text.to_string())));
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        parts.push(InterpolationPart::Literal(literal));
    }
    Ok(Expression::Interpolation(InterpolatedString { parts }))
}

/// Maps a byte offset in an unescaped string body to the matching offset
/// in the body as written.
fn raw_offset(raw: &str, unescaped: usize) -> usize {
    let mut chars = raw.char_indices();
    let mut cooked = 0;
    while let Some((at, ch)) = chars.next() {
        if cooked >= unescaped {
            return at;
        }
        if ch != '\\' {
            cooked += ch.len_utf8();
            continue;
        }
        match chars.next() {
            Some((_, 'n' | 'r' | 't' | '\\' | '"')) => cooked += 1,
            Some((_, other)) => cooked += 1 + other.len_utf8(),
            None => cooked += 1,
        }
    }
    raw.len()
}

/// Parses one interpolated segment, reporting errors at their position
/// in the enclosing source.
fn parse_embedded(
    source: &str,
    to_source: impl Fn(usize) -> usize,
) -> Result<Expression, Error> {
    let shift = |err: Error| match err {
        Error::SyntaxError { message, span } => {
            Error::syntax(message, Span::new(to_source(span.start), to_source(span.end)))
        }
        other => other,
    };
    let mut parser = Parser::new(source);
    let expression = parser.parse_expression().map_err(shift)?;
    if !parser.is_finished() {
        return Err(shift(Error::syntax(
            "Unexpected input in interpolation",
            parser.current.span,
        )));
    }
    Ok(expression)
}
