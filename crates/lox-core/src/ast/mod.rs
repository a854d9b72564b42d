// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Abstract Syntax Tree (AST) definitions for Lox.
//!
//! The tree is a direct image of the surface syntax. Sugared forms such as
//! `for-in`, postfix guards and interpolated strings are kept as their own
//! nodes and lowered by the compiler.

use crate::lexer::Span;
use num_bigint::BigInt;

/// A complete Lox program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// The statements in the program
    pub body: Vec<Statement>,
}

/// An identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    /// The name of the identifier
    pub name: String,
    /// Where the identifier appears
    pub span: Span,
}

impl Identifier {
    /// Creates an identifier.
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// A Lox statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `var name = init;` or `name := init;`
    VarDeclaration(VarDeclaration),
    /// Function declaration
    FunctionDeclaration(FunctionDeclaration),
    /// Expression statement
    Expression(ExpressionStatement),
    /// print statement
    Print(PrintStatement),
    /// Block statement { ... }
    Block(BlockStatement),
    /// If statement
    If(IfStatement),
    /// While statement
    While(WhileStatement),
    /// C-style for statement
    For(ForStatement),
    /// `for (x in array)` and `for (x of array)`
    ForEach(ForEachStatement),
    /// Return statement
    Return(ReturnStatement),
    /// Break statement
    Break(Span),
    /// Continue statement
    Continue(Span),
    /// `stmt if (cond);` or `stmt unless (cond);`
    Guarded(GuardedStatement),
    /// Empty statement (;)
    Empty,
}

/// Variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclaration {
    /// The declared name
    pub name: Identifier,
    /// Initializer
    pub init: Option<Expression>,
}

/// Function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    /// Function name
    pub id: Identifier,
    /// Parameters and body
    pub function: Function,
}

/// A function or lambda: parameters plus body.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Fixed parameters
    pub params: Vec<Identifier>,
    /// Trailing `...name` parameter
    pub rest: Option<Identifier>,
    /// Function body
    pub body: FunctionBody,
}

/// The body of a function.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    /// A braced statement list
    Block(Vec<Statement>),
    /// A lambda's bare expression, returned implicitly
    Expression(Box<Expression>),
}

/// Expression statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    /// The expression
    pub expression: Expression,
}

/// print statement.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintStatement {
    /// The printed value
    pub argument: Expression,
}

/// Block statement.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    /// Statements in the block
    pub body: Vec<Statement>,
}

/// If statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    /// Condition
    pub test: Expression,
    /// Consequent
    pub consequent: Box<Statement>,
    /// Alternate (else)
    pub alternate: Option<Box<Statement>>,
}

/// While statement.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    /// Condition
    pub test: Expression,
    /// Body
    pub body: Box<Statement>,
}

/// C-style for statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    /// Initializer
    pub init: Option<ForInit>,
    /// Condition, absent means always true
    pub test: Option<Expression>,
    /// Increment
    pub update: Option<Expression>,
    /// Body
    pub body: Box<Statement>,
}

/// For loop initializer.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    /// Variable declaration
    Declaration(VarDeclaration),
    /// Expression
    Expression(Expression),
}

/// Which array iteration a `for` performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForEachKind {
    /// Binds successive indices
    In,
    /// Binds successive elements
    Of,
}

/// `for (var x in array)` / `for (var x of array)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForEachStatement {
    /// Indices or elements
    pub kind: ForEachKind,
    /// Whether the loop variable is declared with `var`
    pub declare: bool,
    /// Loop variable
    pub variable: Identifier,
    /// The iterated array expression
    pub iterable: Expression,
    /// Body
    pub body: Box<Statement>,
}

/// Return statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    /// Return value
    pub argument: Option<Expression>,
}

/// Kind of postfix guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Runs when the condition is truthy
    If,
    /// Runs when the condition is falsy
    Unless,
}

/// A statement with a trailing `if (cond)` or `unless (cond)`.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardedStatement {
    /// The guarded statement
    pub statement: Box<Statement>,
    /// if or unless
    pub guard: Guard,
    /// The condition
    pub condition: Expression,
}

/// A Lox expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal(Literal),
    /// Variable reference
    Identifier(Identifier),
    /// Array literal [a, b, c]
    Array(ArrayExpression),
    /// Index access a[i]
    Index(IndexExpression),
    /// Call f(a, b)
    Call(CallExpression),
    /// Unary operation
    Unary(UnaryExpression),
    /// Binary operation
    Binary(BinaryExpression),
    /// Short-circuit and/or
    Logical(LogicalExpression),
    /// Assignment
    Assignment(AssignmentExpression),
    /// String with `${...}` segments
    Interpolation(InterpolatedString),
    /// Lambda
    Lambda(Box<Function>),
}

/// Literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// nil
    Nil,
    /// true or false
    Boolean(bool),
    /// Integer that fits in 64 bits
    Integer(i64),
    /// Integer that does not
    BigInteger(BigInt),
    /// Floating point number
    Float(f64),
    /// String
    String(String),
}

/// Array literal.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpression {
    /// Elements in order
    pub elements: Vec<Expression>,
}

/// Index access.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpression {
    /// The indexed value
    pub object: Box<Expression>,
    /// The index
    pub index: Box<Expression>,
}

/// Call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    /// The called value
    pub callee: Box<Expression>,
    /// Arguments, evaluated left to right
    pub arguments: Vec<Expression>,
}

/// Unary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    /// Operator
    pub operator: UnaryOperator,
    /// Operand
    pub argument: Box<Expression>,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// -
    Minus,
    /// !
    Not,
}

/// Binary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    /// Operator
    pub operator: BinaryOperator,
    /// Left operand
    pub left: Box<Expression>,
    /// Right operand
    pub right: Box<Expression>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// +
    Add,
    /// -
    Subtract,
    /// *
    Multiply,
    /// /
    Divide,
    /// %
    Modulo,
    /// ==
    Equal,
    /// !=
    NotEqual,
    /// <
    LessThan,
    /// <=
    LessThanEqual,
    /// >
    GreaterThan,
    /// >=
    GreaterThanEqual,
}

/// Logical expression.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpression {
    /// Operator
    pub operator: LogicalOperator,
    /// Left operand
    pub left: Box<Expression>,
    /// Right operand, evaluated only when needed
    pub right: Box<Expression>,
}

/// Logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    /// and
    And,
    /// or
    Or,
}

/// Assignment expression.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    /// What is assigned to
    pub target: AssignmentTarget,
    /// The assigned value, also the expression's result
    pub value: Box<Expression>,
}

/// Left-hand side of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentTarget {
    /// A variable
    Identifier(Identifier),
    /// An array slot
    Index(IndexExpression),
}

/// Interpolated string.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedString {
    /// Segments in source order
    pub parts: Vec<InterpolationPart>,
}

/// One segment of an interpolated string.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpolationPart {
    /// Text copied verbatim
    Literal(String),
    /// A `${...}` expression
    Expression(Expression),
}
