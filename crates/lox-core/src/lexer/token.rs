// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Token definitions for the Lox lexer.

use std::fmt;

/// A span in the source code, representing a range of bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the length of this span in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if this span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the smallest span covering both.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The span in the source code
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The different kinds of tokens in Lox.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Numeric literal, kept as source text so the parser can pick a
    /// representation
    Number(String),
    /// String literal with escapes resolved
    String(String),
    /// Identifier
    Identifier(String),

    // Keywords
    And,
    Break,
    Continue,
    Else,
    False,
    For,
    Fun,
    If,
    In,
    Nil,
    Of,
    Or,
    Print,
    Return,
    True,
    Unless,
    Var,
    While,

    // Punctuation
    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    Semicolon,
    /// ...
    Ellipsis,
    /// =>
    Arrow,
    /// :=
    ColonEqual,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Special
    /// End of file
    Eof,
    /// Malformed input, with a description
    Invalid(String),
}

impl TokenKind {
    /// Looks up the keyword spelled `name`.
    pub fn keyword(name: &str) -> Option<TokenKind> {
        let kind = match name {
            "and" => TokenKind::And,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "else" => TokenKind::Else,
            "false" => TokenKind::False,
            "for" => TokenKind::For,
            "fun" => TokenKind::Fun,
            "if" => TokenKind::If,
            "in" => TokenKind::In,
            "nil" => TokenKind::Nil,
            "of" => TokenKind::Of,
            "or" => TokenKind::Or,
            "print" => TokenKind::Print,
            "return" => TokenKind::Return,
            "true" => TokenKind::True,
            "unless" => TokenKind::Unless,
            "var" => TokenKind::Var,
            "while" => TokenKind::While,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns true if this token is a keyword.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::And
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Else
                | TokenKind::False
                | TokenKind::For
                | TokenKind::Fun
                | TokenKind::If
                | TokenKind::In
                | TokenKind::Nil
                | TokenKind::Of
                | TokenKind::Or
                | TokenKind::Print
                | TokenKind::Return
                | TokenKind::True
                | TokenKind::Unless
                | TokenKind::Var
                | TokenKind::While
        )
    }

    /// Returns true if this token is a literal.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Number(_)
                | TokenKind::String(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Nil
        )
    }

    /// Returns true for the four ordering comparison operators.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            TokenKind::Greater | TokenKind::GreaterEqual | TokenKind::Less | TokenKind::LessEqual
        )
    }
}
