// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # lox-core
//!
//! A scope-resolving bytecode compiler and runtime for a small Lox dialect.
//!
//! ## Overview
//!
//! - Lexer and recursive-descent parser producing a syntax tree
//! - Single-pass compiler that resolves every variable to a local slot,
//!   an enclosing frame or the global table, and desugars loops,
//!   postfix conditionals and string interpolation
//! - Operation semantics over a numeric tower of 64-bit integers,
//!   arbitrary precision integers and doubles
//! - A stack-based interpreter with closures over materialized frames
//!
//! ## Quick Start
//!
//! ```rust
//! use lox_core::{Engine, OutputBuffer, Value};
//!
//! let output = OutputBuffer::new();
//! let mut engine = Engine::new().with_output(output.clone());
//! engine.eval("var a = 40; print a + 2;").unwrap();
//! assert_eq!(output.contents(), "42\n");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod config;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod vm;

#[cfg(feature = "async")]
pub mod async_engine;

#[cfg(feature = "async")]
pub use async_engine::AsyncEngine;

// Re-exports for convenience
pub use config::EngineConfig;
pub use lexer::Span;
pub use runtime::context::{Context, OutputBuffer};
pub use runtime::function::FunctionProto;
pub use runtime::value::Value;

use compiler::Compiler;
use parser::Parser;
use std::io::Write;
use std::sync::Arc;
use vm::VM;

/// The main Lox engine instance.
///
/// Owns one interpreter state: the global table, the output sink and the
/// configuration. Globals persist across [`Engine::eval`] calls; two
/// engines share nothing.
pub struct Engine {
    vm: VM,
}

impl Engine {
    /// Creates a new engine with default configuration, printing to stdout.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates a new engine with the given configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            vm: VM::new(Context::new(config)),
        }
    }

    /// Redirects `print` output and warnings to `sink`.
    pub fn with_output(mut self, sink: impl Write + Send + 'static) -> Self {
        self.vm.context_mut().set_output(sink);
        self
    }

    /// Compiles source code without running it.
    pub fn compile(&self, source: &str) -> Result<Arc<FunctionProto>, Error> {
        let program = Parser::new(source).parse_program()?;
        let proto = Compiler::new().compile_program(&program)?;
        Ok(Arc::new(proto))
    }

    /// Evaluates Lox source code and returns the value of the last
    /// expression statement, or nil.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let mut engine = lox_core::Engine::new();
    /// let result = engine.eval("1 + 2;").unwrap();
    /// assert_eq!(result, lox_core::Value::Int(3));
    /// ```
    pub fn eval(&mut self, source: &str) -> Result<Value, Error> {
        let proto = self.compile(source)?;
        self.vm.run(proto)
    }

    /// Evaluates Lox source code from a file.
    pub fn eval_file(&mut self, path: &std::path::Path) -> Result<Value, Error> {
        let source = std::fs::read_to_string(path)?;
        self.eval(&source)
    }

    /// Returns the interpreter state.
    pub fn context(&self) -> &Context {
        self.vm.context()
    }

    /// Returns the interpreter state mutably.
    pub fn context_mut(&mut self) -> &mut Context {
        self.vm.context_mut()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur while compiling or running Lox code.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed source text
    #[error("SyntaxError: {message} at {span}")]
    SyntaxError {
        /// What went wrong
        message: String,
        /// Where it went wrong
        span: Span,
    },
    /// Well-formed source that cannot be compiled
    #[error("CompileError: {message} at {span}")]
    CompileError {
        /// What went wrong
        message: String,
        /// Where it went wrong
        span: Span,
    },
    /// Operand types that an operation does not accept
    #[error("TypeError: {0}")]
    TypeError(String),
    /// Reading or writing a variable that is not declared or not defined
    #[error("ReferenceError: {0}")]
    ReferenceError(String),
    /// Other run-time failures such as division by zero
    #[error("RuntimeError: {0}")]
    RuntimeError(String),
    /// Internal engine error
    #[error("InternalError: {0}")]
    InternalError(String),
    /// I/O error
    #[error("IOError: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds a syntax error.
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Error::SyntaxError {
            message: message.into(),
            span,
        }
    }

    /// Builds a compile error.
    pub fn compile(message: impl Into<String>, span: Span) -> Self {
        Error::CompileError {
            message: message.into(),
            span,
        }
    }

    /// Builds an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::InternalError(message.into())
    }

    /// Returns true for the parse-time taxonomy.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Error::SyntaxError { .. } | Error::CompileError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_returns_last_expression() {
        let mut engine = Engine::new().with_output(OutputBuffer::new());
        let result = engine.eval("var a = 2; a * 21;").unwrap();
        assert_eq!(result, Value::Int(42));
    }

    #[test]
    fn test_eval_statement_only_program_returns_nil() {
        let mut engine = Engine::new().with_output(OutputBuffer::new());
        assert_eq!(engine.eval("var a = 1;").unwrap(), Value::Nil);
    }

    #[test]
    fn test_globals_persist_across_evals() {
        let output = OutputBuffer::new();
        let mut engine = Engine::new().with_output(output.clone());
        engine.eval("var a = [1, \"hello\"];").unwrap();
        engine.eval("print a[1];").unwrap();
        assert_eq!(output.contents(), "hello\n");
    }

    #[test]
    fn test_engines_share_nothing() {
        let mut first = Engine::new().with_output(OutputBuffer::new());
        first.eval("var shared = 1;").unwrap();
        let mut second = Engine::new().with_output(OutputBuffer::new());
        let err = second.eval("print shared;").unwrap_err();
        assert!(err.to_string().contains("not declared"));
    }

    #[test]
    fn test_error_display() {
        let err = Error::syntax("Expected ';'", Span::new(3, 4));
        assert_eq!(err.to_string(), "SyntaxError: Expected ';' at 3..4");
        assert!(err.is_parse_error());
        let err = Error::RuntimeError("Cannot divide by zero".into());
        assert_eq!(err.to_string(), "RuntimeError: Cannot divide by zero");
        assert!(!err.is_parse_error());
    }

    #[test]
    fn test_compile_does_not_run() {
        let output = OutputBuffer::new();
        let engine = Engine::new().with_output(output.clone());
        let proto = engine.compile("print 1;").unwrap();
        assert!(!proto.bytecode.instructions.is_empty());
        assert_eq!(output.contents(), "");
    }
}
