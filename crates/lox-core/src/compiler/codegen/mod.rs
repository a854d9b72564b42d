// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Code generation from AST to bytecode.
//!
//! This module contains the `Compiler` which transforms a parsed Lox
//! program into a [`FunctionProto`] for the VM. The compiler walks the tree
//! once, resolving every name through a [`ScopeResolver`] and lowering the
//! sugared statements to jumps.

mod expressions;
mod scope;
mod statements;


pub use scope::{FunctionLayout, ScopeKind, ScopeResolver, Storage};

use crate::Error;
use crate::ast::*;
use crate::compiler::bytecode::{Bytecode, Instruction, OpCode, Operand};
use crate::lexer::Span;
use crate::runtime::function::FunctionProto;
use crate::runtime::value::Value;
use tracing::debug;

/// Name given to the top-level program's prototype.
pub const SCRIPT_NAME: &str = "script";

/// Pending jumps of the innermost enclosing loop.
#[derive(Debug, Default)]
struct LoopLabels {
    breaks: Vec<usize>,
    continues: Vec<usize>,
}

/// Compiles AST to bytecode.
pub struct Compiler {
    /// The bytecode being generated
    bytecode: Bytecode,
    /// Symbol table for variable resolution
    scopes: ScopeResolver,
    /// Innermost loop last
    loops: Vec<LoopLabels>,
}

impl Compiler {
    /// Creates a new compiler.
    pub fn new() -> Self {
        Self {
            bytecode: Bytecode::new(),
            scopes: ScopeResolver::new(),
            loops: Vec::new(),
        }
    }

    // ========================================================================
    // Main Compilation Entry Point
    // ========================================================================

    /// Compiles a program to the prototype of its top-level code.
    ///
    /// When the last statement is an expression statement its value is
    /// left on the stack, so running the program yields it.
    pub fn compile_program(&mut self, program: &Program) -> Result<FunctionProto, Error> {
        let len = program.body.len();
        for (i, stmt) in program.body.iter().enumerate() {
            self.compile_statement(stmt, i + 1 == len)?;
        }
        self.emit(Instruction::simple(OpCode::Halt));

        if self.scopes.depth() != 0 {
            return Err(Error::internal("unbalanced scopes after compilation"));
        }

        let mut proto = FunctionProto::new(SCRIPT_NAME, std::mem::take(&mut self.bytecode));
        proto.local_names = self.scopes.program_locals();
        debug!(
            instructions = proto.bytecode.instructions.len(),
            functions = proto.bytecode.functions.len(),
            locals = proto.local_count(),
            "compiled program"
        );
        Ok(proto)
    }

    // ========================================================================
    // Statement Compilation
    // ========================================================================

    fn compile_statement(&mut self, stmt: &Statement, keep_value: bool) -> Result<(), Error> {
        match stmt {
            Statement::Expression(expr) => {
                self.compile_expression(&expr.expression)?;
                // The program's last value is its result
                if !keep_value {
                    self.emit(Instruction::simple(OpCode::Pop));
                }
            }
            Statement::VarDeclaration(decl) => self.compile_var_declaration(decl)?,
            Statement::FunctionDeclaration(decl) => self.compile_function_declaration(decl)?,
            Statement::Print(print) => {
                self.compile_expression(&print.argument)?;
                self.emit(Instruction::simple(OpCode::Print));
            }
            Statement::Block(block) => {
                self.scopes.begin_block();
                for stmt in &block.body {
                    self.compile_statement(stmt, false)?;
                }
                self.scopes.end_block()?;
            }
            Statement::If(if_stmt) => self.compile_if_statement(if_stmt)?,
            Statement::While(while_stmt) => self.compile_while_statement(while_stmt)?,
            Statement::For(for_stmt) => self.compile_for_statement(for_stmt)?,
            Statement::ForEach(each) => self.compile_for_each_statement(each)?,
            Statement::Return(ret) => {
                match &ret.argument {
                    Some(arg) => self.compile_expression(arg)?,
                    None => {
                        self.emit(Instruction::simple(OpCode::Nil));
                    }
                }
                self.emit(Instruction::simple(OpCode::Return));
            }
            Statement::Break(span) => {
                let jump = self.emit_jump(OpCode::Jump);
                self.innermost_loop("break", *span)?.breaks.push(jump);
            }
            Statement::Continue(span) => {
                let jump = self.emit_jump(OpCode::Jump);
                self.innermost_loop("continue", *span)?.continues.push(jump);
            }
            Statement::Guarded(guarded) => self.compile_guarded_statement(guarded)?,
            Statement::Empty => {}
        }
        Ok(())
    }

    fn compile_var_declaration(&mut self, decl: &VarDeclaration) -> Result<(), Error> {
        match self.scopes.declare(&decl.name.name, decl.name.span)? {
            Storage::Global => {
                let name = self.name_constant(&decl.name.name);
                self.emit(Instruction::with_operand(
                    OpCode::DefineGlobal,
                    Operand::Constant(name),
                ));
                // Without an initializer an existing value is kept
                if let Some(init) = &decl.init {
                    self.compile_expression(init)?;
                    self.emit(Instruction::with_operand(
                        OpCode::SetGlobal,
                        Operand::Constant(name),
                    ));
                }
            }
            Storage::Local(slot) => match &decl.init {
                Some(init) => {
                    self.compile_expression(init)?;
                    self.emit(Instruction::with_operand(OpCode::SetLocal, Operand::Local(slot)));
                }
                None => {
                    self.emit(Instruction::with_operand(OpCode::ClearLocal, Operand::Local(slot)));
                }
            },
            Storage::NonLocal { .. } => {
                return Err(Error::internal("declaration resolved to an enclosing frame"));
            }
        }
        Ok(())
    }

    fn compile_function_declaration(&mut self, decl: &FunctionDeclaration) -> Result<(), Error> {
        // Declared before the body so the body can call itself
        match self.scopes.declare(&decl.id.name, decl.id.span)? {
            Storage::Global => {
                let name = self.name_constant(&decl.id.name);
                self.emit(Instruction::with_operand(
                    OpCode::DefineGlobal,
                    Operand::Constant(name),
                ));
                self.compile_function(&decl.id.name, &decl.function)?;
                self.emit(Instruction::with_operand(OpCode::SetGlobal, Operand::Constant(name)));
            }
            Storage::Local(slot) => {
                self.compile_function(&decl.id.name, &decl.function)?;
                self.emit(Instruction::with_operand(OpCode::SetLocal, Operand::Local(slot)));
            }
            Storage::NonLocal { .. } => {
                return Err(Error::internal("declaration resolved to an enclosing frame"));
            }
        }
        Ok(())
    }

    fn compile_if_statement(&mut self, if_stmt: &IfStatement) -> Result<(), Error> {
        self.compile_expression(&if_stmt.test)?;
        let jump_to_else = self.emit_jump(OpCode::JumpIfFalse);

        self.compile_statement(&if_stmt.consequent, false)?;

        if let Some(alternate) = &if_stmt.alternate {
            let jump_to_end = self.emit_jump(OpCode::Jump);
            self.patch_here(jump_to_else);
            self.compile_statement(alternate, false)?;
            self.patch_here(jump_to_end);
        } else {
            self.patch_here(jump_to_else);
        }
        Ok(())
    }

    fn compile_while_statement(&mut self, while_stmt: &WhileStatement) -> Result<(), Error> {
        let loop_start = self.bytecode.position();

        self.compile_expression(&while_stmt.test)?;
        let jump_to_end = self.emit_jump(OpCode::JumpIfFalse);

        self.loops.push(LoopLabels::default());
        self.compile_statement(&while_stmt.body, false)?;
        let labels = self.finish_loop()?;

        self.emit(Instruction::with_operand(OpCode::Jump, Operand::Jump(loop_start)));

        let end = self.bytecode.position();
        self.bytecode.patch_jump(jump_to_end, end);
        self.patch_labels(labels, loop_start, end);
        Ok(())
    }

    /// `for (init; test; update) body` runs as
    /// `{ init; while (test) { body; update; } }`; `continue` jumps to the
    /// update.
    fn compile_for_statement(&mut self, for_stmt: &ForStatement) -> Result<(), Error> {
        self.scopes.begin_block();

        match &for_stmt.init {
            Some(ForInit::Declaration(decl)) => self.compile_var_declaration(decl)?,
            Some(ForInit::Expression(expr)) => {
                self.compile_expression(expr)?;
                self.emit(Instruction::simple(OpCode::Pop));
            }
            None => {}
        }

        let loop_start = self.bytecode.position();
        let jump_to_end = match &for_stmt.test {
            Some(test) => {
                self.compile_expression(test)?;
                Some(self.emit_jump(OpCode::JumpIfFalse))
            }
            None => None,
        };

        self.loops.push(LoopLabels::default());
        self.compile_statement(&for_stmt.body, false)?;
        let labels = self.finish_loop()?;

        let continue_target = self.bytecode.position();
        if let Some(update) = &for_stmt.update {
            self.compile_expression(update)?;
            self.emit(Instruction::simple(OpCode::Pop));
        }
        self.emit(Instruction::with_operand(OpCode::Jump, Operand::Jump(loop_start)));

        let end = self.bytecode.position();
        if let Some(jump) = jump_to_end {
            self.bytecode.patch_jump(jump, end);
        }
        self.patch_labels(labels, continue_target, end);

        self.scopes.end_block()
    }

    /// Lowers `for (x in a)` and `for (x of a)` to a counting loop over a
    /// hidden index. The array expression is evaluated on every test and,
    /// for `of`, again on every element read.
    fn compile_for_each_statement(&mut self, each: &ForEachStatement) -> Result<(), Error> {
        self.scopes.begin_block();

        let index = self.scopes.declare_hidden("index")?;
        self.emit_constant(Value::Int(0));
        self.emit(Instruction::with_operand(OpCode::SetLocal, Operand::Local(index)));

        let variable = if each.declare {
            self.scopes.declare(&each.variable.name, each.variable.span)?
        } else {
            self.scopes.resolve(&each.variable.name)
        };

        // index < size(array)
        let loop_start = self.bytecode.position();
        self.emit(Instruction::with_operand(OpCode::GetLocal, Operand::Local(index)));
        self.compile_expression(&each.iterable)?;
        self.emit(Instruction::simple(OpCode::ArraySize));
        self.emit(Instruction::simple(OpCode::LessThan));
        let jump_to_end = self.emit_jump(OpCode::JumpIfFalse);

        match each.kind {
            ForEachKind::In => {
                self.emit(Instruction::with_operand(OpCode::GetLocal, Operand::Local(index)));
            }
            ForEachKind::Of => {
                self.compile_expression(&each.iterable)?;
                self.emit(Instruction::with_operand(OpCode::GetLocal, Operand::Local(index)));
                self.emit(Instruction::simple(OpCode::GetIndex));
            }
        }
        self.emit_store(variable, &each.variable.name);

        self.loops.push(LoopLabels::default());
        self.compile_statement(&each.body, false)?;
        let labels = self.finish_loop()?;

        // index = index + 1
        let continue_target = self.bytecode.position();
        self.emit(Instruction::with_operand(OpCode::GetLocal, Operand::Local(index)));
        self.emit_constant(Value::Int(1));
        self.emit(Instruction::simple(OpCode::Add));
        self.emit(Instruction::with_operand(OpCode::SetLocal, Operand::Local(index)));
        self.emit(Instruction::with_operand(OpCode::Jump, Operand::Jump(loop_start)));

        let end = self.bytecode.position();
        self.bytecode.patch_jump(jump_to_end, end);
        self.patch_labels(labels, continue_target, end);

        self.scopes.end_block()
    }

    fn compile_guarded_statement(&mut self, guarded: &GuardedStatement) -> Result<(), Error> {
        self.compile_expression(&guarded.condition)?;
        if guarded.guard == Guard::Unless {
            self.emit(Instruction::simple(OpCode::Not));
        } else {
            self.emit(Instruction::simple(OpCode::IsTruthy));
        }
        let skip = self.emit_jump(OpCode::JumpIfFalse);
        self.compile_statement(&guarded.statement, false)?;
        self.patch_here(skip);
        Ok(())
    }

    // ========================================================================
    // Function Compilation
    // ========================================================================

    /// Compiles a function or lambda body into a nested prototype and emits
    /// the instruction that creates its value.
    fn compile_function(&mut self, name: &str, function: &Function) -> Result<(), Error> {
        let enclosing = std::mem::take(&mut self.bytecode);
        let enclosing_loops = std::mem::take(&mut self.loops);

        self.scopes.begin_function();
        let compiled = self.compile_function_body(function);

        let bytecode = std::mem::replace(&mut self.bytecode, enclosing);
        self.loops = enclosing_loops;
        compiled?;
        let layout = self.scopes.end_function()?;

        let captures = layout.captures_frame();
        let mut proto = FunctionProto::new(name, bytecode);
        proto.arity = function.params.len();
        proto.variadic = function.rest.is_some();
        proto.captures_frame = captures;
        proto.local_names = layout.local_names;

        let index = self.bytecode.add_function(proto);
        self.emit(Instruction::with_operand(
            OpCode::CreateFunction,
            Operand::Function {
                index,
                capture: captures,
            },
        ));
        Ok(())
    }

    fn compile_function_body(&mut self, function: &Function) -> Result<(), Error> {
        // Argument 0 is the callee
        for (i, param) in function.params.iter().enumerate() {
            let slot = self.declare_local(param)?;
            self.emit(Instruction::with_operand(
                OpCode::LoadArgument,
                Operand::Argument(argument_index(i + 1, param.span)?),
            ));
            self.emit(Instruction::with_operand(OpCode::SetLocal, Operand::Local(slot)));
        }
        if let Some(rest) = &function.rest {
            let slot = self.declare_local(rest)?;
            let first = argument_index(function.params.len() + 1, rest.span)?;
            self.emit(Instruction::with_operand(
                OpCode::CollectArguments,
                Operand::Argument(first),
            ));
            self.emit(Instruction::with_operand(OpCode::SetLocal, Operand::Local(slot)));
        }

        match &function.body {
            FunctionBody::Block(body) => {
                for stmt in body {
                    self.compile_statement(stmt, false)?;
                }
                self.emit(Instruction::simple(OpCode::Nil));
            }
            FunctionBody::Expression(expr) => self.compile_expression(expr)?,
        }
        self.emit(Instruction::simple(OpCode::Return));
        Ok(())
    }

    fn declare_local(&mut self, id: &Identifier) -> Result<u16, Error> {
        match self.scopes.declare(&id.name, id.span)? {
            Storage::Local(slot) => Ok(slot),
            _ => Err(Error::internal("parameter declared outside a function scope")),
        }
    }

    // ========================================================================
    // Expression Compilation
    // ========================================================================

    fn compile_expression(&mut self, expr: &Expression) -> Result<(), Error> {
        match expr {
            Expression::Literal(lit) => self.compile_literal(lit),
            Expression::Identifier(id) => {
                self.compile_identifier(id);
                Ok(())
            }
            Expression::Array(arr) => self.compile_array(arr),
            Expression::Index(index) => {
                self.compile_expression(&index.object)?;
                self.compile_expression(&index.index)?;
                self.emit(Instruction::simple(OpCode::GetIndex));
                Ok(())
            }
            Expression::Call(call) => self.compile_call(call),
            Expression::Unary(un) => {
                self.compile_expression(&un.argument)?;
                let opcode = match un.operator {
                    UnaryOperator::Minus => OpCode::Negate,
                    UnaryOperator::Not => OpCode::Not,
                };
                self.emit(Instruction::simple(opcode));
                Ok(())
            }
            Expression::Binary(bin) => self.compile_binary(bin),
            Expression::Logical(logical) => self.compile_logical(logical),
            Expression::Assignment(assign) => self.compile_assignment(assign),
            Expression::Interpolation(interp) => self.compile_interpolation(interp),
            Expression::Lambda(function) => self.compile_function("", function),
        }
    }

    fn compile_literal(&mut self, lit: &Literal) -> Result<(), Error> {
        match lit {
            Literal::Nil => {
                self.emit(Instruction::simple(OpCode::Nil));
            }
            Literal::Boolean(true) => {
                self.emit(Instruction::simple(OpCode::True));
            }
            Literal::Boolean(false) => {
                self.emit(Instruction::simple(OpCode::False));
            }
            Literal::Integer(n) => self.emit_constant(Value::Int(*n)),
            Literal::BigInteger(n) => self.emit_constant(Value::BigInt(n.clone())),
            Literal::Float(n) => self.emit_constant(Value::Float(*n)),
            Literal::String(s) => self.emit_constant(Value::String(s.clone())),
        }
        Ok(())
    }

    fn compile_identifier(&mut self, id: &Identifier) {
        let (opcode, operand) = match self.scopes.resolve(&id.name) {
            Storage::Local(slot) => (OpCode::GetLocal, Operand::Local(slot)),
            Storage::NonLocal { slot, depth } => {
                (OpCode::GetNonLocal, Operand::NonLocal { slot, depth })
            }
            Storage::Global => (
                OpCode::GetGlobal,
                Operand::Constant(self.name_constant(&id.name)),
            ),
        };
        self.emit(Instruction::with_operand(opcode, operand));
    }

    fn compile_array(&mut self, arr: &ArrayExpression) -> Result<(), Error> {
        for element in &arr.elements {
            self.compile_expression(element)?;
        }
        let count = u16::try_from(arr.elements.len())
            .map_err(|_| Error::internal("too many elements in array literal"))?;
        self.emit(Instruction::with_operand(OpCode::NewArray, Operand::Count(count)));
        Ok(())
    }

    fn compile_call(&mut self, call: &CallExpression) -> Result<(), Error> {
        self.compile_expression(&call.callee)?;
        for arg in &call.arguments {
            self.compile_expression(arg)?;
        }
        let count = u8::try_from(call.arguments.len()).map_err(|_| {
            Error::compile("Can't have more than 255 arguments", Span::default())
        })?;
        self.emit(Instruction::with_operand(OpCode::Call, Operand::ArgCount(count)));
        Ok(())
    }

    fn compile_binary(&mut self, bin: &BinaryExpression) -> Result<(), Error> {
        self.compile_expression(&bin.left)?;
        self.compile_expression(&bin.right)?;

        let opcode = match bin.operator {
            BinaryOperator::Add => OpCode::Add,
            BinaryOperator::Subtract => OpCode::Subtract,
            BinaryOperator::Multiply => OpCode::Multiply,
            BinaryOperator::Divide => OpCode::Divide,
            BinaryOperator::Modulo => OpCode::Modulo,
            BinaryOperator::Equal => OpCode::Equal,
            BinaryOperator::NotEqual => OpCode::NotEqual,
            BinaryOperator::LessThan => OpCode::LessThan,
            BinaryOperator::LessThanEqual => OpCode::LessThanEqual,
            BinaryOperator::GreaterThan => OpCode::GreaterThan,
            BinaryOperator::GreaterThanEqual => OpCode::GreaterThanEqual,
        };
        self.emit(Instruction::simple(opcode));
        Ok(())
    }

    /// `and`/`or` with short-circuit evaluation; the result is the operand
    /// that decided it.
    fn compile_logical(&mut self, logical: &LogicalExpression) -> Result<(), Error> {
        self.compile_expression(&logical.left)?;
        self.emit(Instruction::simple(OpCode::Dup));
        let short_circuit = self.emit_jump(match logical.operator {
            LogicalOperator::And => OpCode::JumpIfFalse,
            LogicalOperator::Or => OpCode::JumpIfTrue,
        });
        self.emit(Instruction::simple(OpCode::Pop));
        self.compile_expression(&logical.right)?;
        self.patch_here(short_circuit);
        Ok(())
    }

    fn compile_assignment(&mut self, assign: &AssignmentExpression) -> Result<(), Error> {
        match &assign.target {
            AssignmentTarget::Identifier(id) => {
                self.compile_expression(&assign.value)?;
                // Keep the value as the expression's result
                self.emit(Instruction::simple(OpCode::Dup));
                let storage = self.scopes.resolve(&id.name);
                self.emit_store(storage, &id.name);
            }
            AssignmentTarget::Index(target) => {
                self.compile_expression(&target.object)?;
                self.compile_expression(&target.index)?;
                self.compile_expression(&assign.value)?;
                self.emit(Instruction::simple(OpCode::SetIndex));
            }
        }
        Ok(())
    }

    /// Concatenates the segments left to right with `+`, starting from an
    /// empty string so every segment is coerced to text.
    fn compile_interpolation(&mut self, interp: &InterpolatedString) -> Result<(), Error> {
        self.emit_constant(Value::String(String::new()));
        for part in &interp.parts {
            match part {
                InterpolationPart::Literal(text) => self.emit_constant(Value::String(text.clone())),
                InterpolationPart::Expression(expr) => self.compile_expression(expr)?,
            }
            self.emit(Instruction::simple(OpCode::Add));
        }
        Ok(())
    }

    // ========================================================================
    // Utilities
    // ========================================================================

    fn emit(&mut self, instruction: Instruction) -> usize {
        self.bytecode.emit(instruction)
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.bytecode.add_constant(value);
        self.emit(Instruction::with_operand(OpCode::Constant, Operand::Constant(index)));
    }

    /// Emits a jump with a placeholder target.
    fn emit_jump(&mut self, opcode: OpCode) -> usize {
        self.emit(Instruction::with_operand(opcode, Operand::Jump(0)))
    }

    fn patch_here(&mut self, jump: usize) {
        let target = self.bytecode.position();
        self.bytecode.patch_jump(jump, target);
    }

    fn name_constant(&mut self, name: &str) -> u16 {
        self.bytecode.add_constant(Value::String(name.to_string()))
    }

    /// Pops the top of the stack into `storage`.
    fn emit_store(&mut self, storage: Storage, name: &str) {
        let (opcode, operand) = match storage {
            Storage::Local(slot) => (OpCode::SetLocal, Operand::Local(slot)),
            Storage::NonLocal { slot, depth } => {
                (OpCode::SetNonLocal, Operand::NonLocal { slot, depth })
            }
            Storage::Global => (OpCode::SetGlobal, Operand::Constant(self.name_constant(name))),
        };
        self.emit(Instruction::with_operand(opcode, operand));
    }

    fn innermost_loop(&mut self, keyword: &str, span: Span) -> Result<&mut LoopLabels, Error> {
        self.loops
            .last_mut()
            .ok_or_else(|| Error::compile(format!("Cannot use '{}' outside of a loop", keyword), span))
    }

    fn finish_loop(&mut self) -> Result<LoopLabels, Error> {
        self.loops
            .pop()
            .ok_or_else(|| Error::internal("loop labels popped twice"))
    }

    fn patch_labels(&mut self, labels: LoopLabels, continue_target: usize, break_target: usize) {
        for jump in labels.continues {
            self.bytecode.patch_jump(jump, continue_target);
        }
        for jump in labels.breaks {
            self.bytecode.patch_jump(jump, break_target);
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

fn argument_index(index: usize, span: Span) -> Result<u16, Error> {
    u16::try_from(index).map_err(|_| Error::compile("Too many parameters", span))
}
