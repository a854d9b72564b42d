// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode definitions.

use crate::runtime::function::FunctionProto;
use crate::runtime::value::Value;
use std::fmt::{self, Write};
use std::sync::Arc;

/// A compiled bytecode chunk.
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    /// The instructions
    pub instructions: Vec<Instruction>,
    /// The constant pool
    pub constants: Vec<Value>,
    /// Nested function bodies created by `CreateFunction`
    pub functions: Vec<Arc<FunctionProto>>,
}

impl Bytecode {
    /// Creates a new empty bytecode chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instruction and returns its index.
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        let index = self.instructions.len();
        self.instructions.push(instruction);
        index
    }

    /// Adds a constant and returns its index, reusing an equal string
    /// constant when one exists.
    pub fn add_constant(&mut self, value: Value) -> u16 {
        if let Value::String(_) = value {
            if let Some(index) = self.constants.iter().position(|c| {
                matches!(c, Value::String(_)) && *c == value
            }) {
                return index as u16;
            }
        }
        let index = self.constants.len();
        self.constants.push(value);
        index as u16
    }

    /// Adds a nested function body and returns its index.
    pub fn add_function(&mut self, proto: FunctionProto) -> u16 {
        let index = self.functions.len();
        self.functions.push(Arc::new(proto));
        index as u16
    }

    /// Index the next emitted instruction will get.
    pub fn position(&self) -> usize {
        self.instructions.len()
    }

    /// Points the jump at `index` to `target`.
    pub fn patch_jump(&mut self, index: usize, target: usize) {
        if let Some(instruction) = self.instructions.get_mut(index) {
            instruction.operand = Some(Operand::Jump(target));
        }
    }

    /// Renders the chunk one instruction per line, followed by every
    /// nested function body.
    pub fn disassemble(&self, name: &str) -> String {
        let mut out = String::new();
        self.disassemble_into(name, &mut out);
        out
    }

    fn disassemble_into(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "== {} ==", if name.is_empty() { "<lambda>" } else { name });
        for (index, instruction) in self.instructions.iter().enumerate() {
            let _ = write!(out, "{:04} {:?}", index, instruction.opcode);
            if let Some(operand) = &instruction.operand {
                let _ = write!(out, " {}", operand);
                if let Operand::Constant(constant) = operand {
                    if let Some(value) = self.constants.get(*constant as usize) {
                        let _ = write!(out, " ({})", value.to_element_string());
                    }
                }
            }
            out.push('\n');
        }
        for function in &self.functions {
            out.push('\n');
            function.bytecode.disassemble_into(&function.name, out);
        }
    }
}

/// A single bytecode instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The operation code
    pub opcode: OpCode,
    /// Optional operand
    pub operand: Option<Operand>,
}

impl Instruction {
    /// Creates a new instruction with no operand.
    pub fn simple(opcode: OpCode) -> Self {
        Self {
            opcode,
            operand: None,
        }
    }

    /// Creates a new instruction with an operand.
    pub fn with_operand(opcode: OpCode, operand: Operand) -> Self {
        Self {
            opcode,
            operand: Some(operand),
        }
    }
}

/// Instruction operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Constant pool index
    Constant(u16),
    /// Local slot in the current frame
    Local(u16),
    /// Local slot `depth` captured frames outward
    NonLocal {
        /// Slot in the reached frame
        slot: u16,
        /// Number of function boundaries crossed
        depth: u16,
    },
    /// Call argument index, 0 is the callee
    Argument(u16),
    /// Absolute jump target
    Jump(usize),
    /// Argument count for calls
    ArgCount(u8),
    /// Element count for array literals
    Count(u16),
    /// Nested function index and whether to capture the current frame
    Function {
        /// Index into `Bytecode::functions`
        index: u16,
        /// Capture the current frame
        capture: bool,
    },
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Constant(index) => write!(f, "#{}", index),
            Operand::Local(slot) => write!(f, "slot={}", slot),
            Operand::NonLocal { slot, depth } => write!(f, "slot={} depth={}", slot, depth),
            Operand::Argument(index) => write!(f, "arg={}", index),
            Operand::Jump(target) => write!(f, "-> {:04}", target),
            Operand::ArgCount(count) => write!(f, "argc={}", count),
            Operand::Count(count) => write!(f, "n={}", count),
            Operand::Function { index, capture } => {
                write!(f, "fn={}{}", index, if *capture { " capture" } else { "" })
            }
        }
    }
}

/// Operation codes for the bytecode VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // Stack operations
    /// Push a constant
    Constant,
    /// Push nil
    Nil,
    /// Push true
    True,
    /// Push false
    False,
    /// Pop top of stack
    Pop,
    /// Duplicate top of stack
    Dup,

    // Arithmetic
    /// Addition or string concatenation
    Add,
    /// Subtraction
    Subtract,
    /// Multiplication
    Multiply,
    /// Division
    Divide,
    /// Truncating remainder
    Modulo,
    /// Unary negation
    Negate,

    // Logic
    /// Logical not
    Not,
    /// Replace top of stack with its truthiness
    IsTruthy,

    // Comparison
    /// Structural equality
    Equal,
    /// Structural inequality
    NotEqual,
    /// Less than
    LessThan,
    /// Less than or equal
    LessThanEqual,
    /// Greater than
    GreaterThan,
    /// Greater than or equal
    GreaterThanEqual,

    // Control flow
    /// Unconditional jump
    Jump,
    /// Pop and jump if falsy
    JumpIfFalse,
    /// Pop and jump if truthy
    JumpIfTrue,

    // Variables
    /// Read a local, failing if it is not yet defined
    GetLocal,
    /// Pop into a local
    SetLocal,
    /// Mark a local as not yet defined
    ClearLocal,
    /// Read a local of an enclosing call through captured frames
    GetNonLocal,
    /// Pop into a local of an enclosing call
    SetNonLocal,
    /// Push a call argument, nil if absent
    LoadArgument,
    /// Push an array of the arguments from an index onward
    CollectArguments,
    /// Declare a global
    DefineGlobal,
    /// Read a global
    GetGlobal,
    /// Pop into a global
    SetGlobal,

    // Arrays
    /// Build an array from the top `n` values
    NewArray,
    /// array[index]
    GetIndex,
    /// array[index] = value, leaves value
    SetIndex,
    /// Number of elements of an array
    ArraySize,

    // Functions
    /// Push a function value, optionally capturing the current frame
    CreateFunction,
    /// Call a function
    Call,
    /// Return from function
    Return,

    // Special
    /// Pop and print
    Print,
    /// Halt execution
    Halt,
}
