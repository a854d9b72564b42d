// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode compiler for Lox.
//!
//! Transforms AST into bytecode that can be executed by the VM.
//!
//! # Module Structure
//!
//! - `bytecode`: Bytecode definitions and instructions
//! - `codegen`: Code generation from AST
//!   - `codegen::scope`: Scope management for variable resolution

pub mod bytecode;
pub mod codegen;

pub use bytecode::{Bytecode, Instruction, OpCode, Operand};
pub use codegen::{Compiler, SCRIPT_NAME};
