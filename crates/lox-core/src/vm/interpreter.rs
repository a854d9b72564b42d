// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The bytecode interpreter.

use std::sync::Arc;

use tracing::{debug, trace};

use super::{arithmetic, comparison};
use crate::Error;
use crate::compiler::{Instruction, OpCode, Operand};
use crate::runtime::array::LoxArray;
use crate::runtime::context::Context;
use crate::runtime::function::{Callable, Frame, Function, FunctionProto};
use crate::runtime::value::Value;

/// Remaining native stack below which a call switches to a fresh segment.
const STACK_RED_ZONE: usize = 128 * 1024;

/// Size of each native stack segment allocated for deep recursion.
const STACK_GROW_SIZE: usize = 2 * 1024 * 1024;

/// The virtual machine that executes bytecode.
///
/// Every call runs in its own Rust activation with its own operand stack;
/// locals live in the call's [`Frame`] so closures can reach them after
/// the call returns.
pub struct VM {
    /// Globals, output and configuration
    context: Context,
    /// Number of Lox calls currently active
    depth: usize,
    /// The program being run, for naming its locals in errors
    script: Option<Arc<FunctionProto>>,
}

impl VM {
    /// Creates a new VM over the given interpreter state.
    pub fn new(context: Context) -> Self {
        Self {
            context,
            depth: 0,
            script: None,
        }
    }

    /// Returns the interpreter state.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Returns the interpreter state mutably.
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Runs a compiled program and returns the value it halted with.
    pub fn run(&mut self, script: Arc<FunctionProto>) -> Result<Value, Error> {
        debug!(
            instructions = script.bytecode.instructions.len(),
            locals = script.local_count(),
            "running program"
        );
        self.depth = 0;
        self.script = Some(Arc::clone(&script));
        let frame = Frame::new(Vec::new(), script.local_count());
        let result = self.execute(&script, &frame);
        self.context.flush();
        match &result {
            Ok(value) => debug!(result = %value, "program finished"),
            Err(err) => debug!(error = %err, "program failed"),
        }
        result
    }

    /// Calls a function value. `arguments[0]` is the callee itself.
    fn call(&mut self, arguments: Vec<Value>) -> Result<Value, Error> {
        let function = match arguments.first() {
            Some(Value::Function(function)) => Arc::clone(function),
            Some(other) => return Err(Error::TypeError(format!("cannot call {}", other))),
            None => return Err(Error::internal("call without a callee")),
        };

        match &function.callable {
            Callable::Native { name, func } => {
                trace!(function = %name, argc = arguments.len() - 1, "native call");
                func(&arguments[1..])
            }
            Callable::Compiled(proto) => {
                if self.depth >= self.context.config.max_call_depth {
                    return Err(Error::RuntimeError("Stack overflow".to_string()));
                }
                trace!(function = %proto.name, argc = arguments.len() - 1, depth = self.depth, "call");
                let frame = Frame::new(arguments, proto.local_count());
                self.depth += 1;
                let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
                    self.execute(proto, &frame)
                });
                self.depth -= 1;
                result
            }
        }
    }

    fn execute(&mut self, proto: &FunctionProto, frame: &Frame) -> Result<Value, Error> {
        let code = &proto.bytecode;
        let mut stack: Vec<Value> = Vec::with_capacity(16);
        let mut ip = 0;

        while let Some(instruction) = code.instructions.get(ip) {
            ip += 1;

            match instruction.opcode {
                // Stack operations
                OpCode::Constant => {
                    let index = constant_index(instruction)?;
                    let value = code
                        .constants
                        .get(index)
                        .cloned()
                        .ok_or_else(|| Error::internal("constant index out of range"))?;
                    stack.push(value);
                }
                OpCode::Nil => stack.push(Value::Nil),
                OpCode::True => stack.push(Value::Bool(true)),
                OpCode::False => stack.push(Value::Bool(false)),
                OpCode::Pop => {
                    pop(&mut stack)?;
                }
                OpCode::Dup => {
                    let top = stack
                        .last()
                        .cloned()
                        .ok_or_else(|| Error::internal("stack underflow"))?;
                    stack.push(top);
                }

                // Arithmetic
                OpCode::Add => binary(&mut stack, arithmetic::add)?,
                OpCode::Subtract => binary(&mut stack, arithmetic::subtract)?,
                OpCode::Multiply => binary(&mut stack, arithmetic::multiply)?,
                OpCode::Divide => binary(&mut stack, arithmetic::divide)?,
                OpCode::Modulo => binary(&mut stack, arithmetic::modulo)?,
                OpCode::Negate => {
                    let value = pop(&mut stack)?;
                    stack.push(arithmetic::negate(&value)?);
                }

                // Logic
                OpCode::Not => {
                    let value = pop(&mut stack)?;
                    stack.push(Value::Bool(!value.is_truthy()));
                }
                OpCode::IsTruthy => {
                    let value = pop(&mut stack)?;
                    stack.push(Value::Bool(value.is_truthy()));
                }

                // Comparison
                OpCode::Equal => {
                    binary(&mut stack, |a, b| Ok(Value::Bool(comparison::equals(a, b))))?
                }
                OpCode::NotEqual => {
                    binary(&mut stack, |a, b| Ok(Value::Bool(!comparison::equals(a, b))))?
                }
                OpCode::LessThan => {
                    binary(&mut stack, |a, b| comparison::less_than(a, b).map(Value::Bool))?
                }
                OpCode::LessThanEqual => binary(&mut stack, |a, b| {
                    comparison::less_than_equal(a, b).map(Value::Bool)
                })?,
                OpCode::GreaterThan => {
                    binary(&mut stack, |a, b| comparison::greater_than(a, b).map(Value::Bool))?
                }
                OpCode::GreaterThanEqual => binary(&mut stack, |a, b| {
                    comparison::greater_than_equal(a, b).map(Value::Bool)
                })?,

                // Control flow
                OpCode::Jump => ip = jump_target(instruction)?,
                OpCode::JumpIfFalse => {
                    let target = jump_target(instruction)?;
                    if !pop(&mut stack)?.is_truthy() {
                        ip = target;
                    }
                }
                OpCode::JumpIfTrue => {
                    let target = jump_target(instruction)?;
                    if pop(&mut stack)?.is_truthy() {
                        ip = target;
                    }
                }

                // Variables
                OpCode::GetLocal => {
                    let slot = local_slot(instruction)?;
                    let value = frame.local(slot).ok_or_else(|| not_defined(proto.local_name(slot)))?;
                    stack.push(value);
                }
                OpCode::SetLocal => {
                    let slot = local_slot(instruction)?;
                    frame.set_local(slot, pop(&mut stack)?);
                }
                OpCode::ClearLocal => frame.clear_local(local_slot(instruction)?),
                OpCode::GetNonLocal => {
                    let (slot, depth) = non_local(instruction)?;
                    let target = enclosing_frame(frame, depth)?;
                    let value = match target.local(slot) {
                        Some(value) => value,
                        None => return Err(not_defined(&self.frame_local_name(&target, slot))),
                    };
                    stack.push(value);
                }
                OpCode::SetNonLocal => {
                    let (slot, depth) = non_local(instruction)?;
                    let target = enclosing_frame(frame, depth)?;
                    target.set_local(slot, pop(&mut stack)?);
                }
                OpCode::LoadArgument => stack.push(frame.argument(argument_index(instruction)?)),
                OpCode::CollectArguments => {
                    let rest = frame.arguments_from(argument_index(instruction)?);
                    stack.push(Value::Array(LoxArray::from_values(rest)));
                }
                OpCode::DefineGlobal => {
                    let name = global_name(code.constants.as_slice(), instruction)?;
                    if self.context.globals.declare(name) {
                        self.context.warn_redeclared(name);
                    }
                }
                OpCode::GetGlobal => {
                    let name = global_name(code.constants.as_slice(), instruction)?;
                    stack.push(self.context.globals.read(name)?);
                }
                OpCode::SetGlobal => {
                    let name = global_name(code.constants.as_slice(), instruction)?;
                    let value = pop(&mut stack)?;
                    self.context.globals.write(name, value)?;
                }

                // Arrays
                OpCode::NewArray => {
                    let count = match instruction.operand {
                        Some(Operand::Count(count)) => count as usize,
                        _ => return Err(bad_operand(instruction)),
                    };
                    let start = stack
                        .len()
                        .checked_sub(count)
                        .ok_or_else(|| Error::internal("stack underflow"))?;
                    let elements = stack.split_off(start);
                    stack.push(Value::Array(LoxArray::from_values(elements)));
                }
                OpCode::GetIndex => {
                    let index = pop(&mut stack)?;
                    let array = expect_array(pop(&mut stack)?)?;
                    match index {
                        Value::Int(i) => stack.push(array.get(i)),
                        other => {
                            return Err(Error::TypeError(format!(
                                "Array index must be an integer, got {}",
                                other
                            )));
                        }
                    }
                }
                OpCode::SetIndex => {
                    let value = pop(&mut stack)?;
                    let index = pop(&mut stack)?;
                    let array = expect_array(pop(&mut stack)?)?;
                    let slot = match index {
                        Value::Int(i) if i >= 0 => usize::try_from(i).unwrap_or(usize::MAX),
                        other => {
                            return Err(Error::RuntimeError(format!(
                                "Array index must be a non-negative integer, got {}",
                                other
                            )));
                        }
                    };
                    array.set(slot, value.clone())?;
                    stack.push(value);
                }
                OpCode::ArraySize => {
                    let array = expect_array(pop(&mut stack)?)?;
                    stack.push(Value::Int(array.len() as i64));
                }

                // Functions
                OpCode::CreateFunction => {
                    let (index, capture) = match instruction.operand {
                        Some(Operand::Function { index, capture }) => (index as usize, capture),
                        _ => return Err(bad_operand(instruction)),
                    };
                    let body = code
                        .functions
                        .get(index)
                        .cloned()
                        .ok_or_else(|| Error::internal("function index out of range"))?;
                    let captured = capture.then(|| frame.clone());
                    stack.push(Value::Function(Arc::new(Function::compiled(body, captured))));
                }
                OpCode::Call => {
                    let argc = match instruction.operand {
                        Some(Operand::ArgCount(argc)) => argc as usize,
                        _ => return Err(bad_operand(instruction)),
                    };
                    let start = stack
                        .len()
                        .checked_sub(argc + 1)
                        .ok_or_else(|| Error::internal("stack underflow"))?;
                    let arguments = stack.split_off(start);
                    let result = self.call(arguments)?;
                    stack.push(result);
                }
                OpCode::Return => return Ok(stack.pop().unwrap_or(Value::Nil)),

                // Special
                OpCode::Print => {
                    let value = pop(&mut stack)?;
                    self.context.print(&value);
                }
                OpCode::Halt => return Ok(stack.pop().unwrap_or(Value::Nil)),
            }
        }

        Ok(stack.pop().unwrap_or(Value::Nil))
    }

    /// Source name of a slot in a frame reached through a closure.
    fn frame_local_name(&self, frame: &Frame, slot: usize) -> String {
        // Only the program's own frame has no callee
        let owner = match frame.callee() {
            Some(function) => match &function.callable {
                Callable::Compiled(proto) => Some(Arc::clone(proto)),
                Callable::Native { .. } => None,
            },
            None => self.script.clone(),
        };
        owner
            .map(|proto| proto.local_name(slot).to_string())
            .unwrap_or_else(|| "?".to_string())
    }
}

fn pop(stack: &mut Vec<Value>) -> Result<Value, Error> {
    stack.pop().ok_or_else(|| Error::internal("stack underflow"))
}

fn binary(
    stack: &mut Vec<Value>,
    op: impl FnOnce(&Value, &Value) -> Result<Value, Error>,
) -> Result<(), Error> {
    let right = pop(stack)?;
    let left = pop(stack)?;
    stack.push(op(&left, &right)?);
    Ok(())
}

/// Follows `depth` captured frames outward from the running call.
fn enclosing_frame(frame: &Frame, depth: usize) -> Result<Frame, Error> {
    let callee = frame
        .callee()
        .ok_or_else(|| Error::internal("non-local access outside a function"))?;
    Frame::materialized(&callee, depth)
}

fn expect_array(value: Value) -> Result<LoxArray, Error> {
    match value {
        Value::Array(array) => Ok(array),
        other => Err(Error::TypeError(format!("Expected array, got {}", other))),
    }
}

fn not_defined(name: &str) -> Error {
    Error::ReferenceError(format!("Variable {} was not defined", name))
}

fn bad_operand(instruction: &Instruction) -> Error {
    Error::internal(format!(
        "{:?} has operand {:?}",
        instruction.opcode, instruction.operand
    ))
}

fn constant_index(instruction: &Instruction) -> Result<usize, Error> {
    match instruction.operand {
        Some(Operand::Constant(index)) => Ok(index as usize),
        _ => Err(bad_operand(instruction)),
    }
}

fn local_slot(instruction: &Instruction) -> Result<usize, Error> {
    match instruction.operand {
        Some(Operand::Local(slot)) => Ok(slot as usize),
        _ => Err(bad_operand(instruction)),
    }
}

fn non_local(instruction: &Instruction) -> Result<(usize, usize), Error> {
    match instruction.operand {
        Some(Operand::NonLocal { slot, depth }) => Ok((slot as usize, depth as usize)),
        _ => Err(bad_operand(instruction)),
    }
}

fn argument_index(instruction: &Instruction) -> Result<usize, Error> {
    match instruction.operand {
        Some(Operand::Argument(index)) => Ok(index as usize),
        _ => Err(bad_operand(instruction)),
    }
}

fn jump_target(instruction: &Instruction) -> Result<usize, Error> {
    match instruction.operand {
        Some(Operand::Jump(target)) => Ok(target),
        _ => Err(bad_operand(instruction)),
    }
}

fn global_name<'a>(constants: &'a [Value], instruction: &Instruction) -> Result<&'a str, Error> {
    match constants.get(constant_index(instruction)?) {
        Some(Value::String(name)) => Ok(name),
        _ => Err(Error::internal("global name is not a string constant")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use crate::config::EngineConfig;
    use crate::parser::Parser;
    use crate::runtime::context::OutputBuffer;

    fn vm_with_output() -> (VM, OutputBuffer) {
        let output = OutputBuffer::new();
        let mut context = Context::new(EngineConfig::default());
        context.set_output(output.clone());
        (VM::new(context), output)
    }

    fn run(vm: &mut VM, src: &str) -> Result<Value, Error> {
        let program = Parser::new(src).parse_program()?;
        let proto = Compiler::new().compile_program(&program)?;
        vm.run(Arc::new(proto))
    }

    fn eval(src: &str) -> Result<Value, Error> {
        let (mut vm, _) = vm_with_output();
        run(&mut vm, src)
    }

    fn eval_ok(src: &str) -> Value {
        eval(src).expect("Evaluation should succeed")
    }

    fn output_of(src: &str) -> String {
        let (mut vm, output) = vm_with_output();
        run(&mut vm, src).expect("Evaluation should succeed");
        output.contents()
    }

    #[test]
    fn test_eval_literals() {
        assert_eq!(eval_ok("42;"), Value::Int(42));
        assert_eq!(eval_ok("2.5;"), Value::Float(2.5));
        assert_eq!(eval_ok("\"hello\";"), Value::from("hello"));
        assert_eq!(eval_ok("true;"), Value::Bool(true));
        assert_eq!(eval_ok("nil;"), Value::Nil);
    }

    #[test]
    fn test_statement_program_yields_nil() {
        assert_eq!(eval_ok("var a = 1;"), Value::Nil);
        assert_eq!(eval_ok(""), Value::Nil);
    }

    #[test]
    fn test_eval_arithmetic() {
        assert_eq!(eval_ok("1 + 2 * 3;"), Value::Int(7));
        assert_eq!(eval_ok("7 / 2;"), Value::Float(3.5));
        assert_eq!(eval_ok("-7 % 3;"), Value::Int(-1));
    }

    #[test]
    fn test_print_writes_to_context_output() {
        assert_eq!(output_of("print 1; print \"two\"; print nil;"), "1\ntwo\nnil\n");
    }

    #[test]
    fn test_block_locals() {
        assert_eq!(output_of("{ var a = 1; { var a = 2; print a; } print a; }"), "2\n1\n");
    }

    #[test]
    fn test_unassigned_local_is_not_defined() {
        let err = eval("{ var a; print a; }").unwrap_err();
        assert_eq!(err.to_string(), "ReferenceError: Variable a was not defined");
    }

    #[test]
    fn test_local_initializer_sees_new_slot() {
        let err = eval("{ var a = a; }").unwrap_err();
        assert!(err.to_string().contains("Variable a was not defined"));
    }

    #[test]
    fn test_undeclared_global() {
        let err = eval("print missing;").unwrap_err();
        assert_eq!(err.to_string(), "ReferenceError: Variable missing was not declared");
        let err = eval("missing = 1;").unwrap_err();
        assert!(err.to_string().contains("was not declared"));
    }

    #[test]
    fn test_declared_but_undefined_global() {
        let err = eval("var a; print a;").unwrap_err();
        assert_eq!(err.to_string(), "ReferenceError: Variable a was not defined");
    }

    #[test]
    fn test_function_call_and_return() {
        assert_eq!(eval_ok("fun add(a, b) { return a + b; } add(2, 3);"), Value::Int(5));
        assert_eq!(eval_ok("fun f() {} f();"), Value::Nil);
    }

    #[test]
    fn test_missing_arguments_are_nil() {
        assert_eq!(eval_ok("fun f(a, b) { return b; } f(1);"), Value::Nil);
        assert_eq!(eval_ok("fun f(a) { return a; } f(1, 2, 3);"), Value::Int(1));
    }

    #[test]
    fn test_rest_parameter_collects() {
        assert_eq!(
            output_of("fun f(a, ...r) { print r; } f(1, 2, \"x\"); f(1);"),
            "[2, \"x\"]\n[]\n"
        );
    }

    #[test]
    fn test_closure_keeps_frame_alive() {
        let src = r#"
            fun counter() {
                var i = 0;
                fun inc() { i = i + 1; return i; }
                return inc;
            }
            var c = counter();
            c();
            c();
            print c();
            var d = counter();
            print d();
        "#;
        assert_eq!(output_of(src), "3\n1\n");
    }

    #[test]
    fn test_closure_two_levels_out() {
        let src = r#"
            fun a() {
                var x = "outer";
                fun b() {
                    fun c() { return x; }
                    return c;
                }
                return b;
            }
            print a()()();
        "#;
        assert_eq!(output_of(src), "outer\n");
    }

    #[test]
    fn test_nonlocal_not_defined_names_variable() {
        let src = "fun f() { var late; fun g() { return late; } return g; } f()();";
        let err = eval(src).unwrap_err();
        assert_eq!(err.to_string(), "ReferenceError: Variable late was not defined");
    }

    #[test]
    fn test_closure_over_program_block() {
        assert_eq!(
            output_of("{ var n = 5; fun show() { print n; } n = 6; show(); }"),
            "6\n"
        );
    }

    #[test]
    fn test_local_recursion() {
        let src = "{ fun fact(n) { if (n <= 1) return 1; return n * fact(n - 1); } print fact(5); }";
        assert_eq!(output_of(src), "120\n");
    }

    #[test]
    fn test_call_non_function() {
        let err = eval("var a = 1; a();").unwrap_err();
        assert_eq!(err.to_string(), "TypeError: cannot call 1");
    }

    #[test]
    fn test_stack_overflow() {
        let mut context = Context::new(EngineConfig::default().max_call_depth(32));
        context.set_output(OutputBuffer::new());
        let mut vm = VM::new(context);
        let err = run(&mut vm, "fun f() { return f(); } f();").unwrap_err();
        assert_eq!(err.to_string(), "RuntimeError: Stack overflow");
        // Depth resets for the next run
        assert_eq!(run(&mut vm, "fun g() { return 1; } g();").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_native_call() {
        assert!(matches!(eval_ok("clock();"), Value::Float(_)));
    }

    #[test]
    fn test_array_operations() {
        assert_eq!(output_of("var a = [1, 2]; a[3] = 4; print a;"), "[1, 2, nil, 4]\n");
        assert_eq!(eval_ok("var a = [1]; a[5];"), Value::Nil);
        assert_eq!(eval_ok("var a = [1]; a[0] = 7;"), Value::Int(7));
    }

    #[test]
    fn test_array_aliasing() {
        assert_eq!(output_of("var a = [1]; var b = a; b[0] = 9; print a[0];"), "9\n");
    }

    #[test]
    fn test_array_errors() {
        let err = eval("var a = 1; a[0];").unwrap_err();
        assert_eq!(err.to_string(), "TypeError: Expected array, got 1");
        let err = eval("var a = []; a[-1] = 1;").unwrap_err();
        assert!(err.to_string().contains("non-negative integer"));
        let err = eval("var a = []; a[\"x\"];").unwrap_err();
        assert!(err.to_string().contains("must be an integer"));
    }

    #[test]
    fn test_logical_operators_short_circuit() {
        assert_eq!(eval_ok("nil or 2;"), Value::Int(2));
        assert_eq!(eval_ok("false and missing();"), Value::Bool(false));
        assert_eq!(eval_ok("1 and 2;"), Value::Int(2));
    }

    #[test]
    fn test_redeclared_global_warns_and_keeps_value() {
        let (mut vm, output) = vm_with_output();
        run(&mut vm, "var a = 1; var a; print a;").unwrap();
        assert_eq!(output.contents(), "Warning: Variable a was already declared\n1\n");
    }

    #[test]
    fn test_globals_persist_between_runs() {
        let (mut vm, _) = vm_with_output();
        run(&mut vm, "var a = 20;").unwrap();
        assert_eq!(run(&mut vm, "a + 22;").unwrap(), Value::Int(42));
    }

    #[test]
    fn test_top_level_return() {
        assert_eq!(eval_ok("return 5; print 1;"), Value::Int(5));
    }
}
