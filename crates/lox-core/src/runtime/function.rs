// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lox function, closure and frame representation.
//!
//! A call's storage is a [`Frame`]: the argument vector (slot 0 holds the
//! callee itself) plus the local slots. Frames are reference counted so a
//! closure created during the call can keep the frame alive after the call
//! returns. Reaching a variable `n` function boundaries outward walks `n`
//! captured frames, see [`Frame::materialized`].

use super::value::Value;
use crate::Error;
use crate::compiler::Bytecode;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// A compiled callable unit: a function body, a lambda body or the
/// top-level program.
#[derive(Debug, Clone)]
pub struct FunctionProto {
    /// The function name, empty for lambdas
    pub name: String,
    /// The compiled body
    pub bytecode: Bytecode,
    /// Source name of each local slot, used for diagnostics
    pub local_names: Vec<String>,
    /// Number of fixed parameters
    pub arity: usize,
    /// Whether the last parameter collects the remaining arguments
    pub variadic: bool,
    /// Whether values of this function capture their defining frame
    pub captures_frame: bool,
}

impl FunctionProto {
    /// Creates a prototype with no locals.
    pub fn new(name: impl Into<String>, bytecode: Bytecode) -> Self {
        Self {
            name: name.into(),
            bytecode,
            local_names: Vec::new(),
            arity: 0,
            variadic: false,
            captures_frame: false,
        }
    }

    /// Number of local slots a call needs.
    pub fn local_count(&self) -> usize {
        self.local_names.len()
    }

    /// Name of a local slot, for error messages.
    pub fn local_name(&self, slot: usize) -> &str {
        self.local_names.get(slot).map(String::as_str).unwrap_or("?")
    }
}

/// A native (Rust) function. Receives the user arguments only.
pub type NativeFunction = fn(&[Value]) -> Result<Value, Error>;

/// The body behind a function value.
#[derive(Clone)]
pub enum Callable {
    /// A compiled Lox function
    Compiled(Arc<FunctionProto>),
    /// A native Rust function
    Native {
        /// The function name
        name: String,
        /// The native function pointer
        func: NativeFunction,
    },
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Compiled(proto) => write!(f, "Compiled({:?})", proto.name),
            Callable::Native { name, .. } => write!(f, "NativeFunction({})", name),
        }
    }
}

/// A function value: a body plus the frame it closed over, if any.
///
/// A function without a captured frame was declared where nothing it
/// references lives in an enclosing call. One with a captured frame is a
/// closure.
pub struct Function {
    /// What runs when the function is called
    pub callable: Callable,
    /// The frame that was active when this value was created
    pub captured: Option<Frame>,
}

impl Function {
    /// Creates a function value from a compiled body.
    pub fn compiled(proto: Arc<FunctionProto>, captured: Option<Frame>) -> Self {
        Self {
            callable: Callable::Compiled(proto),
            captured,
        }
    }

    /// Creates a native function value.
    pub fn native(name: impl Into<String>, func: NativeFunction) -> Self {
        Self {
            callable: Callable::Native {
                name: name.into(),
                func,
            },
            captured: None,
        }
    }

    /// Returns the function name.
    pub fn name(&self) -> &str {
        match &self.callable {
            Callable::Compiled(proto) => &proto.name,
            Callable::Native { name, .. } => name,
        }
    }

    /// Returns true if this function closed over a frame.
    pub fn is_closure(&self) -> bool {
        self.captured.is_some()
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Captured frames can reach this function again, so stay shallow.
        f.debug_struct("Function")
            .field("callable", &self.callable)
            .field("closure", &self.is_closure())
            .finish()
    }
}

/// Argument and local storage of one call.
#[derive(Default)]
pub struct FrameData {
    /// Call arguments, slot 0 is the callee
    pub arguments: Vec<Value>,
    /// Local slots, `None` until first written
    pub locals: Vec<Option<Value>>,
}

/// Shared handle to a call's storage.
#[derive(Clone, Default)]
pub struct Frame {
    inner: Arc<RwLock<FrameData>>,
}

impl Frame {
    /// Creates storage for a call with `local_count` uninitialized slots.
    pub fn new(arguments: Vec<Value>, local_count: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(FrameData {
                arguments,
                locals: vec![None; local_count],
            })),
        }
    }

    /// Reads argument `index`, nil when the caller passed fewer.
    pub fn argument(&self, index: usize) -> Value {
        self.inner
            .read()
            .arguments
            .get(index)
            .cloned()
            .unwrap_or(Value::Nil)
    }

    /// Copies arguments from `start` onward.
    pub fn arguments_from(&self, start: usize) -> Vec<Value> {
        let data = self.inner.read();
        data.arguments.get(start..).map(<[Value]>::to_vec).unwrap_or_default()
    }

    /// Reads a local slot; `None` means declared but not yet defined.
    pub fn local(&self, slot: usize) -> Option<Value> {
        self.inner.read().locals.get(slot).cloned().flatten()
    }

    /// Writes a local slot, growing the slot vector if needed.
    pub fn set_local(&self, slot: usize, value: Value) {
        let mut data = self.inner.write();
        if slot >= data.locals.len() {
            data.locals.resize(slot + 1, None);
        }
        data.locals[slot] = Some(value);
    }

    /// Marks a local slot as not yet defined.
    pub fn clear_local(&self, slot: usize) {
        let mut data = self.inner.write();
        if let Some(local) = data.locals.get_mut(slot) {
            *local = None;
        }
    }

    /// The function value this frame belongs to, if any.
    pub fn callee(&self) -> Option<Arc<Function>> {
        match self.inner.read().arguments.first() {
            Some(Value::Function(function)) => Some(Arc::clone(function)),
            _ => None,
        }
    }

    /// Walks `levels` captured frames outward from `function`.
    ///
    /// Hop one is the frame `function` captured; every further hop reads
    /// the callee stored in argument slot 0 of the frame just reached and
    /// follows its captured frame.
    pub fn materialized(function: &Function, levels: usize) -> Result<Frame, Error> {
        let mut frame = function
            .captured
            .clone()
            .ok_or_else(|| Error::internal("function has no captured frame"))?;
        for _ in 1..levels {
            let callee = frame
                .callee()
                .ok_or_else(|| Error::internal("materialized frame has no callee"))?;
            frame = callee
                .captured
                .clone()
                .ok_or_else(|| Error::internal("enclosing function has no captured frame"))?;
        }
        Ok(frame)
    }

    /// Returns true if both handles share the same storage.
    pub fn ptr_eq(&self, other: &Frame) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.read();
        f.debug_struct("Frame")
            .field("arguments", &data.arguments.len())
            .field("locals", &data.locals.len())
            .finish()
    }
}
