// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lox value representation.

use super::array::LoxArray;
use super::function::Function;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::fmt;
use std::sync::Arc;

/// A Lox runtime value.
///
/// Values are cheap to clone: arrays and functions are reference values
/// and cloning them only bumps a reference count, so every clone aliases
/// the same storage.
#[derive(Debug, Clone)]
pub enum Value {
    /// nil
    Nil,
    /// Boolean value
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// Arbitrary precision integer, produced by literals or overflow
    BigInt(BigInt),
    /// IEEE 754 double
    Float(f64),
    /// String
    String(String),
    /// Shared, mutable array
    Array(LoxArray),
    /// Function or closure
    Function(Arc<Function>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Int(a), Value::BigInt(b)) | (Value::BigInt(b), Value::Int(a)) => {
                b.to_i64() == Some(*a)
            }
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    /// Returns true if this value is nil.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Returns true for the three numeric kinds.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::BigInt(_) | Value::Float(_))
    }

    /// Truthiness: only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Returns the kind of this value as a lowercase name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::BigInt(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Function(_) => "function",
        }
    }

    /// Formats the value the way it appears inside an array, where
    /// strings are quoted.
    pub fn to_element_string(&self) -> String {
        match self {
            Value::String(s) => format!("\"{}\"", s),
            other => other.to_string(),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Nil
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::BigInt(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::BigInt(n) => write!(f, "{}", n),
            Value::Float(n) => write_float(f, *n),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(array) => write!(f, "{}", array),
            Value::Function(function) => write!(f, "Function {}", function.name()),
        }
    }
}

/// Writes a float in positional notation, always with a decimal point.
fn write_float(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    let text = n.to_string();
    if n.is_finite() && !text.contains('.') {
        write!(f, "{}.0", text)
    } else {
        write!(f, "{}", text)
    }
}
