// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Arithmetic over the numeric tower.
//!
//! Integers are 64-bit until an operation overflows, at which point the
//! result is promoted to a big integer. Big integer results are never
//! narrowed back. Mixing an integer of either width with a float yields a
//! float. `+` with a string on either side concatenates display forms.

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::Error;
use crate::runtime::value::Value;

/// A numeric operand pair after promotion to a common representation.
enum Operands {
    Int(i64, i64),
    Big(BigInt, BigInt),
    Float(f64, f64),
}

/// Promotes two numeric values to a common representation, or `None`
/// when either side is not a number.
fn promote(a: &Value, b: &Value) -> Option<Operands> {
    Some(match (a, b) {
        (Value::Int(x), Value::Int(y)) => Operands::Int(*x, *y),
        (Value::Float(x), Value::Float(y)) => Operands::Float(*x, *y),
        (Value::Int(x), Value::Float(y)) => Operands::Float(*x as f64, *y),
        (Value::Float(x), Value::Int(y)) => Operands::Float(*x, *y as f64),
        (Value::BigInt(x), Value::BigInt(y)) => Operands::Big(x.clone(), y.clone()),
        (Value::Int(x), Value::BigInt(y)) => Operands::Big(BigInt::from(*x), y.clone()),
        (Value::BigInt(x), Value::Int(y)) => Operands::Big(x.clone(), BigInt::from(*y)),
        (Value::BigInt(x), Value::Float(y)) => Operands::Float(big_to_f64(x), *y),
        (Value::Float(x), Value::BigInt(y)) => Operands::Float(*x, big_to_f64(y)),
        _ => return None,
    })
}

fn big_to_f64(n: &BigInt) -> f64 {
    n.to_f64().unwrap_or(f64::NAN)
}

/// Applies a checked 64-bit operation, redoing it on big integers when it
/// overflows.
fn int_or_big(
    x: i64,
    y: i64,
    checked: fn(i64, i64) -> Option<i64>,
    big: fn(BigInt, BigInt) -> BigInt,
) -> Value {
    match checked(x, y) {
        Some(n) => Value::Int(n),
        None => Value::BigInt(big(BigInt::from(x), BigInt::from(y))),
    }
}

/// `a + b`
pub fn add(a: &Value, b: &Value) -> Result<Value, Error> {
    if let (Value::String(_), _) | (_, Value::String(_)) = (a, b) {
        return Ok(Value::String(format!("{}{}", a, b)));
    }
    match promote(a, b) {
        Some(Operands::Int(x, y)) => Ok(int_or_big(x, y, i64::checked_add, |x, y| x + y)),
        Some(Operands::Big(x, y)) => Ok(Value::BigInt(x + y)),
        Some(Operands::Float(x, y)) => Ok(Value::Float(x + y)),
        None => Err(Error::TypeError(format!(
            "Unsupported types for addition: cannot add {} and {}",
            a, b
        ))),
    }
}

/// `a - b`
pub fn subtract(a: &Value, b: &Value) -> Result<Value, Error> {
    match promote(a, b) {
        Some(Operands::Int(x, y)) => Ok(int_or_big(x, y, i64::checked_sub, |x, y| x - y)),
        Some(Operands::Big(x, y)) => Ok(Value::BigInt(x - y)),
        Some(Operands::Float(x, y)) => Ok(Value::Float(x - y)),
        None => Err(Error::TypeError(format!(
            "Unsupported types for subtraction: cannot subtract {} and {}",
            a, b
        ))),
    }
}

/// `a * b`
pub fn multiply(a: &Value, b: &Value) -> Result<Value, Error> {
    match promote(a, b) {
        Some(Operands::Int(x, y)) => Ok(int_or_big(x, y, i64::checked_mul, |x, y| x * y)),
        Some(Operands::Big(x, y)) => Ok(Value::BigInt(x * y)),
        Some(Operands::Float(x, y)) => Ok(Value::Float(x * y)),
        None => Err(Error::TypeError(format!(
            "Unsupported types for multiplication: cannot multiply {} and {}",
            a, b
        ))),
    }
}

/// `a / b`
///
/// Integer division is exact when the divisor divides evenly and a float
/// otherwise, so `6 / 3` is `2` and `7 / 2` is `3.5`. Big integer division
/// truncates.
pub fn divide(a: &Value, b: &Value) -> Result<Value, Error> {
    let divide_by_zero = || Error::RuntimeError("Cannot divide by zero".to_string());
    match promote(a, b) {
        Some(Operands::Int(_, 0)) => Err(divide_by_zero()),
        Some(Operands::Int(x, y)) => match x.checked_rem(y) {
            Some(0) => Ok(int_or_big(x, y, i64::checked_div, |x, y| x / y)),
            Some(_) => Ok(Value::Float(x as f64 / y as f64)),
            // i64::MIN / -1
            None => Ok(Value::BigInt(BigInt::from(x) / BigInt::from(y))),
        },
        Some(Operands::Big(_, y)) if y.is_zero() => Err(divide_by_zero()),
        Some(Operands::Big(x, y)) => Ok(Value::BigInt(x / y)),
        Some(Operands::Float(_, y)) if y == 0.0 => Err(divide_by_zero()),
        Some(Operands::Float(x, y)) => Ok(Value::Float(x / y)),
        None => Err(Error::TypeError(format!(
            "Unsupported types for division: cannot divide {} and {}",
            a, b
        ))),
    }
}

/// `a % b`, the remainder of truncating division; its sign follows the
/// dividend.
pub fn modulo(a: &Value, b: &Value) -> Result<Value, Error> {
    let modulo_by_zero = || Error::RuntimeError("Cannot modulo by zero".to_string());
    match promote(a, b) {
        Some(Operands::Int(_, 0)) => Err(modulo_by_zero()),
        // i64::MIN % -1 is the only overflow and its remainder is zero
        Some(Operands::Int(x, y)) => Ok(Value::Int(x.checked_rem(y).unwrap_or(0))),
        Some(Operands::Big(_, y)) if y.is_zero() => Err(modulo_by_zero()),
        Some(Operands::Big(x, y)) => Ok(Value::BigInt(x % y)),
        Some(Operands::Float(_, y)) if y == 0.0 => Err(modulo_by_zero()),
        Some(Operands::Float(x, y)) => Ok(Value::Float(x % y)),
        None => Err(Error::TypeError(format!(
            "Unsupported types for modulus: cannot modulo {} and {}",
            a, b
        ))),
    }
}

/// `-a`
pub fn negate(a: &Value) -> Result<Value, Error> {
    match a {
        Value::Int(n) => Ok(n
            .checked_neg()
            .map(Value::Int)
            .unwrap_or_else(|| Value::BigInt(-BigInt::from(*n)))),
        Value::BigInt(n) => Ok(Value::BigInt(-n)),
        Value::Float(n) => Ok(Value::Float(-n)),
        other => Err(Error::TypeError(format!(
            "Unsupported type for negation: cannot negate {}",
            other
        ))),
    }
}
