// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Equality and ordering.
//!
//! Equality never coerces: values of different kinds are unequal, except
//! that an integer and a big integer holding the same number are equal.
//! Ordering is defined for numbers only.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::Error;
use crate::runtime::value::Value;

/// `a == b`
pub fn equals(a: &Value, b: &Value) -> bool {
    a == b
}

/// Orders two numbers, or fails with "Cannot compare".
///
/// Returns `None` for unordered floats (NaN), which makes every ordering
/// operator false.
pub fn compare(a: &Value, b: &Value) -> Result<Option<Ordering>, Error> {
    let ordering = match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::BigInt(x), Value::BigInt(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::BigInt(y)) => Some(BigInt::from(*x).cmp(y)),
        (Value::BigInt(x), Value::Int(y)) => Some(x.cmp(&BigInt::from(*y))),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Value::BigInt(x), Value::Float(y)) => x.to_f64().and_then(|x| x.partial_cmp(y)),
        (Value::Float(x), Value::BigInt(y)) => y.to_f64().and_then(|y| x.partial_cmp(&y)),
        _ => {
            return Err(Error::TypeError(format!("Cannot compare {} and {}", a, b)));
        }
    };
    Ok(ordering)
}

/// `a < b`
pub fn less_than(a: &Value, b: &Value) -> Result<bool, Error> {
    Ok(compare(a, b)? == Some(Ordering::Less))
}

/// `a <= b`
pub fn less_than_equal(a: &Value, b: &Value) -> Result<bool, Error> {
    Ok(matches!(compare(a, b)?, Some(Ordering::Less | Ordering::Equal)))
}

/// `a > b`
pub fn greater_than(a: &Value, b: &Value) -> Result<bool, Error> {
    Ok(compare(a, b)? == Some(Ordering::Greater))
}

/// `a >= b`
pub fn greater_than_equal(a: &Value, b: &Value) -> Result<bool, Error> {
    Ok(matches!(compare(a, b)?, Some(Ordering::Greater | Ordering::Equal)))
}
