// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Growable Lox arrays with nil-fill semantics.

use super::value::Value;
use crate::Error;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Capacity of a freshly created array.
pub const INITIAL_CAPACITY: usize = 10;

/// Upper bound on the number of elements an array may hold.
pub const MAX_LENGTH: usize = 1 << 24;

/// A shared, mutable, zero-indexed array.
///
/// Cloning a `LoxArray` aliases the same storage; writes through one
/// handle are visible through every other.
#[derive(Clone, Default)]
pub struct LoxArray {
    inner: Arc<RwLock<ArrayStorage>>,
}

#[derive(Debug)]
struct ArrayStorage {
    elements: Vec<Value>,
    /// Highest index ever written plus one
    size: usize,
}

impl Default for ArrayStorage {
    fn default() -> Self {
        Self {
            elements: vec![Value::Nil; INITIAL_CAPACITY],
            size: 0,
        }
    }
}

impl ArrayStorage {
    fn ensure_capacity(&mut self, index: usize) -> Result<(), Error> {
        let mut capacity = self.elements.len().max(1);
        while capacity <= index {
            capacity = capacity.saturating_mul(2);
        }
        let capacity = capacity.min(MAX_LENGTH);
        if capacity > self.elements.len() {
            self.elements
                .try_reserve_exact(capacity - self.elements.len())
                .map_err(|_| out_of_range(index))?;
            self.elements.resize(capacity, Value::Nil);
        }
        Ok(())
    }
}

fn out_of_range(index: usize) -> Error {
    Error::RuntimeError(format!("Array index {} is out of range", index))
}

/// Identity of an array's storage, used to detect cycles.
type StoragePtr = *const RwLock<ArrayStorage>;

impl LoxArray {
    /// Creates an empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an array holding `values` at indices `0..len`.
    pub fn from_values(values: Vec<Value>) -> Self {
        let size = values.len();
        let mut elements = values;
        if elements.len() < INITIAL_CAPACITY {
            elements.resize(INITIAL_CAPACITY, Value::Nil);
        }
        Self {
            inner: Arc::new(RwLock::new(ArrayStorage { elements, size })),
        }
    }

    /// Returns the element at `index`, or nil for negative, out-of-range,
    /// or never-written slots.
    pub fn get(&self, index: i64) -> Value {
        let storage = self.inner.read();
        if index < 0 {
            return Value::Nil;
        }
        storage
            .elements
            .get(index as usize)
            .cloned()
            .unwrap_or(Value::Nil)
    }

    /// Writes `value` at `index`, growing the backing store by doubling.
    ///
    /// Indices at or past [`MAX_LENGTH`] are rejected, as is any growth
    /// the allocator refuses.
    pub fn set(&self, index: usize, value: Value) -> Result<(), Error> {
        if index >= MAX_LENGTH {
            return Err(out_of_range(index));
        }
        let mut storage = self.inner.write();
        if index >= storage.elements.len() {
            storage.ensure_capacity(index)?;
        }
        if index >= storage.size {
            storage.size = index + 1;
        }
        storage.elements[index] = value;
        Ok(())
    }

    /// Number of elements, i.e. the highest written index plus one.
    pub fn len(&self) -> usize {
        self.inner.read().size
    }

    /// Returns true if nothing was ever written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current backing capacity.
    pub fn capacity(&self) -> usize {
        self.inner.read().elements.len()
    }

    /// Copies out the live elements.
    pub fn to_vec(&self) -> Vec<Value> {
        let storage = self.inner.read();
        storage.elements[..storage.size].to_vec()
    }

    /// Returns true if both handles alias the same storage.
    pub fn ptr_eq(&self, other: &LoxArray) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn storage_ptr(&self) -> StoragePtr {
        Arc::as_ptr(&self.inner)
    }

    /// Structural equality. A pair of arrays already being compared
    /// further up is assumed equal, so cyclic arrays terminate.
    fn eq_on_path(&self, other: &LoxArray, path: &mut Vec<(StoragePtr, StoragePtr)>) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let pair = (self.storage_ptr(), other.storage_ptr());
        if path.contains(&pair) {
            return true;
        }
        let (left, right) = (self.to_vec(), other.to_vec());
        if left.len() != right.len() {
            return false;
        }
        path.push(pair);
        let equal = left.iter().zip(&right).all(|pair| match pair {
            (Value::Array(a), Value::Array(b)) => a.eq_on_path(b, path),
            (a, b) => a == b,
        });
        path.pop();
        equal
    }

    /// Writes the array, printing `[...]` for an array that is already
    /// being printed further up.
    fn fmt_on_path(&self, f: &mut fmt::Formatter<'_>, path: &mut Vec<StoragePtr>) -> fmt::Result {
        if path.contains(&self.storage_ptr()) {
            return write!(f, "[...]");
        }
        path.push(self.storage_ptr());
        write!(f, "[")?;
        for (i, element) in self.to_vec().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match element {
                Value::Array(inner) => inner.fmt_on_path(f, path)?,
                other => write!(f, "{}", other.to_element_string())?,
            }
        }
        path.pop();
        write!(f, "]")
    }
}

impl PartialEq for LoxArray {
    fn eq(&self, other: &Self) -> bool {
        self.eq_on_path(other, &mut Vec::new())
    }
}

impl fmt::Debug for LoxArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_on_path(f, &mut Vec::new())
    }
}

impl fmt::Display for LoxArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_on_path(f, &mut Vec::new())
    }
}
