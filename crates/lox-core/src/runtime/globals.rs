// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The global variable table.

use super::value::Value;
use crate::Error;
use rustc_hash::FxHashMap;

/// Mapping from global name to value.
///
/// A name maps to `None` once declared and to `Some` once assigned.
/// Reading an undeclared name and reading a declared but unassigned name
/// are distinct errors.
#[derive(Debug, Clone, Default)]
pub struct GlobalTable {
    bindings: FxHashMap<String, Option<Value>>,
}

impl GlobalTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name`, keeping any existing value.
    ///
    /// Returns true if the name was already declared.
    pub fn declare(&mut self, name: &str) -> bool {
        if self.bindings.contains_key(name) {
            return true;
        }
        self.bindings.insert(name.to_string(), None);
        false
    }

    /// Declares and assigns `name` in one step.
    pub fn define(&mut self, name: &str, value: Value) {
        self.bindings.insert(name.to_string(), Some(value));
    }

    /// Reads a global.
    pub fn read(&self, name: &str) -> Result<Value, Error> {
        match self.bindings.get(name) {
            None => Err(Error::ReferenceError(format!(
                "Variable {} was not declared",
                name
            ))),
            Some(None) => Err(Error::ReferenceError(format!(
                "Variable {} was not defined",
                name
            ))),
            Some(Some(value)) => Ok(value.clone()),
        }
    }

    /// Assigns a declared global.
    pub fn write(&mut self, name: &str, value: Value) -> Result<(), Error> {
        match self.bindings.get_mut(name) {
            Some(slot) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(Error::ReferenceError(format!(
                "Variable {} was not declared",
                name
            ))),
        }
    }

    /// Returns true if `name` is declared.
    pub fn is_declared(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Declared names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.bindings.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of declared globals.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undeclared_read() {
        let table = GlobalTable::new();
        let err = table.read("a").unwrap_err();
        assert_eq!(err.to_string(), "ReferenceError: Variable a was not declared");
    }

    #[test]
    fn test_declared_but_undefined_read() {
        let mut table = GlobalTable::new();
        assert!(!table.declare("a"));
        let err = table.read("a").unwrap_err();
        assert_eq!(err.to_string(), "ReferenceError: Variable a was not defined");
    }

    #[test]
    fn test_write_requires_declaration() {
        let mut table = GlobalTable::new();
        assert!(table.write("a", Value::Int(1)).is_err());
        table.declare("a");
        table.write("a", Value::Int(1)).unwrap();
        assert_eq!(table.read("a").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_redeclare_keeps_value() {
        let mut table = GlobalTable::new();
        table.define("a", Value::Int(3));
        assert!(table.declare("a"));
        assert_eq!(table.read("a").unwrap(), Value::Int(3));
    }

    #[test]
    fn test_names_sorted() {
        let mut table = GlobalTable::new();
        table.declare("b");
        table.declare("a");
        assert_eq!(table.names(), vec!["a", "b"]);
        assert_eq!(table.len(), 2);
    }
}
