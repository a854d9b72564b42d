// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Built-in native functions.
//!
//! Natives are ordinary function values stored in the global table, so
//! they can be passed around, shadowed and redeclared like any global.

pub mod global;

use std::sync::Arc;

use crate::runtime::function::{Function, NativeFunction};
use crate::runtime::globals::GlobalTable;
use crate::runtime::value::Value;

/// Registers every built-in function in `globals`.
pub fn install(globals: &mut GlobalTable) {
    globals.define("clock", make_native("clock", global::clock));
}

/// Create a native function value.
fn make_native(name: &str, func: NativeFunction) -> Value {
    Value::Function(Arc::new(Function::native(name, func)))
}
