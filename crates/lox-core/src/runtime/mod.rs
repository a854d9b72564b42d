// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lox runtime types and interpreter state.

pub mod array;
pub mod context;
pub mod function;
pub mod globals;
pub mod value;

pub use array::LoxArray;
pub use function::{Callable, Frame, Function, FunctionProto};
pub use globals::GlobalTable;
