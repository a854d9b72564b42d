// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Statement compilation documentation.
//!
//! This module documents the statement compilation logic in `mod.rs`.
//!
//! ## Statement Compilation Overview
//!
//! | Statement | Key Operations | Notes |
//! |-----------|----------------|-------|
//! | `var` at the root | `DefineGlobal`, `SetGlobal` | Redeclaring warns, keeps the value |
//! | `var` elsewhere | `SetLocal` / `ClearLocal` | Fresh slot per declaration |
//! | `fun` | `CreateFunction` + store | Name bound before the body compiles |
//! | `if/else` | `JumpIfFalse`, `Jump` | Conditional branching |
//! | `while` | `JumpIfFalse`, `Jump` (back) | `continue` targets the test |
//! | `for` | Synthetic block | `continue` targets the update |
//! | `for-in` / `for-of` | Hidden index, `ArraySize`, `GetIndex` | Array re-evaluated each pass |
//! | `stmt if (c)` | `IsTruthy`, `JumpIfFalse` | Guard evaluated first |
//! | `stmt unless (c)` | `Not`, `JumpIfFalse` | |
//! | `return` | `Return` | Allowed at the top level |
//! | `break/continue` | `Jump` (patched later) | Innermost loop only |
//!
//! ## Loop Lowering
//!
//! ```text
//! for (var x of arr) body;
//!
//! // Effectively:
//! {
//!     var $index = 0;
//!     var x;
//!     while ($index < size(arr)) {
//!         x = arr[$index];
//!         body;
//!         $index = $index + 1;   // continue lands here
//!     }
//! }
//! ```
//!
//! Hidden slots are named with a leading `$`, which no identifier can
//! start with, so user code never sees them.
