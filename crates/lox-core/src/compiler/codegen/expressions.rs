// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Expression compilation documentation.
//!
//! Operands are pushed before their operator; every expression leaves
//! exactly one value on the stack.
//!
//! | Expression | Bytecode |
//! |------------|----------|
//! | literal | `Constant` / `Nil` / `True` / `False` |
//! | `x` | `GetLocal`, `GetNonLocal` or `GetGlobal` by resolution |
//! | `x = v` | `v`, `Dup`, `SetLocal`/`SetNonLocal`/`SetGlobal` |
//! | `a[i]` | `a`, `i`, `GetIndex` |
//! | `a[i] = v` | `a`, `i`, `v`, `SetIndex` |
//! | `[a, b]` | `a`, `b`, `NewArray n=2` |
//! | `f(a)` | `f`, `a`, `Call argc=1` |
//! | `l and r` | `l`, `Dup`, `JumpIfFalse`, `Pop`, `r` |
//! | `l or r` | `l`, `Dup`, `JumpIfTrue`, `Pop`, `r` |
//! | `"a${e}b"` | `""`, `"a"`, `Add`, `e`, `Add`, `"b"`, `Add` |
//! | lambda | `CreateFunction` |
//!
//! ## Calls
//!
//! The callee stays below its arguments and becomes argument 0 of the new
//! frame. A parameter `p` at position `i` is read with `LoadArgument i+1`
//! on entry; a `...rest` parameter collects everything after the fixed
//! ones with `CollectArguments`.
