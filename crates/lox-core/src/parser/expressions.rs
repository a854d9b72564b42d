// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Expression parsing documentation.
//!
//! This module documents the expression parsing logic in `parser.rs`.
//!
//! ## Operator Precedence (lowest to highest)
//!
//! | Precedence | Operators | Associativity |
//! |------------|-----------|---------------|
//! | 1 | `=` | Right |
//! | 2 | `or` | Left |
//! | 3 | `and` | Left |
//! | 4 | `==` `!=` | Left |
//! | 5 | `<` `<=` `>` `>=` | Chained |
//! | 6 | `+` `-` | Left |
//! | 7 | `*` `/` `%` | Left |
//! | 8 | `!` `-` (unary) | Right |
//! | 9 | `()` `[]` | Left |
//!
//! Comparison chains read like mathematics: `6 > 4 > 3` becomes
//! `(6 > 4) and (4 > 3)`.
//!
//! ## Primary Expressions
//!
//! - Literals: numbers, strings, `true`, `false`, `nil`
//! - Identifiers and grouping
//! - Array literals: `[1, "two"]`
//! - Lambdas: `() => 42`, `x => x * 2`, `(a, b) => { return a + b; }`
//! - Interpolated strings: `"sum ${a + b}"`
//!
//! Number literals containing a dot are floats. Other literals are 64-bit
//! integers when they fit and big integers when they do not.
