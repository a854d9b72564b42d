// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Statement parsing documentation.
//!
//! This module documents the statement parsing logic found in `parser.rs`.
//!
//! ## Statement Types
//!
//! | Statement | Method |
//! |-----------|--------|
//! | Variable | `parse_var_declaration_no_semi` |
//! | Short declaration `a := e` | `parse_short_declaration` |
//! | Function | `parse_function_declaration` |
//! | If | `parse_if_statement` |
//! | While | `parse_while_statement` |
//! | For / For-In / For-Of | `parse_for_statement` |
//! | Print, Return, Break, Continue, Expression | `parse_simple_statement` |
//! | Postfix `if` / `unless` | `parse_guard` |
//! | Block | `parse_block` |
//! | Empty | inline in `parse_statement` |
//!
//! ## Grammar Overview
//!
//! ```text
//! declaration : "var" IDENT ( "=" expression )? ";"
//!             | IDENT ":=" expression ";"
//!             | "fun" IDENT "(" parameters? ")" block
//!             | statement ;
//! statement   : block | ";" | if | while | for
//!             | simple ( ( "if" | "unless" ) "(" expression ")" )? ";" ;
//! simple      : "print" expression | "return" expression? | "break"
//!             | "continue" | expression ;
//! parameters  : IDENT ( "," IDENT )* ( "," "..." IDENT )? | "..." IDENT ;
//! ```
//!
//! ## Example
//!
//! ```text
//! var a = 5;
//! print a if (a > 0);
//! for (var x of [1, 2, 3]) print x;
//! fun f(a, ...rest) { return rest; }
//! ```
