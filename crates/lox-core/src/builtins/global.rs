// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Global built-in functions.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::Error;
use crate::runtime::value::Value;

/// clock() - Wall-clock time in seconds as a float.
pub fn clock(_args: &[Value]) -> Result<Value, Error> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::RuntimeError(format!("clock unavailable: {}", e)))?;
    Ok(Value::Float(elapsed.as_secs_f64()))
}
