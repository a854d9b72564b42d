// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Interpreter state shared by every compiled unit of one engine.

use super::globals::GlobalTable;
use super::value::Value;
use crate::builtins;
use crate::config::EngineConfig;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// Interpreter state passed explicitly into execution: the global table,
/// the output sink and the configuration.
pub struct Context {
    /// The global variable table
    pub globals: GlobalTable,
    /// Engine configuration
    pub config: EngineConfig,
    output: Box<dyn Write + Send>,
}

impl Context {
    /// Creates a context with the built-in functions installed and stdout
    /// as the output sink.
    pub fn new(config: EngineConfig) -> Self {
        let mut globals = GlobalTable::new();
        builtins::install(&mut globals);
        Self {
            globals,
            config,
            output: Box::new(io::stdout()),
        }
    }

    /// Replaces the output sink.
    pub fn set_output(&mut self, sink: impl Write + Send + 'static) {
        self.output = Box::new(sink);
    }

    /// Writes the display string of `value` and a line terminator.
    ///
    /// Write failures are not surfaced to the running program.
    pub fn print(&mut self, value: &Value) {
        if let Err(err) = writeln!(self.output, "{}", value) {
            tracing::debug!(%err, "print failed");
        }
    }

    /// Reports that global `name` was declared again.
    pub fn warn_redeclared(&mut self, name: &str) {
        tracing::warn!(name, "variable was already declared");
        if !self.config.warn_on_redeclare {
            return;
        }
        let result = writeln!(self.output, "Warning: Variable {} was already declared", name)
            .and_then(|_| self.output.flush());
        if let Err(err) = result {
            tracing::debug!(%err, "warning could not be written");
        }
    }

    /// Flushes the output sink, ignoring failures.
    pub fn flush(&mut self) {
        let _ = self.output.flush();
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// An in-memory output sink whose clones share one buffer.
///
/// Useful for embedding and for tests that inspect program output.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl OutputBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything written so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    /// Discards everything written so far.
    pub fn clear(&self) {
        self.bytes.lock().clear();
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
