// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Engine configuration.

/// Default bound on nested calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 512;

/// Tunables for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of nested calls before `Stack overflow` is raised
    pub max_call_depth: usize,
    /// Whether redeclaring a global writes a warning to the output sink
    pub warn_on_redeclare: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            warn_on_redeclare: true,
        }
    }
}

impl EngineConfig {
    /// Sets the call depth bound.
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Enables or disables the redeclaration warning.
    pub fn warn_on_redeclare(mut self, warn: bool) -> Self {
        self.warn_on_redeclare = warn;
        self
    }
}
