// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Scope management for variable resolution during compilation.
//!
//! Scopes live in an arena and point at their parent by index. The first
//! scope is the program root: it has no parent and every name that is not
//! found before reaching it is a global. Each function or lambda opens a
//! new frame ("unit") whose local slots are numbered from zero; block
//! scopes allocate slots in the frame of the function that contains them.

use crate::Error;
use crate::lexer::Span;
use rustc_hash::FxHashMap;

/// Index of a scope in the arena.
pub type ScopeId = usize;

/// What opened a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The program root
    Global,
    /// A `{ ... }` block or a synthetic loop scope
    Block,
    /// A function or lambda body
    Function,
}

/// Where a variable lives at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Slot in the current call's frame
    Local(u16),
    /// Slot in a frame `depth` function boundaries outward
    NonLocal {
        /// Slot in the reached frame
        slot: u16,
        /// Function boundaries crossed
        depth: u16,
    },
    /// The global table
    Global,
}

#[derive(Debug)]
struct ScopeRecord {
    parent: Option<ScopeId>,
    kind: ScopeKind,
    locals: FxHashMap<String, u16>,
    /// How many frame levels outward code inside this scope reaches
    max_frame_level: usize,
    unit: usize,
}

/// Slot layout of a finished function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionLayout {
    /// Source name of each slot
    pub local_names: Vec<String>,
    /// Frame levels reached by the function or anything nested in it
    pub max_frame_level: usize,
}

impl FunctionLayout {
    /// Whether values of the function must capture their defining frame.
    pub fn captures_frame(&self) -> bool {
        self.max_frame_level > 0
    }
}

/// Compile-time symbol table over nested lexical scopes.
#[derive(Debug)]
pub struct ScopeResolver {
    scopes: Vec<ScopeRecord>,
    /// Slot names per frame, index 0 is the program's own frame
    units: Vec<Vec<String>>,
    current: ScopeId,
    hidden: usize,
}

impl Default for ScopeResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeResolver {
    /// Creates a resolver positioned at the program root.
    pub fn new() -> Self {
        Self {
            scopes: vec![ScopeRecord {
                parent: None,
                kind: ScopeKind::Global,
                locals: FxHashMap::default(),
                max_frame_level: 0,
                unit: 0,
            }],
            units: vec![Vec::new()],
            current: 0,
            hidden: 0,
        }
    }

    /// Returns true while the current scope is the program root.
    pub fn is_global_scope(&self) -> bool {
        self.scopes[self.current].kind == ScopeKind::Global
    }

    /// Number of scopes open above the program root.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut id = self.current;
        while let Some(parent) = self.scopes[id].parent {
            depth += 1;
            id = parent;
        }
        depth
    }

    /// Enters a block scope.
    pub fn begin_block(&mut self) {
        let unit = self.scopes[self.current].unit;
        self.push(ScopeKind::Block, unit);
    }

    /// Leaves a block scope.
    pub fn end_block(&mut self) -> Result<(), Error> {
        if self.scopes[self.current].kind != ScopeKind::Block {
            return Err(Error::internal("end_block outside a block scope"));
        }
        self.pop()
    }

    /// Enters a function or lambda body with a fresh frame.
    pub fn begin_function(&mut self) {
        self.units.push(Vec::new());
        let unit = self.units.len() - 1;
        self.push(ScopeKind::Function, unit);
    }

    /// Leaves a function body and returns its slot layout.
    pub fn end_function(&mut self) -> Result<FunctionLayout, Error> {
        let scope = &self.scopes[self.current];
        if scope.kind != ScopeKind::Function {
            return Err(Error::internal("end_function outside a function scope"));
        }
        let layout = FunctionLayout {
            local_names: std::mem::take(&mut self.units[scope.unit]),
            max_frame_level: scope.max_frame_level,
        };
        self.pop()?;
        Ok(layout)
    }

    /// Slot names of the program's own frame.
    pub fn program_locals(&self) -> Vec<String> {
        self.units[0].clone()
    }

    /// Declares `name` in the current scope.
    ///
    /// At the program root the name is a global. Elsewhere a fresh slot is
    /// allocated; declaring the same name twice in one scope is an error,
    /// shadowing an outer declaration is not.
    pub fn declare(&mut self, name: &str, span: Span) -> Result<Storage, Error> {
        if self.is_global_scope() {
            return Ok(Storage::Global);
        }
        if self.scopes[self.current].locals.contains_key(name) {
            return Err(Error::compile(
                format!("Variable {} already defined", name),
                span,
            ));
        }
        let slot = self.allocate(name)?;
        self.scopes[self.current].locals.insert(name.to_string(), slot);
        Ok(Storage::Local(slot))
    }

    /// Allocates an unnamed slot in the current frame, invisible to
    /// `resolve`.
    pub fn declare_hidden(&mut self, purpose: &str) -> Result<u16, Error> {
        self.hidden += 1;
        let name = format!("${}{}", purpose, self.hidden);
        self.allocate(&name)
    }

    /// Resolves `name` by walking outward from the current scope.
    pub fn resolve(&mut self, name: &str) -> Storage {
        let mut id = self.current;
        let mut depth = 0usize;
        loop {
            let scope = &self.scopes[id];
            if scope.kind == ScopeKind::Global {
                return Storage::Global;
            }
            if let Some(&slot) = scope.locals.get(name) {
                if depth == 0 {
                    return Storage::Local(slot);
                }
                self.record_frame_level(depth);
                return Storage::NonLocal {
                    slot,
                    depth: depth as u16,
                };
            }
            if scope.kind == ScopeKind::Function {
                depth += 1;
            }
            match scope.parent {
                Some(parent) => id = parent,
                None => return Storage::Global,
            }
        }
    }

    /// Records that code in the current scope reaches `level` frames out,
    /// one level fewer for every function boundary on the way up.
    fn record_frame_level(&mut self, level: usize) {
        let mut id = Some(self.current);
        let mut level = level;
        while let Some(index) = id {
            if level == 0 {
                break;
            }
            let scope = &mut self.scopes[index];
            scope.max_frame_level = scope.max_frame_level.max(level);
            if scope.kind == ScopeKind::Function {
                level -= 1;
            }
            id = scope.parent;
        }
    }

    fn allocate(&mut self, name: &str) -> Result<u16, Error> {
        let unit = &mut self.units[self.scopes[self.current].unit];
        let slot = u16::try_from(unit.len())
            .map_err(|_| Error::internal("too many local variables in one function"))?;
        unit.push(name.to_string());
        Ok(slot)
    }

    fn push(&mut self, kind: ScopeKind, unit: usize) {
        self.scopes.push(ScopeRecord {
            parent: Some(self.current),
            kind,
            locals: FxHashMap::default(),
            max_frame_level: 0,
            unit,
        });
        self.current = self.scopes.len() - 1;
    }

    fn pop(&mut self) -> Result<(), Error> {
        let parent = self.scopes[self.current]
            .parent
            .ok_or_else(|| Error::internal("cannot leave the program scope"))?;
        self.current = parent;
        Ok(())
    }
}
