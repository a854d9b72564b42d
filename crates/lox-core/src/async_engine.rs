// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Asynchronous Lox engine APIs.
//!
//! This module provides async/await compatible APIs for the engine,
//! enabling non-blocking file I/O while sharing one interpreter state
//! between tasks.
//!
//! # Example
//!
//! ```ignore
//! use lox_core::AsyncEngine;
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = AsyncEngine::new();
//!     let result = engine.eval_file("script.lox").await.unwrap();
//!     println!("{}", result);
//! }
//! ```

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;

use crate::runtime::value::Value;
use crate::{Engine, EngineConfig, Error};

/// An asynchronous Lox engine.
///
/// Wraps an [`Engine`] behind an async mutex. Clones share the same
/// globals, so evaluations from different tasks see each other's
/// definitions; they run one at a time.
#[derive(Clone)]
pub struct AsyncEngine {
    engine: Arc<Mutex<Engine>>,
}

impl AsyncEngine {
    /// Creates a new async engine with default configuration.
    pub fn new() -> Self {
        Self::from_engine(Engine::new())
    }

    /// Creates a new async engine with the given configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self::from_engine(Engine::with_config(config))
    }

    /// Wraps an existing engine.
    pub fn from_engine(engine: Engine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// Redirects `print` output and warnings to `sink`.
    pub async fn set_output(&self, sink: impl Write + Send + 'static) {
        self.engine.lock().await.context_mut().set_output(sink);
    }

    /// Evaluates Lox source code.
    pub async fn eval(&self, source: &str) -> Result<Value, Error> {
        let mut engine = self.engine.lock().await;
        engine.eval(source)
    }

    /// Evaluates a Lox file, reading it with non-blocking I/O.
    pub async fn eval_file(&self, path: impl AsRef<Path>) -> Result<Value, Error> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "reading script");
        let source = fs::read_to_string(path).await?;
        self.eval(&source).await
    }

    /// Evaluates several files in order. Does not stop at the first
    /// error; every file gets a result.
    pub async fn eval_files_ordered(
        &self,
        paths: &[impl AsRef<Path>],
    ) -> Vec<Result<Value, Error>> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            results.push(self.eval_file(path).await);
        }
        results
    }
}

impl Default for AsyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OutputBuffer;

    async fn engine_with_output() -> (AsyncEngine, OutputBuffer) {
        let output = OutputBuffer::new();
        let engine = AsyncEngine::new();
        engine.set_output(output.clone()).await;
        (engine, output)
    }

    #[tokio::test]
    async fn test_async_eval() {
        let (engine, output) = engine_with_output().await;
        let result = engine.eval("print 1 + 1; 40 + 2;").await.unwrap();
        assert_eq!(result, Value::Int(42));
        assert_eq!(output.contents(), "2\n");
    }

    #[tokio::test]
    async fn test_clones_share_globals() {
        let (engine, _) = engine_with_output().await;
        let other = engine.clone();
        engine.eval("var shared = 7;").await.unwrap();
        assert_eq!(other.eval("shared;").await.unwrap(), Value::Int(7));
    }

    #[tokio::test]
    async fn test_concurrent_tasks() {
        let (engine, _) = engine_with_output().await;
        engine.eval("var total = 0;").await.unwrap();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.eval("total = total + 1;").await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(engine.eval("total;").await.unwrap(), Value::Int(4));
    }

    #[tokio::test]
    async fn test_eval_file() {
        let path = std::env::temp_dir().join(format!("lox-async-{}.lox", std::process::id()));
        tokio::fs::write(&path, "var x = 3; x * 3;").await.unwrap();
        let (engine, _) = engine_with_output().await;
        let result = engine.eval_file(&path).await;
        let _ = tokio::fs::remove_file(&path).await;
        assert_eq!(result.unwrap(), Value::Int(9));
    }

    #[tokio::test]
    async fn test_eval_missing_file() {
        let (engine, _) = engine_with_output().await;
        let err = engine
            .eval_file("/definitely/not/here.lox")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_eval_files_ordered() {
        let (engine, _) = engine_with_output().await;
        let results = engine
            .eval_files_ordered(&["/missing/a.lox", "/missing/b.lox"])
            .await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_err()));
    }
}
