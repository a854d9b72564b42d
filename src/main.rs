// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! lox - A scope-resolving bytecode interpreter for a small Lox dialect
//!
//! This is the main entry point for the lox CLI/REPL.
//!
//! ## Features
//!
//! - Interactive REPL with syntax highlighting and history
//! - Async file execution with tokio
//! - Bytecode dumps for inspecting what the compiler produced

mod repl;

use anyhow::{Context as _, Result};
use clap::Parser;
use lox_core::{AsyncEngine, Engine, EngineConfig};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// lox - Run Lox programs or start an interactive session
#[derive(Parser, Debug)]
#[command(name = "lox")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Lox file to execute; starts the REPL when omitted
    file: Option<PathBuf>,

    /// Evaluate Lox code from the command line
    #[arg(short, long, value_name = "CODE", conflicts_with = "file")]
    eval: Option<String>,

    /// Print the compiled bytecode instead of running it
    #[arg(long)]
    dump_bytecode: bool,

    /// Maximum number of nested calls
    #[arg(long, value_name = "N", default_value_t = lox_core::config::DEFAULT_MAX_CALL_DEPTH)]
    max_call_depth: usize,

    /// Do not print the REPL banner
    #[arg(short, long)]
    quiet: bool,

    /// Do not print a warning when a global is declared twice
    #[arg(long)]
    no_redeclare_warning: bool,
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .max_call_depth(self.max_call_depth)
            .warn_on_redeclare(!self.no_redeclare_warning)
    }
}

/// Main entry point - uses tokio runtime for async operations.
#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so they never mix with program output
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_env("LOX_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match (&cli.file, &cli.eval) {
        (_, Some(code)) => run_eval(&cli, code).await,
        (Some(path), None) => run_file(&cli, path).await,
        (None, None) => run_repl(&cli),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Start the interactive REPL
fn run_repl(cli: &Cli) -> Result<()> {
    let mut repl =
        repl::Repl::new(cli.engine_config(), !cli.quiet).context("failed to initialize REPL")?;
    repl.run().context("REPL terminated")?;
    Ok(())
}

/// Execute a Lox file asynchronously.
async fn run_file(cli: &Cli, path: &Path) -> Result<()> {
    if cli.dump_bytecode {
        let source = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        return dump_bytecode(cli, &source);
    }

    let engine = AsyncEngine::with_config(cli.engine_config());
    engine
        .eval_file(path)
        .await
        .with_context(|| format!("while running '{}'", path.display()))?;
    Ok(())
}

/// Evaluate Lox code from the command line, printing a non-nil result.
async fn run_eval(cli: &Cli, code: &str) -> Result<()> {
    if cli.dump_bytecode {
        return dump_bytecode(cli, code);
    }

    let engine = AsyncEngine::with_config(cli.engine_config());
    let value = engine.eval(code).await?;
    if !value.is_nil() {
        println!("{}", value);
    }
    Ok(())
}

fn dump_bytecode(cli: &Cli, source: &str) -> Result<()> {
    let engine = Engine::with_config(cli.engine_config());
    let proto = engine.compile(source)?;
    print!("{}", proto.bytecode.disassemble(&proto.name));
    Ok(())
}
