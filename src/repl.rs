// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Interactive REPL (Read-Eval-Print Loop) for the Lox interpreter.

use lox_core::{Engine, EngineConfig, Error, Value};
use owo_colors::OwoColorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Config, Editor, Helper};
use std::borrow::Cow;
use std::path::PathBuf;

/// REPL configuration constants
const HISTORY_FILE: &str = "history";
const MAX_HISTORY_SIZE: usize = 1000;

const KEYWORDS: &[&str] = &[
    "and", "break", "continue", "else", "for", "fun", "if", "in", "of", "or", "print", "return",
    "unless", "var", "while",
];

const LITERALS: &[&str] = &["true", "false", "nil"];

/// REPL commands that can be executed with a dot prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Exit,
    Clear,
    Version,
    Load,
    Dump,
    Globals,
}

impl ReplCommand {
    /// Parse a REPL command from input string
    pub fn parse(input: &str) -> Option<(Self, Option<&str>)> {
        let input = input.trim();
        let rest = input.strip_prefix('.')?;

        let mut parts = rest.splitn(2, char::is_whitespace);
        let cmd = parts.next()?.to_lowercase();
        let arg = parts.next().map(str::trim).filter(|arg| !arg.is_empty());

        match cmd.as_str() {
            "help" | "h" | "?" => Some((ReplCommand::Help, arg)),
            "exit" | "quit" | "q" => Some((ReplCommand::Exit, arg)),
            "clear" | "cls" => Some((ReplCommand::Clear, arg)),
            "version" | "v" => Some((ReplCommand::Version, arg)),
            "load" | "l" => Some((ReplCommand::Load, arg)),
            "dump" | "d" => Some((ReplCommand::Dump, arg)),
            "globals" | "g" => Some((ReplCommand::Globals, arg)),
            _ => None,
        }
    }

    /// Get all available commands for help/completion
    pub fn all_commands() -> &'static [(&'static str, &'static str)] {
        &[
            (".help", "Show this help message"),
            (".exit", "Exit the REPL"),
            (".clear", "Clear the screen"),
            (".version", "Show version information"),
            (".load <file>", "Load and execute a Lox file"),
            (".dump <code>", "Show the bytecode compiled for <code>"),
            (".globals", "List declared global variables"),
        ]
    }
}

/// Helper struct for rustyline that provides completion, hints, and validation
struct LoxHelper {
    /// Keywords, built-ins and commands for completion
    words: Vec<String>,
}

impl LoxHelper {
    fn new() -> Self {
        let words = KEYWORDS
            .iter()
            .chain(LITERALS)
            .copied()
            .chain(["clock"])
            .chain(
                ReplCommand::all_commands()
                    .iter()
                    .map(|&(cmd, _)| cmd.split_whitespace().next().unwrap_or(cmd)),
            )
            .map(String::from)
            .collect();

        Self { words }
    }

    fn current_word(line: &str, pos: usize) -> (usize, &str) {
        let start = line[..pos]
            .rfind(|c: char| !c.is_alphanumeric() && c != '_' && c != '.')
            .map(|i| i + 1)
            .unwrap_or(0);
        (start, &line[start..pos])
    }
}

impl Completer for LoxHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (_, word) = Self::current_word(line, pos);
        if word.is_empty() {
            return Ok((pos, vec![]));
        }

        let matches: Vec<Pair> = self
            .words
            .iter()
            .filter(|w| w.starts_with(word))
            .map(|w| Pair {
                display: w.clone(),
                replacement: w[word.len()..].to_string(),
            })
            .collect();

        Ok((pos, matches))
    }
}

impl Hinter for LoxHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if pos < line.len() {
            return None;
        }

        let (_, word) = Self::current_word(line, pos);
        if word.len() < 2 {
            return None;
        }

        self.words
            .iter()
            .find(|w| w.starts_with(word) && w.len() > word.len())
            .map(|w| (&w[word.len()..]).dimmed().to_string())
    }
}

impl Highlighter for LoxHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let mut result = String::with_capacity(line.len() * 2);
        let mut current_word = String::new();
        let mut in_string = false;

        for c in line.chars() {
            if in_string {
                result.push_str(&c.green().to_string());
                if c == '"' {
                    in_string = false;
                }
                continue;
            }
            if c.is_alphanumeric() || c == '_' || (c == '.' && !current_word.is_empty()) {
                current_word.push(c);
                continue;
            }
            if !current_word.is_empty() {
                result.push_str(&highlight_word(&current_word));
                current_word.clear();
            }
            let colored = match c {
                '(' | ')' | '[' | ']' | '{' | '}' => c.yellow().to_string(),
                '+' | '-' | '*' | '/' | '%' | '=' | '<' | '>' | '!' | ':' => c.cyan().to_string(),
                '"' => {
                    in_string = true;
                    c.green().to_string()
                }
                '.' if line.starts_with('.') => c.magenta().to_string(),
                _ => c.to_string(),
            };
            result.push_str(&colored);
        }

        if !current_word.is_empty() {
            result.push_str(&highlight_word(&current_word));
        }

        Cow::Owned(result)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn highlight_word(word: &str) -> String {
    if KEYWORDS.contains(&word) {
        word.magenta().bold().to_string()
    } else if LITERALS.contains(&word) {
        word.blue().to_string()
    } else if word == "clock" {
        word.cyan().to_string()
    } else if word.chars().all(|c| c.is_ascii_digit() || c == '.') {
        word.yellow().to_string()
    } else {
        word.to_string()
    }
}

impl Validator for LoxHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();

        if input.trim_start().starts_with('.') {
            return Ok(ValidationResult::Valid(None));
        }

        if !is_balanced(input) {
            return Ok(ValidationResult::Incomplete);
        }

        // A trailing operator expects more input
        let trimmed = input.trim_end();
        if trimmed.ends_with(['+', '-', '*', '/', '%', '=', ',', '(', '[', '{']) {
            return Ok(ValidationResult::Incomplete);
        }

        Ok(ValidationResult::Valid(None))
    }
}

/// Check if brackets, braces, and parentheses are balanced
fn is_balanced(input: &str) -> bool {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;

    for c in input.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }

        if in_string {
            match c {
                '\\' => escape_next = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '(' => stack.push(')'),
            '[' => stack.push(']'),
            '{' => stack.push('}'),
            ')' | ']' | '}' => {
                if stack.pop() != Some(c) {
                    // Let the parser report the mismatch
                    return true;
                }
            }
            _ => {}
        }
    }

    stack.is_empty() && !in_string
}

/// Appends the statement terminator a bare expression is missing.
fn complete_statement(input: &str) -> Cow<'_, str> {
    let trimmed = input.trim_end();
    if trimmed.ends_with(';') || trimmed.ends_with('}') {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!("{};", trimmed))
    }
}

impl Helper for LoxHelper {}

/// The interactive REPL for the Lox interpreter
pub struct Repl {
    engine: Engine,
    editor: Editor<LoxHelper, DefaultHistory>,
    history_path: PathBuf,
    banner: bool,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(config: EngineConfig, banner: bool) -> rustyline::Result<Self> {
        let editor_config = Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .max_history_size(MAX_HISTORY_SIZE)?
            .auto_add_history(true)
            .build();

        let mut editor = Editor::with_config(editor_config)?;
        editor.set_helper(Some(LoxHelper::new()));

        let history_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lox")
            .join(HISTORY_FILE);

        if let Some(parent) = history_path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                tracing::debug!(%err, "history directory unavailable");
            }
        }

        if let Err(err) = editor.load_history(&history_path) {
            tracing::debug!(%err, "no history loaded");
        }

        Ok(Self {
            engine: Engine::with_config(config),
            editor,
            history_path,
            banner,
        })
    }

    /// Run the REPL main loop
    pub fn run(&mut self) -> rustyline::Result<()> {
        if self.banner {
            self.print_banner();
        }

        loop {
            let prompt = format!("{} ", "lox>".bright_green().bold());

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();

                    if trimmed.is_empty() {
                        continue;
                    }

                    if let Some((cmd, arg)) = ReplCommand::parse(trimmed) {
                        match self.execute_command(cmd, arg) {
                            CommandResult::Continue => continue,
                            CommandResult::Exit => break,
                        }
                    }

                    self.eval_and_print(trimmed);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".dimmed());
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "^D".dimmed());
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        if let Err(err) = self.editor.save_history(&self.history_path) {
            tracing::warn!(%err, path = %self.history_path.display(), "history not saved");
        }

        if self.banner {
            println!();
            println!("{}", "Goodbye!".bright_cyan());
        }
        Ok(())
    }

    fn print_banner(&self) {
        let version = env!("CARGO_PKG_VERSION");
        println!();
        println!(
            "  {} {} {}",
            "Lox".white().bold(),
            "v".dimmed(),
            version.bright_yellow()
        );
        println!(
            "  {} {} {}",
            "Type".dimmed(),
            ".help".cyan(),
            "for available commands".dimmed()
        );
        println!();
    }

    fn execute_command(&mut self, cmd: ReplCommand, arg: Option<&str>) -> CommandResult {
        match cmd {
            ReplCommand::Help => self.print_help(),
            ReplCommand::Exit => return CommandResult::Exit,
            ReplCommand::Clear => print!("\x1B[2J\x1B[H"),
            ReplCommand::Version => {
                println!("{} {}", "lox".bright_cyan().bold(), env!("CARGO_PKG_VERSION").yellow());
            }
            ReplCommand::Load => match arg {
                Some(path) => self.load_file(path),
                None => missing_argument(".load", "a file path"),
            },
            ReplCommand::Dump => match arg {
                Some(code) => self.dump(code),
                None => missing_argument(".dump", "some code"),
            },
            ReplCommand::Globals => {
                let mut names = self.engine.context().globals.names();
                names.sort_unstable();
                for name in names {
                    println!("  {}", name.cyan());
                }
            }
        }
        CommandResult::Continue
    }

    fn print_help(&self) {
        println!();
        println!("{}", "REPL Commands:".white().bold());
        println!();

        for (cmd, desc) in ReplCommand::all_commands() {
            println!("  {:16} {}", cmd.cyan(), desc.dimmed());
        }

        println!();
        println!("{}", "Keyboard Shortcuts:".white().bold());
        println!();
        println!("  {:16} {}", "Ctrl+C".yellow(), "Cancel current input".dimmed());
        println!("  {:16} {}", "Ctrl+D".yellow(), "Exit REPL".dimmed());
        println!("  {:16} {}", "Tab".yellow(), "Autocomplete".dimmed());
        println!();
    }

    fn load_file(&mut self, path: &str) {
        match self.engine.eval_file(std::path::Path::new(path)) {
            Ok(value) => print_value(&value),
            Err(e) => print_error(&e),
        }
    }

    fn dump(&self, code: &str) {
        match self.engine.compile(&complete_statement(code)) {
            Ok(proto) => print!("{}", proto.bytecode.disassemble(&proto.name)),
            Err(e) => print_error(&e),
        }
    }

    fn eval_and_print(&mut self, input: &str) {
        match self.engine.eval(&complete_statement(input)) {
            Ok(value) => print_value(&value),
            Err(e) => print_error(&e),
        }
    }
}

/// Result of executing a REPL command
enum CommandResult {
    Continue,
    Exit,
}

fn missing_argument(command: &str, what: &str) {
    eprintln!(
        "{}: {} {}",
        "Error".red().bold(),
        command.cyan(),
        format!("requires {}", what).dimmed()
    );
}

/// Echo a result unless it is nil, which statements produce.
fn print_value(value: &Value) {
    if !value.is_nil() {
        println!("{}", format_value(value));
    }
}

/// Format a Lox value for display with syntax coloring
fn format_value(value: &Value) -> String {
    match value {
        Value::Nil => "nil".blue().dimmed().to_string(),
        Value::Bool(b) => b.yellow().to_string(),
        Value::Int(_) | Value::BigInt(_) | Value::Float(_) => value.yellow().to_string(),
        Value::String(s) => format!("{:?}", s).green().to_string(),
        Value::Array(_) => value.cyan().to_string(),
        Value::Function(_) => value.magenta().to_string(),
    }
}

/// Print a formatted error message
fn print_error(error: &Error) {
    let error_str = error.to_string();

    // Split error type from message
    if let Some(colon_pos) = error_str.find(':') {
        let (error_type, message) = error_str.split_at(colon_pos);
        eprintln!("{}{}", error_type.red().bold(), message);
    } else {
        eprintln!("{}", error_str.red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repl_command_parse() {
        assert!(matches!(
            ReplCommand::parse(".help"),
            Some((ReplCommand::Help, None))
        ));
        assert!(matches!(
            ReplCommand::parse(".exit"),
            Some((ReplCommand::Exit, None))
        ));
        assert!(matches!(
            ReplCommand::parse(".load test.lox"),
            Some((ReplCommand::Load, Some("test.lox")))
        ));
        assert!(matches!(
            ReplCommand::parse(".dump var a = 1;"),
            Some((ReplCommand::Dump, Some("var a = 1;")))
        ));
        assert!(matches!(ReplCommand::parse(".load   "), Some((ReplCommand::Load, None))));
        assert!(ReplCommand::parse("not a command").is_none());
        assert!(ReplCommand::parse(".bogus").is_none());
    }

    #[test]
    fn test_is_balanced() {
        assert!(is_balanced("(1 + 2)"));
        assert!(is_balanced("fun f() { return 1; }"));
        assert!(is_balanced("var a = [1, [2]];"));
        assert!(!is_balanced("(1 + 2"));
        assert!(!is_balanced("fun f() {"));
        assert!(is_balanced("\"string with (unbalanced\""));
        assert!(is_balanced("\"escaped \\\" quote {\""));
        assert!(!is_balanced("\"unterminated"));
    }

    #[test]
    fn test_complete_statement() {
        assert_eq!(complete_statement("1 + 2"), "1 + 2;");
        assert_eq!(complete_statement("print 1;"), "print 1;");
        assert_eq!(complete_statement("{ print 1; }"), "{ print 1; }");
    }

    #[test]
    fn test_highlight_word() {
        assert_eq!(highlight_word("counter"), "counter");
        assert_ne!(highlight_word("fun"), "fun");
        assert_ne!(highlight_word("nil"), "nil");
    }
}
