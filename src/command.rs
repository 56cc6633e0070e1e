use crate::env::Environment;
use crate::jobs::JobTable;
use anyhow::Result;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// The bare token that sends a command to the background.
pub const BACKGROUND_TOKEN: &str = "&";

/// One input line split into an argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Whitespace-delimited tokens with every `&` token removed.
    pub argv: Vec<String>,
    /// Set when any token was a bare `&`.
    pub background: bool,
    /// The line as typed, for job display.
    pub text: String,
}

impl ParsedCommand {
    /// Split `line` on whitespace. Returns `None` when nothing is left to run.
    pub fn parse(line: &str) -> Option<Self> {
        let text = line.trim();
        let mut background = false;
        let argv: Vec<String> = text
            .split_whitespace()
            .filter(|token| {
                let is_marker = *token == BACKGROUND_TOKEN;
                background |= is_marker;
                !is_marker
            })
            .map(str::to_string)
            .collect();

        if argv.is_empty() {
            return None;
        }
        Some(Self {
            argv,
            background,
            text: text.to_string(),
        })
    }

    /// Build a foreground command from an already split argument vector.
    pub fn from_argv(argv: Vec<String>) -> Option<Self> {
        if argv.is_empty() {
            return None;
        }
        let text = argv.join(" ");
        Some(Self {
            argv,
            background: false,
            text,
        })
    }

    pub fn name(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> Vec<&str> {
        self.argv[1..].iter().map(String::as_str).collect()
    }
}

/// Object-safe trait for any command the shell runs in-process.
pub trait ExecutableCommand {
    /// Executes the command.
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        env: &mut Environment,
        jobs: &JobTable,
    ) -> Result<ExitCode>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}
