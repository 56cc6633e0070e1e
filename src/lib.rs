//! A small interactive shell with background jobs and resource-usage reports.
//!
//! Every external command runs as a child process. Foreground commands are waited for
//! immediately; commands ending in a bare `&` become jobs in a [`JobTable`] and are
//! polled without blocking each time the shell prompts. Whenever a child finishes the
//! shell prints a [`UsageStats`] block: wall clock and CPU time in milliseconds, memory,
//! paging, I/O and scheduling counters.
//!
//! The main entry point is [`Interpreter`]. The binary adds argument parsing and a
//! one-shot mode (`doit <cmd> [args...]`) that runs a single command and reports it.

mod builtin;
pub mod command;
pub mod config;
mod cutils;
pub mod env;
mod interpreter;
pub mod io_adapters;
pub mod jobs;
pub mod launcher;
pub mod logger;
pub mod reaper;
pub mod usage;
pub mod wait;

pub use config::{Args, Config};
pub use interpreter::Interpreter;
pub use io_adapters::{LineSource, ScriptedLines, Terminal};
pub use jobs::{Job, JobTable};
pub use launcher::{LaunchError, ProcessId, ProcessLauncher};
pub use reaper::{JobFinished, JobReport, Reaper};
pub use usage::{Accounting, UsageSampler, UsageStats};
