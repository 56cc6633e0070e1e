use crate::command::{CommandFactory, ExitCode, ParsedCommand};
use crate::config::Config;
use crate::env::Environment;
use crate::io_adapters::{LineSource, Terminal};
use crate::jobs::{Job, JobLine, JobTable};
use crate::launcher::ProcessLauncher;
use crate::reaper::Reaper;
use crate::usage::UsageSampler;
use anyhow::Result;
use std::io::Write;
use std::time::Instant;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports the built-ins defined in this crate.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

enum State {
    Prompting,
    Dispatching(String),
    ShuttingDown,
}

/// A job-control shell: runs built-ins in-process, external commands as children in
/// the foreground or background, and reports resource usage for each finished child.
///
/// Finished background jobs are noticed by polling once per prompt, never asynchronously.
///
/// Example
/// ```
/// use doit::{Config, Interpreter, ScriptedLines};
/// let mut sh = Interpreter::new(&Config::default());
/// let mut out = Vec::new();
/// let code = sh.run_session(&mut ScriptedLines::new(["jobs", "exit 0"]), &mut out).unwrap();
/// assert_eq!(code, 0);
/// assert_eq!(String::from_utf8(out).unwrap(), "No background jobs.\n");
/// ```
pub struct Interpreter {
    env: Environment,
    jobs: JobTable,
    launcher: ProcessLauncher,
    reaper: Reaper,
    prompt: String,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a shell with the default built-ins: `cd`, `jobs` and `exit`.
    pub fn new(config: &Config) -> Self {
        Self::with_env(Environment::new(), config)
    }

    pub fn with_env(env: Environment, config: &Config) -> Self {
        use crate::builtin::*;
        Self {
            env,
            jobs: JobTable::new(),
            launcher: ProcessLauncher::new(),
            reaper: Reaper::new(UsageSampler::new(config.accounting)),
            prompt: config.prompt.clone(),
            commands: vec![
                Box::new(Factory::<Cd>::default()),
                Box::new(Factory::<Jobs>::default()),
                Box::new(Factory::<Exit>::default()),
            ],
        }
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Interactive session on the terminal.
    pub fn repl(&mut self) -> Result<ExitCode> {
        let mut terminal = Terminal::new()?;
        self.run_session(&mut terminal, &mut std::io::stdout())
    }

    /// Run until `exit` or end of input, then wait for every remaining job.
    /// Returns the status given to `exit`.
    pub fn run_session(
        &mut self,
        lines: &mut dyn LineSource,
        out: &mut dyn Write,
    ) -> Result<ExitCode> {
        let mut state = State::Prompting;
        loop {
            state = match state {
                State::Prompting => {
                    self.poll_jobs(out)?;
                    out.flush()?;
                    match lines.read_line(&self.prompt) {
                        Ok(Some(line)) => State::Dispatching(line),
                        Ok(None) => State::ShuttingDown,
                        Err(err) => {
                            log::error!("{err:#}");
                            State::ShuttingDown
                        }
                    }
                }
                State::Dispatching(line) => {
                    self.dispatch(&line, out)?;
                    if self.env.should_exit {
                        State::ShuttingDown
                    } else {
                        State::Prompting
                    }
                }
                State::ShuttingDown => {
                    self.shutdown(out)?;
                    return Ok(self.env.exit_code);
                }
            };
        }
    }

    /// Report and forget every background job that has finished since the last poll.
    pub fn poll_jobs(&mut self, out: &mut dyn Write) -> Result<()> {
        for report in self.reaper.poll(&mut self.jobs) {
            write!(out, "{report}")?;
        }
        Ok(())
    }

    /// Handle one input line: built-ins run in-process, anything else is executed.
    pub fn dispatch(&mut self, line: &str, out: &mut dyn Write) -> Result<()> {
        let Some(cmd) = ParsedCommand::parse(line) else {
            return Ok(());
        };
        let args = cmd.args();
        for factory in &self.commands {
            if let Some(builtin) = factory.try_create(cmd.name(), &args) {
                builtin.execute(out, &mut self.env, &self.jobs)?;
                return Ok(());
            }
        }
        self.execute(&cmd, out)?;
        Ok(())
    }

    /// Execute `argv` once in the foreground and report its usage.
    pub fn run_once(&mut self, argv: Vec<String>, out: &mut dyn Write) -> Result<ExitCode> {
        let cmd = ParsedCommand::from_argv(argv)
            .ok_or_else(|| anyhow::anyhow!("no command to run"))?;
        Ok(self.execute(&cmd, out)?.unwrap_or(1))
    }

    /// Wait for every remaining job, reporting each in table order.
    pub fn shutdown(&mut self, out: &mut dyn Write) -> Result<()> {
        let mut written = Ok(());
        self.reaper.drain(&mut self.jobs, |report| {
            if written.is_ok() {
                written = write!(out, "{report}");
            }
        });
        written?;
        out.flush()?;
        Ok(())
    }

    /// Spawn an external command. Returns the exit code of a foreground child, or
    /// `None` for background jobs and for commands that could not be started.
    fn execute(&mut self, cmd: &ParsedCommand, out: &mut dyn Write) -> Result<Option<ExitCode>> {
        out.flush()?;
        let started = Instant::now();
        let pid = match self.launcher.spawn(&cmd.argv) {
            Ok(pid) => pid,
            Err(err) => {
                log::warn!("cannot start {}: {err}", cmd.name());
                writeln!(out, "doit: {}: {err}", cmd.name())?;
                return Ok(None);
            }
        };

        if cmd.background {
            let job = Job::new(pid, cmd.text.as_str(), started);
            let number = self.jobs.add(job.clone())?;
            writeln!(out, "{}", JobLine { number, job: &job })?;
            return Ok(None);
        }

        match self.reaper.wait_for(pid, started) {
            Ok((status, stats)) => {
                write!(out, "{stats}")?;
                Ok(Some(status.exit_code()))
            }
            Err(err) => {
                log::warn!("lost foreground pid {pid}: {err}");
                writeln!(out, "doit: cannot wait for {pid}: {err}")?;
                Ok(None)
            }
        }
    }
}
