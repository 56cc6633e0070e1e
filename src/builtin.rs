use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::interpreter::Factory;
use crate::jobs::JobTable;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "jobs".
    fn name() -> &'static str;

    /// Executes the command with the shell's output, environment and job table.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(
        self,
        stdout: &mut dyn Write,
        env: &mut Environment,
        jobs: &JobTable,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        env: &mut Environment,
        jobs: &JobTable,
    ) -> Result<ExitCode> {
        match <T as BuiltinCommand>::execute(*self, stdout, env, jobs) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stdout, "{e:#}")?;
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _env: &mut Environment,
        _jobs: &JobTable,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.output.trim_end())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        env: &mut Environment,
        _jobs: &JobTable,
    ) -> Result<ExitCode> {
        let target = match &self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => match env.get_var("HOME") {
                Some(home) => PathBuf::from(home),
                None => return Err(anyhow::anyhow!("cd: no target and HOME not set")),
            },
        };

        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: can't change to {}", new_dir.display()))?;

        env::set_current_dir(&canonical)
            .with_context(|| format!("cd: can't chdir to {}", canonical.display()))?;
        log::debug!("working directory is now {}", canonical.display());
        env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List the background jobs that have not been reported as finished.
pub struct Jobs {}

impl BuiltinCommand for Jobs {
    fn name() -> &'static str {
        "jobs"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _env: &mut Environment,
        jobs: &JobTable,
    ) -> Result<ExitCode> {
        if jobs.is_empty() {
            writeln!(stdout, "No background jobs.")?;
        }
        for line in jobs.lines() {
            writeln!(stdout, "{line}")?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Wait for all background jobs, report them and leave the shell.
pub struct Exit {
    #[argh(positional)]
    /// exit status of the shell; 0 when omitted.
    pub status: Option<ExitCode>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        env: &mut Environment,
        _jobs: &JobTable,
    ) -> Result<ExitCode> {
        let status = self.status.unwrap_or(0);
        env.should_exit = true;
        env.exit_code = status;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::Job;
    use crate::launcher::ProcessId;
    use pretty_assertions::assert_eq;
    use std::time::Instant;

    fn run<T: BuiltinCommand + 'static>(
        args: &[&str],
        env: &mut Environment,
        jobs: &JobTable,
    ) -> (ExitCode, String) {
        let factory = Factory::<T>::default();
        let cmd = factory.try_create(T::name(), args).unwrap();
        let mut out = Vec::new();
        let code = cmd.execute(&mut out, env, jobs).unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn factory_ignores_other_names() {
        assert!(Factory::<Cd>::default().try_create("jobs", &[]).is_none());
        assert!(Factory::<Jobs>::default().try_create("jobs", &[]).is_some());
    }

    #[test]
    fn cd_to_missing_directory_reports_and_keeps_state() {
        let mut env = Environment::new();
        let before = env.current_dir.clone();

        let (code, out) = run::<Cd>(&["/nonexistent/doit-test"], &mut env, &JobTable::new());

        assert_eq!(code, 1);
        assert!(out.starts_with("cd: can't change to /nonexistent/doit-test"));
        assert!(!env.should_exit);
        assert_eq!(env.current_dir, before);
    }

    #[test]
    fn jobs_without_jobs() {
        let mut env = Environment::new();
        let (code, out) = run::<Jobs>(&[], &mut env, &JobTable::new());
        assert_eq!(code, 0);
        assert_eq!(out, "No background jobs.\n");
    }

    #[test]
    fn jobs_lists_in_insertion_order() {
        let mut env = Environment::new();
        let mut jobs = JobTable::new();
        jobs.add(Job::new(ProcessId::new(300), "sleep 10 &", Instant::now()))
            .unwrap();
        jobs.add(Job::new(ProcessId::new(200), "sleep 20 &", Instant::now()))
            .unwrap();

        let (_, out) = run::<Jobs>(&[], &mut env, &jobs);
        assert_eq!(out, "[1] 300 sleep 10 &\n[2] 200 sleep 20 &\n");
    }

    #[test]
    fn exit_requests_shutdown_with_status() {
        let mut env = Environment::new();
        let (code, _) = run::<Exit>(&["3"], &mut env, &JobTable::new());
        assert_eq!(code, 3);
        assert!(env.should_exit);
        assert_eq!(env.exit_code, 3);
    }

    #[test]
    fn exit_rejects_non_numeric_status() {
        let mut env = Environment::new();
        let (code, out) = run::<Exit>(&["soon"], &mut env, &JobTable::new());
        assert_eq!(code, 1);
        assert!(!out.is_empty());
        assert!(!env.should_exit);
    }
}
