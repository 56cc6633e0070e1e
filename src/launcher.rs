//! Starting child processes with `fork` + `execvp`.
//!
//! The parent only learns whether a new process could be created. A program that
//! cannot be loaded is reported by the child itself, which prints a diagnostic and
//! exits with [`EXEC_FAILURE_STATUS`]; the shell then observes an ordinary termination.

use crate::cutils::cerr;
use std::ffi::CString;
use std::fmt;
use std::io;

/// Exit status of a child whose target program could not be executed.
pub const EXEC_FAILURE_STATUS: i32 = 127;

/// Operating system identifier of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(libc::pid_t);

impl ProcessId {
    pub fn new(id: libc::pid_t) -> Self {
        Self(id)
    }

    pub fn id(&self) -> libc::pid_t {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure to create a new process. No child exists when this is returned.
#[derive(Debug)]
pub enum LaunchError {
    /// The argument vector was empty.
    EmptyCommand,
    /// An argument contained an interior NUL byte and cannot be passed to `exec`.
    InvalidArgument(String),
    /// `fork` itself failed.
    Fork(io::Error),
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchError::EmptyCommand => write!(f, "empty command"),
            LaunchError::InvalidArgument(arg) => {
                write!(f, "argument contains a NUL byte: {arg:?}")
            }
            LaunchError::Fork(err) => write!(f, "fork failed: {err}"),
        }
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaunchError::Fork(err) => Some(err),
            _ => None,
        }
    }
}

/// Spawns one child per call. The child inherits the shell's working directory,
/// environment and standard streams.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    pub fn new() -> Self {
        Self
    }

    /// Start `argv[0]` with the given arguments, searching `PATH` the way `execvp` does.
    pub fn spawn(&self, argv: &[String]) -> Result<ProcessId, LaunchError> {
        if argv.is_empty() {
            return Err(LaunchError::EmptyCommand);
        }

        // Everything the child touches is allocated here; after `fork` it only
        // calls `execvp`, `write` and `_exit`.
        let args = argv
            .iter()
            .map(|arg| {
                CString::new(arg.as_str()).map_err(|_| LaunchError::InvalidArgument(arg.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut ptrs: Vec<*const libc::c_char> = args.iter().map(|arg| arg.as_ptr()).collect();
        ptrs.push(std::ptr::null());
        let diagnostic = format!("doit: {}: cannot execute\n", argv[0]);

        // SAFETY: the child branch below only performs async-signal-safe calls on
        // memory prepared before the fork.
        let pid = cerr(unsafe { libc::fork() }).map_err(LaunchError::Fork)?;
        if pid == 0 {
            unsafe {
                libc::execvp(ptrs[0], ptrs.as_ptr());
                libc::write(
                    libc::STDERR_FILENO,
                    diagnostic.as_ptr().cast(),
                    diagnostic.len(),
                );
                libc::_exit(EXEC_FAILURE_STATUS);
            }
        }

        log::debug!("spawned {} as pid {}", argv.join(" "), pid);
        Ok(ProcessId(pid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wait::{Wait, WaitOptions};

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn empty_argv_is_rejected() {
        let err = ProcessLauncher::new().spawn(&[]).unwrap_err();
        assert!(matches!(err, LaunchError::EmptyCommand));
    }

    #[test]
    fn nul_byte_is_rejected_before_forking() {
        let err = ProcessLauncher::new()
            .spawn(&argv(&["echo", "a\0b"]))
            .unwrap_err();
        assert!(matches!(err, LaunchError::InvalidArgument(arg) if arg == "a\0b"));
    }

    #[test]
    fn spawned_program_runs_with_its_arguments() {
        let pid = ProcessLauncher::new()
            .spawn(&argv(&["sh", "-c", "exit 7"]))
            .unwrap();
        let reaped = pid.wait(WaitOptions::new()).unwrap();
        assert_eq!(reaped.pid, pid);
        assert_eq!(reaped.status.exit_status(), Some(7));
    }

    #[test]
    fn missing_program_exits_with_distinguished_status() {
        let pid = ProcessLauncher::new()
            .spawn(&argv(&["doit-test-no-such-program"]))
            .unwrap();
        let reaped = pid.wait(WaitOptions::new()).unwrap();
        assert_eq!(reaped.status.exit_status(), Some(EXEC_FAILURE_STATUS));
    }
}
