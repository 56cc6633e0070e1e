use std::fmt;
use std::io;

use libc::{WEXITSTATUS, WIFEXITED, WIFSIGNALED, WNOHANG, WTERMSIG, c_int};

use crate::cutils::cerr;
use crate::launcher::ProcessId;

pub trait Wait {
    /// Wait for a child process to terminate and collect its resource usage.
    ///
    /// Calling this function will block until the child specified by the given process ID
    /// has terminated, unless [`WaitOptions::no_hang`] is used. Interrupted waits are
    /// restarted.
    fn wait(self, options: WaitOptions) -> Result<Reaped, WaitError>;
}

impl Wait for ProcessId {
    fn wait(self, options: WaitOptions) -> Result<Reaped, WaitError> {
        let mut status: c_int = 0;
        // SAFETY: `rusage` is a plain C struct for which all-zero bytes is a valid value.
        let mut usage: libc::rusage = unsafe { std::mem::zeroed() };

        loop {
            let res = cerr(unsafe {
                libc::wait4(self.id(), &mut status, options.flags, &mut usage)
            });
            match res {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(WaitError::Io(err)),
                Ok(0) if options.flags & WNOHANG != 0 => return Err(WaitError::NotReady),
                Ok(pid) => {
                    return Ok(Reaped {
                        pid: ProcessId::new(pid),
                        status: WaitStatus { status },
                        usage,
                    });
                }
            }
        }
    }
}

/// A terminated child: its identity, how it ended and what it consumed.
#[derive(Clone, Copy)]
pub struct Reaped {
    pub pid: ProcessId,
    pub status: WaitStatus,
    /// Resource usage of this child alone, as reported by `wait4`.
    pub usage: libc::rusage,
}

impl fmt::Debug for Reaped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaped")
            .field("pid", &self.pid)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Error values returned when [`Wait::wait`] fails.
#[derive(Debug)]
pub enum WaitError {
    // The child has not terminated yet.
    //
    // This is only returned if the [`WaitOptions::no_hang`] option is used.
    NotReady,
    // The status query itself failed.
    Io(io::Error),
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitError::NotReady => write!(f, "child has not terminated"),
            WaitError::Io(err) => write!(f, "status query failed: {err}"),
        }
    }
}

impl std::error::Error for WaitError {}

/// Options to configure how [`Wait::wait`] waits for children.
pub struct WaitOptions {
    flags: c_int,
}

impl WaitOptions {
    /// Only wait for terminated children.
    pub const fn new() -> Self {
        Self { flags: 0 }
    }

    /// Return immediately if the child has not terminated.
    pub const fn no_hang(mut self) -> Self {
        self.flags |= WNOHANG;
        self
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// The status of the waited child.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct WaitStatus {
    status: c_int,
}

impl fmt::Debug for WaitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(exit_status) = self.exit_status() {
            write!(f, "ExitStatus({exit_status})")
        } else if let Some(signal) = self.term_signal() {
            write!(f, "TermSignal({signal})")
        } else {
            write!(f, "Unknown")
        }
    }
}

impl WaitStatus {
    /// Return `true` if the child terminated normally, i.e., by calling `exit`.
    pub const fn did_exit(&self) -> bool {
        WIFEXITED(self.status)
    }

    /// Return the exit status of the child if the child terminated normally.
    pub const fn exit_status(&self) -> Option<c_int> {
        if self.did_exit() {
            Some(WEXITSTATUS(self.status))
        } else {
            None
        }
    }

    /// Return `true` if the child process was terminated by a signal.
    pub const fn was_signaled(&self) -> bool {
        WIFSIGNALED(self.status)
    }

    /// Return the signal number which caused the child to terminate.
    pub const fn term_signal(&self) -> Option<c_int> {
        if self.was_signaled() {
            Some(WTERMSIG(self.status))
        } else {
            None
        }
    }

    /// Shell-style exit code: the exit status, or `128 + signal` for a killed child.
    pub fn exit_code(&self) -> i32 {
        match (self.exit_status(), self.term_signal()) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => -1,
        }
    }
}
