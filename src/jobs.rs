//! The table of background jobs.
//!
//! Jobs are kept in insertion order and numbered by position: the job in slot `i`
//! is shown to the user as `[i + 1]`. Removing a job renumbers the ones after it.

use crate::launcher::ProcessId;
use std::fmt;
use std::time::Instant;

/// A background child process under shell management.
#[derive(Debug, Clone)]
pub struct Job {
    pub pid: ProcessId,
    /// The command line as the user typed it.
    pub command: String,
    /// Taken immediately before the process was spawned.
    pub started: Instant,
}

impl Job {
    pub fn new(pid: ProcessId, command: impl Into<String>, started: Instant) -> Self {
        Self {
            pid,
            command: command.into(),
            started,
        }
    }
}

/// `[n] pid command`, the way a job is announced and listed.
pub struct JobLine<'a> {
    pub number: usize,
    pub job: &'a Job,
}

impl fmt::Display for JobLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.number, self.job.pid, self.job.command)
    }
}

/// A job with the same process id is already in the table.
#[derive(Debug)]
pub struct DuplicateJob(pub ProcessId);

impl fmt::Display for DuplicateJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "process {} is already a job", self.0)
    }
}

impl std::error::Error for DuplicateJob {}

#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<Job>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job and return its display number.
    pub fn add(&mut self, job: Job) -> Result<usize, DuplicateJob> {
        if self.jobs.iter().any(|live| live.pid == job.pid) {
            return Err(DuplicateJob(job.pid));
        }
        self.jobs.push(job);
        Ok(self.jobs.len())
    }

    /// Remove the job in slot `index`, shifting later jobs down by one.
    pub fn remove_at(&mut self, index: usize) -> Option<Job> {
        if index < self.jobs.len() {
            Some(self.jobs.remove(index))
        } else {
            None
        }
    }

    pub fn all(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs paired with their display numbers, in table order.
    pub fn lines(&self) -> impl Iterator<Item = JobLine<'_>> {
        self.jobs
            .iter()
            .enumerate()
            .map(|(index, job)| JobLine { number: index + 1, job })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn job(pid: i32, command: &str) -> Job {
        Job::new(ProcessId::new(pid), command, Instant::now())
    }

    fn pids(table: &JobTable) -> Vec<i32> {
        table.all().iter().map(|job| job.pid.id()).collect()
    }

    #[test]
    fn add_returns_one_based_numbers() {
        let mut table = JobTable::new();
        assert_eq!(table.add(job(10, "a")).unwrap(), 1);
        assert_eq!(table.add(job(11, "b")).unwrap(), 2);
        assert_eq!(table.add(job(12, "c")).unwrap(), 3);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn duplicate_pid_is_rejected() {
        let mut table = JobTable::new();
        table.add(job(10, "a")).unwrap();
        let err = table.add(job(10, "again")).unwrap_err();
        assert_eq!(err.0, ProcessId::new(10));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn removal_keeps_numbers_contiguous() {
        let mut table = JobTable::new();
        for pid in 1..=5 {
            table.add(job(pid, "sleep 1 &")).unwrap();
        }

        let removed = table.remove_at(1).unwrap();
        assert_eq!(removed.pid.id(), 2);
        table.remove_at(2).unwrap();

        assert_eq!(pids(&table), vec![1, 3, 5]);
        let numbers: Vec<usize> = table.lines().map(|line| line.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn size_is_adds_minus_removals() {
        let mut table = JobTable::new();
        for pid in 100..110 {
            table.add(job(pid, "x")).unwrap();
        }
        for _ in 0..4 {
            table.remove_at(0).unwrap();
        }
        assert_eq!(table.len(), 6);
        assert!(table.remove_at(6).is_none());
    }

    #[test]
    fn job_line_format() {
        let job = job(4242, "sleep 5 &");
        let line = JobLine { number: 2, job: &job };
        assert_eq!(line.to_string(), "[2] 4242 sleep 5 &");
    }
}
