//! Detecting terminated children and turning them into completion reports.
//!
//! A poll pass checks every job present when the pass starts. Terminated jobs are
//! reported in table order under the numbers they had at the start of the pass and
//! removed back-to-front once the pass is over, so removing one job never hides the
//! job after it.

use crate::jobs::{Job, JobTable};
use crate::launcher::ProcessId;
use crate::usage::{UsageSampler, UsageStats};
use crate::wait::{Reaped, Wait, WaitError, WaitOptions, WaitStatus};
use std::fmt;
use std::time::Instant;

/// `[n] pid command [Finished]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFinished {
    pub number: usize,
    pub pid: ProcessId,
    pub command: String,
}

impl fmt::Display for JobFinished {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {} [Finished]", self.number, self.pid, self.command)
    }
}

/// A finished job together with its usage statistics.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub finished: JobFinished,
    /// `None` when the status could not be queried during the shutdown drain.
    pub status: Option<WaitStatus>,
    pub stats: UsageStats,
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.finished)?;
        write!(f, "{}", self.stats)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Reaper {
    sampler: UsageSampler,
}

impl Reaper {
    pub fn new(sampler: UsageSampler) -> Self {
        Self { sampler }
    }

    /// One non-blocking pass over the table. Jobs that are still running, or whose
    /// status cannot be queried right now, stay in the table.
    pub fn poll(&self, jobs: &mut JobTable) -> Vec<JobReport> {
        let mut done = Vec::new();
        for (index, job) in jobs.all().iter().enumerate() {
            match job.pid.wait(WaitOptions::new().no_hang()) {
                Ok(reaped) => done.push((index, self.report(index + 1, job, Some(&reaped)))),
                Err(WaitError::NotReady) => {}
                Err(WaitError::Io(err)) => {
                    log::warn!("cannot query job [{}] (pid {}): {err}", index + 1, job.pid);
                }
            }
        }

        for (index, _) in done.iter().rev() {
            jobs.remove_at(*index);
        }
        done.into_iter().map(|(_, report)| report).collect()
    }

    /// Block on every remaining job in table order, handing each report to
    /// `on_finished` before the job is removed. The table is empty afterwards.
    pub fn drain(&self, jobs: &mut JobTable, mut on_finished: impl FnMut(JobReport)) {
        let mut number = 0;
        while let Some(job) = jobs.all().first() {
            number += 1;
            let report = match job.pid.wait(WaitOptions::new()) {
                Ok(reaped) => self.report(number, job, Some(&reaped)),
                Err(err) => {
                    log::warn!("cannot reap job [{number}] (pid {}): {err}", job.pid);
                    self.report(number, job, None)
                }
            };
            on_finished(report);
            jobs.remove_at(0);
        }
    }

    /// Block until the foreground child `pid` terminates.
    pub fn wait_for(
        &self,
        pid: ProcessId,
        started: Instant,
    ) -> Result<(WaitStatus, UsageStats), WaitError> {
        let reaped = pid.wait(WaitOptions::new())?;
        log::debug!("foreground pid {pid} ended with {:?}", reaped.status);
        Ok((reaped.status, self.sampler.sample_reaped(started, &reaped)))
    }

    fn report(&self, number: usize, job: &Job, reaped: Option<&Reaped>) -> JobReport {
        if let Some(reaped) = reaped {
            log::debug!("job [{number}] (pid {}) ended with {:?}", job.pid, reaped.status);
        }
        JobReport {
            finished: JobFinished {
                number,
                pid: job.pid,
                command: job.command.clone(),
            },
            status: reaped.map(|reaped| reaped.status),
            stats: match reaped {
                Some(reaped) => self.sampler.sample_reaped(job.started, reaped),
                None => UsageStats::zeroed(job.started.elapsed()),
            },
        }
    }
}
