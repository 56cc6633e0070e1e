//! Post-mortem resource usage of terminated children.

use crate::cutils::cerr;
use crate::wait::Reaped;
use std::fmt;
use std::time::{Duration, Instant};

/// How usage figures are attributed to a finished job.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Accounting {
    /// Usage of the reaped child alone, as returned by `wait4`.
    #[default]
    PerChild,
    /// Aggregate usage of every child reaped by the shell so far (`RUSAGE_CHILDREN`).
    /// Figures for a job include children that finished before it.
    Cumulative,
}

/// Snapshot of the resources consumed by a terminated process.
///
/// Times are in milliseconds; every other field is the raw `rusage` counter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UsageStats {
    pub wall_clock_ms: i64,
    pub user_cpu_ms: i64,
    pub system_cpu_ms: i64,
    pub max_rss: i64,
    pub shared_memory: i64,
    pub unshared_data: i64,
    pub unshared_stack: i64,
    pub page_reclaims: i64,
    pub page_faults: i64,
    pub swaps: i64,
    pub block_input: i64,
    pub block_output: i64,
    pub messages_sent: i64,
    pub messages_received: i64,
    pub signals: i64,
    pub voluntary_switches: i64,
    pub involuntary_switches: i64,
}

fn millis(tv: &libc::timeval) -> i64 {
    tv.tv_sec as i64 * 1000 + tv.tv_usec as i64 / 1000
}

impl UsageStats {
    /// Stats with only the wall clock filled in, used when the OS query fails.
    pub fn zeroed(wall_clock: Duration) -> Self {
        Self {
            wall_clock_ms: i64::try_from(wall_clock.as_millis()).unwrap_or(i64::MAX),
            ..Self::default()
        }
    }

    pub fn from_rusage(wall_clock: Duration, usage: &libc::rusage) -> Self {
        Self {
            user_cpu_ms: millis(&usage.ru_utime),
            system_cpu_ms: millis(&usage.ru_stime),
            max_rss: usage.ru_maxrss as i64,
            shared_memory: usage.ru_ixrss as i64,
            unshared_data: usage.ru_idrss as i64,
            unshared_stack: usage.ru_isrss as i64,
            page_reclaims: usage.ru_minflt as i64,
            page_faults: usage.ru_majflt as i64,
            swaps: usage.ru_nswap as i64,
            block_input: usage.ru_inblock as i64,
            block_output: usage.ru_oublock as i64,
            messages_sent: usage.ru_msgsnd as i64,
            messages_received: usage.ru_msgrcv as i64,
            signals: usage.ru_nsignals as i64,
            voluntary_switches: usage.ru_nvcsw as i64,
            involuntary_switches: usage.ru_nivcsw as i64,
            ..Self::zeroed(wall_clock)
        }
    }

    /// Report rows in display order.
    pub fn rows(&self) -> [(&'static str, i64); 17] {
        [
            ("Wall Clock Time", self.wall_clock_ms),
            ("User CPU Time", self.user_cpu_ms),
            ("System CPU Time", self.system_cpu_ms),
            ("Max RSS", self.max_rss),
            ("Integral Shared Memory Size", self.shared_memory),
            ("Integral Unshared Data Size", self.unshared_data),
            ("Integral Unshared Stack Size", self.unshared_stack),
            ("Page Reclaims", self.page_reclaims),
            ("Page Faults", self.page_faults),
            ("Swaps", self.swaps),
            ("Block Input Operations", self.block_input),
            ("Block Output Operations", self.block_output),
            ("IPC Messages Sent", self.messages_sent),
            ("IPC Messages Received", self.messages_received),
            ("Signals Received", self.signals),
            ("Voluntary Context Switches", self.voluntary_switches),
            ("Involuntary Context Switches", self.involuntary_switches),
        ]
    }
}

impl fmt::Display for UsageStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, value) in self.rows() {
            writeln!(f, "{label:<30}{value:>15}")?;
        }
        Ok(())
    }
}

/// Produces [`UsageStats`] for reaped children.
#[derive(Debug, Default, Clone, Copy)]
pub struct UsageSampler {
    accounting: Accounting,
}

impl UsageSampler {
    pub fn new(accounting: Accounting) -> Self {
        Self { accounting }
    }

    pub fn accounting(&self) -> Accounting {
        self.accounting
    }

    /// Cumulative usage of all children reaped so far, with the wall clock measured
    /// from `start`. A failed query yields zeroed counters.
    pub fn sample(&self, start: Instant) -> UsageStats {
        let wall_clock = start.elapsed();
        // SAFETY: `rusage` is a plain C struct for which all-zero bytes is a valid value.
        let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
        match cerr(unsafe { libc::getrusage(libc::RUSAGE_CHILDREN, &mut usage) }) {
            Ok(_) => UsageStats::from_rusage(wall_clock, &usage),
            Err(err) => {
                log::warn!("getrusage failed: {err}");
                UsageStats::zeroed(wall_clock)
            }
        }
    }

    /// Stats for a child that was just reaped, attributed according to the configured
    /// [`Accounting`].
    pub fn sample_reaped(&self, start: Instant, reaped: &Reaped) -> UsageStats {
        match self.accounting {
            Accounting::PerChild => UsageStats::from_rusage(start.elapsed(), &reaped.usage),
            Accounting::Cumulative => self.sample(start),
        }
    }
}
