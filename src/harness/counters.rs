//! Resource counter snapshots read from the /proc filesystem.
//!
//! Cumulative counters (IO operation counts, voluntary context switches)
//! only ever increase and are reported as deltas between two snapshots.
//! Instantaneous counters (thread count, unique resident memory) are
//! sampled live and tracked as a running peak.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Point-in-time reading of counters that only ever increase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeCounters {
    pub read_ops: u64,
    pub write_ops: u64,
    pub voluntary_ctx_switches: u64,
}

/// Deltas between two cumulative snapshots plus elapsed wall-clock time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CumulativeDelta {
    pub wall_time_secs: f64,
    pub read_ops: u64,
    pub write_ops: u64,
    pub voluntary_ctx_switches: u64,
}

/// Live (instantaneous) counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstantCounters {
    pub threads: u64,
    pub memory_bytes: u64,
}

impl InstantCounters {
    /// Component-wise maximum, used to track the running peak.
    pub fn component_max(self, other: Self) -> Self {
        Self {
            threads: self.threads.max(other.threads),
            memory_bytes: self.memory_bytes.max(other.memory_bytes),
        }
    }

    /// Peak-minus-baseline. Deltas saturate at zero: a peak observed from
    /// outside can momentarily read below the worker's own baseline, and
    /// the record must stay non-negative.
    pub fn saturating_delta(self, baseline: Self) -> Self {
        Self {
            threads: self.threads.saturating_sub(baseline.threads),
            memory_bytes: self.memory_bytes.saturating_sub(baseline.memory_bytes),
        }
    }
}

/// Reads counters for one process out of /proc.
///
/// Missing or unreadable counter files read as zero so sampling keeps
/// working on kernels without the optional interfaces.
#[derive(Debug, Clone)]
pub struct ProcessProbe {
    proc_dir: PathBuf,
}

impl ProcessProbe {
    /// Probe for the calling process.
    pub fn current() -> Self {
        Self {
            proc_dir: PathBuf::from("/proc/self"),
        }
    }

    /// Probe for another process by pid.
    pub fn for_pid(pid: u32) -> Self {
        Self {
            proc_dir: PathBuf::from(format!("/proc/{pid}")),
        }
    }

    /// Snapshot the cumulative counters.
    pub fn cumulative(&self) -> CumulativeCounters {
        let io = fs::read_to_string(self.proc_dir.join("io")).unwrap_or_default();
        let status = fs::read_to_string(self.proc_dir.join("status")).unwrap_or_default();

        CumulativeCounters {
            read_ops: field(&io, "syscr:"),
            write_ops: field(&io, "syscw:"),
            voluntary_ctx_switches: field(&status, "voluntary_ctxt_switches:"),
        }
    }

    /// Sample the instantaneous counters.
    pub fn instant(&self) -> InstantCounters {
        let status = fs::read_to_string(self.proc_dir.join("status")).unwrap_or_default();

        InstantCounters {
            threads: field(&status, "Threads:"),
            memory_bytes: self.unique_memory().unwrap_or_else(|| self.resident_memory()),
        }
    }

    /// Unique set size: private clean + private dirty out of smaps_rollup.
    fn unique_memory(&self) -> Option<u64> {
        let rollup = fs::read_to_string(self.proc_dir.join("smaps_rollup")).ok()?;
        let kb = field(&rollup, "Private_Clean:") + field(&rollup, "Private_Dirty:");
        (kb > 0).then_some(kb * 1024)
    }

    /// Resident set size out of statm, as a fallback for kernels without
    /// smaps_rollup.
    fn resident_memory(&self) -> u64 {
        let pages = fs::read_to_string(self.proc_dir.join("statm"))
            .ok()
            .and_then(|s| {
                s.split_whitespace()
                    .nth(1)
                    .and_then(|v| v.parse::<u64>().ok())
            })
            .unwrap_or(0);
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        pages * page_size.max(0) as u64
    }
}

/// First whitespace-separated value after `key` in a `/proc` key-value
/// listing, zero when absent.
fn field(content: &str, key: &str) -> u64 {
    content
        .lines()
        .find(|l| l.starts_with(key))
        .and_then(|l| l[key.len()..].split_whitespace().next())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Pre-execution cumulative baseline carrying its own start instant.
#[derive(Debug)]
pub struct CumulativeBaseline {
    counters: CumulativeCounters,
    started: Instant,
}

impl CumulativeBaseline {
    /// Take the pre-execution snapshot.
    pub fn take(probe: &ProcessProbe) -> Self {
        Self {
            counters: probe.cumulative(),
            started: Instant::now(),
        }
    }

    /// Delta between the post-execution snapshot and this baseline.
    pub fn delta(&self, probe: &ProcessProbe) -> CumulativeDelta {
        let now = probe.cumulative();
        CumulativeDelta {
            wall_time_secs: self.started.elapsed().as_secs_f64(),
            read_ops: now.read_ops.saturating_sub(self.counters.read_ops),
            write_ops: now.write_ops.saturating_sub(self.counters.write_ops),
            voluntary_ctx_switches: now
                .voluntary_ctx_switches
                .saturating_sub(self.counters.voluntary_ctx_switches),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_parses_proc_listings() {
        let status = "Name:\tcat\nThreads:\t3\nvoluntary_ctxt_switches:\t42\n";
        assert_eq!(field(status, "Threads:"), 3);
        assert_eq!(field(status, "voluntary_ctxt_switches:"), 42);
        assert_eq!(field(status, "nonvoluntary_ctxt_switches:"), 0);
    }

    #[test]
    fn test_field_with_units() {
        let rollup = "Rss:\t1024 kB\nPrivate_Clean:\t128 kB\nPrivate_Dirty:\t256 kB\n";
        assert_eq!(field(rollup, "Private_Clean:"), 128);
        assert_eq!(field(rollup, "Private_Dirty:"), 256);
    }

    #[test]
    fn test_component_max() {
        let a = InstantCounters { threads: 2, memory_bytes: 100 };
        let b = InstantCounters { threads: 1, memory_bytes: 300 };
        assert_eq!(
            a.component_max(b),
            InstantCounters { threads: 2, memory_bytes: 300 }
        );
    }

    #[test]
    fn test_saturating_delta_never_negative() {
        let peak = InstantCounters { threads: 1, memory_bytes: 50 };
        let baseline = InstantCounters { threads: 2, memory_bytes: 100 };
        assert_eq!(peak.saturating_delta(baseline), InstantCounters::default());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_current_process_probe() {
        let probe = ProcessProbe::current();
        let instant = probe.instant();
        assert!(instant.threads >= 1);
        assert!(instant.memory_bytes > 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_cumulative_delta_non_negative() {
        let probe = ProcessProbe::current();
        let baseline = CumulativeBaseline::take(&probe);
        // Produce a little measurable work.
        let _ = std::fs::read_to_string("/proc/self/status");
        let delta = baseline.delta(&probe);
        assert!(delta.wall_time_secs >= 0.0);
    }

    #[test]
    fn test_probe_for_missing_pid_reads_zero() {
        let probe = ProcessProbe::for_pid(u32::MAX);
        assert_eq!(probe.cumulative(), CumulativeCounters::default());
    }
}
