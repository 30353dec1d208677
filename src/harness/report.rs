//! Append-only resource report.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::Result;

use super::counters::{CumulativeDelta, InstantCounters};

/// Tab-separated report with one line per executed test, in execution
/// order: cumulative deltas, then peak non-cumulative deltas, then the
/// test's node id. Lines are appended as tests finish and never rewritten.
pub struct ResourceReport {
    path: PathBuf,
}

impl ResourceReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one measurement line.
    pub fn append(
        &self,
        cumulative: &CumulativeDelta,
        peak: InstantCounters,
        node_id: &str,
    ) -> Result<()> {
        let mut fd = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(
            fd,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            cumulative.wall_time_secs,
            cumulative.read_ops,
            cumulative.write_ops,
            cumulative.voluntary_ctx_switches,
            peak.threads,
            peak.memory_bytes,
            node_id,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn delta(wall: f64) -> CumulativeDelta {
        CumulativeDelta {
            wall_time_secs: wall,
            read_ops: 5,
            write_ops: 2,
            voluntary_ctx_switches: 9,
        }
    }

    #[test]
    fn test_lines_append_in_order() {
        let dir = TempDir::new().unwrap();
        let report = ResourceReport::new(dir.path().join("usage.tsv"));
        let peak = InstantCounters {
            threads: 1,
            memory_bytes: 2048,
        };

        report.append(&delta(0.25), peak, "t::first").unwrap();
        report.append(&delta(0.5), peak, "t::second").unwrap();

        let content = fs::read_to_string(report.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("t::first"));
        assert!(lines[1].ends_with("t::second"));
    }

    #[test]
    fn test_field_order() {
        let dir = TempDir::new().unwrap();
        let report = ResourceReport::new(dir.path().join("usage.tsv"));
        let peak = InstantCounters {
            threads: 3,
            memory_bytes: 4096,
        };

        report.append(&delta(1.5), peak, "t::x").unwrap();

        let content = fs::read_to_string(report.path()).unwrap();
        let fields: Vec<&str> = content.trim_end().split('\t').collect();
        assert_eq!(fields, vec!["1.5", "5", "2", "9", "3", "4096", "t::x"]);
    }
}
