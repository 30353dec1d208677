//! Supervisor side of the per-test isolation protocol.
//!
//! Drives a strictly sequential loop: exactly one worker process exists at
//! a time, and the next is not spawned until the previous one has been
//! reaped and both signals reset. Report lines therefore appear in
//! execution order and never interleave.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use crate::core::{Error, Result, TestItem};

use super::counters::ProcessProbe;
use super::protocol::{EventChannel, WorkerSignals};
use super::report::ResourceReport;

/// Interval between live samples of the worker's instantaneous counters,
/// also used as the polling timeout on the stopped wait.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(25);

/// Builds the isolated worker process for one test.
///
/// Production re-executes the current binary in its hidden worker mode;
/// tests may point at an explicit program.
pub struct WorkerSpawner {
    program: PathBuf,
    output_base: PathBuf,
    command_template: String,
    working_dir: Option<PathBuf>,
}

impl WorkerSpawner {
    pub fn new(output_base: impl Into<PathBuf>, command_template: impl Into<String>) -> Result<Self> {
        Ok(Self {
            program: std::env::current_exe()?,
            output_base: output_base.into(),
            command_template: command_template.into(),
            working_dir: None,
        })
    }

    /// Use an explicit worker binary instead of the current executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the working directory workers run in.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn spawn(&self, item: &TestItem) -> Result<Child> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("worker")
            .arg("--output")
            .arg(&self.output_base)
            .arg("--cmd")
            .arg(&self.command_template)
            .arg("--node-id")
            .arg(&item.node_id)
            .arg("--callable")
            .arg(item.callable.as_str())
            .arg("--file")
            .arg(&item.file)
            .arg("--line")
            .arg(item.line.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        Ok(cmd.spawn()?)
    }
}

/// The long-lived process driving the per-test loop.
pub struct Supervisor {
    spawner: WorkerSpawner,
    report: ResourceReport,
    interval: Duration,
}

impl Supervisor {
    pub fn new(spawner: WorkerSpawner, report: ResourceReport) -> Self {
        Self {
            spawner,
            report,
            interval: SAMPLE_INTERVAL,
        }
    }

    /// Override the sampling interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// The report being appended to.
    pub fn report_path(&self) -> &Path {
        self.report.path()
    }

    /// Run every test, one isolated worker at a time.
    pub fn run(&self, items: &[TestItem]) -> Result<()> {
        let mut signals = WorkerSignals::default();
        for item in items {
            self.run_one(item, &mut signals)?;
        }
        Ok(())
    }

    fn run_one(&self, item: &TestItem, signals: &mut WorkerSignals) -> Result<()> {
        let mut child = self.spawner.spawn(item)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::protocol("worker stdout not captured"))?;
        let channel = EventChannel::new(stdout);

        if let Err(err) = self.measure(item, &child, &channel, signals) {
            // Reap before surfacing so no zombie outlives the session.
            let _ = child.wait();
            return Err(err);
        }

        child.wait()?;
        // Both signals return to their initial state before the next test.
        signals.reset();
        Ok(())
    }

    fn measure(
        &self,
        item: &TestItem,
        child: &Child,
        channel: &EventChannel,
        signals: &mut WorkerSignals,
    ) -> Result<()> {
        let died = || Error::WorkerDied {
            node_id: item.node_id.clone(),
        };

        channel.wait_started().map_err(|_| died())?;
        signals.started = true;

        // Track the running component-wise peak while the test executes;
        // the stopped wait polls on the sampling interval, so the last
        // sample lands promptly before completion.
        let probe = ProcessProbe::for_pid(child.id());
        let mut peak = probe.instant();
        loop {
            match channel.wait_stopped(self.interval) {
                Ok(true) => break,
                Ok(false) => peak = peak.component_max(probe.instant()),
                Err(_) => return Err(died()),
            }
        }
        signals.stopped = true;

        let sample = channel.recv_sample().map_err(|_| died())?;
        let peak_delta = peak.saturating_delta(sample.baseline);
        self.report
            .append(&sample.cumulative, peak_delta, &item.node_id)?;

        tracing::debug!(
            node_id = %item.node_id,
            wall_time_secs = sample.cumulative.wall_time_secs,
            "test measured"
        );
        Ok(())
    }
}
