//! Worker side of the per-test isolation protocol.
//!
//! A worker lives for exactly one test: it scopes the coverage store to
//! the test's node id, measures its own resource consumption around the
//! host's single-test execution path, reports the result upstream, and
//! terminates immediately without running the process's normal exit
//! sequence, so shared exit handlers never run twice and the supervisor's
//! state is never perturbed.

use std::io::{self, Write};

use crate::core::{Result, TestItem};
use crate::coverage::CoverageStore;
use crate::host::HostRunner;

use super::counters::{CumulativeBaseline, ProcessProbe};
use super::protocol::{write_message, WorkerMessage, WorkerSample};

/// Run the worker protocol for one test, then exit the process.
pub fn run(item: &TestItem, runner: &dyn HostRunner, coverage: &mut dyn CoverageStore) -> ! {
    let code = match run_protocol(item, runner, coverage) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("worker error for {}: {err}", item.node_id);
            1
        }
    };
    unsafe { libc::_exit(code) }
}

fn run_protocol(
    item: &TestItem,
    runner: &dyn HostRunner,
    coverage: &mut dyn CoverageStore,
) -> Result<()> {
    let mut stdout = io::stdout().lock();

    coverage.start_context(&item.node_id)?;

    let probe = ProcessProbe::current();
    let cumulative_pre = CumulativeBaseline::take(&probe);
    let baseline = probe.instant();

    write_message(&mut stdout, &WorkerMessage::Started)?;

    let status = runner.run_single(item);

    // Stopped goes out regardless of the test's outcome; the sample
    // follows the post-execution snapshot.
    write_message(&mut stdout, &WorkerMessage::Stopped)?;

    let cumulative = cumulative_pre.delta(&probe);
    write_message(
        &mut stdout,
        &WorkerMessage::Sample(WorkerSample {
            cumulative,
            baseline,
        }),
    )?;
    stdout.flush()?;

    coverage.stop_context()?;
    coverage.save()?;

    match status {
        Ok(outcome) => tracing::debug!(node_id = %item.node_id, ?outcome, "test finished"),
        Err(err) => tracing::debug!(node_id = %item.node_id, %err, "host runner failed"),
    }

    Ok(())
}
