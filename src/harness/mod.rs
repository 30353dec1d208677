//! Execution and resource-profiling harness.
//!
//! Each test runs in a freshly spawned worker process so global-state
//! corruption or crashes cannot leak across tests or into the supervisor.
//! The worker measures its own cumulative consumption; the supervisor
//! concurrently samples the worker's instantaneous footprint and keeps
//! the peak.

pub mod counters;
pub mod protocol;
pub mod report;
pub mod supervisor;
pub mod worker;

pub use counters::{CumulativeDelta, InstantCounters, ProcessProbe};
pub use protocol::{WorkerMessage, WorkerSample, WorkerSignals};
pub use report::ResourceReport;
pub use supervisor::{Supervisor, WorkerSpawner, SAMPLE_INTERVAL};
