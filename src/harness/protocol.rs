//! Worker/supervisor wire protocol and synchronization state.
//!
//! The worker owns its stdout and emits one JSON message per line. Three
//! messages exist per test: `started`, `stopped`, and the one-shot
//! `sample` carrying the cumulative deltas and the non-cumulative
//! baseline. A reader thread feeds them into a channel whose timed
//! receive doubles as the supervisor's polling wait.

use std::io::{BufRead, BufReader, Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

use super::counters::{CumulativeDelta, InstantCounters};

/// Measurement payload sent once per test over the one-shot channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkerSample {
    /// Post-minus-pre cumulative counters, measured by the worker on
    /// itself.
    pub cumulative: CumulativeDelta,
    /// The worker's pre-execution instantaneous baseline.
    pub baseline: InstantCounters,
}

/// One protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum WorkerMessage {
    Started,
    Stopped,
    Sample(WorkerSample),
}

/// Write one message as a JSON line and flush it.
pub fn write_message<W: Write>(writer: &mut W, message: &WorkerMessage) -> Result<()> {
    serde_json::to_writer(&mut *writer, message)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Receiving side of the worker channel.
///
/// Lines that do not parse as protocol messages are ignored, so stray
/// output from an embedded host cannot corrupt the channel.
pub struct EventChannel {
    rx: Receiver<WorkerMessage>,
}

impl EventChannel {
    /// Spawn a reader thread over the worker's output stream.
    pub fn new<R: Read + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let buf = BufReader::new(reader);
            for line in buf.lines() {
                let Ok(line) = line else { break };
                if let Ok(message) = serde_json::from_str::<WorkerMessage>(&line) {
                    if tx.send(message).is_err() {
                        break;
                    }
                }
            }
        });
        Self { rx }
    }

    /// Block until the worker reports it has started.
    pub fn wait_started(&self) -> Result<()> {
        match self.rx.recv() {
            Ok(WorkerMessage::Started) => Ok(()),
            Ok(other) => Err(Error::protocol(format!("expected started, got {other:?}"))),
            Err(_) => Err(Error::protocol("channel closed before started")),
        }
    }

    /// Poll for the stopped signal. Returns `false` on timeout so the
    /// caller can take another sample; the timeout is the sampling
    /// interval.
    pub fn wait_stopped(&self, poll: Duration) -> Result<bool> {
        match self.rx.recv_timeout(poll) {
            Ok(WorkerMessage::Stopped) => Ok(true),
            Ok(other) => Err(Error::protocol(format!("expected stopped, got {other:?}"))),
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::protocol("channel closed before stopped"))
            }
        }
    }

    /// Receive the one-shot sample message.
    pub fn recv_sample(&self) -> Result<WorkerSample> {
        match self.rx.recv() {
            Ok(WorkerMessage::Sample(sample)) => Ok(sample),
            Ok(other) => Err(Error::protocol(format!("expected sample, got {other:?}"))),
            Err(_) => Err(Error::protocol("channel closed before sample")),
        }
    }
}

/// The pair of binary signals the supervisor tracks per test. Both must
/// be reset before the next worker is spawned.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSignals {
    pub started: bool,
    pub stopped: bool,
}

impl WorkerSignals {
    /// Clear both signals back to their initial state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> WorkerSample {
        WorkerSample {
            cumulative: CumulativeDelta {
                wall_time_secs: 0.5,
                read_ops: 10,
                write_ops: 4,
                voluntary_ctx_switches: 7,
            },
            baseline: InstantCounters {
                threads: 1,
                memory_bytes: 4096,
            },
        }
    }

    fn wire(messages: &[WorkerMessage]) -> Vec<u8> {
        let mut out = Vec::new();
        for m in messages {
            write_message(&mut out, m).unwrap();
        }
        out
    }

    #[test]
    fn test_message_round_trip() {
        let line = serde_json::to_string(&WorkerMessage::Sample(sample())).unwrap();
        let parsed: WorkerMessage = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, WorkerMessage::Sample(sample()));
    }

    #[test]
    fn test_channel_full_protocol() {
        let bytes = wire(&[
            WorkerMessage::Started,
            WorkerMessage::Stopped,
            WorkerMessage::Sample(sample()),
        ]);
        let channel = EventChannel::new(Cursor::new(bytes));

        channel.wait_started().unwrap();
        // Stopped is already buffered; the poll returns true immediately.
        assert!(channel.wait_stopped(Duration::from_millis(25)).unwrap());
        assert_eq!(channel.recv_sample().unwrap(), sample());
    }

    #[test]
    fn test_channel_ignores_stray_lines() {
        let mut bytes = b"not json\n".to_vec();
        bytes.extend(wire(&[WorkerMessage::Started]));
        bytes.extend(b"PASSED test_foo\n");
        bytes.extend(wire(&[WorkerMessage::Stopped, WorkerMessage::Sample(sample())]));

        let channel = EventChannel::new(Cursor::new(bytes));
        channel.wait_started().unwrap();
        assert!(channel.wait_stopped(Duration::from_millis(25)).unwrap());
        channel.recv_sample().unwrap();
    }

    #[test]
    fn test_channel_closed_before_started() {
        let channel = EventChannel::new(Cursor::new(Vec::new()));
        assert!(channel.wait_started().is_err());
    }

    #[test]
    fn test_channel_closed_before_stopped() {
        let channel = EventChannel::new(Cursor::new(wire(&[WorkerMessage::Started])));
        channel.wait_started().unwrap();
        // EOF after started: once the reader thread drains, the poll must
        // error out instead of timing out forever.
        let result = loop {
            match channel.wait_stopped(Duration::from_millis(5)) {
                Ok(false) => continue,
                other => break other,
            }
        };
        assert!(result.is_err());
    }

    #[test]
    fn test_signals_reset() {
        let mut signals = WorkerSignals {
            started: true,
            stopped: true,
        };
        signals.reset();
        assert_eq!(signals, WorkerSignals::default());
    }
}
