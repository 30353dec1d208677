//! Testinspect - per-test resource profiling and static test features.
//!
//! Augments a test run with a dataset combining static properties of each
//! test function (structural shape, complexity, per-line churn of recent
//! history) and the resource consumption measured while the test executes
//! in an isolated worker process.
//!
//! # Example
//!
//! ```no_run
//! use testinspect::config::Config;
//! use testinspect::core::TestManifest;
//! use testinspect::session::{Session, SessionHooks};
//!
//! let mut config = Config::default();
//! config.harness.output = Some("build/profile".into());
//!
//! let manifest = TestManifest::load("tests.json").unwrap();
//! let mut session = Session::configure(&config, ".").unwrap().unwrap();
//! session.on_collect(&manifest).unwrap();
//! session.on_run(&manifest).unwrap();
//! ```

pub mod analyzers;
pub mod cli;
pub mod config;
pub mod core;
pub mod coverage;
pub mod git;
pub mod harness;
pub mod host;
pub mod metrics;
pub mod output;
pub mod parser;
pub mod resolve;
pub mod session;

pub use crate::core::{Error, Result};
pub use crate::session::{Session, SessionHooks};
