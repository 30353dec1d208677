//! Session orchestration: named lifecycle callbacks wiring the collection
//! and run phases.
//!
//! The session activates only when a resource-report base path is
//! configured; otherwise it stays fully inactive and the host's default
//! behavior stands. At collection it computes the churn map once,
//! deduplicates static records by callable identity, and persists the
//! snapshot before the first test executes. The run phase is replaced by
//! the per-test isolation loop.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzers::churn::{Analyzer as ChurnAnalyzer, ChurnMap};
use crate::analyzers::statics::{Extractor, StaticRecord};
use crate::config::Config;
use crate::core::{CallableId, Error, Result, TestManifest};
use crate::git::{GitCli, LineLogProvider};
use crate::harness::{ResourceReport, Supervisor, WorkerSpawner};

/// Output files derived from the configured base path.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub report: PathBuf,
    pub snapshot: PathBuf,
    pub coverage: PathBuf,
}

impl OutputPaths {
    /// Derive the three file names from one base path.
    pub fn from_base(base: &Path) -> Self {
        let base = base.display();
        Self {
            report: PathBuf::from(format!("{base}.tsv")),
            snapshot: PathBuf::from(format!("{base}.json")),
            coverage: PathBuf::from(format!("{base}.sqlite3")),
        }
    }

    /// Delete stale outputs left over from a previous session.
    pub fn clean(&self) -> Result<()> {
        for path in [&self.report, &self.snapshot, &self.coverage] {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

/// Serialized exactly once per session, before any test runs.
#[derive(Debug, Serialize, Deserialize)]
pub struct StaticSnapshot {
    pub generated_at: DateTime<Utc>,
    /// Node id -> callable identity.
    pub items: BTreeMap<String, CallableId>,
    /// Callable identity -> static record.
    pub records: BTreeMap<CallableId, StaticRecord>,
    /// Source files the collected items came from.
    pub files: BTreeSet<PathBuf>,
    /// File -> line -> commits touching it within the window.
    pub churn: ChurnMap,
}

/// Named lifecycle callbacks a hosting test tool drives in order. The
/// on-configure step is [`Session::configure`].
pub trait SessionHooks {
    /// Collection finished: compute the static dataset and persist the
    /// snapshot.
    fn on_collect(&mut self, manifest: &TestManifest) -> Result<()>;

    /// Replace the host's run phase with the isolation loop.
    fn on_run(&mut self, manifest: &TestManifest) -> Result<()>;
}

/// An active profiling session.
pub struct Session {
    config: Config,
    base: PathBuf,
    paths: OutputPaths,
    workdir: PathBuf,
    line_log: Option<Box<dyn LineLogProvider>>,
    worker_program: Option<PathBuf>,
}

impl Session {
    /// On-configure hook.
    ///
    /// Returns `None` when no output base is configured: the session is
    /// then fully inactive with zero overhead. Activation failures (an
    /// unwritable output location) are loud.
    pub fn configure(config: &Config, workdir: impl AsRef<Path>) -> Result<Option<Self>> {
        let Some(base) = config.harness.output.clone() else {
            return Ok(None);
        };
        let paths = OutputPaths::from_base(&base);
        paths.clean()?;

        Ok(Some(Self {
            config: config.clone(),
            base,
            paths,
            workdir: workdir.as_ref().to_path_buf(),
            line_log: None,
            worker_program: None,
        }))
    }

    /// Replace the line-log provider (the default discovers the enclosing
    /// git repository on first use).
    pub fn with_line_log(mut self, provider: Box<dyn LineLogProvider>) -> Self {
        self.line_log = Some(provider);
        self
    }

    /// Use an explicit worker binary instead of the current executable.
    pub fn with_worker_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.worker_program = Some(program.into());
        self
    }

    /// The output files this session writes.
    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    fn churn(&mut self) -> Result<ChurnMap> {
        let provider: Box<dyn LineLogProvider> = match self.line_log.take() {
            Some(provider) => provider,
            None => Box::new(GitCli::discover(&self.workdir)?),
        };
        let churn =
            ChurnAnalyzer::new(provider.as_ref(), &self.workdir, &self.config.churn).analyze()?;
        self.line_log = Some(provider);
        Ok(churn)
    }
}

impl SessionHooks for Session {
    fn on_collect(&mut self, manifest: &TestManifest) -> Result<()> {
        let start = Instant::now();

        let churn = self.churn()?;
        let extractor = Extractor::new(&self.config.statics);

        let mut items: BTreeMap<String, CallableId> = BTreeMap::new();
        let mut files: BTreeSet<PathBuf> = BTreeSet::new();
        let mut computed: BTreeMap<CallableId, Option<StaticRecord>> = BTreeMap::new();

        for item in &manifest.items {
            // One record per unique callable; parametrized instances reuse it.
            let record = computed
                .entry(item.callable.clone())
                .or_insert_with(|| extractor.extract(item));
            if record.is_none() {
                continue;
            }
            items.insert(item.node_id.clone(), item.callable.clone());
            files.insert(item.file.clone());
        }

        let records: BTreeMap<CallableId, StaticRecord> = computed
            .into_iter()
            .filter_map(|(callable, record)| record.map(|r| (callable, r)))
            .collect();

        let snapshot = StaticSnapshot {
            generated_at: Utc::now(),
            items,
            records,
            files,
            churn,
        };

        let fd = fs::File::create(&self.paths.snapshot)?;
        serde_json::to_writer(fd, &snapshot)?;

        tracing::info!(
            "Collection completed in {:?}: {} items, {} static records, {} churned files",
            start.elapsed(),
            snapshot.items.len(),
            snapshot.records.len(),
            snapshot.churn.len()
        );
        Ok(())
    }

    fn on_run(&mut self, manifest: &TestManifest) -> Result<()> {
        if manifest.collection_errors > 0 && !self.config.harness.continue_on_collection_errors {
            return Err(Error::CollectionAborted {
                failed: manifest.collection_errors,
            });
        }
        if self.config.harness.collect_only {
            return Ok(());
        }

        let start = Instant::now();

        let mut spawner = WorkerSpawner::new(&self.base, self.config.harness.command.clone())?
            .with_working_dir(&self.workdir);
        if let Some(program) = &self.worker_program {
            spawner = spawner.with_program(program);
        }

        let report = ResourceReport::new(&self.paths.report);
        let supervisor = Supervisor::new(spawner, report)
            .with_interval(Duration::from_millis(self.config.harness.sample_interval_ms));

        supervisor.run(&manifest.items)?;

        tracing::info!(
            "Run phase completed in {:?}: {} tests profiled",
            start.elapsed(),
            manifest.items.len()
        );
        Ok(())
    }
}
