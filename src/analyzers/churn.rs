//! Per-line churn over recent repository history.
//!
//! For every source file changed inside the commit window, asks the line
//! log how many commits touched each line, scanning from line 1 until the
//! log reports the file has run out of lines. Only nonzero counts are
//! recorded, so absence of a key means zero touches.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::ChurnConfig;
use crate::core::Result;
use crate::git::{LineLogProvider, LineTouches};

/// File -> 1-based line -> number of commits touching it in the window.
pub type ChurnMap = BTreeMap<PathBuf, BTreeMap<u32, u32>>;

/// Churn analyzer over a line-log provider.
pub struct Analyzer<'a> {
    provider: &'a dyn LineLogProvider,
    workdir: PathBuf,
    window: u32,
    source_ext: String,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        provider: &'a dyn LineLogProvider,
        workdir: impl Into<PathBuf>,
        config: &ChurnConfig,
    ) -> Self {
        Self {
            provider,
            workdir: workdir.into(),
            window: config.commit_window,
            source_ext: config.source_ext.clone(),
        }
    }

    /// Build the churn map for the configured window.
    ///
    /// Provider failures other than the past-end-of-file condition are
    /// fatal and propagate.
    pub fn analyze(&self) -> Result<ChurnMap> {
        let start = Instant::now();
        let mut churn = ChurnMap::new();

        for file in self.provider.changed_files(self.window)? {
            if !self.is_tracked(&file) {
                continue;
            }

            let per_line = self.scan_file(&file)?;
            if !per_line.is_empty() {
                churn.insert(file, per_line);
            }
        }

        tracing::info!(
            "Churn analysis completed in {:?}: {} files with nonzero churn",
            start.elapsed(),
            churn.len()
        );

        Ok(churn)
    }

    /// Changed files must still exist on disk with the tracked extension.
    fn is_tracked(&self, file: &Path) -> bool {
        file.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext == self.source_ext)
            && self.workdir.join(file).exists()
    }

    fn scan_file(&self, file: &Path) -> Result<BTreeMap<u32, u32>> {
        let mut per_line = BTreeMap::new();
        let mut line = 1u32;

        loop {
            match self.provider.touches(file, line, self.window)? {
                LineTouches::PastEndOfFile => break,
                LineTouches::Count(n) => {
                    if n > 0 {
                        per_line.insert(line, n);
                    }
                    line += 1;
                }
            }
        }

        Ok(per_line)
    }
}
