//! Configuration loading and management.
//!
//! One value bundle, constructed at startup and threaded through the
//! components that need it: output base path, commit window, tracked
//! source extension, library install root, framework exclusions, and the
//! sampling interval.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::core::Result;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Execution harness configuration.
    pub harness: HarnessConfig,
    /// Churn analyzer configuration.
    pub churn: ChurnConfig,
    /// Static feature extractor configuration.
    pub statics: StaticsConfig,
}

impl Config {
    /// Load configuration from an explicit file path.
    ///
    /// Errors if the file does not exist. Env vars with `TESTINSPECT_`
    /// prefix override file values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(crate::core::Error::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file_exact(path))
            .merge(Env::prefixed("TESTINSPECT_").split("__"))
            .extract()
            .map_err(|e| crate::core::Error::Config(e.to_string()))?;
        Ok(config)
    }

    /// Load configuration from a directory, looking for `testinspect.toml`.
    ///
    /// A missing file is silently skipped (defaults are used). Env vars
    /// with `TESTINSPECT_` prefix override file/default values.
    pub fn load_default(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join("testinspect.toml")))
            .merge(Env::prefixed("TESTINSPECT_").split("__"))
            .extract()
            .map_err(|e| crate::core::Error::Config(e.to_string()))?;
        Ok(config)
    }
}

/// Execution harness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Base path for the resource report, snapshot and coverage store.
    /// `None` leaves the harness entirely inactive.
    pub output: Option<PathBuf>,
    /// Command template used to run one test; `{id}` expands to the
    /// test's node id.
    pub command: String,
    /// Milliseconds between live samples of the worker's counters.
    pub sample_interval_ms: u64,
    /// Run the collection phase only; no test executes.
    pub collect_only: bool,
    /// Tolerate collection errors instead of aborting the run phase.
    pub continue_on_collection_errors: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            output: None,
            command: "pytest {id}".to_string(),
            sample_interval_ms: 25,
            collect_only: false,
            continue_on_collection_errors: false,
        }
    }
}

/// Churn analyzer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChurnConfig {
    /// Number of commits in the history window.
    pub commit_window: u32,
    /// Extension of tracked source files.
    pub source_ext: String,
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            commit_window: 75,
            source_ext: "py".to_string(),
        }
    }
}

/// Static feature extractor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticsConfig {
    /// Install root for standard/third-party libraries; module names
    /// resolving under it count as external. Unset classifies nothing
    /// as external.
    pub library_root: PathBuf,
    /// Module names excluded from the external count (the testing
    /// framework's own library). Matched by substring, so `pytest`
    /// also excludes `pytest_asyncio`.
    pub framework_exclude: Vec<String>,
}

impl Default for StaticsConfig {
    fn default() -> Self {
        Self {
            library_root: PathBuf::new(),
            framework_exclude: vec!["pytest".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.harness.output.is_none());
        assert_eq!(config.harness.sample_interval_ms, 25);
        assert_eq!(config.churn.commit_window, 75);
        assert_eq!(config.churn.source_ext, "py");
        assert_eq!(config.statics.framework_exclude, vec!["pytest"]);
    }

    #[test]
    fn test_load_default_without_file() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_default(temp.path()).unwrap();
        assert_eq!(config.churn.commit_window, 75);
    }

    #[test]
    fn test_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("testinspect.toml");
        fs::write(
            &path,
            "[harness]\noutput = \"build/profile\"\n\n[churn]\ncommit_window = 10\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(
            config.harness.output,
            Some(PathBuf::from("build/profile"))
        );
        assert_eq!(config.churn.commit_window, 10);
        // Untouched sections keep their defaults.
        assert_eq!(config.churn.source_ext, "py");
    }

    #[test]
    fn test_from_file_missing_errors() {
        let result = Config::from_file("/nonexistent/testinspect.toml");
        assert!(result.is_err());
    }
}
