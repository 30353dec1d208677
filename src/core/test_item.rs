//! Test item identity and the host collection manifest.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::Result;

/// Stable identity of the callable underlying one or more test items.
///
/// Parametrized instances of the same test function share one `CallableId`,
/// so per-function records are computed once and referenced by every
/// instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallableId(String);

impl CallableId {
    /// Create a new callable identity.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single collected test, as reported by the hosting test tool.
///
/// Read-only to this system; identity and ordering are the host's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestItem {
    /// Unique node id of this test instance (includes parametrization).
    pub node_id: String,
    /// Identity of the underlying callable.
    pub callable: CallableId,
    /// Source file the test is defined in.
    pub file: PathBuf,
    /// 1-based line of the definition.
    pub line: u32,
}

/// Outcome of running one test through the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    /// The host could not execute the test at all.
    Error,
}

/// Collected test items handed over by the host, plus the number of
/// collection-time errors it encountered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestManifest {
    pub items: Vec<TestItem>,
    #[serde(default)]
    pub collection_errors: usize,
}

impl TestManifest {
    /// Load a manifest from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callable_id_shared_across_instances() {
        let a = CallableId::new("tests/test_foo.py::test_bar");
        let b = CallableId::new("tests/test_foo.py::test_bar");
        assert_eq!(a, b);
    }

    #[test]
    fn test_manifest_round_trip() {
        let manifest = TestManifest {
            items: vec![TestItem {
                node_id: "tests/test_foo.py::test_bar[1]".to_string(),
                callable: CallableId::new("tests/test_foo.py::test_bar"),
                file: PathBuf::from("tests/test_foo.py"),
                line: 12,
            }],
            collection_errors: 0,
        };

        let json = serde_json::to_string(&manifest).unwrap();
        let parsed: TestManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].line, 12);
        assert_eq!(parsed.items[0].callable.as_str(), "tests/test_foo.py::test_bar");
    }

    #[test]
    fn test_manifest_collection_errors_default_to_zero() {
        let parsed: TestManifest = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert_eq!(parsed.collection_errors, 0);
    }

    #[test]
    fn test_manifest_load_missing_file() {
        let result = TestManifest::load("/nonexistent/manifest.json");
        assert!(result.is_err());
    }
}
