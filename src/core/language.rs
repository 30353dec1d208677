//! Language detection for test source files.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Languages the static extractor can parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Rust,
    Go,
    JavaScript,
    TypeScript,
}

impl Language {
    /// Detect the language from a file extension.
    pub fn detect(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "py" => Some(Self::Python),
            "rs" => Some(Self::Rust),
            "go" => Some(Self::Go),
            "js" | "mjs" | "cjs" => Some(Self::JavaScript),
            "ts" | "mts" => Some(Self::TypeScript),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Python => "python",
            Self::Rust => "rust",
            Self::Go => "go",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(Language::detect(Path::new("test_foo.py")), Some(Language::Python));
        assert_eq!(Language::detect(Path::new("lib.rs")), Some(Language::Rust));
        assert_eq!(Language::detect(Path::new("main_test.go")), Some(Language::Go));
        assert_eq!(Language::detect(Path::new("foo.spec.ts")), Some(Language::TypeScript));
        assert_eq!(Language::detect(Path::new("foo.test.js")), Some(Language::JavaScript));
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(Language::detect(Path::new("README.md")), None);
        assert_eq!(Language::detect(&PathBuf::from("Makefile")), None);
    }
}
