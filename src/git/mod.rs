//! Git operations: repository discovery plus the line-history CLI contract.

mod linelog;

use std::path::{Path, PathBuf};

use crate::core::{Error, Result};

pub use linelog::{GitCli, LineLogProvider, LineTouches};

/// Git repository wrapper for discovery and validation.
pub struct GitRepo {
    /// The gix repository handle.
    repo: gix::Repository,
    /// Repository root path.
    root: PathBuf,
}

impl GitRepo {
    /// Open a git repository at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let repo =
            gix::open(path).map_err(|e| Error::git(format!("Failed to open repository: {e}")))?;
        let root = repo
            .work_dir()
            .ok_or_else(|| Error::git("Not a work tree"))?
            .to_path_buf();

        Ok(Self { repo, root })
    }

    /// Get the repository root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the HEAD commit SHA.
    pub fn head_sha(&self) -> Result<String> {
        let head = self
            .repo
            .head_id()
            .map_err(|e| Error::git(format!("Failed to get HEAD: {e}")))?;
        Ok(head.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_repo_open_not_a_repo() {
        let temp = tempfile::tempdir().unwrap();
        let result = GitRepo::open(temp.path());
        assert!(result.is_err());
    }
}
