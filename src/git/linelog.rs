//! Line-history queries against the `git` command-line tool.
//!
//! Churn analysis consumes git as an external tool contract: a diff of
//! changed files between two points in history, and a per-line commit log.
//! The exact stderr text git emits when a line number exceeds the file
//! length is the per-file termination condition.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::core::{Error, Result};

use super::GitRepo;

/// Answer to a single-line history query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTouches {
    /// Number of commits in the window that modified the line.
    Count(u32),
    /// The file has fewer lines than the queried number.
    PastEndOfFile,
}

/// Queryable per-line commit history over a bounded commit window.
pub trait LineLogProvider {
    /// Files that differ between `HEAD~window` and `HEAD`, repo-relative.
    fn changed_files(&self, window: u32) -> Result<Vec<PathBuf>>;

    /// How many distinct commits within the window touched `line` of
    /// `file`. Lines are 1-based.
    fn touches(&self, file: &Path, line: u32, window: u32) -> Result<LineTouches>;
}

/// Provider shelling out to the `git` CLI.
pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    /// Create a provider rooted at an already-known work tree.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Discover the enclosing repository and root the provider at its
    /// work tree.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self> {
        let repo = GitRepo::open(path)?;
        Ok(Self::new(repo.root()))
    }

    /// The work tree the provider runs in.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn git(&self, args: &[&str]) -> Result<std::process::Output> {
        Ok(Command::new("git")
            .arg("--no-pager")
            .args(args)
            .current_dir(&self.workdir)
            .output()?)
    }
}

impl LineLogProvider for GitCli {
    fn changed_files(&self, window: u32) -> Result<Vec<PathBuf>> {
        let range = format!("HEAD~{window}..HEAD");
        let out = self.git(&["diff", "--name-only", &range])?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(Error::git(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&out.stdout)
            .lines()
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .collect())
    }

    fn touches(&self, file: &Path, line: u32, window: u32) -> Result<LineTouches> {
        let spec = format!("{line},{line}:{}", file.display());
        let range = format!("HEAD~{window}..HEAD");
        let out = self.git(&["log", "-L", &spec, "--no-patch", &range])?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            if stderr == past_end_message(file, line) {
                return Ok(LineTouches::PastEndOfFile);
            }
            return Err(Error::git(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&out.stdout);
        Ok(LineTouches::Count(count_commit_headers(&stdout)))
    }
}

/// The stderr text git emits when `line` is past the end of `file`.
///
/// Scanning starts at line 1 and advances one line at a time, so by the
/// time the query fails the file is known to have exactly `line - 1` lines.
fn past_end_message(file: &Path, line: u32) -> String {
    format!(
        "fatal: file {} has only {} lines\n",
        file.display(),
        line - 1
    )
}

/// Number of `commit` header lines in `git log` output.
fn count_commit_headers(stdout: &str) -> u32 {
    stdout.lines().filter(|l| l.starts_with("commit")).count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_commit_headers() {
        let log = "commit 4f2a9c0d\nAuthor: A <a@example.com>\nDate: now\n\n    foo\n\ncommit 77bd3e11\nAuthor: B <b@example.com>\nDate: then\n\n    bar\n";
        assert_eq!(count_commit_headers(log), 2);
    }

    #[test]
    fn test_count_commit_headers_empty() {
        assert_eq!(count_commit_headers(""), 0);
    }

    #[test]
    fn test_past_end_message_format() {
        let msg = past_end_message(Path::new("foo.py"), 4);
        assert_eq!(msg, "fatal: file foo.py has only 3 lines\n");
    }
}
