//! Host test-tool integration.
//!
//! The harness assumes no particular hosting framework; it only needs a
//! way to run one collected test. Embedding hosts implement [`HostRunner`]
//! directly; the CLI uses [`ShellRunner`] with a command template.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::core::{Result, TestItem, TestStatus};

/// Runs exactly one test through the hosting tool's single-test path.
pub trait HostRunner: Send + Sync {
    /// Execute the test. Pass/fail is the host's verdict, never an error
    /// of the harness.
    fn run_single(&self, item: &TestItem) -> Result<TestStatus>;
}

/// Runner that invokes a shell command template, substituting `{id}` with
/// the test's node id. Output is discarded; the worker protocol owns
/// stdout.
pub struct ShellRunner {
    template: String,
    working_dir: Option<PathBuf>,
}

impl ShellRunner {
    /// Create a runner with the given command template.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            working_dir: None,
        }
    }

    /// Set the working directory for the command.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl HostRunner for ShellRunner {
    fn run_single(&self, item: &TestItem) -> Result<TestStatus> {
        let command = self.template.replace("{id}", &item.node_id);

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.args(["/C", &command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", &command]);
            c
        };

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        // A command that cannot even spawn is still a test outcome, not a
        // harness failure.
        match cmd.status() {
            Ok(status) if status.success() => Ok(TestStatus::Passed),
            Ok(_) => Ok(TestStatus::Failed),
            Err(_) => Ok(TestStatus::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CallableId;
    use std::path::PathBuf;

    fn item(node_id: &str) -> TestItem {
        TestItem {
            node_id: node_id.to_string(),
            callable: CallableId::new(node_id),
            file: PathBuf::from("test.py"),
            line: 1,
        }
    }

    #[test]
    fn test_passing_command() {
        let runner = ShellRunner::new("true");
        assert_eq!(runner.run_single(&item("t::a")).unwrap(), TestStatus::Passed);
    }

    #[test]
    fn test_failing_command() {
        let runner = ShellRunner::new("false");
        assert_eq!(runner.run_single(&item("t::a")).unwrap(), TestStatus::Failed);
    }

    #[test]
    fn test_template_substitution() {
        // The node id lands in the command line; a grep for it succeeds.
        let runner = ShellRunner::new("echo {id} | grep -q t::needle");
        assert_eq!(
            runner.run_single(&item("t::needle")).unwrap(),
            TestStatus::Passed
        );
        assert_eq!(
            runner.run_single(&item("t::other")).unwrap(),
            TestStatus::Failed
        );
    }
}
