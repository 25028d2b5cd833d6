//! Static lint gate for generated code.
//!
//! The default linter writes the code to a temporary `.py` file and runs
//! `ruff check` on it. Output is rewritten so reports refer to `code.py`
//! rather than the temporary path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Name substituted for the scratch file path in linter output.
pub const REPORTED_FILE_NAME: &str = "code.py";

/// Captured linter output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintOutput {
    /// Standard output of the linter.
    pub out: String,
    /// Standard error of the linter.
    pub error: String,
    /// Whether the linter exited successfully.
    pub success: bool,
}

impl LintOutput {
    /// A result with no findings.
    #[must_use]
    pub fn clean() -> Self {
        Self { out: String::new(), error: String::new(), success: true }
    }

    /// A failing result with the given error text.
    #[must_use]
    pub fn failed(error: impl Into<String>, out: impl Into<String>) -> Self {
        Self { out: out.into(), error: error.into(), success: false }
    }

    /// Returns `true` if the linter reported a problem.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.success || !self.error.trim().is_empty()
    }

    /// Text of the review message appended to the conversation.
    #[must_use]
    pub fn report(&self) -> String {
        format!("{}\n\nOutput:\n{}", self.error, self.out)
    }
}

/// Errors raised while running a linter.
#[derive(Debug, Error)]
pub enum LintError {
    /// The scratch file could not be written.
    #[error("Failed to write scratch file: {0}")]
    Scratch(#[from] std::io::Error),

    /// The linter process could not be started.
    #[error("Failed to run linter '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// A static checker over source text.
#[async_trait]
pub trait Linter: Send + Sync {
    /// Lints `code`.
    ///
    /// # Errors
    /// Returns a `LintError` if the linter could not be run. Findings are not
    /// errors; they are reported through [`LintOutput`].
    async fn lint(&self, code: &str) -> Result<LintOutput, LintError>;
}

/// Runs an external command with the scratch file path as its last argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLinter {
    program: String,
    args: Vec<String>,
}

impl CommandLinter {
    /// Creates a linter running `program args... <file>`.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// `ruff check <file>`.
    #[must_use]
    pub fn ruff() -> Self {
        Self::new("ruff", vec!["check".to_string()])
    }
}

impl Default for CommandLinter {
    fn default() -> Self {
        Self::ruff()
    }
}

#[async_trait]
impl Linter for CommandLinter {
    async fn lint(&self, code: &str) -> Result<LintOutput, LintError> {
        let mut scratch = tempfile::Builder::new().prefix("graphwright-").suffix(".py").tempfile()?;
        scratch.write_all(code.as_bytes())?;
        scratch.flush()?;

        let path = scratch.path().to_string_lossy().into_owned();
        debug!(program = %self.program, path = %path, "Running linter");

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&path)
            .output()
            .await
            .map_err(|source| LintError::Spawn { program: self.program.clone(), source })?;

        let out = String::from_utf8_lossy(&output.stdout).replace(&path, REPORTED_FILE_NAME);
        let error = String::from_utf8_lossy(&output.stderr).replace(&path, REPORTED_FILE_NAME);

        debug!(
            program = %self.program,
            success = output.status.success(),
            stdout_len = out.len(),
            stderr_len = error.len(),
            "Linter finished"
        );

        Ok(LintOutput { out, error, success: output.status.success() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_errors() {
        assert!(!LintOutput::clean().has_errors());
        assert!(LintOutput::failed("", "code.py:1:1: F401").has_errors());
        assert!(LintOutput { out: String::new(), error: "warning".to_string(), success: true }.has_errors());
        assert!(!LintOutput { out: String::new(), error: "  \n".to_string(), success: true }.has_errors());
    }

    #[test]
    fn test_report_layout() {
        let output = LintOutput::failed("E999 SyntaxError", "Found 1 error.");
        assert_eq!(output.report(), "E999 SyntaxError\n\nOutput:\nFound 1 error.");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_linter_rewrites_scratch_path() {
        let linter = CommandLinter::new(
            "sh",
            vec!["-c".to_string(), "echo \"$0:1:1: E999 bad\" >&2; exit 1".to_string()],
        );

        let output = linter.lint("def broken(:\n").await.unwrap();
        assert!(output.has_errors());
        assert_eq!(output.error.trim(), "code.py:1:1: E999 bad");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_linter_sees_code() {
        let linter = CommandLinter::new("sh", vec!["-c".to_string(), "cat \"$0\"".to_string()]);

        let output = linter.lint("x = 1\n").await.unwrap();
        assert!(!output.has_errors());
        assert_eq!(output.out, "x = 1\n");
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let linter = CommandLinter::new("graphwright-no-such-linter", Vec::new());
        let err = linter.lint("x = 1").await.unwrap_err();
        assert!(matches!(err, LintError::Spawn { .. }));
    }
}
