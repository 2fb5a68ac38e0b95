//! Command executor for external tools
//!
//! gRPC stub generation shells out to the protocol-buffer compiler. The
//! executor trait lets the orchestrator be tested without it installed.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::core::error::{Error, Result};

/// Trait for executing external programs
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `program` with `args` in the given working directory
    async fn execute(&self, program: &str, args: &[String], working_dir: &Path)
    -> Result<CommandResult>;
}

/// Result of command execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    /// Check if the command was successful
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Default command executor using tokio::process
#[derive(Debug, Default)]
pub struct ProcessCommandExecutor;

impl ProcessCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for ProcessCommandExecutor {
    async fn execute(
        &self,
        program: &str,
        args: &[String],
        working_dir: &Path,
    ) -> Result<CommandResult> {
        debug!(%program, ?args, dir = %working_dir.display(), "Running command");
        let output = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::ToolMissing(program.to_string()),
                _ => Error::Io(e),
            })?;

        Ok(CommandResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Mock command executor for testing.
///
/// Results are keyed by the full command line (`program arg1 arg2`); every
/// invocation is recorded.
#[cfg(test)]
#[derive(Default)]
pub struct MockCommandExecutor {
    pub results: std::collections::HashMap<String, CommandResult>,
    pub calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockCommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(mut self, command: &str, exit_code: i32, stdout: &str, stderr: &str) -> Self {
        self.results.insert(
            command.to_string(),
            CommandResult {
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl CommandExecutor for MockCommandExecutor {
    async fn execute(
        &self,
        program: &str,
        args: &[String],
        _working_dir: &Path,
    ) -> Result<CommandResult> {
        let command = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(command.clone());
        self.results
            .get(&command)
            .cloned()
            .ok_or(Error::ToolMissing(program.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_executor_success() {
        let executor = ProcessCommandExecutor::new();
        let dir = tempdir().unwrap();

        let result = executor
            .execute("echo", &["hello".to_string()], dir.path())
            .await
            .unwrap();

        assert!(result.is_success());
        assert!(result.stdout.contains("hello"));
        assert!(result.stderr.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_executor_failure_exit_code() {
        let executor = ProcessCommandExecutor::new();
        let dir = tempdir().unwrap();

        let result = executor
            .execute("sh", &["-c".to_string(), "exit 3".to_string()], dir.path())
            .await
            .unwrap();

        assert!(!result.is_success());
        assert_eq!(result.exit_code, 3);
    }

    #[tokio::test]
    async fn test_missing_program_is_tool_missing() {
        let executor = ProcessCommandExecutor::new();
        let dir = tempdir().unwrap();

        let result = executor
            .execute("servicegen-no-such-binary", &[], dir.path())
            .await;
        assert!(matches!(result, Err(Error::ToolMissing(name)) if name == "servicegen-no-such-binary"));
    }

    #[tokio::test]
    async fn test_mock_command_executor() {
        let executor = MockCommandExecutor::new()
            .with_result("protoc --version", 0, "libprotoc 25.1", "")
            .with_result("protoc bad.proto", 1, "", "error");
        let dir = tempdir().unwrap();

        let result = executor
            .execute("protoc", &["--version".to_string()], dir.path())
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.stdout, "libprotoc 25.1");

        let result = executor
            .execute("protoc", &["bad.proto".to_string()], dir.path())
            .await
            .unwrap();
        assert_eq!(result.stderr, "error");

        assert_eq!(executor.calls(), vec!["protoc --version", "protoc bad.proto"]);
    }
}
