//! Running shell tasks.

use crate::task::TaskConfig;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

/// Result of a task execution.
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Task name.
    pub task_name: String,

    /// Exit code (0 = success, -1 when killed by a signal).
    pub exit_code: i32,

    /// Captured stdout; empty unless the task captured output.
    pub stdout: String,

    /// Captured stderr; empty unless the task captured output.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether execution succeeded.
    pub success: bool,
}

impl TaskResult {
    /// Whether this task passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }
}

/// Something that can run a [`TaskConfig`].
///
/// `Err` means the task could not be run at all (spawn failure, timeout);
/// a command that ran and exited non-zero is an `Ok` with `success == false`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, task: &TaskConfig) -> anyhow::Result<TaskResult>;
}

#[async_trait]
impl<T: CommandRunner + ?Sized> CommandRunner for std::sync::Arc<T> {
    async fn run(&self, task: &TaskConfig) -> anyhow::Result<TaskResult> {
        (**self).run(task).await
    }
}

/// Runs tasks through `sh -c`, since plan commands carry quoting and
/// redirections.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, task: &TaskConfig) -> anyhow::Result<TaskResult> {
        let start = Instant::now();

        if task.command.trim().is_empty() {
            anyhow::bail!("Task {} has empty command", task.name);
        }

        let mut command = Command::new("sh");
        command.arg("-c").arg(&task.command).kill_on_drop(true);
        if task.capture_output {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        let child = command.spawn()?;

        let output = if task.timeout_secs > 0 {
            tokio::time::timeout(
                std::time::Duration::from_secs(task.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "Task {} timed out after {} seconds",
                    task.name,
                    task.timeout_secs
                )
            })??
        } else {
            child.wait_with_output().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);

        Ok(TaskResult {
            task_name: task.name.clone(),
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
            success: output.status.success(),
        })
    }
}
