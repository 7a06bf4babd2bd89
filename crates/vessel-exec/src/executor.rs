use std::process::Stdio;

use crate::command::{CommandOutput, CommandSpec, ExecError};

/// Abstraction over external process execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait CommandExecutor: Send + Sync {
    /// Run a command to completion and capture its output.
    ///
    /// A non-zero exit status is an error carrying the captured output.
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, ExecError>;
}

/// Executes commands with `tokio::process`.
pub struct RealExecutor;

impl CommandExecutor for RealExecutor {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, ExecError> {
        let rendered = command.display();
        tracing::debug!(command = %rendered, cwd = %command.cwd.display(), "running");

        let child = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.cwd)
            .envs(&command.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecError::Spawn {
                program: command.program_name(),
                source: e,
            })?;

        let output = match command.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_elapsed| ExecError::TimedOut {
                    command: rendered.clone(),
                    timeout: limit,
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| ExecError::Spawn {
            program: command.program_name(),
            source: e,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            Err(ExecError::Failed {
                command: rendered,
                status: output.status.to_string(),
                stdout,
                stderr,
            })
        }
    }
}
