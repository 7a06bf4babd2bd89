use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Number of output lines kept in a failure summary.
const SUMMARY_LINES: usize = 20;

/// A fully specified external process invocation.
///
/// Every command carries its own working directory and environment; nothing
/// depends on the current directory of the builder process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>, cwd: &Path) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
            env: BTreeMap::new(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base name of the program, e.g. `yarn` for `/usr/bin/yarn`.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Command line rendered for logs and error messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program_name())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to start `{program}` (is it installed?)")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Failed {
        command: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("`{command}` did not finish within {}s", timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },

    #[error("`{command}` produced output that could not be decoded")]
    Decode {
        command: String,
        source: serde_json::Error,
    },
}

impl ExecError {
    /// Human-readable tail of the command's output, used to explain stage
    /// failures. Falls back to the error message when no output was captured.
    pub fn output_summary(&self) -> String {
        match self {
            Self::Failed { stdout, stderr, .. } => {
                let source = if stderr.trim().is_empty() { stdout } else { stderr };
                let lines: Vec<&str> = source.lines().filter(|l| !l.trim().is_empty()).collect();
                if lines.is_empty() {
                    return self.to_string();
                }
                let start = lines.len().saturating_sub(SUMMARY_LINES);
                lines[start..].join("\n")
            }
            other => other.to_string(),
        }
    }
}
