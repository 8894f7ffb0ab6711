//! The process execution seam.

use std::fmt;
use std::time::Duration;

use super::command::CommandSpec;

/// Where a command runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement<'a> {
    /// The root namespace: switches, bridges and the emulation plumbing
    Root,
    /// Inside the named host's namespace
    Host(&'a str),
}

impl fmt::Display for Placement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Root => write!(f, "root"),
            Placement::Host(name) => write!(f, "{}", name),
        }
    }
}

/// Identifier of a detached process, valid until it is stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle(pub u64);

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Captured result of a blocking command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if terminated by a signal
    pub status: Option<i32>,
    /// Standard output followed by standard error
    pub text: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Errors raised by a `ProcessExecutor`
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Failed to launch '{command}' on {placement}: {source}")]
    Launch {
        command: String,
        placement: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{command}' on {placement} exited with status {status:?}")]
    Failed {
        command: String,
        placement: String,
        status: Option<i32>,
    },

    #[error("No such process: {0}")]
    NoSuchProcess(ProcessHandle),

    #[error("Failed to stop process {handle}: {source}")]
    Stop {
        handle: ProcessHandle,
        #[source]
        source: std::io::Error,
    },
}

/// Runs commands on the emulated network's nodes.
///
/// Implementations must be safe to share across the single control thread
/// and the helper threads they spawn themselves.
pub trait ProcessExecutor: Send + Sync {
    /// Run `command` to completion and return its captured text
    fn run(&self, placement: Placement<'_>, command: &CommandSpec) -> Result<CommandOutput, ExecError>;

    /// Start `command` in the background
    fn spawn(&self, placement: Placement<'_>, command: &CommandSpec) -> Result<ProcessHandle, ExecError>;

    /// Block until the detached process prints a line containing `marker`,
    /// or `timeout` elapses. Returns whether the marker was seen.
    fn wait_for_output(
        &self,
        handle: ProcessHandle,
        marker: &str,
        timeout: Duration,
    ) -> Result<bool, ExecError>;

    /// Stop a detached process and release its handle
    fn stop(&self, handle: ProcessHandle) -> Result<(), ExecError>;

    /// Run `command` and turn a non-zero exit into `ExecError::Failed`
    fn run_checked(
        &self,
        placement: Placement<'_>,
        command: &CommandSpec,
    ) -> Result<CommandOutput, ExecError> {
        let output = self.run(placement, command)?;
        if output.success() {
            Ok(output)
        } else {
            Err(ExecError::Failed {
                command: command.to_string(),
                placement: placement.to_string(),
                status: output.status,
            })
        }
    }
}
