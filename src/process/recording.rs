//! Executor that records commands instead of running them.
//!
//! Backs `--dry-run` and the test suites. Blocking commands are answered by
//! an optional responder that sees the command and everything issued before
//! it; without one, every command succeeds with empty output.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use log::info;

use super::command::CommandSpec;
use super::executor::{CommandOutput, ExecError, Placement, ProcessExecutor, ProcessHandle};

/// A command as seen by the recording executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCommand {
    /// Host name, `None` for the root namespace
    pub host: Option<String>,
    pub command: CommandSpec,
    /// Set for detached commands
    pub handle: Option<ProcessHandle>,
}

impl IssuedCommand {
    pub fn on_host(&self, host: &str) -> bool {
        self.host.as_deref() == Some(host)
    }

    pub fn is(&self, program: &str) -> bool {
        self.command.program() == program
    }
}

/// Computes the output of a blocking command from the command and the history before it
pub type Responder = Box<dyn Fn(&IssuedCommand, &[IssuedCommand]) -> Option<CommandOutput> + Send + Sync>;

#[derive(Default)]
pub struct RecordingExecutor {
    issued: Mutex<Vec<IssuedCommand>>,
    live: Mutex<HashSet<ProcessHandle>>,
    stopped: Mutex<Vec<ProcessHandle>>,
    next_id: AtomicU64,
    responder: Option<Responder>,
    log_commands: bool,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer blocking commands through `responder`
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&IssuedCommand, &[IssuedCommand]) -> Option<CommandOutput> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Log every command at info level as it is issued
    pub fn logging(mut self, enabled: bool) -> Self {
        self.log_commands = enabled;
        self
    }

    /// Every command issued so far, in order
    pub fn issued(&self) -> Vec<IssuedCommand> {
        self.issued.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Handles stopped so far, in order
    pub fn stopped(&self) -> Vec<ProcessHandle> {
        self.stopped.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn record(&self, placement: Placement<'_>, command: &CommandSpec, handle: Option<ProcessHandle>) -> (IssuedCommand, Vec<IssuedCommand>) {
        if self.log_commands {
            info!("[{}] {}", placement, command);
        }
        let entry = IssuedCommand {
            host: match placement {
                Placement::Root => None,
                Placement::Host(name) => Some(name.to_string()),
            },
            command: command.clone(),
            handle,
        };
        let mut issued = self.issued.lock().unwrap_or_else(|p| p.into_inner());
        let history = issued.clone();
        issued.push(entry.clone());
        (entry, history)
    }
}

impl ProcessExecutor for RecordingExecutor {
    fn run(&self, placement: Placement<'_>, command: &CommandSpec) -> Result<CommandOutput, ExecError> {
        let (entry, history) = self.record(placement, command, None);
        let output = self
            .responder
            .as_ref()
            .and_then(|respond| respond(&entry, &history))
            .unwrap_or(CommandOutput { status: Some(0), text: String::new() });
        Ok(output)
    }

    fn spawn(&self, placement: Placement<'_>, command: &CommandSpec) -> Result<ProcessHandle, ExecError> {
        let handle = ProcessHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.record(placement, command, Some(handle));
        self.live.lock().unwrap_or_else(|p| p.into_inner()).insert(handle);
        Ok(handle)
    }

    fn wait_for_output(&self, handle: ProcessHandle, _marker: &str, _timeout: Duration) -> Result<bool, ExecError> {
        if self.live.lock().unwrap_or_else(|p| p.into_inner()).contains(&handle) {
            Ok(true)
        } else {
            Err(ExecError::NoSuchProcess(handle))
        }
    }

    fn stop(&self, handle: ProcessHandle) -> Result<(), ExecError> {
        if !self.live.lock().unwrap_or_else(|p| p.into_inner()).remove(&handle) {
            return Err(ExecError::NoSuchProcess(handle));
        }
        self.stopped.lock().unwrap_or_else(|p| p.into_inner()).push(handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order() {
        let exec = RecordingExecutor::new();
        exec.run(Placement::Root, &CommandSpec::new("ovs-vsctl").arg("show")).unwrap();
        let handle = exec
            .spawn(Placement::Host("h1"), &CommandSpec::new("tcpdump").detached())
            .unwrap();

        let issued = exec.issued();
        assert_eq!(issued.len(), 2);
        assert!(issued[0].host.is_none());
        assert!(issued[1].on_host("h1"));
        assert_eq!(issued[1].handle, Some(handle));
    }

    #[test]
    fn test_responder_sees_history() {
        let exec = RecordingExecutor::new().with_responder(|cmd, history| {
            cmd.is("ping").then(|| CommandOutput {
                status: Some(0),
                text: format!("{} earlier", history.len()),
            })
        });
        exec.run(Placement::Root, &CommandSpec::new("true")).unwrap();
        let out = exec.run(Placement::Host("h3"), &CommandSpec::new("ping")).unwrap();
        assert_eq!(out.text, "1 earlier");
    }

    #[test]
    fn test_stop_twice_reports_missing_process() {
        let exec = RecordingExecutor::new();
        let handle = exec
            .spawn(Placement::Host("h1"), &CommandSpec::new("iperf3").detached())
            .unwrap();
        assert!(exec.wait_for_output(handle, "Server listening", Duration::ZERO).unwrap());
        exec.stop(handle).unwrap();
        assert!(matches!(exec.stop(handle), Err(ExecError::NoSuchProcess(_))));
        assert_eq!(exec.stopped(), vec![handle]);
    }
}
