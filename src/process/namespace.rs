//! Real process execution on Linux network namespaces.
//!
//! Host commands are wrapped in `ip netns exec {host}`; root commands run
//! directly. Detached processes are tracked by handle, and their output is
//! drained on helper threads so readiness markers can be awaited.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use super::command::CommandSpec;
use super::executor::{CommandOutput, ExecError, Placement, ProcessExecutor, ProcessHandle};

/// How long a stopped process gets to exit after SIGTERM before it is killed
const STOP_GRACE: Duration = Duration::from_secs(1);

struct Tracked {
    child: Child,
    description: String,
    lines: Receiver<String>,
}

/// Executor that launches real processes
#[derive(Default)]
pub struct NamespaceExecutor {
    next_id: AtomicU64,
    running: Mutex<HashMap<u64, Tracked>>,
}

impl NamespaceExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn command(placement: Placement<'_>, spec: &CommandSpec) -> Command {
        match placement {
            Placement::Root => {
                let mut cmd = Command::new(spec.program());
                cmd.args(spec.arguments());
                cmd
            }
            Placement::Host(host) => {
                let mut cmd = Command::new("ip");
                cmd.args(["netns", "exec", host, spec.program()]);
                cmd.args(spec.arguments());
                cmd
            }
        }
    }

    fn forward_lines<R: Read + Send + 'static>(stream: R, tx: Sender<String>) {
        thread::spawn(move || {
            for line in BufReader::new(stream).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    }

    fn terminate(handle: ProcessHandle, tracked: &mut Tracked) -> Result<(), ExecError> {
        if let Ok(Some(_)) = tracked.child.try_wait() {
            return Err(ExecError::NoSuchProcess(handle));
        }

        // SIGTERM first so capture tools can flush their output files
        let _ = Command::new("kill")
            .args(["-TERM", &tracked.child.id().to_string()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        let deadline = Instant::now() + STOP_GRACE;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = tracked.child.try_wait() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(20));
        }

        tracked
            .child
            .kill()
            .map_err(|source| ExecError::Stop { handle, source })?;
        let _ = tracked.child.wait();
        Ok(())
    }
}

impl ProcessExecutor for NamespaceExecutor {
    fn run(&self, placement: Placement<'_>, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
        debug!("[{}] {}", placement, spec);
        let output = Self::command(placement, spec)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ExecError::Launch {
                command: spec.to_string(),
                placement: placement.to_string(),
                source,
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(CommandOutput { status: output.status.code(), text })
    }

    fn spawn(&self, placement: Placement<'_>, spec: &CommandSpec) -> Result<ProcessHandle, ExecError> {
        debug!("[{}] {} (detached)", placement, spec);
        let mut child = Self::command(placement, spec)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecError::Launch {
                command: spec.to_string(),
                placement: placement.to_string(),
                source,
            })?;

        let (tx, rx) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            Self::forward_lines(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            Self::forward_lines(stderr, tx);
        }

        let handle = ProcessHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let tracked = Tracked {
            child,
            description: format!("[{}] {}", placement, spec),
            lines: rx,
        };
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(handle.0, tracked);
        Ok(handle)
    }

    fn wait_for_output(
        &self,
        handle: ProcessHandle,
        marker: &str,
        timeout: Duration,
    ) -> Result<bool, ExecError> {
        let running = self.running.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let tracked = running.get(&handle.0).ok_or(ExecError::NoSuchProcess(handle))?;

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            match tracked.lines.recv_timeout(remaining) {
                Ok(line) if line.contains(marker) => return Ok(true),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => return Ok(false),
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("{} closed its output before printing '{}'", tracked.description, marker);
                    return Ok(false);
                }
            }
        }
    }

    fn stop(&self, handle: ProcessHandle) -> Result<(), ExecError> {
        let tracked = self
            .running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&handle.0);
        let mut tracked = tracked.ok_or(ExecError::NoSuchProcess(handle))?;
        debug!("Stopping {} {}", handle, tracked.description);
        Self::terminate(handle, &mut tracked)
    }
}

impl Drop for NamespaceExecutor {
    fn drop(&mut self) {
        let running = self.running.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        for (id, mut tracked) in running.drain() {
            if let Ok(None) = tracked.child.try_wait() {
                warn!("Killing leftover process {}", tracked.description);
                let _ = tracked.child.kill();
                let _ = tracked.child.wait();
            }
            debug!("Released handle #{}", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_command_output() {
        let exec = NamespaceExecutor::new();
        let output = exec
            .run(Placement::Root, &CommandSpec::new("echo").arg("hello"))
            .unwrap();
        assert!(output.success());
        assert_eq!(output.text.trim(), "hello");
    }

    #[test]
    fn test_launch_failure() {
        let exec = NamespaceExecutor::new();
        let err = exec
            .run(Placement::Root, &CommandSpec::new("/nonexistent/loopsim-tool"))
            .unwrap_err();
        assert!(matches!(err, ExecError::Launch { .. }));
    }

    #[test]
    fn test_detached_marker_and_stop() {
        let exec = NamespaceExecutor::new();
        let spec = CommandSpec::new("sh")
            .args(["-c", "echo listening on lo >&2; sleep 30"])
            .detached();
        let handle = exec.spawn(Placement::Root, &spec).unwrap();
        assert!(exec
            .wait_for_output(handle, "listening on", Duration::from_secs(5))
            .unwrap());
        exec.stop(handle).unwrap();
        assert!(matches!(exec.stop(handle), Err(ExecError::NoSuchProcess(_))));
    }
}
