//! Repeated reachability and throughput trials.
//!
//! A reachability trial starts one capture per endpoint, waits until both
//! are listening, probes synchronously, then stops the captures by handle.
//! Trials of one test are separated by the configured interval.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::capture;
use super::pacer::Pacer;
use crate::analysis::{analyze, render_summary, TestSummary, ThroughputRecord, TrialResult};
use crate::config::HarnessSettings;
use crate::emulation::{HostHandle, Network};
use crate::process::{tools, ExecError, ProcessHandle};
use crate::topology::TopologyError;

/// Errors that abort a test
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("Host {0} has no address to probe")]
    NoAddress(String),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct MeasurementHarness<'a> {
    settings: &'a HarnessSettings,
    capture_dir: PathBuf,
    pacer: &'a dyn Pacer,
}

impl<'a> MeasurementHarness<'a> {
    pub fn new(settings: &'a HarnessSettings, capture_dir: impl Into<PathBuf>, pacer: &'a dyn Pacer) -> Self {
        Self {
            settings,
            capture_dir: capture_dir.into(),
            pacer,
        }
    }

    pub fn capture_dir(&self) -> &Path {
        &self.capture_dir
    }

    /// Probe `target` from `source` `attempts` times and summarize the trials
    pub fn run_test(
        &self,
        network: &Network<'_>,
        source: &str,
        target: &str,
        name: &str,
        label: &str,
    ) -> Result<TestSummary, HarnessError> {
        let src = network.host(source)?;
        let dst = network.host(target)?;
        let target_ip = dst.ip().ok_or_else(|| HarnessError::NoAddress(target.to_string()))?;

        info!("--- {} ({} -> {} at {}) ---", name, source, target, target_ip);

        let attempts = self.settings.attempts;
        let mut trials = Vec::with_capacity(attempts as usize);
        for attempt in 1..=attempts {
            info!("Attempt {}/{}", attempt, attempts);

            let src_file = capture::source_capture(&self.capture_dir, source, target, attempt, label);
            let dst_file = capture::target_capture(&self.capture_dir, source, target, attempt, label);
            let captures = [self.start_capture(&src, &src_file), self.start_capture(&dst, &dst_file)];

            let output = match src.run(&tools::ping(target_ip, self.settings.probe_count)) {
                Ok(output) => output.text,
                Err(e) => {
                    warn!("Probe from {} failed to launch: {}", source, e);
                    String::new()
                }
            };

            for (host, handle) in [(&src, captures[0]), (&dst, captures[1])] {
                if let Some(handle) = handle {
                    stop_quietly(host, handle);
                }
            }

            let trial = analyze(&output);
            log_trial(attempt, &trial);
            debug!("{}", output.trim_end());

            let path = capture::transcript(&self.capture_dir, source, target, attempt, label);
            fs::write(&path, &output).map_err(|source| HarnessError::Io { path, source })?;
            trials.push(trial);

            if attempt < attempts {
                info!("Waiting {:?} before next attempt", self.settings.inter_trial_interval);
                self.pacer.pause(self.settings.inter_trial_interval);
            }
        }

        let summary = TestSummary::from_trials(name, source, target, trials);
        info!("\n{}", render_summary(&summary));
        Ok(summary)
    }

    /// Start `iperf3 -s` on `server`, run the client on `client` for the
    /// configured duration, then stop the server. Output is kept raw.
    pub fn run_throughput(
        &self,
        network: &Network<'_>,
        server: &str,
        client: &str,
        name: &str,
    ) -> Result<ThroughputRecord, HarnessError> {
        let srv = network.host(server)?;
        let cli = network.host(client)?;
        let server_ip = srv.ip().ok_or_else(|| HarnessError::NoAddress(server.to_string()))?;
        let duration = self.settings.throughput_duration;

        info!("--- {}: {} (server) <-> {} (client), {:?} ---", name, server, client, duration);

        let handle = match srv.spawn(&tools::iperf3_server()) {
            Ok(handle) => {
                match srv.wait_for_output(handle, tools::IPERF_READY_MARKER, self.settings.server_ready_timeout) {
                    Ok(true) => {}
                    Ok(false) => warn!("iperf3 server on {} not ready after {:?}", server, self.settings.server_ready_timeout),
                    Err(e) => warn!("iperf3 server on {} exited early: {}", server, e),
                }
                Some(handle)
            }
            Err(e) => {
                warn!("Failed to start iperf3 server on {}: {}", server, e);
                None
            }
        };

        let (completed, raw_output) = match cli.run(&tools::iperf3_client(server_ip, duration)) {
            Ok(output) => (output.success(), output.text),
            Err(e) => {
                warn!("iperf3 client on {} failed to launch: {}", client, e);
                (false, String::new())
            }
        };

        if let Some(handle) = handle {
            stop_quietly(&srv, handle);
        }

        info!("{}", raw_output.trim_end());
        Ok(ThroughputRecord {
            test_name: name.to_string(),
            server: server.to_string(),
            client: client.to_string(),
            duration,
            completed,
            raw_output,
        })
    }

    /// Spawn a capture on the host's first interface and wait until it is
    /// listening. Returns `None` if it could not be started.
    fn start_capture(&self, host: &HostHandle<'_>, file: &Path) -> Option<ProcessHandle> {
        let command = tools::tcpdump(host.interface(), file, &self.settings.capture_filter);
        let handle = match host.spawn(&command) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Failed to start capture on {}: {}", host.name(), e);
                return None;
            }
        };

        match host.wait_for_output(handle, tools::TCPDUMP_READY_MARKER, self.settings.capture_ready_timeout) {
            Ok(true) => debug!("Capture on {} listening", host.name()),
            Ok(false) => warn!(
                "Capture on {} not ready after {:?}, continuing",
                host.name(),
                self.settings.capture_ready_timeout
            ),
            Err(e) => warn!("Capture on {} exited early: {}", host.name(), e),
        }
        Some(handle)
    }
}

fn stop_quietly(host: &HostHandle<'_>, handle: ProcessHandle) {
    match host.stop(handle) {
        Ok(()) => {}
        Err(ExecError::NoSuchProcess(_)) => debug!("Process {} on {} already gone", handle, host.name()),
        Err(e) => debug!("Failed to stop {} on {}: {}", handle, host.name(), e),
    }
}

fn log_trial(attempt: u32, trial: &TrialResult) {
    match (trial.is_reachable(), trial.latency_ms, trial.reason) {
        (true, Some(ms), _) => info!("Attempt {}: reachable, avg {:.3} ms", attempt, ms),
        (true, None, _) => info!("Attempt {}: reachable, latency unavailable", attempt),
        (false, _, Some(reason)) => info!("Attempt {}: unreachable ({})", attempt, reason),
        (false, _, None) => info!("Attempt {}: unreachable", attempt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Outcome;
    use crate::harness::pacer::Immediate;
    use crate::process::{CommandOutput, RecordingExecutor};
    use crate::topology::loop_topology;
    use std::time::Duration;
    use tempfile::TempDir;

    const REPLY: &str = "4 packets transmitted, 4 received, 0% packet loss, time 3004ms
rtt min/avg/max/mdev = 24.213/24.712/26.104/0.803 ms
";

    fn pinging(text: &'static str) -> RecordingExecutor {
        RecordingExecutor::new().with_responder(move |cmd, _| {
            cmd.is("ping").then(|| CommandOutput { status: Some(0), text: text.to_string() })
        })
    }

    #[test]
    fn test_trial_sequence() {
        let topo = loop_topology().unwrap();
        let exec = pinging(REPLY);
        let net = Network::new(&topo, &exec);
        let dir = TempDir::new().unwrap();
        let settings = HarnessSettings::default();
        let pacer = Immediate::new();
        let harness = MeasurementHarness::new(&settings, dir.path(), &pacer);

        let summary = harness.run_test(&net, "h3", "h1", "Ping h1 from h3", "with_stp").unwrap();
        assert_eq!(summary.trials.len(), 3);
        assert!(summary.trials.iter().all(|t| t.outcome == Outcome::Reachable));
        assert_eq!(summary.success_rate, 100.0);
        assert_eq!(pacer.pauses(), vec![Duration::from_secs(30); 2]);

        let issued = exec.issued();
        // Per attempt: two captures, the probe
        assert_eq!(issued.len(), 9);
        let first = &issued[..3];
        assert!(first[0].is("tcpdump") && first[0].on_host("h3"));
        assert!(first[1].is("tcpdump") && first[1].on_host("h1"));
        assert_eq!(first[2].command.to_string(), "ping -c 4 10.0.0.2");
        assert!(first[0].command.has_arg("h3-eth0"));
        assert!(first[0]
            .command
            .has_arg(&dir.path().join("h3_to_h1_attempt1_with_stp.pcap").to_string_lossy()));

        // Both captures of every attempt are stopped by handle
        let handles: Vec<_> = issued.iter().filter_map(|c| c.handle).collect();
        assert_eq!(exec.stopped(), handles);

        for attempt in 1..=3 {
            let path = dir.path().join(format!("h3_to_h1_attempt{}_with_stp.ping.txt", attempt));
            assert_eq!(fs::read_to_string(path).unwrap(), REPLY);
        }
    }

    #[test]
    fn test_single_attempt_does_not_pause() {
        let topo = loop_topology().unwrap();
        let exec = pinging("4 packets transmitted, 0 received, 100% packet loss");
        let net = Network::new(&topo, &exec);
        let dir = TempDir::new().unwrap();
        let settings = HarnessSettings { attempts: 1, ..Default::default() };
        let pacer = Immediate::new();
        let harness = MeasurementHarness::new(&settings, dir.path(), &pacer);

        let summary = harness.run_test(&net, "h8", "h2", "Ping h2 from h8", "without_stp").unwrap();
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.mean_latency_ms, None);
        assert!(pacer.pauses().is_empty());
    }

    #[test]
    fn test_unknown_host_is_an_error() {
        let topo = loop_topology().unwrap();
        let exec = RecordingExecutor::new();
        let net = Network::new(&topo, &exec);
        let dir = TempDir::new().unwrap();
        let settings = HarnessSettings::default();
        let pacer = Immediate::new();
        let harness = MeasurementHarness::new(&settings, dir.path(), &pacer);

        let err = harness.run_test(&net, "h3", "h42", "x", "without_stp").unwrap_err();
        assert!(matches!(err, HarnessError::Topology(TopologyError::UnknownNode(_))));
        assert!(exec.issued().is_empty());
    }

    #[test]
    fn test_throughput_stops_server() {
        let topo = loop_topology().unwrap();
        let exec = RecordingExecutor::new().with_responder(|cmd, _| {
            cmd.command.has_arg("-c").then(|| CommandOutput {
                status: Some(0),
                text: "[  5]   0.00-120.00 sec  1.10 GBytes  78.6 Mbits/sec  receiver\n".to_string(),
            })
        });
        let net = Network::new(&topo, &exec);
        let dir = TempDir::new().unwrap();
        let settings = HarnessSettings::default();
        let pacer = Immediate::new();
        let harness = MeasurementHarness::new(&settings, dir.path(), &pacer);

        let record = harness.run_throughput(&net, "h1", "h6", "h1 <-> h6").unwrap();
        assert!(record.completed);
        assert!(record.raw_output.contains("78.6 Mbits/sec"));
        assert_eq!(record.duration, Duration::from_secs(120));

        let issued = exec.issued();
        assert_eq!(issued.len(), 2);
        assert!(issued[0].on_host("h1") && issued[0].command.is_detached());
        assert_eq!(issued[1].command.to_string(), "iperf3 -c 10.0.0.2 -t 120");
        assert_eq!(exec.stopped(), vec![issued[0].handle.unwrap()]);
    }
}
