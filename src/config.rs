use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration structure that mirrors the YAML configuration.
///
/// Every section has defaults for the standard loop and NAT runs, so an
/// empty file (or no file at all) is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General run settings
    pub general: GeneralConfig,
    /// Trial and probe settings
    pub harness: HarnessSettings,
    /// Convergence waits for the mitigation modes
    pub convergence: ConvergenceSettings,
    /// External learning controller endpoint
    pub controller: ControllerEndpoint,
}

/// General run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory for captures, transcripts and reports; created, never cleared
    pub capture_dir: PathBuf,
    /// Log filter passed to env_logger (e.g. "info", "debug")
    pub log_level: String,
    /// Pause for manual inspection before tearing down the NAT network
    pub interactive: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            capture_dir: PathBuf::from("./captures"),
            log_level: "info".to_string(),
            interactive: true,
        }
    }
}

/// Trial and probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSettings {
    /// Trials per test
    pub attempts: u32,
    /// Echo requests per probe
    pub probe_count: u32,
    /// Pause between consecutive trials of one test
    #[serde(with = "humantime_serde")]
    pub inter_trial_interval: Duration,
    /// Upper bound on waiting for a capture to report it is listening
    #[serde(with = "humantime_serde")]
    pub capture_ready_timeout: Duration,
    /// Capture filter expression
    pub capture_filter: String,
    /// Length of each throughput test
    #[serde(with = "humantime_serde")]
    pub throughput_duration: Duration,
    /// Upper bound on waiting for the throughput server to listen
    #[serde(with = "humantime_serde")]
    pub server_ready_timeout: Duration,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            probe_count: 4,
            inter_trial_interval: Duration::from_secs(30),
            capture_ready_timeout: Duration::from_secs(2),
            capture_filter: "not icmp6".to_string(),
            throughput_duration: Duration::from_secs(120),
            server_ready_timeout: Duration::from_secs(5),
        }
    }
}

/// How convergence is awaited after a mitigation is engaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceStrategy {
    /// Sleep for the configured wait
    FixedDelay,
    /// Poll the switches until STP settles, bounded by the configured wait
    Polled,
}

/// Convergence waits for the mitigation modes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceSettings {
    pub strategy: ConvergenceStrategy,
    /// Spanning-tree convergence wait (upper bound when polling)
    #[serde(with = "humantime_serde")]
    pub stp_wait: Duration,
    /// Controller topology-discovery wait
    #[serde(with = "humantime_serde")]
    pub controller_wait: Duration,
    /// Interval between polls
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for ConvergenceSettings {
    fn default() -> Self {
        Self {
            strategy: ConvergenceStrategy::FixedDelay,
            stp_wait: Duration::from_secs(30),
            controller_wait: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// External learning controller endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerEndpoint {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl Default for ControllerEndpoint {
    fn default() -> Self {
        Self {
            ip: Ipv4Addr::LOCALHOST,
            port: 6633,
        }
    }
}

/// Validation errors for the configuration
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid harness configuration: {0}")]
    InvalidHarness(String),
    #[error("Invalid convergence configuration: {0}")]
    InvalidConvergence(String),
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.general.capture_dir.as_os_str().is_empty() {
            return Err(ValidationError::InvalidGeneral(
                "capture_dir cannot be empty".to_string(),
            ));
        }

        if self.harness.attempts == 0 {
            return Err(ValidationError::InvalidHarness(
                "attempts must be at least 1".to_string(),
            ));
        }
        if self.harness.probe_count == 0 {
            return Err(ValidationError::InvalidHarness(
                "probe_count must be at least 1".to_string(),
            ));
        }
        if self.harness.throughput_duration.as_secs() == 0 {
            return Err(ValidationError::InvalidHarness(
                "throughput_duration must be at least one second".to_string(),
            ));
        }

        if self.convergence.strategy == ConvergenceStrategy::Polled
            && self.convergence.poll_interval.is_zero()
        {
            return Err(ValidationError::InvalidConvergence(
                "poll_interval must be non-zero when polling".to_string(),
            ));
        }

        Ok(())
    }
}
