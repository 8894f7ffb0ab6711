//! Core data types for probe analysis.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Whether a probe got any reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Reachable,
    Unreachable,
}

/// Why a trial failed, or what metadata a successful trial is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The probe reported the destination host unreachable (no ARP reply)
    HostUnreachable,
    /// Every echo request was lost
    TotalPacketLoss,
    /// Nothing recognisable in the output
    Unknown,
    /// Replies arrived but no round-trip statistics could be read
    LatencyUnavailable,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::HostUnreachable => write!(f, "ARP/host unreachable"),
            FailureReason::TotalPacketLoss => write!(f, "total packet loss"),
            FailureReason::Unknown => write!(f, "unknown, inspect capture"),
            FailureReason::LatencyUnavailable => write!(f, "latency unavailable"),
        }
    }
}

/// Result of one probe attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub outcome: Outcome,
    /// Mean round-trip time in milliseconds
    pub latency_ms: Option<f64>,
    pub reason: Option<FailureReason>,
}

impl TrialResult {
    pub fn reachable(latency_ms: f64) -> Self {
        Self {
            outcome: Outcome::Reachable,
            latency_ms: Some(latency_ms),
            reason: None,
        }
    }

    pub fn reachable_without_latency() -> Self {
        Self {
            outcome: Outcome::Reachable,
            latency_ms: None,
            reason: Some(FailureReason::LatencyUnavailable),
        }
    }

    pub fn unreachable(reason: FailureReason) -> Self {
        Self {
            outcome: Outcome::Unreachable,
            latency_ms: None,
            reason: Some(reason),
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.outcome == Outcome::Reachable
    }
}

/// Aggregate of the trials of one test. Built by `TestSummary::from_trials`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSummary {
    pub test_name: String,
    pub source: String,
    pub target: String,
    /// Percentage of reachable trials, rounded to one decimal
    pub success_rate: f64,
    /// Mean latency over reachable trials that carried a sample
    pub mean_latency_ms: Option<f64>,
    pub trials: Vec<TrialResult>,
}

/// Raw output of one throughput test; not parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThroughputRecord {
    pub test_name: String,
    pub server: String,
    pub client: String,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    /// Whether the client command exited successfully
    pub completed: bool,
    pub raw_output: String,
}

/// Everything measured in one run of one mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Display name of the mode, e.g. "With STP"
    pub mode: String,
    /// File-name label of the mode, e.g. "with_stp"
    pub label: String,
    /// RFC 3339 timestamp of report generation
    pub generated_at: String,
    pub tests: Vec<TestSummary>,
    pub throughput: Vec<ThroughputRecord>,
}

impl RunReport {
    pub fn new(mode: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            label: label.into(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            tests: Vec::new(),
            throughput: Vec::new(),
        }
    }
}
