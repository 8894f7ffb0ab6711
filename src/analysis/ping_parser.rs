//! Ping output parsing.
//!
//! Classifies a ping transcript as reachable or not and extracts the mean
//! round-trip time from the statistics line.

use std::sync::LazyLock;

use regex::Regex;

use super::types::{FailureReason, TrialResult};

/// Compiled regex patterns for ping output
pub struct PingPatterns {
    /// Match: "4 packets transmitted, 4 received"
    pub received: Regex,
    /// Match: "rtt min/avg/max/mdev = 10.1/12.3/14.0/1.2 ms" (BSD prints "stddev")
    pub rtt_summary: Regex,
}

impl PingPatterns {
    pub fn new() -> Self {
        Self {
            received: Regex::new(r"\b(\d+) (?:packets )?received").expect("Invalid received regex"),
            rtt_summary: Regex::new(
                r"min/avg/max/(?:mdev|stddev) = [\d.]+/([\d.]+)/[\d.]+/[\d.]+ ms",
            )
            .expect("Invalid rtt_summary regex"),
        }
    }
}

impl Default for PingPatterns {
    fn default() -> Self {
        Self::new()
    }
}

/// Global patterns instance
pub static PATTERNS: LazyLock<PingPatterns> = LazyLock::new(PingPatterns::new);

const HOST_UNREACHABLE: &str = "Destination Host Unreachable";
const TOTAL_LOSS: &str = "100% packet loss";

/// Reply counts reported in the transcript, in order of appearance
fn reply_counts(output: &str) -> Vec<u64> {
    PATTERNS
        .received
        .captures_iter(output)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .collect()
}

/// Classify a raw ping transcript.
///
/// Any zero reply count makes the trial unreachable, even when other text
/// in the transcript looks like a success.
pub fn analyze(output: &str) -> TrialResult {
    let counts = reply_counts(output);
    let replied = !counts.is_empty() && counts.iter().all(|&n| n > 0);

    if replied {
        let avg = PATTERNS
            .rtt_summary
            .captures(output)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok());

        return match avg {
            Some(avg) => TrialResult::reachable(avg),
            None => TrialResult::reachable_without_latency(),
        };
    }

    let reason = if output.contains(HOST_UNREACHABLE) {
        FailureReason::HostUnreachable
    } else if output.contains(TOTAL_LOSS) {
        FailureReason::TotalPacketLoss
    } else {
        FailureReason::Unknown
    };
    TrialResult::unreachable(reason)
}
