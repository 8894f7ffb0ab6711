//! Aggregation of trial results.

use super::types::{TestSummary, TrialResult};

/// Round to one decimal place
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl TestSummary {
    /// Aggregate `trials`, keeping them in issuance order
    pub fn from_trials(
        test_name: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        trials: Vec<TrialResult>,
    ) -> Self {
        let reachable = trials.iter().filter(|t| t.is_reachable()).count();
        let success_rate = if trials.is_empty() {
            0.0
        } else {
            round_one_decimal(reachable as f64 / trials.len() as f64 * 100.0)
        };

        let samples: Vec<f64> = trials
            .iter()
            .filter(|t| t.is_reachable())
            .filter_map(|t| t.latency_ms)
            .collect();
        let mean_latency_ms = if samples.is_empty() {
            None
        } else {
            Some(samples.iter().sum::<f64>() / samples.len() as f64)
        };

        Self {
            test_name: test_name.into(),
            source: source.into(),
            target: target.into(),
            success_rate,
            mean_latency_ms,
            trials,
        }
    }

    pub fn successful_trials(&self) -> usize {
        self.trials.iter().filter(|t| t.is_reachable()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::FailureReason;

    #[test]
    fn test_success_rate_rounding() {
        let trials = vec![
            TrialResult::reachable(10.0),
            TrialResult::unreachable(FailureReason::TotalPacketLoss),
            TrialResult::reachable(12.0),
        ];
        let summary = TestSummary::from_trials("Ping h1 from h3", "h3", "h1", trials);
        assert_eq!(summary.success_rate, 66.7);
        assert_eq!(summary.successful_trials(), 2);
    }

    #[test]
    fn test_mean_ignores_missing_samples() {
        let trials = vec![
            TrialResult::reachable(10.0),
            TrialResult::reachable_without_latency(),
            TrialResult::reachable(20.0),
        ];
        let summary = TestSummary::from_trials("t", "a", "b", trials);
        assert_eq!(summary.mean_latency_ms, Some(15.0));
        assert_eq!(summary.success_rate, 100.0);
    }

    #[test]
    fn test_mean_absent_without_samples() {
        let trials = vec![
            TrialResult::unreachable(FailureReason::HostUnreachable),
            TrialResult::reachable_without_latency(),
        ];
        let summary = TestSummary::from_trials("t", "a", "b", trials);
        assert_eq!(summary.mean_latency_ms, None);
        assert_eq!(summary.success_rate, 50.0);
    }

    #[test]
    fn test_empty_trials() {
        let summary = TestSummary::from_trials("t", "a", "b", Vec::new());
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.mean_latency_ms, None);
    }

    #[test]
    fn test_trial_order_preserved() {
        let trials = vec![
            TrialResult::unreachable(FailureReason::Unknown),
            TrialResult::reachable(3.0),
        ];
        let summary = TestSummary::from_trials("t", "a", "b", trials.clone());
        assert_eq!(summary.trials, trials);
    }
}
