//! Report generation for measurement runs.
//!
//! Generates both JSON and human-readable text reports.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};

use super::types::*;

/// Human-readable summary block for one test
pub fn render_summary(summary: &TestSummary) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("=== Summary for {} ===", summary.test_name));
    lines.push(format!(
        "Success Rate: {:.1}% ({}/{} attempts)",
        summary.success_rate,
        summary.successful_trials(),
        summary.trials.len()
    ));
    match summary.mean_latency_ms {
        Some(delay) => lines.push(format!("Average Delay: {:.2} ms", delay)),
        None => lines.push("Average Delay: N/A (no successful pings)".to_string()),
    }
    for (i, trial) in summary.trials.iter().enumerate() {
        let outcome = match trial.outcome {
            Outcome::Reachable => "reachable",
            Outcome::Unreachable => "unreachable",
        };
        let latency = trial
            .latency_ms
            .map(|ms| format!(" {:.3} ms", ms))
            .unwrap_or_default();
        let reason = trial
            .reason
            .map(|r| format!(" ({})", r))
            .unwrap_or_default();
        lines.push(format!("  Attempt {}: {}{}{}", i + 1, outcome, latency, reason));
    }
    lines.join("\n")
}

/// Generate JSON report
pub fn generate_json_report(report: &RunReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

/// Generate human-readable text report
pub fn generate_text_report(report: &RunReport, output_path: &Path) -> Result<()> {
    let mut lines: Vec<String> = Vec::new();

    // Header
    lines.push("=".repeat(80));
    lines.push("                        LOOPSIM MEASUREMENT REPORT".to_string());
    lines.push("=".repeat(80));
    lines.push(String::new());

    // Metadata
    lines.push(format!("Generated: {}", report.generated_at));
    lines.push(format!("Mode: {} ({})", report.mode, report.label));
    lines.push(format!("Ping tests: {}", report.tests.len()));
    lines.push(format!("Throughput tests: {}", report.throughput.len()));
    lines.push(String::new());

    if !report.tests.is_empty() {
        lines.push("=".repeat(80));
        lines.push("                               REACHABILITY".to_string());
        lines.push("=".repeat(80));
        lines.push(String::new());
        for summary in &report.tests {
            lines.push(render_summary(summary));
            lines.push(String::new());
        }
    }

    if !report.throughput.is_empty() {
        lines.push("=".repeat(80));
        lines.push("                                THROUGHPUT".to_string());
        lines.push("=".repeat(80));
        lines.push(String::new());
        for record in &report.throughput {
            lines.push(format!(
                "--- {}: {} (server) <-> {} (client), {}s{} ---",
                record.test_name,
                record.server,
                record.client,
                record.duration.as_secs(),
                if record.completed { "" } else { ", client failed" }
            ));
            lines.push(record.raw_output.trim_end().to_string());
            lines.push(String::new());
        }
    }

    fs::write(output_path, lines.join("\n"))
        .with_context(|| format!("Failed to write text report to {}", output_path.display()))?;

    log::info!("Text report written to {}", output_path.display());
    Ok(())
}
