//! Offline reachability analysis of saved probe transcripts.
//!
//! Re-reads the `*.ping.txt` files a run left in its capture directory and
//! prints the same per-test summaries the run logged, optionally as JSON.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Context, Result};

use loopsim::analysis::{self, TestSummary};

#[derive(Parser)]
#[command(name = "probe-analyzer")]
#[command(about = "Summarize saved loopsim probe transcripts")]
#[command(version)]
struct Cli {
    /// Capture directory of a previous run
    #[arg(short, long, default_value = "./captures")]
    dir: PathBuf,

    /// Only analyze transcripts with this mode label (e.g. with_stp)
    #[arg(short, long)]
    label: Option<String>,

    /// Also write the summaries as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of parallel workers (0 = auto-detect)
    #[arg(short = 'j', long, default_value = "0")]
    threads: usize,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let summaries = analysis::analyze_transcripts(&cli.dir, cli.label.as_deref())
        .with_context(|| format!("Failed to analyze transcripts in {}", cli.dir.display()))?;

    if summaries.is_empty() {
        log::warn!("No transcripts found in {}", cli.dir.display());
    }

    print_summaries(&summaries);

    if let Some(path) = &cli.json {
        let json = serde_json::to_string_pretty(&summaries).context("Failed to serialize summaries")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Summaries written to {}", path.display());
    }

    Ok(())
}

fn print_summaries(summaries: &[TestSummary]) {
    for summary in summaries {
        println!("{}", analysis::render_summary(summary));
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["probe-analyzer"]);
        assert_eq!(cli.dir, PathBuf::from("./captures"));
        assert_eq!(cli.label, None);
        assert_eq!(cli.threads, 0);
    }

    #[test]
    fn test_cli_options() {
        let cli = Cli::parse_from([
            "probe-analyzer",
            "--dir", "/tmp/run1",
            "--label", "nat_fixed",
            "--json", "out.json",
            "-j", "4",
        ]);
        assert_eq!(cli.dir, PathBuf::from("/tmp/run1"));
        assert_eq!(cli.label.as_deref(), Some("nat_fixed"));
        assert_eq!(cli.json, Some(PathBuf::from("out.json")));
        assert_eq!(cli.threads, 4);
    }
}
