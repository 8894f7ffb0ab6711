use clap::Parser;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use loopsim::config_loader::{self, CliOverrides};
use loopsim::emulation::NamespaceEngine;
use loopsim::harness::{Immediate, Pacer, ThreadSleep};
use loopsim::mode::RunMode;
use loopsim::orchestrator::{Orchestrator, StdinPrompt};
use loopsim::process::{NamespaceExecutor, ProcessExecutor, RecordingExecutor};

/// Loop-mitigation and NAT measurements on an emulated switched network
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
struct Args {
    /// Scenario to run
    #[arg(value_enum)]
    mode: RunMode,

    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for captures, transcripts and reports (overrides capture_dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Record and log commands instead of running them, without waiting
    #[arg(long)]
    dry_run: bool,

    /// Skip the prompt before the NAT network is torn down
    #[arg(long)]
    no_interactive: bool,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments; an unknown mode exits here with usage
    let args = Args::parse();

    let mut config = config_loader::load_config(args.config.as_deref())?;
    config_loader::apply_overrides(
        &mut config,
        &CliOverrides {
            capture_dir: args.output.clone(),
            no_interactive: args.no_interactive,
        },
    )?;

    env_logger::Builder::from_env(Env::default().default_filter_or(config.general.log_level.as_str())).init();

    // Logging starts only once the configured level is known
    for line in config_messages(&args) {
        info!("{}", line);
    }

    info!("Starting loopsim in mode {}", args.mode.cli_name());
    info!("Capture directory: {:?}", config.general.capture_dir);

    let exec: Box<dyn ProcessExecutor> = if args.dry_run {
        info!("Dry run: commands are logged, not executed");
        Box::new(RecordingExecutor::new().logging(true))
    } else {
        Box::new(NamespaceExecutor::new())
    };
    let pacer: Box<dyn Pacer> = if args.dry_run {
        Box::new(Immediate::new())
    } else {
        Box::new(ThreadSleep)
    };
    let engine = NamespaceEngine::new(exec.as_ref());

    let reports = Orchestrator::new(&config, exec.as_ref(), &engine, pacer.as_ref(), &StdinPrompt).run(args.mode)?;

    for report in &reports {
        let reachable = report.tests.iter().filter(|t| t.success_rate > 0.0).count();
        info!(
            "{}: {}/{} tests reached their target",
            report.mode,
            reachable,
            report.tests.len()
        );
    }
    info!("Run completed successfully");
    Ok(())
}

/// Where the configuration came from, reported once the logger is up
fn config_messages(args: &Args) -> Vec<String> {
    let mut lines = vec![match &args.config {
        Some(path) => format!("Loaded configuration from: {:?}", path),
        None => "No configuration file given, using defaults".to_string(),
    }];
    if let Some(dir) = &args.output {
        lines.push(format!("Capture directory overridden on command line: {:?}", dir));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["loopsim", "with-stp"]);
        assert_eq!(args.mode, RunMode::WithStp);
        assert_eq!(args.config, None);
        assert_eq!(args.output, None);
        assert!(!args.dry_run);
        assert!(!args.no_interactive);
    }

    #[test]
    fn test_all_options() {
        let args = Args::parse_from([
            "loopsim",
            "nat",
            "--config", "run.yaml",
            "--output", "/tmp/caps",
            "--dry-run",
            "--no-interactive",
        ]);
        assert_eq!(args.mode, RunMode::Nat);
        assert_eq!(args.config, Some(PathBuf::from("run.yaml")));
        assert_eq!(args.output, Some(PathBuf::from("/tmp/caps")));
        assert!(args.dry_run);
        assert!(args.no_interactive);
    }

    #[test]
    fn test_mode_is_required_and_closed() {
        let err = Args::try_parse_from(["loopsim", "with-magic"]).unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("without-fixes"));
        assert!(rendered.contains("with-pox"));
    }

    #[test]
    fn test_missing_mode_lists_every_mode() {
        let err = Args::try_parse_from(["loopsim"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand);
        let rendered = err.to_string();
        for mode in ["without-fixes", "with-stp", "with-pox", "nat"] {
            assert!(rendered.contains(mode), "{} missing from:\n{}", mode, rendered);
        }
    }

    #[test]
    fn test_config_messages() {
        let args = Args::parse_from(["loopsim", "with-pox"]);
        assert_eq!(config_messages(&args), vec!["No configuration file given, using defaults"]);

        let args = Args::parse_from(["loopsim", "nat", "-c", "run.yaml", "-o", "/tmp/caps"]);
        let lines = config_messages(&args);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("run.yaml"));
        assert!(lines[1].contains("/tmp/caps"));
    }
}
