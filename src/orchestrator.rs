//! Scenario orchestrator.
//!
//! Coordinates one run end to end: build the topology, start it, engage the
//! mode, run the tests, write the reports and tear the network down.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::{info, warn};

use crate::analysis::{generate_json_report, generate_text_report, RunReport};
use crate::config::{Config, ConvergenceStrategy};
use crate::emulation::{ControllerAttachment, EmulationEngine, Network};
use crate::harness::{MeasurementHarness, Pacer};
use crate::mode::{attachment_for, Convergence, FixedDelay, LoopMode, ModeController, NatMode, PolledStp, RunMode};
use crate::nat::{NatProvisioner, TranslatorSpec};
use crate::process::ProcessExecutor;
use crate::topology::{cycles_share_edge, inter_switch_degree, loop_topology, nat_topology, switch_cycles, Topology};

/// Reachability probes on the loop topology, as (source, target)
pub const LOOP_PROBES: [(&str, &str); 3] = [("h3", "h1"), ("h5", "h7"), ("h8", "h2")];

/// Reachability probes on the NAT topology: outbound from the private
/// hosts, then inbound to them
pub const NAT_PROBES: [(&str, &str); 4] = [("h1", "h5"), ("h2", "h3"), ("h8", "h1"), ("h6", "h2")];

/// Throughput tests on the NAT topology, as (server, client, name)
pub const NAT_THROUGHPUT: [(&str, &str, &str); 3] = [
    ("h1", "h6", "h1 <-> h6"),
    ("h8", "h2", "h8 <-> h2"),
    ("h1", "h6", "h1 <-> h6 (repeat)"),
];

/// Holds the finished network for manual inspection before teardown
pub trait ControlPoint {
    fn hold(&self, topology: &Topology);
}

/// Waits for Enter on stdin
pub struct StdinPrompt;

impl ControlPoint for StdinPrompt {
    fn hold(&self, topology: &Topology) {
        println!();
        println!(
            "Network is still up ({} hosts). Inspect it with `ip netns exec <host> ...`.",
            topology.hosts().count()
        );
        print!("Press Enter to tear it down... ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        if let Err(e) = io::stdin().lock().read_line(&mut line) {
            warn!("Failed to read from stdin: {}", e);
        }
    }
}

/// Everything a run needs besides the topology
pub struct Orchestrator<'a> {
    config: &'a Config,
    exec: &'a dyn ProcessExecutor,
    engine: &'a dyn EmulationEngine,
    pacer: &'a dyn Pacer,
    control: &'a dyn ControlPoint,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a Config,
        exec: &'a dyn ProcessExecutor,
        engine: &'a dyn EmulationEngine,
        pacer: &'a dyn Pacer,
        control: &'a dyn ControlPoint,
    ) -> Self {
        Self { config, exec, engine, pacer, control }
    }

    fn capture_dir(&self) -> &Path {
        &self.config.general.capture_dir
    }

    fn harness(&self) -> MeasurementHarness<'_> {
        MeasurementHarness::new(&self.config.harness, self.capture_dir(), self.pacer)
    }

    /// Polling only makes sense for spanning tree; the controller always gets the fixed wait
    fn convergence_for(&self, mode: LoopMode) -> Box<dyn Convergence + '_> {
        match (mode, self.config.convergence.strategy) {
            (LoopMode::SpanningTree, ConvergenceStrategy::Polled) => {
                Box::new(PolledStp::new(self.pacer, self.config.convergence.poll_interval))
            }
            _ => Box::new(FixedDelay::new(self.pacer)),
        }
    }

    /// Run the scenario selected on the command line and return its reports
    pub fn run(&self, mode: RunMode) -> Result<Vec<RunReport>> {
        fs::create_dir_all(self.capture_dir()).wrap_err_with(|| {
            format!("Failed to create capture directory '{}'", self.capture_dir().display())
        })?;

        match mode.loop_mode() {
            Some(loop_mode) => Ok(vec![self.run_loop_scenario(loop_mode)?]),
            None => self.run_nat_scenario(),
        }
    }

    /// Loop topology under one mitigation mode
    pub fn run_loop_scenario(&self, mode: LoopMode) -> Result<RunReport> {
        info!("=== Loop topology: {} ===", mode);
        let topology = loop_topology().wrap_err("Failed to build loop topology")?;
        log_fabric(&topology);

        let attachment = attachment_for(mode, &self.config.controller);
        let result = self
            .engine
            .start(&topology, attachment)
            .wrap_err("Failed to start loop network")
            .and_then(|()| self.measure_loop(&topology, mode));
        self.engine.stop(&topology);

        let report = result?;
        write_reports(&report, self.capture_dir())?;
        Ok(report)
    }

    fn measure_loop(&self, topology: &Topology, mode: LoopMode) -> Result<RunReport> {
        let network = Network::new(topology, self.exec);
        let convergence = self.convergence_for(mode);
        let mut controller = ModeController::new(convergence.as_ref(), &self.config.convergence);
        let state = controller.engage(&network, mode);
        if !state.is_settled() {
            return Err(eyre!("Mitigation did not settle: {:?}", state));
        }

        let harness = self.harness();
        let mut report = RunReport::new(mode.display_name(), mode.label());
        for (source, target) in LOOP_PROBES {
            let name = format!("Ping {} from {}", target, source);
            let summary = harness
                .run_test(&network, source, target, &name, mode.label())
                .wrap_err_with(|| format!("Test '{}' failed", name))?;
            report.tests.push(summary);
        }
        Ok(report)
    }

    /// NAT topology, measured before and after the translator is fixed
    pub fn run_nat_scenario(&self) -> Result<Vec<RunReport>> {
        info!("=== NAT topology ===");
        let topology = nat_topology().wrap_err("Failed to build NAT topology")?;

        let result = self
            .engine
            .start(&topology, ControllerAttachment::Standalone)
            .wrap_err("Failed to start NAT network")
            .and_then(|()| self.measure_nat(&topology));

        if self.config.general.interactive {
            self.control.hold(&topology);
        }
        self.engine.stop(&topology);

        let reports = result?;
        for report in &reports {
            write_reports(report, self.capture_dir())?;
        }
        Ok(reports)
    }

    fn measure_nat(&self, topology: &Topology) -> Result<Vec<RunReport>> {
        let mut network = Network::new(topology, self.exec);
        let unfixed = NatProvisioner::new(TranslatorSpec::default())
            .prepare(&mut network)
            .wrap_err("Failed to address the private side")?;

        // The NAT fabric has the same loops, so spanning tree is on for both phases
        let convergence = self.convergence_for(LoopMode::SpanningTree);
        let mut controller = ModeController::new(convergence.as_ref(), &self.config.convergence);
        controller.engage(&network, LoopMode::SpanningTree);

        let before = self.measure_nat_phase(&network, NatMode::Unfixed)?;

        let fixed = unfixed.apply(&network).wrap_err("Failed to apply NAT rules")?;
        info!(
            "Applied {} NAT rules ({} failed commands)",
            fixed.rules().len(),
            fixed.failures()
        );

        let after = self.measure_nat_phase(&network, NatMode::NatFixed)?;
        Ok(vec![before, after])
    }

    fn measure_nat_phase(&self, network: &Network<'_>, mode: NatMode) -> Result<RunReport> {
        info!("=== {} ===", mode);
        let harness = self.harness();
        let mut report = RunReport::new(mode.display_name(), mode.label());

        for (source, target) in NAT_PROBES {
            let name = format!("Ping {} from {}", target, source);
            let summary = harness
                .run_test(network, source, target, &name, mode.label())
                .wrap_err_with(|| format!("Test '{}' failed", name))?;
            report.tests.push(summary);
        }

        for (server, client, name) in NAT_THROUGHPUT {
            let record = harness
                .run_throughput(network, server, client, name)
                .wrap_err_with(|| format!("Throughput test '{}' failed", name))?;
            report.throughput.push(record);
        }
        Ok(report)
    }
}

/// Log the fabric's loop structure before starting it
fn log_fabric(topology: &Topology) {
    let degrees = inter_switch_degree(topology);
    let cycles = switch_cycles(topology);
    info!(
        "Switch fabric: {} inter-switch links, degrees {:?}, {} cycles{}",
        topology.inter_switch_links().count(),
        degrees,
        cycles.len(),
        if cycles_share_edge(&cycles) { " sharing edges" } else { "" }
    );
}

/// Write `report_{label}_{YYYYmmdd_HHMMSS}.json` and `.txt` into `dir`
pub fn write_reports(report: &RunReport, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let base = format!("report_{}_{}", report.label, stamp);
    let json_path = dir.join(format!("{}.json", base));
    let text_path = dir.join(format!("{}.txt", base));
    generate_json_report(report, &json_path)?;
    generate_text_report(report, &text_path)?;
    Ok((json_path, text_path))
}
