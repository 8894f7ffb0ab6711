//! Drives a started loop network into its mitigation mode.

use log::{info, warn};

use super::convergence::Convergence;
use super::types::{LoopMode, MitigationState};
use crate::config::{ControllerEndpoint, ConvergenceSettings};
use crate::emulation::{ControllerAttachment, Network};
use crate::process::tools;

/// How the engine should attach switches for `mode`
pub fn attachment_for(mode: LoopMode, endpoint: &ControllerEndpoint) -> ControllerAttachment {
    match mode {
        LoopMode::ExternalController => ControllerAttachment::Remote {
            ip: endpoint.ip,
            port: endpoint.port,
        },
        LoopMode::NoMitigation | LoopMode::SpanningTree => ControllerAttachment::Standalone,
    }
}

/// Engages a mitigation once and tracks the resulting state
pub struct ModeController<'a> {
    convergence: &'a dyn Convergence,
    settings: &'a ConvergenceSettings,
    history: Vec<MitigationState>,
    engaged: bool,
}

impl<'a> ModeController<'a> {
    pub fn new(convergence: &'a dyn Convergence, settings: &'a ConvergenceSettings) -> Self {
        Self {
            convergence,
            settings,
            history: vec![MitigationState::Unmitigated],
            engaged: false,
        }
    }

    pub fn state(&self) -> MitigationState {
        self.history.last().copied().unwrap_or(MitigationState::Unmitigated)
    }

    /// Every state visited so far, starting with `Unmitigated`
    pub fn history(&self) -> &[MitigationState] {
        &self.history
    }

    fn enter(&mut self, state: MitigationState) {
        info!("Mitigation state: {:?} -> {:?}", self.state(), state);
        self.history.push(state);
    }

    /// Engage `mode` on a started network and block until it has settled.
    ///
    /// Mitigation command failures are logged and never abort the run.
    /// Engaging twice is a no-op.
    pub fn engage(&mut self, network: &Network<'_>, mode: LoopMode) -> MitigationState {
        if self.engaged {
            warn!("Mitigation already engaged, ignoring {}", mode);
            return self.state();
        }
        self.engaged = true;

        match mode {
            LoopMode::NoMitigation => {
                info!("Running without loop mitigation");
            }
            LoopMode::SpanningTree => {
                info!("Enabling STP on all switches");
                for switch in network.switches() {
                    if let Err(e) = switch.toggle(&tools::ovs_enable_stp(switch.name())) {
                        warn!("Failed to enable STP on {}: {}", switch.name(), e);
                    }
                }
                self.enter(MitigationState::Converging);

                let outcome = self.convergence.await_convergence(network, self.settings.stp_wait);
                if !outcome.converged {
                    warn!("Spanning tree not settled after {:?}, continuing", outcome.waited);
                }
                self.enter(MitigationState::Converged);

                for switch in network.switches() {
                    match switch.inspect(&tools::ovs_show(switch.name())) {
                        Ok(output) => info!("{} after STP:\n{}", switch.name(), output.text.trim_end()),
                        Err(e) => warn!("Failed to inspect {}: {}", switch.name(), e),
                    }
                }
            }
            LoopMode::ExternalController => {
                info!("Waiting for the controller to discover the topology");
                self.enter(MitigationState::DiscoveringTopology);
                let outcome = self
                    .convergence
                    .await_convergence(network, self.settings.controller_wait);
                if !outcome.converged {
                    warn!("Controller not settled after {:?}, continuing", outcome.waited);
                }
                self.enter(MitigationState::Stable);
            }
        }

        self.state()
    }
}
