//! Strategies for deciding when a mitigation mechanism has settled.

use std::time::Duration;

use log::{debug, info};

use crate::emulation::Network;
use crate::harness::pacer::Pacer;
use crate::process::tools;

/// Result of waiting for convergence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceOutcome {
    /// False when the wait ran out before the network settled
    pub converged: bool,
    /// Time spent waiting
    pub waited: Duration,
}

/// Blocks until the network is assumed stable, for at most `budget`
pub trait Convergence {
    fn await_convergence(&self, network: &Network<'_>, budget: Duration) -> ConvergenceOutcome;
}

/// Waits the whole budget and assumes convergence
pub struct FixedDelay<'p> {
    pacer: &'p dyn Pacer,
}

impl<'p> FixedDelay<'p> {
    pub fn new(pacer: &'p dyn Pacer) -> Self {
        Self { pacer }
    }
}

impl Convergence for FixedDelay<'_> {
    fn await_convergence(&self, _network: &Network<'_>, budget: Duration) -> ConvergenceOutcome {
        info!("Waiting {:?} for convergence", budget);
        self.pacer.pause(budget);
        ConvergenceOutcome { converged: true, waited: budget }
    }
}

/// Polls `ovs-appctl stp/show` on every switch until no port is still
/// listening or learning
pub struct PolledStp<'p> {
    pacer: &'p dyn Pacer,
    interval: Duration,
}

impl<'p> PolledStp<'p> {
    pub fn new(pacer: &'p dyn Pacer, interval: Duration) -> Self {
        Self { pacer, interval }
    }

    fn settled(network: &Network<'_>) -> bool {
        network.switches().iter().all(|switch| {
            match switch.inspect(&tools::ovs_stp_show(switch.name())) {
                Ok(output) if output.success() => !has_transitional_port(&output.text),
                Ok(output) => {
                    debug!("stp/show on {} exited with {:?}", switch.name(), output.status);
                    false
                }
                Err(e) => {
                    debug!("stp/show on {} failed: {}", switch.name(), e);
                    false
                }
            }
        })
    }
}

/// Returns true if any port in an `stp/show` dump is still listening or learning
fn has_transitional_port(dump: &str) -> bool {
    dump.lines().any(|line| {
        let line = line.to_ascii_lowercase();
        line.contains("listening") || line.contains("learning")
    })
}

impl Convergence for PolledStp<'_> {
    fn await_convergence(&self, network: &Network<'_>, budget: Duration) -> ConvergenceOutcome {
        let mut waited = Duration::ZERO;
        loop {
            if Self::settled(network) {
                info!("Spanning tree settled after {:?}", waited);
                return ConvergenceOutcome { converged: true, waited };
            }
            if waited >= budget {
                return ConvergenceOutcome { converged: false, waited };
            }
            let step = self.interval.min(budget - waited).max(Duration::from_millis(1));
            self.pacer.pause(step);
            waited += step;
        }
    }
}
