//! Translator provisioning.
//!
//! `NatProvisioner::prepare` gives the private side its addresses and
//! yields an `UnfixedTranslator`. Consuming it with `apply` installs the
//! rule set and public-side routes exactly once and yields a
//! `FixedTranslator`.

use std::net::Ipv4Addr;

use log::{info, warn};

use super::rules::{NatRuleSet, PortForward, Protocol};
use crate::emulation::{Network, NetworkError};
use crate::process::{tools, CommandOutput, ExecError};
use crate::topology::{InterfaceAddress, TopologyError};

/// Errors raised while provisioning the translator
#[derive(Debug, thiserror::Error)]
pub enum NatError {
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl From<NetworkError> for NatError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::Topology(e) => NatError::Topology(e),
            NetworkError::Exec(e) => NatError::Exec(e),
        }
    }
}

/// One private subnet behind the translator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateSide {
    /// Translator interface facing the subnet
    pub interface: String,
    /// Translator address on that interface, the private host's gateway
    pub gateway: InterfaceAddress,
    pub host: String,
    pub host_interface: String,
    pub host_address: InterfaceAddress,
}

/// Addresses and mappings of a translator node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorSpec {
    pub node: String,
    pub public_interface: String,
    pub public_address: InterfaceAddress,
    pub private: Vec<PrivateSide>,
    pub forwards: Vec<PortForward>,
    /// Hosts that route through the translator once it is fixed
    pub public_hosts: Vec<String>,
}

impl Default for TranslatorSpec {
    fn default() -> Self {
        let side = |iface: &str, net: u8, host: &str| PrivateSide {
            interface: iface.to_string(),
            gateway: InterfaceAddress::new(Ipv4Addr::new(10, 1, net, 1), 24),
            host: host.to_string(),
            host_interface: format!("{}-eth0", host),
            host_address: InterfaceAddress::new(Ipv4Addr::new(10, 1, net, 2), 24),
        };
        Self {
            node: "h9".to_string(),
            public_interface: "h9-eth2".to_string(),
            public_address: InterfaceAddress::new(Ipv4Addr::new(172, 16, 10, 10), 24),
            private: vec![side("h9-eth0", 1, "h1"), side("h9-eth1", 2, "h2")],
            forwards: vec![
                PortForward { protocol: Protocol::Tcp, port: 5001, destination: Ipv4Addr::new(10, 1, 1, 2) },
                PortForward { protocol: Protocol::Tcp, port: 5002, destination: Ipv4Addr::new(10, 1, 2, 2) },
            ],
            public_hosts: (3..=8).map(|i| format!("h{}", i)).collect(),
        }
    }
}

impl TranslatorSpec {
    pub fn rule_set(&self) -> NatRuleSet {
        let private: Vec<&str> = self.private.iter().map(|p| p.interface.as_str()).collect();
        NatRuleSet::for_translator(&self.public_interface, &private, &self.forwards)
    }
}

/// Entry point of the NAT type-state
pub struct NatProvisioner {
    spec: TranslatorSpec,
}

impl NatProvisioner {
    pub fn new(spec: TranslatorSpec) -> Self {
        Self { spec }
    }

    /// Assign translator and private-host addresses on the running network
    /// and point the private hosts at their gateway.
    pub fn prepare(self, network: &mut Network<'_>) -> Result<UnfixedTranslator, NatError> {
        info!("Configuring addresses behind translator {}", self.spec.node);
        let spec = self.spec;

        for side in &spec.private {
            network.assign_address(&side.host, &side.host_interface, side.host_address)?;
            network.assign_address(&spec.node, &side.interface, side.gateway)?;
        }
        network.assign_address(&spec.node, &spec.public_interface, spec.public_address)?;

        for side in &spec.private {
            let host = network.host(&side.host)?;
            fire(host.name(), || host.run(&tools::default_route(side.gateway.ip)));
        }

        Ok(UnfixedTranslator { spec })
    }
}

/// Translator with addresses but no forwarding rules
#[derive(Debug)]
pub struct UnfixedTranslator {
    spec: TranslatorSpec,
}

impl UnfixedTranslator {
    pub fn spec(&self) -> &TranslatorSpec {
        &self.spec
    }

    /// Install the rule set on the translator, then default routes on the
    /// public hosts. Failures are logged and counted, never retried.
    pub fn apply(self, network: &Network<'_>) -> Result<FixedTranslator, NatError> {
        let rules = self.spec.rule_set();
        let translator = network.host(&self.spec.node)?;
        info!("Applying {} NAT rules on {}", rules.len(), translator.name());

        let mut failures = 0;
        for command in rules.commands() {
            if !fire(translator.name(), || translator.run(&command)) {
                failures += 1;
            }
        }

        let route = tools::default_route(self.spec.public_address.ip);
        for name in &self.spec.public_hosts {
            let host = network.host(name)?;
            if !fire(name, || host.run(&route)) {
                failures += 1;
            }
        }

        if failures > 0 {
            warn!("{} NAT commands failed", failures);
        }
        Ok(FixedTranslator { spec: self.spec, rules, failures })
    }
}

/// Translator after its rule set has been applied
pub struct FixedTranslator {
    spec: TranslatorSpec,
    rules: NatRuleSet,
    failures: usize,
}

impl FixedTranslator {
    pub fn spec(&self) -> &TranslatorSpec {
        &self.spec
    }

    pub fn rules(&self) -> &NatRuleSet {
        &self.rules
    }

    /// Commands that failed to launch or exited non-zero
    pub fn failures(&self) -> usize {
        self.failures
    }
}

/// Run a provisioning command, logging a failure. Returns whether it succeeded.
fn fire<F>(host: &str, run: F) -> bool
where
    F: FnOnce() -> Result<CommandOutput, ExecError>,
{
    match run() {
        Ok(output) if output.success() => true,
        Ok(output) => {
            warn!("Command on {} exited with {:?}: {}", host, output.status, output.text.trim());
            false
        }
        Err(e) => {
            warn!("Command on {} failed: {}", host, e);
            false
        }
    }
}
