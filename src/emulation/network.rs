//! Live view of an instantiated topology.
//!
//! Hosts and switches are exposed through separate handle types: a
//! `HostHandle` can run blocking and detached commands and has an address,
//! a `SwitchHandle` only accepts mitigation commands.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::Duration;

use log::debug;

use crate::process::{tools, CommandOutput, CommandSpec, ExecError, Placement, ProcessExecutor, ProcessHandle};
use crate::topology::{InterfaceAddress, NodeKind, Topology, TopologyError};

/// Errors from changing a running network
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// A started topology and the executor that reaches its nodes
pub struct Network<'a> {
    topology: &'a Topology,
    exec: &'a dyn ProcessExecutor,
    /// Addresses assigned after start, keyed by (host, interface)
    assigned: HashMap<(String, String), InterfaceAddress>,
}

impl<'a> Network<'a> {
    pub fn new(topology: &'a Topology, exec: &'a dyn ProcessExecutor) -> Self {
        Self {
            topology,
            exec,
            assigned: HashMap::new(),
        }
    }

    pub fn topology(&self) -> &Topology {
        self.topology
    }

    pub fn executor(&self) -> &dyn ProcessExecutor {
        self.exec
    }

    /// Handle for host `name`
    pub fn host(&self, name: &str) -> Result<HostHandle<'_>, TopologyError> {
        let node = self
            .topology
            .node(name)
            .ok_or_else(|| TopologyError::UnknownNode(name.to_string()))?;
        if node.kind != NodeKind::Host {
            return Err(TopologyError::WrongKind {
                node: name.to_string(),
                expected: NodeKind::Host,
            });
        }

        let interface = self
            .topology
            .primary_interface(name)
            .unwrap_or_default()
            .to_string();
        let address = self
            .assigned
            .get(&(name.to_string(), interface.clone()))
            .copied()
            .or(node.address)
            .map(|a| a.ip);

        Ok(HostHandle {
            name: node.name.as_str(),
            interface,
            address,
            exec: self.exec,
        })
    }

    /// Handle for switch `name`
    pub fn switch(&self, name: &str) -> Result<SwitchHandle<'_>, TopologyError> {
        let node = self
            .topology
            .node(name)
            .ok_or_else(|| TopologyError::UnknownNode(name.to_string()))?;
        if node.kind != NodeKind::Switch {
            return Err(TopologyError::WrongKind {
                node: name.to_string(),
                expected: NodeKind::Switch,
            });
        }
        Ok(SwitchHandle { name: node.name.as_str(), exec: self.exec })
    }

    /// Handles for every switch, in topology order
    pub fn switches(&self) -> Vec<SwitchHandle<'_>> {
        self.topology
            .switches()
            .map(|node| SwitchHandle { name: node.name.as_str(), exec: self.exec })
            .collect()
    }

    /// Address currently configured on `interface` of `host`
    pub fn address_of(&self, host: &str, interface: &str) -> Option<InterfaceAddress> {
        self.assigned
            .get(&(host.to_string(), interface.to_string()))
            .copied()
            .or_else(|| {
                let node = self.topology.node(host)?;
                (self.topology.primary_interface(host) == Some(interface))
                    .then_some(node.address)
                    .flatten()
            })
    }

    /// Replace the address of `interface` on an already-running host.
    ///
    /// The topology itself is left untouched; later `host()` calls see the
    /// new address.
    pub fn assign_address(
        &mut self,
        host: &str,
        interface: &str,
        address: InterfaceAddress,
    ) -> Result<(), NetworkError> {
        let handle = self.host(host)?;
        handle.run(&tools::addr_flush(interface))?;
        handle.run(&tools::addr_add(interface, &address))?;
        debug!("Assigned {} to {}:{}", address, host, interface);
        self.assigned
            .insert((host.to_string(), interface.to_string()), address);
        Ok(())
    }
}

/// End host: originates probes and runs measurement tools
#[derive(Clone)]
pub struct HostHandle<'n> {
    name: &'n str,
    interface: String,
    address: Option<Ipv4Addr>,
    exec: &'n dyn ProcessExecutor,
}

impl<'n> HostHandle<'n> {
    pub fn name(&self) -> &str {
        self.name
    }

    /// Address of the host's first interface, if one is configured
    pub fn ip(&self) -> Option<Ipv4Addr> {
        self.address
    }

    /// The host's first interface, e.g. `h1-eth0`
    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn run(&self, command: &CommandSpec) -> Result<CommandOutput, ExecError> {
        self.exec.run(Placement::Host(self.name), command)
    }

    pub fn spawn(&self, command: &CommandSpec) -> Result<ProcessHandle, ExecError> {
        self.exec.spawn(Placement::Host(self.name), command)
    }

    pub fn wait_for_output(&self, handle: ProcessHandle, marker: &str, timeout: Duration) -> Result<bool, ExecError> {
        self.exec.wait_for_output(handle, marker, timeout)
    }

    pub fn stop(&self, handle: ProcessHandle) -> Result<(), ExecError> {
        self.exec.stop(handle)
    }
}

/// Forwarding element: only accepts mitigation toggles
#[derive(Clone)]
pub struct SwitchHandle<'n> {
    name: &'n str,
    exec: &'n dyn ProcessExecutor,
}

impl<'n> SwitchHandle<'n> {
    pub fn name(&self) -> &str {
        self.name
    }

    /// Issue a mitigation command; switches run in the root namespace
    pub fn toggle(&self, command: &CommandSpec) -> Result<CommandOutput, ExecError> {
        self.exec.run_checked(Placement::Root, command)
    }

    /// Read-only inspection command, output returned regardless of status
    pub fn inspect(&self, command: &CommandSpec) -> Result<CommandOutput, ExecError> {
        self.exec.run(Placement::Root, command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::RecordingExecutor;
    use crate::topology::{loop_topology, nat_topology};

    #[test]
    fn test_host_and_switch_handles() {
        let topo = loop_topology().unwrap();
        let exec = RecordingExecutor::new();
        let net = Network::new(&topo, &exec);

        let h1 = net.host("h1").unwrap();
        assert_eq!(h1.ip(), Some(Ipv4Addr::new(10, 0, 0, 2)));
        assert_eq!(h1.interface(), "h1-eth0");

        assert!(matches!(net.host("s1"), Err(TopologyError::WrongKind { .. })));
        assert!(matches!(net.switch("h1"), Err(TopologyError::WrongKind { .. })));
        assert!(matches!(net.host("h42"), Err(TopologyError::UnknownNode(_))));
        assert_eq!(net.switches().len(), 4);
    }

    #[test]
    fn test_assign_address_updates_handles() {
        let topo = nat_topology().unwrap();
        let exec = RecordingExecutor::new();
        let mut net = Network::new(&topo, &exec);

        assert_eq!(net.host("h1").unwrap().ip(), None);
        let addr: InterfaceAddress = "10.1.1.2/24".parse().unwrap();
        net.assign_address("h1", "h1-eth0", addr).unwrap();

        assert_eq!(net.host("h1").unwrap().ip(), Some(Ipv4Addr::new(10, 1, 1, 2)));
        assert_eq!(net.address_of("h1", "h1-eth0"), Some(addr));
        // The topology keeps its construction-time view
        assert!(topo.node("h1").unwrap().address.is_none());

        let issued = exec.issued();
        assert_eq!(issued.len(), 2);
        assert!(issued.iter().all(|c| c.on_host("h1")));
        assert_eq!(issued[1].command.to_string(), "ip addr add 10.1.1.2/24 dev h1-eth0");
    }

    #[test]
    fn test_assign_address_rejects_non_hosts() {
        let topo = nat_topology().unwrap();
        let exec = RecordingExecutor::new();
        let mut net = Network::new(&topo, &exec);
        let addr: InterfaceAddress = "10.1.1.2/24".parse().unwrap();

        let err = net.assign_address("h42", "h42-eth0", addr).unwrap_err();
        assert!(matches!(err, NetworkError::Topology(TopologyError::UnknownNode(ref n)) if n == "h42"));
        let err = net.assign_address("s1", "s1-eth1", addr).unwrap_err();
        assert!(matches!(err, NetworkError::Topology(TopologyError::WrongKind { .. })));
        assert!(exec.issued().is_empty());
        assert_eq!(net.address_of("h42", "h42-eth0"), None);
    }

    #[test]
    fn test_switch_toggle_runs_in_root() {
        let topo = loop_topology().unwrap();
        let exec = RecordingExecutor::new();
        let net = Network::new(&topo, &exec);
        net.switch("s2").unwrap().toggle(&tools::ovs_enable_stp("s2")).unwrap();
        let issued = exec.issued();
        assert!(issued[0].host.is_none());
        assert_eq!(issued[0].command.to_string(), "ovs-vsctl set bridge s2 stp_enable=true");
    }
}
