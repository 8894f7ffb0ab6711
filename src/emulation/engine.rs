//! Network emulation engines.
//!
//! An engine turns a `Topology` into running namespaces, bridges and links
//! and tears them down again. `NamespaceEngine` does this with `ip netns`,
//! veth pairs, `tc netem` and Open vSwitch, issuing every command through a
//! `ProcessExecutor`.

use std::net::Ipv4Addr;

use log::{debug, info};

use crate::process::{tools, CommandSpec, ExecError, Placement, ProcessExecutor};
use crate::topology::{Endpoint, Link, Topology};

/// How the switches forward frames once started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerAttachment {
    /// Plain L2 learning inside each bridge
    Standalone,
    /// Flows are programmed by an external controller
    Remote { ip: Ipv4Addr, port: u16 },
}

/// Creates and destroys an emulated network
pub trait EmulationEngine {
    /// Instantiate every node and link of `topology`
    fn start(&self, topology: &Topology, attachment: ControllerAttachment) -> Result<(), ExecError>;

    /// Remove everything `start` created. Best-effort.
    fn stop(&self, topology: &Topology);
}

/// Linux namespaces for hosts, Open vSwitch bridges for switches
pub struct NamespaceEngine<'e> {
    exec: &'e dyn ProcessExecutor,
}

impl<'e> NamespaceEngine<'e> {
    pub fn new(exec: &'e dyn ProcessExecutor) -> Self {
        Self { exec }
    }

    fn root(&self, command: &CommandSpec) -> Result<(), ExecError> {
        self.exec.run_checked(Placement::Root, command).map(|_| ())
    }

    fn start_switch(&self, name: &str, attachment: ControllerAttachment) -> Result<(), ExecError> {
        self.root(&tools::ovs_add_bridge(name))?;
        match attachment {
            ControllerAttachment::Standalone => {
                self.root(&tools::ovs_fail_mode(name, "standalone"))?;
            }
            ControllerAttachment::Remote { ip, port } => {
                self.root(&tools::ovs_fail_mode(name, "secure"))?;
                self.root(&tools::ovs_set_controller(name, ip, port))?;
            }
        }
        self.root(&tools::link_up(name))
    }

    /// Remove bridges, root-side veth pairs and host namespaces, ignoring
    /// anything that is already gone.
    fn clear(&self, topology: &Topology) {
        for switch in topology.switches() {
            if let Err(e) = self.exec.run(Placement::Root, &tools::ovs_del_bridge(&switch.name)) {
                debug!("Failed to remove bridge {}: {}", switch.name, e);
            }
        }
        // Switch-to-switch pairs never leave the root namespace
        for link in topology.inter_switch_links() {
            if let Err(e) = self.exec.run(Placement::Root, &tools::link_del(&link.a.interface)) {
                debug!("Failed to remove link {}: {}", link.a.interface, e);
            }
        }
        // Deleting a namespace removes the host ends and their peers
        for host in topology.hosts() {
            if let Err(e) = self.exec.run(Placement::Root, &tools::netns_del(&host.name)) {
                debug!("Failed to remove namespace {}: {}", host.name, e);
            }
        }
    }

    /// Configure one side of a link: hosts get the interface moved into
    /// their namespace, switches get it added as a bridge port.
    fn attach_endpoint(&self, topology: &Topology, end: &Endpoint, link: &Link) -> Result<(), ExecError> {
        let is_switch = topology.node(&end.node).map_or(false, |n| n.is_switch());
        if is_switch {
            self.root(&tools::ovs_add_port(&end.node, &end.interface))?;
            self.root(&tools::link_up(&end.interface))?;
            self.root(&tools::netem_delay(&end.interface, link.delay))?;
        } else {
            self.root(&tools::link_to_netns(&end.interface, &end.node))?;
            let host = Placement::Host(&end.node);
            self.exec.run_checked(host, &tools::link_up(&end.interface))?;
            self.exec.run_checked(host, &tools::netem_delay(&end.interface, link.delay))?;
        }
        Ok(())
    }
}

impl EmulationEngine for NamespaceEngine<'_> {
    fn start(&self, topology: &Topology, attachment: ControllerAttachment) -> Result<(), ExecError> {
        info!(
            "Starting network: {} switches, {} hosts, {} links",
            topology.switches().count(),
            topology.hosts().count(),
            topology.links().len()
        );

        // Leftovers of an interrupted run would make creation fail
        self.clear(topology);

        for host in topology.hosts() {
            self.root(&tools::netns_add(&host.name))?;
            self.exec.run_checked(Placement::Host(&host.name), &tools::link_up("lo"))?;
        }
        for switch in topology.switches() {
            self.start_switch(&switch.name, attachment)?;
        }

        for link in topology.links() {
            debug!("Link {}:{} <-> {}:{} ({:?})", link.a.node, link.a.interface, link.b.node, link.b.interface, link.delay);
            self.root(&tools::veth_pair(&link.a.interface, &link.b.interface))?;
            self.attach_endpoint(topology, &link.a, link)?;
            self.attach_endpoint(topology, &link.b, link)?;
        }

        for host in topology.hosts() {
            let (Some(address), Some(interface)) = (host.address, topology.primary_interface(&host.name)) else {
                continue;
            };
            self.exec
                .run_checked(Placement::Host(&host.name), &tools::addr_add(interface, &address))?;
        }

        info!("Network started");
        Ok(())
    }

    fn stop(&self, topology: &Topology) {
        info!("Stopping network");
        self.clear(topology);
    }
}
