//! Topology construction.
//!
//! `TopologyBuilder` assembles nodes and links and resolves interface names.
//! `loop_topology` and `nat_topology` are the two fixed experiment layouts:
//! a four-switch ring with one chord, with hosts hanging off the switches,
//! and the same fabric with a NAT translator in front of two private hosts.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::time::Duration;

use super::types::{Endpoint, InterfaceAddress, Link, Node, NodeKind, Topology, TopologyError};

/// Delay applied to every inter-switch link
pub const SWITCH_LINK_DELAY: Duration = Duration::from_millis(7);

/// Delay applied to every host-facing link
pub const HOST_LINK_DELAY: Duration = Duration::from_millis(5);

/// Number of switches in the ring
pub const SWITCH_COUNT: usize = 4;

/// Ring links followed by the chord s1-s3
const FABRIC_LINKS: [(&str, &str); 5] = [
    ("s1", "s2"),
    ("s2", "s3"),
    ("s3", "s4"),
    ("s4", "s1"),
    ("s1", "s3"),
];

/// Incremental builder for a `Topology`
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    nodes: Vec<Node>,
    links: Vec<Link>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_switch(&mut self, name: &str) -> Result<&mut Self, TopologyError> {
        self.add_node(name, NodeKind::Switch, None)
    }

    pub fn add_host(
        &mut self,
        name: &str,
        address: Option<InterfaceAddress>,
    ) -> Result<&mut Self, TopologyError> {
        self.add_node(name, NodeKind::Host, address)
    }

    fn add_node(
        &mut self,
        name: &str,
        kind: NodeKind,
        address: Option<InterfaceAddress>,
    ) -> Result<&mut Self, TopologyError> {
        if self.nodes.iter().any(|n| n.name == name) {
            return Err(TopologyError::DuplicateNode(name.to_string()));
        }
        self.nodes.push(Node { name: name.to_string(), kind, address });
        Ok(self)
    }

    /// Add a link with emulator-assigned interface names on both ends
    pub fn add_link(&mut self, a: &str, b: &str, delay: Duration) -> Result<&mut Self, TopologyError> {
        self.add_link_with_interfaces(a, None, b, None, delay)
    }

    /// Add a link, optionally pinning the interface name on either end
    pub fn add_link_with_interfaces(
        &mut self,
        a: &str,
        a_interface: Option<&str>,
        b: &str,
        b_interface: Option<&str>,
        delay: Duration,
    ) -> Result<&mut Self, TopologyError> {
        if a == b {
            return Err(TopologyError::SelfLink(a.to_string()));
        }
        let a_end = self.endpoint(a, a_interface)?;
        let b_end = self.endpoint(b, b_interface)?;
        self.links.push(Link { a: a_end, b: b_end, delay });
        Ok(self)
    }

    /// Resolve the interface name for the next link on `node`
    fn endpoint(&self, node: &str, explicit: Option<&str>) -> Result<Endpoint, TopologyError> {
        let kind = self
            .nodes
            .iter()
            .find(|n| n.name == node)
            .map(|n| n.kind)
            .ok_or_else(|| TopologyError::UnknownNode(node.to_string()))?;

        let taken: HashSet<&str> = self
            .links
            .iter()
            .filter_map(|l| l.endpoint_on(node))
            .map(|e| e.interface.as_str())
            .collect();

        let interface = match explicit {
            Some(name) => {
                if taken.contains(name) {
                    return Err(TopologyError::DuplicateInterface {
                        node: node.to_string(),
                        interface: name.to_string(),
                    });
                }
                name.to_string()
            }
            None => {
                // Switch port 0 is the bridge itself
                let first = if kind == NodeKind::Switch { 1 } else { 0 };
                (first..)
                    .map(|k| format!("{}-eth{}", node, k))
                    .find(|candidate| !taken.contains(candidate.as_str()))
                    .unwrap_or_default()
            }
        };

        Ok(Endpoint { node: node.to_string(), interface })
    }

    pub fn build(self) -> Topology {
        Topology { nodes: self.nodes, links: self.links }
    }
}

fn add_fabric(builder: &mut TopologyBuilder) -> Result<(), TopologyError> {
    for i in 1..=SWITCH_COUNT {
        builder.add_switch(&format!("s{}", i))?;
    }
    for (a, b) in FABRIC_LINKS {
        builder.add_link(a, b, SWITCH_LINK_DELAY)?;
    }
    Ok(())
}

/// Switch each host `h1..h8` attaches to: two hosts per switch
fn home_switch(host_index: usize) -> String {
    format!("s{}", (host_index - 1) / 2 + 1)
}

/// Four switches in a ring plus the s1-s3 chord, with hosts h1-h8 on
/// `10.0.0.2-9/24`, two per switch.
pub fn loop_topology() -> Result<Topology, TopologyError> {
    let mut builder = TopologyBuilder::new();
    add_fabric(&mut builder)?;

    for i in 1..=8usize {
        let name = format!("h{}", i);
        let address = InterfaceAddress::new(Ipv4Addr::new(10, 0, 0, i as u8 + 1), 24);
        builder.add_host(&name, Some(address))?;
        builder.add_link(&name, &home_switch(i), HOST_LINK_DELAY)?;
    }

    Ok(builder.build())
}

/// Same switch fabric with public hosts h3-h8 on `172.16.10.0/24` and a
/// translator h9 bridging private hosts h1 and h2 to s1.
///
/// Private hosts and the translator get their addresses after the network
/// starts; see `nat::NatProvisioner::prepare`.
pub fn nat_topology() -> Result<Topology, TopologyError> {
    let mut builder = TopologyBuilder::new();
    add_fabric(&mut builder)?;

    for i in 3..=8usize {
        let name = format!("h{}", i);
        let address = InterfaceAddress::new(Ipv4Addr::new(172, 16, 10, i as u8 + 1), 24);
        builder.add_host(&name, Some(address))?;
        builder.add_link(&name, &home_switch(i), HOST_LINK_DELAY)?;
    }

    builder.add_host("h9", None)?;
    builder.add_host("h1", None)?;
    builder.add_host("h2", None)?;

    builder.add_link_with_interfaces("h1", None, "h9", Some("h9-eth0"), HOST_LINK_DELAY)?;
    builder.add_link_with_interfaces("h2", None, "h9", Some("h9-eth1"), HOST_LINK_DELAY)?;
    builder.add_link_with_interfaces("h9", Some("h9-eth2"), "s1", None, HOST_LINK_DELAY)?;

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_topology_shape() {
        let topo = loop_topology().unwrap();

        assert_eq!(topo.switches().count(), 4);
        assert_eq!(topo.hosts().count(), 8);
        assert_eq!(topo.inter_switch_links().count(), 5);

        for host in topo.hosts() {
            assert_eq!(topo.links_of(&host.name).count(), 1, "{} should have one link", host.name);
        }
        assert!(topo.inter_switch_links().all(|l| l.delay == SWITCH_LINK_DELAY));
        assert!(topo
            .links()
            .iter()
            .filter(|l| l.touches("h1") || l.touches("h8"))
            .all(|l| l.delay == HOST_LINK_DELAY));
    }

    #[test]
    fn test_loop_topology_addresses_and_homes() {
        let topo = loop_topology().unwrap();
        let h1 = topo.node("h1").unwrap();
        assert_eq!(h1.address.unwrap().to_string(), "10.0.0.2/24");
        let h8 = topo.node("h8").unwrap();
        assert_eq!(h8.address.unwrap().to_string(), "10.0.0.9/24");

        let h3_link = topo.links_of("h3").next().unwrap();
        assert_eq!(h3_link.peer_of("h3"), Some("s2"));
        let h7_link = topo.links_of("h7").next().unwrap();
        assert_eq!(h7_link.peer_of("h7"), Some("s4"));
    }

    #[test]
    fn test_interface_naming() {
        let topo = loop_topology().unwrap();
        assert_eq!(topo.primary_interface("h1"), Some("h1-eth0"));
        // s1: s1-s2, s4-s1, s1-s3, h1, h2
        assert_eq!(
            topo.interfaces_of("s1"),
            vec!["s1-eth1", "s1-eth2", "s1-eth3", "s1-eth4", "s1-eth5"]
        );
    }

    #[test]
    fn test_nat_topology_translator() {
        let topo = nat_topology().unwrap();
        assert_eq!(topo.interfaces_of("h9"), vec!["h9-eth0", "h9-eth1", "h9-eth2"]);
        assert!(topo.node("h1").unwrap().address.is_none());
        assert_eq!(topo.node("h3").unwrap().address.unwrap().to_string(), "172.16.10.4/24");
        assert_eq!(topo.inter_switch_links().count(), 5);

        let uplink = topo.links_of("h9").find(|l| l.touches("s1")).unwrap();
        assert_eq!(uplink.endpoint_on("h9").unwrap().interface, "h9-eth2");
        assert_eq!(uplink.delay, HOST_LINK_DELAY);
    }

    #[test]
    fn test_builder_rejects_constant_violations() {
        let mut builder = TopologyBuilder::new();
        builder.add_switch("s1").unwrap();
        assert_eq!(
            builder.add_host("s1", None).unwrap_err(),
            TopologyError::DuplicateNode("s1".to_string())
        );
        assert_eq!(
            builder.add_link("s1", "s9", SWITCH_LINK_DELAY).unwrap_err(),
            TopologyError::UnknownNode("s9".to_string())
        );
        assert_eq!(
            builder.add_link("s1", "s1", SWITCH_LINK_DELAY).unwrap_err(),
            TopologyError::SelfLink("s1".to_string())
        );

        builder.add_host("h1", None).unwrap();
        builder.add_host("h2", None).unwrap();
        builder
            .add_link_with_interfaces("h1", Some("h1-eth0"), "s1", None, HOST_LINK_DELAY)
            .unwrap();
        let err = builder
            .add_link_with_interfaces("h1", Some("h1-eth0"), "h2", None, HOST_LINK_DELAY)
            .unwrap_err();
        assert!(matches!(err, TopologyError::DuplicateInterface { .. }));
    }
}
