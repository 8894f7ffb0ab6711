//! Topology type definitions.
//!
//! Nodes, links and the immutable `Topology` they form. Interface names
//! follow the emulator convention `{node}-eth{k}`.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors raised while assembling or querying a topology
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("Duplicate node name: {0}")]
    DuplicateNode(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Duplicate interface {interface} on node {node}")]
    DuplicateInterface { node: String, interface: String },

    #[error("Link from {0} to itself")]
    SelfLink(String),

    #[error("Node {node} is not a {expected}")]
    WrongKind { node: String, expected: NodeKind },

    #[error("Invalid interface address '{0}'")]
    InvalidAddress(String),
}

/// Kind of a node in the emulated network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Forwarding-plane element; never originates probe traffic
    Switch,
    /// End host; originates and receives probes
    Host,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Switch => write!(f, "switch"),
            NodeKind::Host => write!(f, "host"),
        }
    }
}

/// IPv4 address with prefix length, e.g. `10.0.0.2/24`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceAddress {
    pub ip: Ipv4Addr,
    pub prefix_len: u8,
}

impl InterfaceAddress {
    pub fn new(ip: Ipv4Addr, prefix_len: u8) -> Self {
        Self { ip, prefix_len }
    }
}

impl FromStr for InterfaceAddress {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TopologyError::InvalidAddress(s.to_string());
        let (ip, prefix) = s.split_once('/').ok_or_else(invalid)?;
        let ip: Ipv4Addr = ip.parse().map_err(|_| invalid())?;
        let prefix_len: u8 = prefix.parse().map_err(|_| invalid())?;
        if prefix_len > 32 {
            return Err(invalid());
        }
        Ok(Self { ip, prefix_len })
    }
}

impl fmt::Display for InterfaceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ip, self.prefix_len)
    }
}

/// A switch or host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    /// Construction-time address of the host's first interface
    pub address: Option<InterfaceAddress>,
}

impl Node {
    pub fn is_switch(&self) -> bool {
        self.kind == NodeKind::Switch
    }

    pub fn is_host(&self) -> bool {
        self.kind == NodeKind::Host
    }
}

/// One side of a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub node: String,
    pub interface: String,
}

/// Unordered point-to-point link with a propagation delay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub a: Endpoint,
    pub b: Endpoint,
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
}

impl Link {
    /// Returns true if this link touches `node`
    pub fn touches(&self, node: &str) -> bool {
        self.a.node == node || self.b.node == node
    }

    /// The endpoint on `node`, if the link touches it
    pub fn endpoint_on(&self, node: &str) -> Option<&Endpoint> {
        if self.a.node == node {
            Some(&self.a)
        } else if self.b.node == node {
            Some(&self.b)
        } else {
            None
        }
    }

    /// The node on the other side of `node`
    pub fn peer_of(&self, node: &str) -> Option<&str> {
        if self.a.node == node {
            Some(&self.b.node)
        } else if self.b.node == node {
            Some(&self.a.node)
        } else {
            None
        }
    }

    /// Returns true if both ends connect the same pair of nodes, in either order
    pub fn connects(&self, x: &str, y: &str) -> bool {
        (self.a.node == x && self.b.node == y) || (self.a.node == y && self.b.node == x)
    }
}

/// Immutable set of nodes and links, built once by `TopologyBuilder`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub(crate) nodes: Vec<Node>,
    pub(crate) links: Vec<Link>,
}

impl Topology {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_host())
    }

    pub fn switches(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_switch())
    }

    /// Links whose both ends are switches
    pub fn inter_switch_links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(move |l| self.is_switch(&l.a.node) && self.is_switch(&l.b.node))
    }

    /// All links attached to `node`, in insertion order
    pub fn links_of<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a Link> + 'a {
        self.links.iter().filter(move |l| l.touches(node))
    }

    /// Interfaces of `node` in insertion order
    pub fn interfaces_of(&self, node: &str) -> Vec<&str> {
        self.links
            .iter()
            .filter_map(|l| l.endpoint_on(node))
            .map(|e| e.interface.as_str())
            .collect()
    }

    /// First interface of a host, used for captures and construction-time addressing
    pub fn primary_interface(&self, node: &str) -> Option<&str> {
        self.interfaces_of(node).into_iter().next()
    }

    fn is_switch(&self, name: &str) -> bool {
        self.node(name).map_or(false, Node::is_switch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_address_parsing() {
        let addr: InterfaceAddress = "10.0.0.2/24".parse().unwrap();
        assert_eq!(addr.ip, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(addr.prefix_len, 24);
        assert_eq!(addr.to_string(), "10.0.0.2/24");

        assert!("10.0.0.2".parse::<InterfaceAddress>().is_err());
        assert!("10.0.0.2/33".parse::<InterfaceAddress>().is_err());
        assert!("ten/24".parse::<InterfaceAddress>().is_err());
    }

    #[test]
    fn test_link_helpers() {
        let link = Link {
            a: Endpoint { node: "h1".to_string(), interface: "h1-eth0".to_string() },
            b: Endpoint { node: "s1".to_string(), interface: "s1-eth1".to_string() },
            delay: Duration::from_millis(5),
        };
        assert!(link.connects("s1", "h1"));
        assert_eq!(link.peer_of("h1"), Some("s1"));
        assert_eq!(link.endpoint_on("s1").unwrap().interface, "s1-eth1");
        assert!(link.endpoint_on("s2").is_none());
    }

    #[test]
    fn test_interfaces_outlive_the_queried_name() {
        let topo = crate::topology::loop_topology().unwrap();
        let interfaces = {
            let name = format!("s{}", 1);
            topo.interfaces_of(&name)
        };
        assert_eq!(interfaces, vec!["s1-eth1", "s1-eth2", "s1-eth3", "s1-eth4", "s1-eth5"]);

        let primary = {
            let name = String::from("h3");
            topo.primary_interface(&name)
        };
        assert_eq!(primary, Some("h3-eth0"));
    }
}
