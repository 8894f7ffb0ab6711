//! NAT rules and their `iptables`/`sysctl` rendering.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::process::{tools, CommandSpec};

/// Transport protocol of a port forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// Inbound port mapping from the public interface to a private host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortForward {
    pub protocol: Protocol,
    pub port: u16,
    pub destination: Ipv4Addr,
}

/// One step of translator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NatRule {
    /// Turn on IPv4 forwarding
    EnableForwarding,
    /// Source-translate everything leaving through `public`
    Masquerade { public: String },
    /// Allow new traffic from a private interface out through `public`
    ForwardAccept { private: String, public: String },
    /// Allow replies back in to a private interface
    ReturnPath { public: String, private: String },
    /// Destination-translate inbound `port` to the private host
    PortMapping { public: String, forward: PortForward },
    /// Allow the translated inbound traffic through
    PortMappingAccept { forward: PortForward },
}

impl NatRule {
    pub fn to_command(&self) -> CommandSpec {
        match self {
            NatRule::EnableForwarding => tools::enable_ip_forwarding(),
            NatRule::Masquerade { public } => tools::iptables([
                "-t", "nat", "-A", "POSTROUTING", "-o", public.as_str(), "-j", "MASQUERADE",
            ]),
            NatRule::ForwardAccept { private, public } => {
                tools::iptables(["-A", "FORWARD", "-i", private.as_str(), "-o", public.as_str(), "-j", "ACCEPT"])
            }
            NatRule::ReturnPath { public, private } => tools::iptables([
                "-A", "FORWARD", "-i", public.as_str(), "-o", private.as_str(), "-m", "state", "--state",
                "RELATED,ESTABLISHED", "-j", "ACCEPT",
            ]),
            NatRule::PortMapping { public, forward } => {
                tools::iptables(["-t", "nat", "-A", "PREROUTING", "-i", public.as_str(), "-p"])
                    .arg(forward.protocol.to_string())
                    .args(["--dport".to_string(), forward.port.to_string()])
                    .args(["-j", "DNAT", "--to-destination"])
                    .arg(format!("{}:{}", forward.destination, forward.port))
            }
            NatRule::PortMappingAccept { forward } => tools::iptables(["-A", "FORWARD", "-p"])
                .arg(forward.protocol.to_string())
                .arg("-d")
                .arg(forward.destination.to_string())
                .args(["--dport".to_string(), forward.port.to_string()])
                .args(["-j", "ACCEPT"]),
        }
    }
}

/// Ordered translator configuration, applied once
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NatRuleSet {
    rules: Vec<NatRule>,
}

impl NatRuleSet {
    /// Build the rule sequence for a translator: forwarding, masquerade,
    /// per-private-interface accept and return path, then port mappings.
    pub fn for_translator(public: &str, private: &[&str], forwards: &[PortForward]) -> Self {
        let mut rules = vec![
            NatRule::EnableForwarding,
            NatRule::Masquerade { public: public.to_string() },
        ];
        for iface in private {
            rules.push(NatRule::ForwardAccept {
                private: iface.to_string(),
                public: public.to_string(),
            });
        }
        for iface in private {
            rules.push(NatRule::ReturnPath {
                public: public.to_string(),
                private: iface.to_string(),
            });
        }
        for forward in forwards {
            rules.push(NatRule::PortMapping {
                public: public.to_string(),
                forward: forward.clone(),
            });
            rules.push(NatRule::PortMappingAccept { forward: forward.clone() });
        }
        Self { rules }
    }

    pub fn rules(&self) -> &[NatRule] {
        &self.rules
    }

    pub fn commands(&self) -> Vec<CommandSpec> {
        self.rules.iter().map(NatRule::to_command).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwards() -> Vec<PortForward> {
        vec![
            PortForward { protocol: Protocol::Tcp, port: 5001, destination: Ipv4Addr::new(10, 1, 1, 2) },
            PortForward { protocol: Protocol::Tcp, port: 5002, destination: Ipv4Addr::new(10, 1, 2, 2) },
        ]
    }

    #[test]
    fn test_rule_order() {
        let set = NatRuleSet::for_translator("h9-eth2", &["h9-eth0", "h9-eth1"], &forwards());
        let lines: Vec<String> = set.commands().iter().map(|c| c.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "sysctl -w net.ipv4.ip_forward=1",
                "iptables -t nat -A POSTROUTING -o h9-eth2 -j MASQUERADE",
                "iptables -A FORWARD -i h9-eth0 -o h9-eth2 -j ACCEPT",
                "iptables -A FORWARD -i h9-eth1 -o h9-eth2 -j ACCEPT",
                "iptables -A FORWARD -i h9-eth2 -o h9-eth0 -m state --state RELATED,ESTABLISHED -j ACCEPT",
                "iptables -A FORWARD -i h9-eth2 -o h9-eth1 -m state --state RELATED,ESTABLISHED -j ACCEPT",
                "iptables -t nat -A PREROUTING -i h9-eth2 -p tcp --dport 5001 -j DNAT --to-destination 10.1.1.2:5001",
                "iptables -A FORWARD -p tcp -d 10.1.1.2 --dport 5001 -j ACCEPT",
                "iptables -t nat -A PREROUTING -i h9-eth2 -p tcp --dport 5002 -j DNAT --to-destination 10.1.2.2:5002",
                "iptables -A FORWARD -p tcp -d 10.1.2.2 --dport 5002 -j ACCEPT",
            ]
        );
    }

    #[test]
    fn test_without_forwards() {
        let set = NatRuleSet::for_translator("eth1", &["eth0"], &[]);
        assert_eq!(set.len(), 4);
        assert_eq!(set.rules()[0], NatRule::EnableForwarding);
        assert!(!set.is_empty());
    }
}
