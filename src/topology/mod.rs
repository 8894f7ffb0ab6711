//! Network topology module.
//!
//! This module contains the static description of the emulated network:
//! switches, hosts and delay-tagged links, the builder that assembles them,
//! and graph checks over the switch fabric.

pub mod types;
pub mod builder;
pub mod graph;

// Re-export key types and functions for easier access
pub use types::{Endpoint, InterfaceAddress, Link, Node, NodeKind, Topology, TopologyError};
pub use builder::{loop_topology, nat_topology, TopologyBuilder, HOST_LINK_DELAY, SWITCH_LINK_DELAY};
pub use graph::{inter_switch_degree, switch_cycles, cycles_share_edge};
