//! Graph checks over the switch fabric.
//!
//! The loop experiments rely on the fabric containing several cycles that
//! overlap, so a mitigation mechanism has to block at least one link.

use std::collections::{BTreeMap, BTreeSet};

use super::types::Topology;

/// Undirected edge with endpoints in sorted order
pub type Edge = (String, String);

fn edge(a: &str, b: &str) -> Edge {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Number of inter-switch links per switch
pub fn inter_switch_degree(topology: &Topology) -> BTreeMap<String, usize> {
    let mut degrees: BTreeMap<String, usize> =
        topology.switches().map(|s| (s.name.clone(), 0)).collect();
    for link in topology.inter_switch_links() {
        *degrees.entry(link.a.node.clone()).or_default() += 1;
        *degrees.entry(link.b.node.clone()).or_default() += 1;
    }
    degrees
}

/// All simple cycles of the switch fabric, each as its set of edges.
///
/// Exhaustive search; only meant for small fabrics.
pub fn switch_cycles(topology: &Topology) -> Vec<BTreeSet<Edge>> {
    let mut adjacency: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for link in topology.inter_switch_links() {
        adjacency.entry(&link.a.node).or_default().insert(&link.b.node);
        adjacency.entry(&link.b.node).or_default().insert(&link.a.node);
    }

    let mut cycles: BTreeSet<BTreeSet<Edge>> = BTreeSet::new();
    for &start in adjacency.keys() {
        let mut path = vec![start];
        extend_path(&adjacency, start, &mut path, &mut cycles);
    }
    cycles.into_iter().collect()
}

fn extend_path<'a>(
    adjacency: &BTreeMap<&'a str, BTreeSet<&'a str>>,
    start: &'a str,
    path: &mut Vec<&'a str>,
    cycles: &mut BTreeSet<BTreeSet<Edge>>,
) {
    let Some(&last) = path.last() else { return };
    let Some(neighbours) = adjacency.get(last) else { return };

    for &next in neighbours {
        if next == start && path.len() >= 3 {
            let mut edges: BTreeSet<Edge> = path.windows(2).map(|w| edge(w[0], w[1])).collect();
            edges.insert(edge(last, start));
            cycles.insert(edges);
        } else if next > start && !path.contains(&next) {
            // Only visit nodes ordered after the start so each cycle is rooted once
            path.push(next);
            extend_path(adjacency, start, path, cycles);
            path.pop();
        }
    }
}

/// Returns true if at least two distinct cycles share an edge
pub fn cycles_share_edge(cycles: &[BTreeSet<Edge>]) -> bool {
    cycles.iter().enumerate().any(|(i, c1)| {
        cycles[i + 1..].iter().any(|c2| c1.intersection(c2).next().is_some())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::builder::{loop_topology, nat_topology, TopologyBuilder, SWITCH_LINK_DELAY};

    #[test]
    fn test_loop_fabric_degrees() {
        let topo = loop_topology().unwrap();
        let degrees = inter_switch_degree(&topo);
        assert_eq!(degrees.len(), 4);
        assert!(degrees.values().all(|&d| d >= 2));
        assert_eq!(degrees["s1"], 3);
        assert_eq!(degrees["s3"], 3);
        assert_eq!(degrees["s2"], 2);
    }

    #[test]
    fn test_loop_fabric_has_overlapping_cycles() {
        let topo = loop_topology().unwrap();
        let cycles = switch_cycles(&topo);
        // s1-s2-s3, s1-s3-s4 and the outer ring
        assert_eq!(cycles.len(), 3);
        assert!(cycles_share_edge(&cycles));
        let chord = edge("s1", "s3");
        assert_eq!(cycles.iter().filter(|c| c.contains(&chord)).count(), 2);
    }

    #[test]
    fn test_nat_fabric_keeps_loops() {
        let topo = nat_topology().unwrap();
        assert!(cycles_share_edge(&switch_cycles(&topo)));
    }

    #[test]
    fn test_ring_without_chord() {
        let mut builder = TopologyBuilder::new();
        for s in ["s1", "s2", "s3", "s4"] {
            builder.add_switch(s).unwrap();
        }
        for (a, b) in [("s1", "s2"), ("s2", "s3"), ("s3", "s4"), ("s4", "s1")] {
            builder.add_link(a, b, SWITCH_LINK_DELAY).unwrap();
        }
        let cycles = switch_cycles(&builder.build());
        assert_eq!(cycles.len(), 1);
        assert!(!cycles_share_edge(&cycles));
    }
}
