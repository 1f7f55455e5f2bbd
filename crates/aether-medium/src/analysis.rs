//! Computed connectivity views over a medium.
//!
//! A [`ConnectivitySnapshot`] walks the edge set at one instant and answers
//! reachability questions over edges with a positive success ratio. It is a
//! read-only view; it does not observe later mutations.

use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::edge::NodeId;
use crate::medium::DirectedGraphMedium;

#[derive(Debug, Clone, Default)]
pub struct ConnectivitySnapshot {
    reachable: HashMap<NodeId, BTreeSet<NodeId>>,
    direct: BTreeSet<(NodeId, NodeId)>,
}

impl ConnectivitySnapshot {
    pub fn snapshot(medium: &DirectedGraphMedium) -> Self {
        let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut direct = BTreeSet::new();
        for edge in medium.edges() {
            if edge.quality.ratio > 0.0 {
                adjacency.entry(edge.source).or_default().push(edge.dest);
                direct.insert((edge.source, edge.dest));
            }
        }

        let mut reachable = HashMap::new();
        for node in medium.nodes() {
            reachable.insert(node, bfs(node, &adjacency));
        }

        ConnectivitySnapshot { reachable, direct }
    }

    /// Nodes transitively reachable from `node`, excluding itself.
    /// Unregistered nodes reach nothing.
    pub fn reachable_from(&self, node: NodeId) -> BTreeSet<NodeId> {
        self.reachable.get(&node).cloned().unwrap_or_default()
    }

    /// Direct edge `a -> b` with positive ratio.
    pub fn connected(&self, a: NodeId, b: NodeId) -> bool {
        self.direct.contains(&(a, b))
    }

    /// Direct positive-ratio edges in both directions.
    pub fn symmetric(&self, a: NodeId, b: NodeId) -> bool {
        self.connected(a, b) && self.connected(b, a)
    }
}

fn bfs(start: NodeId, adjacency: &HashMap<NodeId, Vec<NodeId>>) -> BTreeSet<NodeId> {
    let mut seen = BTreeSet::new();
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        if let Some(next) = adjacency.get(&node) {
            for &dest in next {
                if dest != start && seen.insert(dest) {
                    queue.push_back(dest);
                }
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{Edge, LinkQuality};

    fn chain_medium() -> DirectedGraphMedium {
        // 1 -> 2 -> 3, with 2 -> 3 severed
        let mut medium = DirectedGraphMedium::new(0);
        for id in [1, 2, 3] {
            medium.register_node(NodeId(id));
        }
        medium
            .add_edge(Edge::new(NodeId(1), NodeId(2), LinkQuality::with_ratio(1.0)))
            .unwrap();
        medium
            .add_edge(Edge::new(NodeId(2), NodeId(3), LinkQuality::with_ratio(0.0)))
            .unwrap();
        medium
    }

    #[test]
    fn zero_ratio_edges_break_reachability() {
        let medium = chain_medium();
        let snapshot = ConnectivitySnapshot::snapshot(&medium);

        assert_eq!(snapshot.reachable_from(NodeId(1)), BTreeSet::from([NodeId(2)]));
        assert!(snapshot.reachable_from(NodeId(2)).is_empty());
        assert!(snapshot.connected(NodeId(1), NodeId(2)));
        assert!(!snapshot.connected(NodeId(2), NodeId(3)));
    }

    #[test]
    fn transitive_reachability_over_open_edges() {
        let mut medium = chain_medium();
        medium.set_ratio(NodeId(2), NodeId(3), 0.6).unwrap();
        let snapshot = ConnectivitySnapshot::snapshot(&medium);

        assert_eq!(
            snapshot.reachable_from(NodeId(1)),
            BTreeSet::from([NodeId(2), NodeId(3)])
        );
    }

    #[test]
    fn symmetric_requires_both_directions() {
        let mut medium = chain_medium();
        assert!(!ConnectivitySnapshot::snapshot(&medium).symmetric(NodeId(1), NodeId(2)));

        medium
            .add_edge(Edge::new(NodeId(2), NodeId(1), LinkQuality::with_ratio(1.0)))
            .unwrap();
        assert!(ConnectivitySnapshot::snapshot(&medium).symmetric(NodeId(1), NodeId(2)));
    }

    #[test]
    fn snapshot_is_a_point_in_time_view() {
        let mut medium = chain_medium();
        let before = ConnectivitySnapshot::snapshot(&medium);
        medium.set_ratio(NodeId(1), NodeId(2), 0.0).unwrap();

        assert!(before.connected(NodeId(1), NodeId(2)));
        assert!(!ConnectivitySnapshot::snapshot(&medium).connected(NodeId(1), NodeId(2)));
    }
}
