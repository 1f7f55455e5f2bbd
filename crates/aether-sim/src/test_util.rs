use aether_medium::{DirectedGraphMedium, Edge, LinkQuality, NodeId};

/// A small topology with a severed wormhole pair between nodes 2 and 25:
/// `1 <-> 2` and `3 <-> 25` are healthy neighbor links, `2 <-> 25` exists
/// in both directions at ratio 0.
pub fn wormhole_topology(seed: u64) -> DirectedGraphMedium {
    let mut medium = DirectedGraphMedium::new(seed);
    for id in [1, 2, 3, 25] {
        medium.register_node(NodeId(id));
    }

    let healthy = [(1, 2), (2, 1), (3, 25), (25, 3)];
    for (source, dest) in healthy {
        medium
            .add_edge(Edge::new(
                NodeId(source),
                NodeId(dest),
                LinkQuality::default(),
            ))
            .expect("healthy edge");
    }
    for (source, dest) in [(2, 25), (25, 2)] {
        medium
            .add_edge(Edge::new(
                NodeId(source),
                NodeId(dest),
                LinkQuality::with_ratio(0.0),
            ))
            .expect("wormhole edge");
    }
    medium
}
