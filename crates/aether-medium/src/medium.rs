use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::RngExt as _;
use rand::SeedableRng;
use thiserror::Error;

use crate::edge::{Edge, LinkAdjustment, NodeId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediumError {
    #[error("self-loop edge on node {node}")]
    SelfLoop { node: NodeId },
    #[error("duplicate edge {src} -> {dest}")]
    DuplicateEdge { src: NodeId, dest: NodeId },
    #[error("no edge {src} -> {dest}")]
    UnknownEdge { src: NodeId, dest: NodeId },
    #[error("nodes {a} and {b} are not linked in both directions")]
    MissingEdgePair { a: NodeId, b: NodeId },
}

/// A packet that made it across one directed edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub source: NodeId,
    pub dest: NodeId,
    pub signal_dbm: f64,
    pub lqi: u8,
    /// Propagation delay relative to the transmission instant.
    pub delay: Duration,
    pub payload: Bytes,
}

/// Counters over the medium's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediumStats {
    pub transmissions: u64,
    pub deliveries: u64,
    pub analyses: u64,
    pub analysis_requests: u64,
}

/// Directed-graph radio medium.
///
/// Edges are identified by their `(source, dest)` pair; duplicates and
/// self-loops are rejected at insert. Structural mutations (add/remove
/// edge, node registration) flag the propagation table dirty on their own.
/// Quality mutations do **not**: callers that change ratios mid-run ask
/// for a re-analysis explicitly via [`request_edge_analysis`], and the
/// rebuild happens lazily before the next transmission.
///
/// [`request_edge_analysis`]: DirectedGraphMedium::request_edge_analysis
pub struct DirectedGraphMedium {
    nodes: BTreeSet<NodeId>,
    edges: Vec<Edge>,
    /// Outgoing edge indices per source, rebuilt by `analyze_edges`.
    table: HashMap<NodeId, Vec<usize>>,
    needs_analysis: bool,
    rng: StdRng,
    stats: MediumStats,
}

impl DirectedGraphMedium {
    /// A deterministic medium: the same seed yields the same delivery
    /// outcomes for the same transmission sequence.
    pub fn new(seed: u64) -> Self {
        DirectedGraphMedium {
            nodes: BTreeSet::new(),
            edges: Vec::new(),
            table: HashMap::new(),
            needs_analysis: false,
            rng: StdRng::seed_from_u64(seed),
            stats: MediumStats::default(),
        }
    }

    pub fn register_node(&mut self, node: NodeId) {
        if self.nodes.insert(node) {
            self.needs_analysis = true;
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn add_edge(&mut self, edge: Edge) -> Result<(), MediumError> {
        if edge.source == edge.dest {
            return Err(MediumError::SelfLoop { node: edge.source });
        }
        if self.edge(edge.source, edge.dest).is_some() {
            return Err(MediumError::DuplicateEdge {
                src: edge.source,
                dest: edge.dest,
            });
        }
        self.edges.push(edge);
        self.needs_analysis = true;
        Ok(())
    }

    pub fn remove_edge(&mut self, source: NodeId, dest: NodeId) -> Result<Edge, MediumError> {
        let idx = self
            .edges
            .iter()
            .position(|e| e.source == source && e.dest == dest)
            .ok_or(MediumError::UnknownEdge { src: source, dest })?;
        let removed = self.edges.remove(idx);
        self.needs_analysis = true;
        Ok(removed)
    }

    pub fn edge(&self, source: NodeId, dest: NodeId) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|e| e.source == source && e.dest == dest)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// All edges connecting `a` and `b`, in either direction.
    pub fn edges_between(&self, a: NodeId, b: NodeId) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.connects(a, b)).collect()
    }

    /// Exactly the two directed edges `a -> b` and `b -> a`, in that order.
    pub fn edge_pair(&self, a: NodeId, b: NodeId) -> Result<(Edge, Edge), MediumError> {
        let forward = self.edge(a, b).copied();
        let back = self.edge(b, a).copied();
        match (forward, back) {
            (Some(f), Some(b)) => Ok((f, b)),
            _ => Err(MediumError::MissingEdgePair { a, b }),
        }
    }

    /// Apply a partial quality update to the directed edge `source -> dest`.
    ///
    /// Does not flag re-analysis; pair with [`request_edge_analysis`]
    /// when the change should be picked up by the propagation rebuild.
    ///
    /// [`request_edge_analysis`]: DirectedGraphMedium::request_edge_analysis
    pub fn adjust_edge(
        &mut self,
        source: NodeId,
        dest: NodeId,
        adjust: &LinkAdjustment,
    ) -> Result<(), MediumError> {
        let edge = self
            .edges
            .iter_mut()
            .find(|e| e.source == source && e.dest == dest)
            .ok_or(MediumError::UnknownEdge { src: source, dest })?;
        adjust.apply_to(&mut edge.quality);
        Ok(())
    }

    /// Set the success ratio of `source -> dest`, returning the previous
    /// value. Clamps to `[0, 1]`.
    pub fn set_ratio(
        &mut self,
        source: NodeId,
        dest: NodeId,
        ratio: f64,
    ) -> Result<f64, MediumError> {
        let edge = self
            .edges
            .iter_mut()
            .find(|e| e.source == source && e.dest == dest)
            .ok_or(MediumError::UnknownEdge { src: source, dest })?;
        let previous = edge.quality.ratio;
        edge.quality.ratio = ratio.clamp(0.0, 1.0);
        Ok(previous)
    }

    /// Flag the propagation table for a rebuild before the next
    /// transmission. Repeated requests coalesce into a single rebuild.
    pub fn request_edge_analysis(&mut self) {
        self.needs_analysis = true;
        self.stats.analysis_requests += 1;
    }

    pub fn analysis_pending(&self) -> bool {
        self.needs_analysis
    }

    /// Rebuild the per-source propagation table now.
    pub fn analyze_edges(&mut self) {
        let mut table: HashMap<NodeId, Vec<usize>> = HashMap::new();
        for (idx, edge) in self.edges.iter().enumerate() {
            if !self.nodes.contains(&edge.source) || !self.nodes.contains(&edge.dest) {
                tracing::warn!(
                    source = %edge.source,
                    dest = %edge.dest,
                    "edge references unregistered node"
                );
            }
            table.entry(edge.source).or_default().push(idx);
        }
        tracing::debug!(
            edges = self.edges.len(),
            sources = table.len(),
            "edge analysis complete"
        );
        self.table = table;
        self.needs_analysis = false;
        self.stats.analyses += 1;
    }

    fn maybe_analyze(&mut self) {
        if self.needs_analysis {
            self.analyze_edges();
        }
    }

    /// Transmit one packet from `source`.
    ///
    /// Runs any pending edge analysis first, then samples each outgoing
    /// edge's success ratio. Sources with no outgoing edges reach nobody.
    pub fn transmit(&mut self, source: NodeId, payload: Bytes) -> Vec<Delivery> {
        self.maybe_analyze();
        self.stats.transmissions += 1;

        let outgoing: Vec<usize> = match self.table.get(&source) {
            Some(indices) => indices.clone(),
            None => return Vec::new(),
        };

        let mut deliveries = Vec::new();
        for idx in outgoing {
            let edge = self.edges[idx];
            if self.rng.random::<f64>() < edge.quality.ratio {
                deliveries.push(Delivery {
                    source: edge.source,
                    dest: edge.dest,
                    signal_dbm: edge.quality.signal_dbm,
                    lqi: edge.quality.lqi,
                    delay: edge.quality.delay,
                    payload: payload.clone(),
                });
            }
        }
        self.stats.deliveries += deliveries.len() as u64;
        deliveries
    }

    pub fn stats(&self) -> MediumStats {
        self.stats
    }
}

impl fmt::Display for DirectedGraphMedium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dgrm ({} nodes, {} edges)",
            self.nodes.len(),
            self.edges.len()
        )
    }
}
