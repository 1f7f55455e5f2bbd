use std::collections::HashSet;
use std::time::Duration;

use aether_medium::{DirectedGraphMedium, Edge, LinkQuality, MediumError, NodeId};
use serde::Deserialize;

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimConfigInput {
    pub version: u32,
    pub seed: u64,
    pub edges: Vec<EdgeConfigInput>,
    pub wormhole: Option<WormholeConfigInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EdgeConfigInput {
    pub source: u32,
    pub dest: u32,
    pub ratio: Option<f64>,
    pub signal_dbm: Option<f64>,
    pub lqi: Option<u8>,
    pub delay_ms: Option<u64>,
    /// Also emit the reverse direction with the same quality.
    pub bidirectional: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WormholeConfigInput {
    pub node_a: u32,
    pub node_b: u32,
    pub period_ms: Option<u64>,
    pub cycles: Option<u64>,
    pub tunnel_ratio: Option<f64>,
    pub severed_ratio: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct WormholeConfig {
    pub node_a: NodeId,
    pub node_b: NodeId,
    pub period: Duration,
    /// `None` toggles until shutdown.
    pub cycles: Option<u64>,
    pub tunnel_ratio: f64,
    pub severed_ratio: f64,
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub version: u32,
    pub seed: u64,
    pub edges: Vec<Edge>,
    pub wormhole: WormholeConfig,
}

impl SimConfigInput {
    pub fn resolve(self) -> Result<SimConfig, String> {
        let version = if self.version == 0 {
            CONFIG_VERSION
        } else {
            self.version
        };
        if version != CONFIG_VERSION {
            return Err(format!("Unsupported config version {}", version));
        }

        let mut used: HashSet<(u32, u32)> = HashSet::new();
        let mut edges = Vec::new();
        for input in self.edges {
            if input.source == input.dest {
                continue;
            }
            let quality = LinkQuality {
                ratio: input.ratio.unwrap_or(1.0).clamp(0.0, 1.0),
                signal_dbm: input.signal_dbm.unwrap_or(LinkQuality::default().signal_dbm),
                lqi: input.lqi.unwrap_or(LinkQuality::default().lqi),
                delay: Duration::from_millis(input.delay_ms.unwrap_or(0)),
            };
            if used.insert((input.source, input.dest)) {
                edges.push(Edge::new(
                    NodeId(input.source),
                    NodeId(input.dest),
                    quality,
                ));
            }
            if input.bidirectional && used.insert((input.dest, input.source)) {
                edges.push(Edge::new(
                    NodeId(input.dest),
                    NodeId(input.source),
                    quality,
                ));
            }
        }

        let wormhole = self.wormhole.ok_or("missing [wormhole] table")?;
        if wormhole.node_a == wormhole.node_b {
            return Err(format!(
                "wormhole endpoints must differ, got {} twice",
                wormhole.node_a
            ));
        }
        let (a, b) = (wormhole.node_a, wormhole.node_b);
        if !used.contains(&(a, b)) || !used.contains(&(b, a)) {
            return Err(format!("wormhole pair {a} <-> {b} is not linked in both directions"));
        }

        Ok(SimConfig {
            version,
            seed: self.seed,
            edges,
            wormhole: WormholeConfig {
                node_a: NodeId(a),
                node_b: NodeId(b),
                period: Duration::from_millis(wormhole.period_ms.unwrap_or(1000)),
                cycles: wormhole.cycles,
                tunnel_ratio: wormhole.tunnel_ratio.unwrap_or(1.0).clamp(0.0, 1.0),
                severed_ratio: wormhole.severed_ratio.unwrap_or(0.0).clamp(0.0, 1.0),
            },
        })
    }
}

impl SimConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, String> {
        let parsed: SimConfigInput =
            toml::from_str(input).map_err(|e| format!("Invalid config TOML: {}", e))?;
        parsed.resolve()
    }

    /// Construct the medium described by this config: nodes are inferred
    /// from edge endpoints.
    pub fn build_medium(&self) -> Result<DirectedGraphMedium, MediumError> {
        let mut medium = DirectedGraphMedium::new(self.seed);
        for edge in &self.edges {
            medium.register_node(edge.source);
            medium.register_node(edge.dest);
        }
        for edge in &self.edges {
            medium.add_edge(*edge)?;
        }
        Ok(medium)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_toml_config_basic() {
        let toml = r#"
            version = 1
            seed = 7

            [[edges]]
            source = 1
            dest = 2
            bidirectional = true

            [[edges]]
            source = 2
            dest = 25
            ratio = 0.0
            delay_ms = 3
            bidirectional = true

            [wormhole]
            node_a = 2
            node_b = 25
            cycles = 20
        "#;

        let cfg = SimConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.version, CONFIG_VERSION);
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.edges.len(), 4);
        assert_eq!(cfg.wormhole.node_a, NodeId(2));
        assert_eq!(cfg.wormhole.node_b, NodeId(25));
        // Defaults
        assert_eq!(cfg.wormhole.period, Duration::from_millis(1000));
        assert_eq!(cfg.wormhole.cycles, Some(20));
        assert_eq!(cfg.wormhole.tunnel_ratio, 1.0);
        assert_eq!(cfg.wormhole.severed_ratio, 0.0);

        let wormhole_edge = cfg
            .edges
            .iter()
            .find(|e| e.source == NodeId(2) && e.dest == NodeId(25))
            .unwrap();
        assert_eq!(wormhole_edge.quality.ratio, 0.0);
        assert_eq!(wormhole_edge.quality.delay, Duration::from_millis(3));
    }

    #[test]
    fn parse_toml_config_dedup_first_wins() {
        let toml = r#"
            [[edges]]
            source = 2
            dest = 25
            ratio = 0.4
            bidirectional = true
            [[edges]]
            source = 25
            dest = 2
            ratio = 0.9
            [wormhole]
            node_a = 2
            node_b = 25
        "#;
        let cfg = SimConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.edges.len(), 2);
        let back = cfg
            .edges
            .iter()
            .find(|e| e.source == NodeId(25))
            .unwrap();
        assert_eq!(back.quality.ratio, 0.4);
    }

    #[test]
    fn self_loop_edges_are_skipped() {
        let toml = r#"
            [[edges]]
            source = 2
            dest = 2
            [[edges]]
            source = 2
            dest = 25
            bidirectional = true
            [wormhole]
            node_a = 2
            node_b = 25
        "#;
        let cfg = SimConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.edges.len(), 2);
    }

    #[test]
    fn missing_wormhole_table_is_an_error() {
        let err = SimConfig::from_toml_str("").unwrap_err();
        assert!(err.contains("wormhole"), "unexpected error: {err}");
    }

    #[test]
    fn incomplete_pair_is_an_error() {
        let toml = r#"
            [[edges]]
            source = 2
            dest = 25
            [wormhole]
            node_a = 2
            node_b = 25
        "#;
        let err = SimConfig::from_toml_str(toml).unwrap_err();
        assert!(err.contains("both directions"), "unexpected error: {err}");
    }

    #[test]
    fn identical_endpoints_are_an_error() {
        let toml = r#"
            [[edges]]
            source = 2
            dest = 25
            bidirectional = true
            [wormhole]
            node_a = 25
            node_b = 25
        "#;
        assert!(SimConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn unsupported_version_is_an_error() {
        let toml = r#"
            version = 9
            [wormhole]
            node_a = 1
            node_b = 2
        "#;
        let err = SimConfig::from_toml_str(toml).unwrap_err();
        assert!(err.contains("version"), "unexpected error: {err}");
    }

    #[test]
    fn build_medium_registers_inferred_nodes() {
        let toml = r#"
            [[edges]]
            source = 1
            dest = 2
            bidirectional = true
            [[edges]]
            source = 2
            dest = 25
            ratio = 0.0
            bidirectional = true
            [wormhole]
            node_a = 2
            node_b = 25
        "#;
        let cfg = SimConfig::from_toml_str(toml).unwrap();
        let medium = cfg.build_medium().unwrap();
        let nodes: Vec<NodeId> = medium.nodes().collect();
        assert_eq!(nodes, vec![NodeId(1), NodeId(2), NodeId(25)]);
        assert_eq!(medium.edges().len(), 4);
        medium.edge_pair(NodeId(2), NodeId(25)).unwrap();
    }
}
