//! # Scripted Fault Templates
//!
//! Pre-built faults that exercise propagation edge cases:
//! - **Wormhole toggle**: a high-quality tunnel between two distant nodes
//!   that opens and severs on a fixed period
//! - **Edge blackout**: an edge pair drops dead for a window, then recovers
//!
//! The wormhole exists in two shapes: [`WormholeFault`] binds to a live
//! medium and flips state in place (the scripted stimulus), while
//! [`WormholeScenario`] precomputes the same toggles as
//! [`ScenarioFrame`]s for frame players.

use std::fmt;
use std::time::Duration;

use aether_medium::{DirectedGraphMedium, LinkAdjustment, MediumError, NodeId};

use crate::scenario::{EdgeAction, ScenarioFrame};

/// Whether the wormhole tunnel currently carries traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WormholeState {
    Open,
    Severed,
}

impl fmt::Display for WormholeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WormholeState::Open => write!(f, "open"),
            WormholeState::Severed => write!(f, "severed"),
        }
    }
}

/// A bound wormhole between two fixed nodes.
///
/// Binding locates the two directed edges between the pair and fails fast
/// when either direction is missing. State is always read from the medium,
/// never cached, so ratio writes from elsewhere are picked up on the next
/// toggle. A pair whose directions disagree counts as open and the next
/// toggle severs both.
#[derive(Debug, Clone, Copy)]
pub struct WormholeFault {
    node_a: NodeId,
    node_b: NodeId,
    tunnel_ratio: f64,
    severed_ratio: f64,
}

impl WormholeFault {
    pub fn bind(
        medium: &DirectedGraphMedium,
        node_a: NodeId,
        node_b: NodeId,
    ) -> Result<Self, MediumError> {
        medium.edge_pair(node_a, node_b)?;
        Ok(WormholeFault {
            node_a,
            node_b,
            tunnel_ratio: 1.0,
            severed_ratio: 0.0,
        })
    }

    pub fn with_ratios(mut self, tunnel_ratio: f64, severed_ratio: f64) -> Self {
        self.tunnel_ratio = tunnel_ratio.clamp(0.0, 1.0);
        self.severed_ratio = severed_ratio.clamp(0.0, 1.0);
        self
    }

    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.node_a, self.node_b)
    }

    /// Current state, judged by the forward edge's ratio.
    pub fn state(&self, medium: &DirectedGraphMedium) -> Result<WormholeState, MediumError> {
        let (forward, _) = medium.edge_pair(self.node_a, self.node_b)?;
        if forward.quality.ratio == self.severed_ratio {
            Ok(WormholeState::Severed)
        } else {
            Ok(WormholeState::Open)
        }
    }

    /// Flip both directions to the opposite state and request re-analysis.
    /// Returns the state the pair is now in.
    pub fn toggle(&self, medium: &mut DirectedGraphMedium) -> Result<WormholeState, MediumError> {
        let next = match self.state(medium)? {
            WormholeState::Severed => WormholeState::Open,
            WormholeState::Open => WormholeState::Severed,
        };
        let ratio = match next {
            WormholeState::Open => self.tunnel_ratio,
            WormholeState::Severed => self.severed_ratio,
        };
        medium.set_ratio(self.node_a, self.node_b, ratio)?;
        medium.set_ratio(self.node_b, self.node_a, ratio)?;
        medium.request_edge_analysis();
        Ok(next)
    }
}

/// The wormhole toggle as a precomputed periodic schedule.
#[derive(Debug, Clone)]
pub struct WormholeScenario {
    pub node_a: NodeId,
    pub node_b: NodeId,
    /// Time between toggles.
    pub period: Duration,
    /// Number of toggles to emit.
    pub cycles: u64,
    pub tunnel_ratio: f64,
    pub severed_ratio: f64,
    /// State written by the first frame.
    pub start_open: bool,
}

impl Default for WormholeScenario {
    fn default() -> Self {
        WormholeScenario {
            node_a: NodeId(1),
            node_b: NodeId(2),
            period: Duration::from_millis(1000),
            cycles: 10,
            tunnel_ratio: 1.0,
            severed_ratio: 0.0,
            start_open: true,
        }
    }
}

impl WormholeScenario {
    /// Generate frames. Frame `k` writes the same ratio to both directions,
    /// alternating between tunnel and severed each period.
    pub fn frames(&self) -> Vec<ScenarioFrame> {
        (0..self.cycles)
            .map(|k| {
                let open = (k % 2 == 0) == self.start_open;
                let ratio = if open {
                    self.tunnel_ratio
                } else {
                    self.severed_ratio
                };
                let adjust = LinkAdjustment::ratio(ratio);
                ScenarioFrame {
                    t: self.period.mul_f64(k as f64),
                    actions: vec![
                        EdgeAction {
                            source: self.node_a,
                            dest: self.node_b,
                            adjust,
                        },
                        EdgeAction {
                            source: self.node_b,
                            dest: self.node_a,
                            adjust,
                        },
                    ],
                }
            })
            .collect()
    }
}

/// An edge pair goes dead for a window, then recovers.
#[derive(Debug, Clone)]
pub struct EdgeBlackoutScenario {
    /// Total scenario duration.
    pub duration: Duration,
    /// Time step between frames.
    pub step: Duration,
    /// Node pairs taken down during the window (both directions).
    pub pairs: Vec<(NodeId, NodeId)>,
    /// When the blackout starts.
    pub blackout_start: Duration,
    /// How long the blackout lasts.
    pub blackout_duration: Duration,
    /// Ratio outside the blackout window.
    pub normal_ratio: f64,
}

impl Default for EdgeBlackoutScenario {
    fn default() -> Self {
        EdgeBlackoutScenario {
            duration: Duration::from_secs(30),
            step: Duration::from_secs(1),
            pairs: Vec::new(),
            blackout_start: Duration::from_secs(10),
            blackout_duration: Duration::from_secs(5),
            normal_ratio: 1.0,
        }
    }
}

impl EdgeBlackoutScenario {
    /// Generate frames. Listed pairs go to ratio 0 during the window.
    pub fn frames(&self) -> Vec<ScenarioFrame> {
        let total_steps = (self.duration.as_secs_f64() / self.step.as_secs_f64()).ceil() as u64;
        let blackout_end = self.blackout_start + self.blackout_duration;

        (0..=total_steps)
            .map(|i| {
                let t = self.step.mul_f64(i as f64);
                let in_blackout = t >= self.blackout_start && t < blackout_end;
                let ratio = if in_blackout { 0.0 } else { self.normal_ratio };
                let adjust = LinkAdjustment::ratio(ratio);

                let actions = self
                    .pairs
                    .iter()
                    .flat_map(|&(a, b)| {
                        [
                            EdgeAction {
                                source: a,
                                dest: b,
                                adjust,
                            },
                            EdgeAction {
                                source: b,
                                dest: a,
                                adjust,
                            },
                        ]
                    })
                    .collect();

                ScenarioFrame { t, actions }
            })
            .collect()
    }
}
