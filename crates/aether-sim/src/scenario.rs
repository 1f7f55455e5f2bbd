use aether_medium::{LinkAdjustment, NodeId};
use rand::rngs::StdRng;
use rand::RngExt as _;
use rand::SeedableRng;
use std::time::Duration;

/// One edge adjustment within a frame.
#[derive(Debug, Clone)]
pub struct EdgeAction {
    pub source: NodeId,
    pub dest: NodeId,
    pub adjust: LinkAdjustment,
}

/// A single time-step of adjustments across edges.
#[derive(Debug, Clone)]
pub struct ScenarioFrame {
    pub t: Duration,
    pub actions: Vec<EdgeAction>,
}

/// Configuration for a deterministic ratio random-walk.
#[derive(Debug, Clone)]
pub struct RatioWalkConfig {
    pub seed: u64,
    pub duration: Duration,
    pub step: Duration,
    pub edges: Vec<EdgeWalkConfig>,
}

/// Per-edge bounds and step sizes for walk generation.
#[derive(Debug, Clone)]
pub struct EdgeWalkConfig {
    pub source: NodeId,
    pub dest: NodeId,
    pub min_ratio: f64,
    pub max_ratio: f64,
    pub ratio_step: f64,
    pub base_delay_ms: u32,
    pub max_delay_ms: u32,
    pub delay_step_ms: u32,
}

/// Deterministic random-walk generator over edge quality.
///
/// Given a seed, produces reproducible sequences of [`ScenarioFrame`]s
/// where each edge's success ratio and delay evolve via random-walk steps
/// clamped to configured bounds. Useful for fading-style chaos runs.
#[derive(Debug)]
pub struct RatioWalk {
    cfg: RatioWalkConfig,
    rng: StdRng,
    states: Vec<WalkState>,
}

#[derive(Debug, Clone)]
struct WalkState {
    ratio: f64,
    delay_ms: f64,
}

impl RatioWalk {
    pub fn new(cfg: RatioWalkConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let states = cfg
            .edges
            .iter()
            .map(|edge| {
                let range = (edge.max_ratio - edge.min_ratio).max(0.0);
                let ratio = edge.min_ratio + rng.random::<f64>() * range;
                WalkState {
                    ratio,
                    delay_ms: edge.base_delay_ms as f64,
                }
            })
            .collect();

        Self { cfg, rng, states }
    }

    pub fn frames(&mut self) -> Vec<ScenarioFrame> {
        let mut frames = Vec::new();
        let total_steps =
            (self.cfg.duration.as_secs_f64() / self.cfg.step.as_secs_f64()).ceil() as u64;

        for step_idx in 0..=total_steps {
            let t = self.cfg.step.mul_f64(step_idx as f64);
            let mut actions = Vec::with_capacity(self.cfg.edges.len());

            for idx in 0..self.cfg.edges.len() {
                let edge_cfg = self.cfg.edges[idx].clone();
                let ratio_delta = rand_signed(&mut self.rng, edge_cfg.ratio_step);
                let delay_delta = rand_signed(&mut self.rng, edge_cfg.delay_step_ms as f64);

                let state = &mut self.states[idx];
                state.ratio = (state.ratio + ratio_delta)
                    .clamp(edge_cfg.min_ratio, edge_cfg.max_ratio)
                    .clamp(0.0, 1.0);
                state.delay_ms =
                    (state.delay_ms + delay_delta).clamp(0.0, edge_cfg.max_delay_ms as f64);

                actions.push(EdgeAction {
                    source: edge_cfg.source,
                    dest: edge_cfg.dest,
                    adjust: LinkAdjustment {
                        ratio: Some(state.ratio),
                        delay: Some(Duration::from_millis(state.delay_ms as u64)),
                        ..Default::default()
                    },
                });
            }

            frames.push(ScenarioFrame { t, actions });
        }

        frames
    }
}

fn rand_signed(rng: &mut StdRng, max_step: f64) -> f64 {
    if max_step <= 0.0 {
        return 0.0;
    }
    let mag = rng.random::<f64>() * max_step;
    if rng.random::<bool>() {
        mag
    } else {
        -mag
    }
}
