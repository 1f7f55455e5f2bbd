use std::time::Duration;

use aether_medium::{ConnectivitySnapshot, DirectedGraphMedium};
use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};
use tokio::sync::watch;

use crate::faults::{WormholeFault, WormholeState};
use crate::scenario::ScenarioFrame;

/// What the driver just did to the medium.
#[derive(Debug, Clone)]
pub enum SimEvent {
    FrameApplied {
        t: Duration,
        actions: usize,
    },
    WormholeToggled {
        cycle: u64,
        state: WormholeState,
        reachable_a: usize,
        reachable_b: usize,
    },
}

/// Plays scenario frames and scripted faults against a medium.
///
/// The driver stands in for the host simulator's main loop: after every
/// applied frame or toggle it honors the pending analysis request before
/// anything else observes the medium. Consumers subscribe to the applied
/// events by cloning `events_rx`.
pub struct SimDriver {
    medium: DirectedGraphMedium,
    cycle: u64,
    events_tx: Sender<SimEvent>,
    pub events_rx: Receiver<SimEvent>,
}

impl SimDriver {
    pub fn new(medium: DirectedGraphMedium) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        SimDriver {
            medium,
            cycle: 0,
            events_tx,
            events_rx,
        }
    }

    pub fn medium(&self) -> &DirectedGraphMedium {
        &self.medium
    }

    pub fn medium_mut(&mut self) -> &mut DirectedGraphMedium {
        &mut self.medium
    }

    /// Apply every action of one frame, then re-analyze.
    pub fn apply_frame(&mut self, frame: &ScenarioFrame) -> Result<()> {
        for action in &frame.actions {
            self.medium
                .adjust_edge(action.source, action.dest, &action.adjust)?;
        }
        self.medium.request_edge_analysis();
        self.medium.analyze_edges();
        let _ = self.events_tx.send(SimEvent::FrameApplied {
            t: frame.t,
            actions: frame.actions.len(),
        });
        Ok(())
    }

    /// Apply all frames in virtual time, ignoring their timestamps.
    pub fn run_frames(&mut self, frames: &[ScenarioFrame]) -> Result<usize> {
        for frame in frames {
            self.apply_frame(frame)?;
        }
        Ok(frames.len())
    }

    /// Apply one wormhole toggle and report the resulting connectivity.
    pub fn toggle_wormhole(&mut self, fault: &WormholeFault) -> Result<WormholeState> {
        let state = fault.toggle(&mut self.medium)?;
        if self.medium.analysis_pending() {
            self.medium.analyze_edges();
        }
        self.cycle += 1;

        let (a, b) = fault.endpoints();
        let snapshot = ConnectivitySnapshot::snapshot(&self.medium);
        let reachable_a = snapshot.reachable_from(a).len();
        let reachable_b = snapshot.reachable_from(b).len();

        tracing::info!(
            cycle = self.cycle,
            state = %state,
            reachable_a,
            reachable_b,
            "wormhole toggled"
        );
        let _ = self.events_tx.send(SimEvent::WormholeToggled {
            cycle: self.cycle,
            state,
            reachable_a,
            reachable_b,
        });
        Ok(state)
    }

    /// Toggle the wormhole on a fixed period until the cycle limit is hit
    /// or `shutdown` flips to true. `cycles: None` runs until shutdown.
    /// Returns the number of toggles performed.
    pub async fn run_wormhole_paced(
        &mut self,
        fault: &WormholeFault,
        period: Duration,
        cycles: Option<u64>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<u64> {
        let mut interval = tokio::time::interval(period);
        let mut done = 0u64;

        loop {
            if let Some(limit) = cycles {
                if done >= limit {
                    break;
                }
            }
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!(cycles = done, "wormhole loop stopped");
                        break;
                    }
                }
                _ = interval.tick() => {
                    self.toggle_wormhole(fault)?;
                    done += 1;
                }
            }
        }
        Ok(done)
    }
}
