use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identifier of a simulated node (mote).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        NodeId(id)
    }
}

/// Propagation parameters of one directed edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkQuality {
    /// Delivery success probability in `[0, 1]`.
    pub ratio: f64,
    /// Signal strength reported to the destination radio, in dBm.
    pub signal_dbm: f64,
    /// Link quality indicator stamped on deliveries.
    pub lqi: u8,
    /// Propagation delay added to each delivery.
    pub delay: Duration,
}

impl Default for LinkQuality {
    fn default() -> Self {
        LinkQuality {
            ratio: 1.0,
            signal_dbm: -70.0,
            lqi: 105,
            delay: Duration::ZERO,
        }
    }
}

impl LinkQuality {
    /// A quality profile with the given success ratio and default RF values.
    pub fn with_ratio(ratio: f64) -> Self {
        LinkQuality {
            ratio: ratio.clamp(0.0, 1.0),
            ..Default::default()
        }
    }
}

/// Partial update for a [`LinkQuality`].
///
/// All fields are optional; only non-`None` parameters are applied.
/// An empty adjustment leaves the quality untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkAdjustment {
    pub ratio: Option<f64>,
    pub signal_dbm: Option<f64>,
    pub lqi: Option<u8>,
    pub delay: Option<Duration>,
}

impl LinkAdjustment {
    /// Adjustment that only sets the success ratio.
    pub fn ratio(ratio: f64) -> Self {
        LinkAdjustment {
            ratio: Some(ratio),
            ..Default::default()
        }
    }

    /// Apply the set fields to `quality`. Ratios are clamped to `[0, 1]`.
    pub fn apply_to(&self, quality: &mut LinkQuality) {
        if let Some(ratio) = self.ratio {
            quality.ratio = ratio.clamp(0.0, 1.0);
        }
        if let Some(signal) = self.signal_dbm {
            quality.signal_dbm = signal;
        }
        if let Some(lqi) = self.lqi {
            quality.lqi = lqi;
        }
        if let Some(delay) = self.delay {
            quality.delay = delay;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == LinkAdjustment::default()
    }
}

/// A directed propagation link between two radios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub dest: NodeId,
    pub quality: LinkQuality,
}

impl Edge {
    pub fn new(source: NodeId, dest: NodeId, quality: LinkQuality) -> Self {
        Edge {
            source,
            dest,
            quality,
        }
    }

    /// The opposite direction with the same quality.
    pub fn reversed(&self) -> Edge {
        Edge {
            source: self.dest,
            dest: self.source,
            quality: self.quality,
        }
    }

    /// Whether this edge connects the unordered pair `(a, b)` in either
    /// direction.
    pub fn connects(&self, a: NodeId, b: NodeId) -> bool {
        (self.source == a && self.dest == b) || (self.source == b && self.dest == a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjustment_applies_only_set_fields() {
        let mut quality = LinkQuality::default();
        let adjust = LinkAdjustment {
            ratio: Some(0.5),
            delay: Some(Duration::from_millis(3)),
            ..Default::default()
        };
        adjust.apply_to(&mut quality);

        assert_eq!(quality.ratio, 0.5);
        assert_eq!(quality.delay, Duration::from_millis(3));
        // Untouched fields keep their defaults
        assert_eq!(quality.signal_dbm, -70.0);
        assert_eq!(quality.lqi, 105);
    }

    #[test]
    fn adjustment_clamps_ratio() {
        let mut quality = LinkQuality::default();
        LinkAdjustment::ratio(1.7).apply_to(&mut quality);
        assert_eq!(quality.ratio, 1.0);
        LinkAdjustment::ratio(-0.2).apply_to(&mut quality);
        assert_eq!(quality.ratio, 0.0);
    }

    #[test]
    fn empty_adjustment_is_noop() {
        let mut quality = LinkQuality::with_ratio(0.3);
        let before = quality;
        let adjust = LinkAdjustment::default();
        assert!(adjust.is_empty());
        adjust.apply_to(&mut quality);
        assert_eq!(quality, before);
    }

    #[test]
    fn reversed_swaps_endpoints_keeps_quality() {
        let edge = Edge::new(NodeId(2), NodeId(25), LinkQuality::with_ratio(0.8));
        let back = edge.reversed();
        assert_eq!(back.source, NodeId(25));
        assert_eq!(back.dest, NodeId(2));
        assert_eq!(back.quality, edge.quality);
    }

    #[test]
    fn connects_is_direction_agnostic() {
        let edge = Edge::new(NodeId(2), NodeId(25), LinkQuality::default());
        assert!(edge.connects(NodeId(2), NodeId(25)));
        assert!(edge.connects(NodeId(25), NodeId(2)));
        assert!(!edge.connects(NodeId(2), NodeId(3)));
    }
}
