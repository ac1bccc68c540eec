use crate::state::RingState;
use std::fmt;

/// Per-node counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStats {
    pub node: usize,
    pub sent: u64,
    pub received: u64,
}

/// Snapshot of the ring's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingStats {
    pub nodes: Vec<NodeStats>,
    /// Most nodes ever holding the producer role at once. Never above 1.
    pub peak_producers: usize,
    /// Workers that did not finish within the join timeout and were detached.
    pub stalled: Vec<usize>,
}

impl RingStats {
    pub(crate) fn snapshot(state: &RingState) -> Self {
        Self {
            nodes: state
                .nodes
                .iter()
                .enumerate()
                .map(|(node, r)| NodeStats {
                    node,
                    sent: r.sent,
                    received: r.received,
                })
                .collect(),
            peak_producers: state.peak_producers,
            stalled: Vec::new(),
        }
    }

    /// Packets sent across all nodes.
    pub fn total_sent(&self) -> u64 {
        self.nodes.iter().map(|n| n.sent).sum()
    }

    /// Packets received across all nodes.
    pub fn total_received(&self) -> u64 {
        self.nodes.iter().map(|n| n.received).sum()
    }
}

impl fmt::Display for RingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for n in &self.nodes {
            writeln!(f, "Node {}: sent={} received={}", n.node, n.sent, n.received)?;
        }
        Ok(())
    }
}
