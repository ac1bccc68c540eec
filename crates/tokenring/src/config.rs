//! Ring configuration.

use crate::RingError;
use std::time::Duration;

/// Number of nodes in the reference ring.
pub const N_NODES: usize = 7;

/// Largest payload a single frame may carry. Length travels as one byte.
pub const MAX_DATA: usize = 250;

/// Configuration for a [`TokenRing`](crate::TokenRing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingConfig {
    /// Ring size (default: [`N_NODES`])
    pub nodes: usize,
    /// Maximum payload length per packet (default: [`MAX_DATA`])
    pub max_data: usize,
    /// Seed for the packet generator; `None` seeds from OS entropy
    pub seed: Option<u64>,
    /// Log every delivered payload at `info` level
    pub trace_payloads: bool,
    /// How long shutdown waits for each worker before detaching it
    pub join_timeout: Duration,
    /// Overall bound on the drain phase of [`TokenRing::run`](crate::TokenRing::run);
    /// `None` waits forever
    pub drain_timeout: Option<Duration>,
}

impl RingConfig {
    /// Creates a configuration with the given ring size and payload limit.
    pub const fn new(nodes: usize, max_data: usize) -> Self {
        Self {
            nodes,
            max_data,
            seed: None,
            trace_payloads: false,
            join_timeout: Duration::from_secs(5),
            drain_timeout: None,
        }
    }

    /// Sets the generator seed.
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enables or disables payload tracing on delivery.
    pub const fn with_trace_payloads(mut self, trace: bool) -> Self {
        self.trace_payloads = trace;
        self
    }

    /// Sets the per-worker join timeout used during shutdown.
    pub const fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Bounds the drain phase.
    pub const fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = Some(timeout);
        self
    }

    /// Index of the node downstream of `node`.
    #[inline]
    pub const fn next(&self, node: usize) -> usize {
        (node + 1) % self.nodes
    }

    /// Checks the ring can be built from this configuration.
    ///
    /// Addresses and lengths travel as single bytes, and every packet needs a
    /// destination distinct from its source.
    pub fn validate(&self) -> Result<(), RingError> {
        if self.nodes < 2 {
            return Err(RingError::InvalidConfig(format!(
                "ring needs at least 2 nodes, got {}",
                self.nodes
            )));
        }
        if self.nodes > usize::from(u8::MAX) + 1 {
            return Err(RingError::InvalidConfig(format!(
                "ring of {} nodes cannot be addressed with one byte",
                self.nodes
            )));
        }
        if self.max_data == 0 || self.max_data > usize::from(u8::MAX) {
            return Err(RingError::InvalidConfig(format!(
                "max_data must be in 1..=255, got {}",
                self.max_data
            )));
        }
        Ok(())
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self::new(N_NODES, MAX_DATA)
    }
}

/// Reference ring: 7 nodes, 250-byte payloads.
pub const REFERENCE_CONFIG: RingConfig = RingConfig::new(N_NODES, MAX_DATA);

/// Small ring with short frames, handy for tests and tracing by eye.
pub const SMALL_RING_CONFIG: RingConfig = RingConfig::new(3, 16);
