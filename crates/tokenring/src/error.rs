//! Error types for ring operations.

use thiserror::Error;

/// Errors raised while building, driving or shutting down a ring.
#[derive(Debug, Error)]
pub enum RingError {
    /// The configuration cannot describe a working ring.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A packet handed to the driver is malformed.
    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    /// A node worker thread could not be started.
    #[error("failed to spawn worker for node {node}: {source}")]
    Spawn {
        /// Node whose worker failed to start.
        node: usize,
        #[source]
        source: std::io::Error,
    },

    /// A synchronization primitive failed (a lock was poisoned).
    #[error("synchronization failure on {primitive}")]
    SyncFailure {
        /// The primitive that failed.
        primitive: &'static str,
    },

    /// A node saw a byte its protocol state does not allow.
    #[error("protocol violation at node {node}: {detail}")]
    ProtocolViolation {
        /// Node that detected the violation.
        node: usize,
        /// What went wrong.
        detail: String,
    },

    /// A packet was injected into a node whose outbound slot is still full.
    #[error("outbound slot of node {node} is already filled")]
    SlotOccupied {
        /// Node whose slot was found full.
        node: usize,
    },

    /// The ring is shutting down; no data was transferred.
    #[error("ring is shutting down")]
    Shutdown,

    /// Pending packets did not drain before the deadline.
    #[error("timed out draining node {node}")]
    DrainTimeout {
        /// First node still holding an unsent packet.
        node: usize,
    },
}

impl RingError {
    /// Returns `true` if the simulation cannot continue after this error.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SyncFailure { .. } | Self::ProtocolViolation { .. } | Self::SlotOccupied { .. }
        )
    }

    /// Returns `true` if this error only reports that shutdown has begun.
    #[inline]
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown)
    }

    /// Process exit status for this error.
    ///
    /// Synchronization failures exit with 4, protocol violations with 5,
    /// everything else with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::SyncFailure { .. } => 4,
            Self::ProtocolViolation { .. } | Self::SlotOccupied { .. } => 5,
            _ => 1,
        }
    }

    pub(crate) fn poisoned(primitive: &'static str) -> Self {
        Self::SyncFailure { primitive }
    }

    pub(crate) fn violation(node: usize, detail: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            node,
            detail: detail.into(),
        }
    }
}

// `io::Error` is not `Clone`; a cloned spawn error keeps its kind and message.
impl Clone for RingError {
    fn clone(&self) -> Self {
        match self {
            Self::InvalidConfig(msg) => Self::InvalidConfig(msg.clone()),
            Self::InvalidPacket(msg) => Self::InvalidPacket(msg.clone()),
            Self::Spawn { node, source } => Self::Spawn {
                node: *node,
                source: std::io::Error::new(source.kind(), source.to_string()),
            },
            Self::SyncFailure { primitive } => Self::SyncFailure {
                primitive: *primitive,
            },
            Self::ProtocolViolation { node, detail } => Self::ProtocolViolation {
                node: *node,
                detail: detail.clone(),
            },
            Self::SlotOccupied { node } => Self::SlotOccupied { node: *node },
            Self::Shutdown => Self::Shutdown,
            Self::DrainTimeout { node } => Self::DrainTimeout { node: *node },
        }
    }
}
