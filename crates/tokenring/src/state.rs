//! State shared by every node worker and the driver.

use crate::semaphore::Semaphore;
use crate::{RingConfig, RingError};
use crossbeam_utils::CachePadded;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// A packet waiting in a node's outbound slot, or delivered to its destination.
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    to: u8,
    from: u8,
    payload: Vec<u8>,
}

impl Packet {
    /// Builds a packet for a ring described by `config`.
    ///
    /// Fails if `config` itself is invalid, if either address is outside the
    /// ring, if `to == from`, or if the payload is empty or longer than
    /// `config.max_data`.
    pub fn new(
        config: &RingConfig,
        from: usize,
        to: usize,
        payload: Vec<u8>,
    ) -> Result<Self, RingError> {
        // Addresses and length go on the wire as single bytes.
        config.validate()?;
        if from >= config.nodes || to >= config.nodes {
            return Err(RingError::InvalidPacket(format!(
                "address {from}->{to} outside ring of {} nodes",
                config.nodes
            )));
        }
        if from == to {
            return Err(RingError::InvalidPacket(format!(
                "node {from} cannot send to itself"
            )));
        }
        if payload.is_empty() || payload.len() > config.max_data {
            return Err(RingError::InvalidPacket(format!(
                "length {} not in 1..={}",
                payload.len(),
                config.max_data
            )));
        }
        Ok(Self {
            to: to as u8,
            from: from as u8,
            payload,
        })
    }

    /// Reassembles a packet from frame fields read off the wire.
    pub(crate) fn from_wire(to: u8, from: u8, payload: Vec<u8>) -> Self {
        Self { to, from, payload }
    }

    /// Destination node.
    #[inline]
    pub fn to(&self) -> usize {
        usize::from(self.to)
    }

    /// Originating node.
    #[inline]
    pub fn from(&self) -> usize {
        usize::from(self.from)
    }

    /// Payload length as carried in the LEN byte.
    #[inline]
    pub fn length(&self) -> u8 {
        self.payload.len() as u8
    }

    /// Payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Byte at `index` of the frame body following the FRAME marker:
    /// `to, from, length, payload..`.
    pub(crate) fn wire_byte(&self, index: usize) -> Option<u8> {
        match index {
            0 => Some(self.to),
            1 => Some(self.from),
            2 => Some(self.length()),
            i => self.payload.get(i - 3).copied(),
        }
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("to", &self.to)
            .field("from", &self.from)
            .field("length", &self.payload.len())
            .field("payload", &String::from_utf8_lossy(&self.payload))
            .finish()
    }
}

/// Per-node fields of the shared state.
#[derive(Debug, Default)]
pub struct NodeRecord {
    /// Byte resident on this node's incoming link slot.
    pub transfer_byte: u8,
    /// Packet awaiting transmission.
    pub outbound: Option<Packet>,
    /// Packets this node has fully transmitted.
    pub sent: u64,
    /// Packets delivered to this node.
    pub received: u64,
    /// Set once by the driver during shutdown.
    pub terminate: bool,
    /// Most recent delivery.
    pub last_received: Option<Packet>,
}

/// Everything guarded by the ring's mutual-exclusion lock.
#[derive(Debug)]
pub struct RingState {
    pub nodes: Vec<NodeRecord>,
    /// Set once shutdown begins.
    pub cleanup_in_progress: bool,
    /// Nodes currently holding the producer role.
    pub active_producers: usize,
    /// Highest value `active_producers` ever reached.
    pub peak_producers: usize,
    /// First fatal error raised by a worker.
    pub fatal: Option<RingError>,
}

impl RingState {
    fn new(nodes: usize) -> Self {
        Self {
            nodes: (0..nodes).map(|_| NodeRecord::default()).collect(),
            cleanup_in_progress: false,
            active_producers: 0,
            peak_producers: 0,
            fatal: None,
        }
    }

    /// Returns `true` if `node` should stop at its next checkpoint.
    #[inline]
    pub fn should_stop(&self, node: usize) -> bool {
        self.cleanup_in_progress || self.nodes[node].terminate
    }
}

/// Shared ring: the locked state plus the per-node semaphores.
///
/// `empty[n]`/`filled[n]` guard the link *into* node `n`; `to_send[n]` guards
/// node `n`'s outbound slot.
pub struct SharedRing {
    config: RingConfig,
    state: Mutex<RingState>,
    pub(crate) empty: Vec<CachePadded<Semaphore>>,
    pub(crate) filled: Vec<CachePadded<Semaphore>>,
    pub(crate) to_send: Vec<CachePadded<Semaphore>>,
}

impl SharedRing {
    /// Allocates zeroed state and semaphores for `config`.
    pub fn new(config: RingConfig) -> Result<Self, RingError> {
        config.validate()?;
        let n = config.nodes;
        let sems = |name, initial| {
            (0..n)
                .map(|_| CachePadded::new(Semaphore::new(name, initial)))
                .collect::<Vec<_>>()
        };
        Ok(Self {
            config,
            state: Mutex::new(RingState::new(n)),
            empty: sems("link empty", 1),
            filled: sems("link filled", 0),
            to_send: sems("outbound slot", 1),
        })
    }

    #[inline]
    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    /// Takes the mutual-exclusion lock. A poisoned lock is fatal.
    pub fn lock(&self) -> Result<MutexGuard<'_, RingState>, RingError> {
        self.state.lock().map_err(|_| RingError::poisoned("ring state"))
    }

    /// Closes every semaphore so all parked workers and the driver wake.
    pub(crate) fn close_all(&self) -> Result<(), RingError> {
        for sem in self.empty.iter().chain(&self.filled).chain(&self.to_send) {
            sem.close()?;
        }
        Ok(())
    }

    /// Records the first fatal error; later ones are only logged by the caller.
    pub(crate) fn record_fatal(&self, error: RingError) {
        if let Ok(mut state) = self.state.lock() {
            if state.fatal.is_none() {
                state.fatal = Some(error);
            }
        }
    }
}

impl fmt::Debug for SharedRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRing")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
