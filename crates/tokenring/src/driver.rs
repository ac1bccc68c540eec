//! Packet generator and injection into outbound slots.

use crate::{Packet, RingConfig, RingError, SharedRing};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

/// Generates packets with a random source, a distinct random destination,
/// a random length in `1..=max_data` and uppercase ASCII payload.
#[derive(Debug)]
pub struct PacketGenerator {
    rng: StdRng,
    nodes: usize,
    max_data: usize,
}

impl PacketGenerator {
    /// Seeds from `config.seed`, or from OS entropy when unset.
    pub fn new(config: &RingConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            nodes: config.nodes,
            max_data: config.max_data,
        }
    }

    pub fn next_packet(&mut self) -> Packet {
        let from = self.rng.gen_range(0..self.nodes);
        // Draw from the other N-1 nodes and skip over the source.
        let mut to = self.rng.gen_range(0..self.nodes - 1);
        if to >= from {
            to += 1;
        }
        let len = self.rng.gen_range(1..=self.max_data);
        let payload = (0..len).map(|_| self.rng.gen_range(b'A'..=b'Z')).collect();
        Packet::from_wire(to as u8, from as u8, payload)
    }
}

impl Iterator for PacketGenerator {
    type Item = Packet;

    fn next(&mut self) -> Option<Packet> {
        Some(self.next_packet())
    }
}

/// Waits for the source's outbound slot to be free, then fills it.
///
/// The slot permit stays taken; the node returns it once the packet has gone
/// round the ring.
pub(crate) fn inject(ring: &SharedRing, packet: Packet) -> Result<(), RingError> {
    check_fits(ring.config(), &packet)?;
    let node = packet.from();

    ring.to_send[node].acquire()?;
    let mut state = ring.lock()?;
    if state.should_stop(node) {
        return Err(RingError::Shutdown);
    }
    if state.nodes[node].outbound.is_some() {
        drop(state);
        let error = RingError::SlotOccupied { node };
        tracing::error!(%error, "slot permit held but slot not empty");
        return Err(error);
    }
    tracing::debug!(node, to = packet.to(), len = packet.length(), "packet injected");
    state.nodes[node].outbound = Some(packet);
    Ok(())
}

/// Waits until every node's outbound slot is free again, i.e. every injected
/// packet has been delivered and stripped.
///
/// `timeout` bounds the whole drain, not each node.
pub(crate) fn drain(ring: &SharedRing, timeout: Option<Duration>) -> Result<(), RingError> {
    let deadline = timeout.map(|timeout| Instant::now() + timeout);
    for (node, slot) in ring.to_send.iter().enumerate() {
        match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if !slot.acquire_timeout(remaining)? {
                    return Err(RingError::DrainTimeout { node });
                }
            }
            None => slot.acquire()?,
        }
        // Hand the permit back; draining must not block later injections.
        slot.release()?;
    }
    Ok(())
}

fn check_fits(config: &RingConfig, packet: &Packet) -> Result<(), RingError> {
    let (from, to) = (packet.from(), packet.to());
    if from >= config.nodes || to >= config.nodes || from == to {
        return Err(RingError::InvalidPacket(format!(
            "address {from}->{to} not valid in ring of {} nodes",
            config.nodes
        )));
    }
    // The real payload length, not the LEN byte it would be sent as.
    let len = packet.payload().len();
    if len == 0 || len > config.max_data {
        return Err(RingError::InvalidPacket(format!(
            "length {len} not in 1..={}",
            config.max_data
        )));
    }
    Ok(())
}
