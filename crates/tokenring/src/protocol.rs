//! Per-node protocol state machine.
//!
//! Frames on the wire look like `FRAME, to, from, length, payload[length]`;
//! between frames the ring carries a lone [`TOKEN`] byte.
//!
//! The engine turns every received byte into exactly one outgoing byte (or an
//! exit), so exactly one byte is ever circulating. A consumer relays what it
//! receives. A producer is the node that captured the token with a packet
//! waiting: it swallows the token, emits `FRAME`, and from then on replaces
//! each byte of its own frame coming back around the ring with the next byte
//! it has to send. When the last payload byte returns, the frame has passed
//! every node, and the producer releases the token.
//!
//! Side effects go through [`Station`] so the engine can be driven without
//! threads.

use crate::{Packet, RingError};
use std::mem;

/// Token marker: sending rights are free.
pub const TOKEN: u8 = b'0';

/// First byte of a data frame.
pub const FRAME: u8 = b'1';

/// Which header field the next received byte belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvState {
    TokenFlag,
    To,
    From,
    Len,
    Data,
}

/// Outcome of offering the token to a node.
#[derive(Debug)]
pub enum Claim {
    /// A packet was waiting; the node is now its producer.
    Send(Packet),
    /// Nothing to send; pass the token on.
    Pass,
    /// Nothing to send and the node has been told to terminate.
    Stop,
}

/// What the worker does after one received byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Send this byte downstream.
    Emit(u8),
    /// Leave the receive loop.
    Exit,
}

/// Shared-state effects the engine needs.
pub trait Station {
    /// Atomically checks the outbound slot and takes the producer role if a
    /// packet is waiting. Check and claim must happen in one critical section.
    fn claim_token(&mut self) -> Result<Claim, RingError>;

    /// Records a packet delivered to this node.
    fn deliver(&mut self, packet: Packet) -> Result<(), RingError>;

    /// Records that this node's packet went all the way round; frees the slot.
    fn complete_send(&mut self) -> Result<(), RingError>;
}

#[derive(Debug)]
enum Role {
    Consumer,
    /// `echo` is the last byte we emitted; it must be the next byte we receive.
    Producer { packet: Packet, echo: u8 },
}

/// Protocol engine for one node.
#[derive(Debug)]
pub struct Engine {
    node: usize,
    state: RecvState,
    role: Role,
    to: u8,
    from: u8,
    len: u8,
    seen: u8,
    payload: Vec<u8>,
}

impl Engine {
    pub fn new(node: usize) -> Self {
        Self {
            node,
            state: RecvState::TokenFlag,
            role: Role::Consumer,
            to: 0,
            from: 0,
            len: 0,
            seen: 0,
            payload: Vec::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> RecvState {
        self.state
    }

    /// Returns `true` while this node is sending its own frame.
    #[inline]
    pub fn is_producing(&self) -> bool {
        matches!(self.role, Role::Producer { .. })
    }

    /// Handles one byte received from the predecessor.
    pub fn on_byte<S: Station>(&mut self, byte: u8, station: &mut S) -> Result<Step, RingError> {
        if let Role::Producer { echo, .. } = &self.role {
            if byte != *echo {
                return Err(RingError::violation(
                    self.node,
                    format!("own frame came back as {byte:#04x}, expected {echo:#04x}"),
                ));
            }
        }

        match self.state {
            RecvState::TokenFlag => self.on_flag(byte, station),
            RecvState::To => {
                self.to = byte;
                self.state = RecvState::From;
                self.relay(byte, 1)
            }
            RecvState::From => {
                if usize::from(byte) == self.node && !self.is_producing() {
                    return Err(RingError::violation(
                        self.node,
                        "frame from this node arrived while not producing",
                    ));
                }
                self.from = byte;
                self.state = RecvState::Len;
                self.relay(byte, 2)
            }
            RecvState::Len => {
                self.len = byte;
                self.seen = 0;
                self.payload.clear();
                if byte == 0 {
                    self.state = RecvState::TokenFlag;
                    Ok(Step::Emit(byte))
                } else {
                    self.state = RecvState::Data;
                    self.relay(byte, 3)
                }
            }
            RecvState::Data => {
                self.seen += 1;
                if self.is_addressee() {
                    self.payload.push(byte);
                }
                if self.seen < self.len {
                    self.relay(byte, 3 + usize::from(self.seen))
                } else {
                    self.state = RecvState::TokenFlag;
                    self.finish_frame(byte, station)
                }
            }
        }
    }

    fn on_flag<S: Station>(&mut self, byte: u8, station: &mut S) -> Result<Step, RingError> {
        match byte {
            TOKEN => match station.claim_token()? {
                Claim::Send(packet) => {
                    tracing::debug!(
                        node = self.node,
                        to = packet.to(),
                        len = packet.length(),
                        "token captured"
                    );
                    self.role = Role::Producer { packet, echo: FRAME };
                    Ok(Step::Emit(FRAME))
                }
                Claim::Pass => Ok(Step::Emit(TOKEN)),
                Claim::Stop => Ok(Step::Exit),
            },
            FRAME => {
                self.state = RecvState::To;
                self.relay(byte, 0)
            }
            other => Err(RingError::violation(
                self.node,
                format!("expected token or frame marker, got {other:#04x}"),
            )),
        }
    }

    /// Forwards `byte`, or, when producing, emits wire byte `index` of our own
    /// frame in its place.
    fn relay(&mut self, byte: u8, index: usize) -> Result<Step, RingError> {
        let node = self.node;
        match &mut self.role {
            Role::Consumer => Ok(Step::Emit(byte)),
            Role::Producer { packet, echo } => {
                let out = packet.wire_byte(index).ok_or_else(|| {
                    RingError::violation(node, "own frame is longer than its packet")
                })?;
                *echo = out;
                Ok(Step::Emit(out))
            }
        }
    }

    fn finish_frame<S: Station>(&mut self, byte: u8, station: &mut S) -> Result<Step, RingError> {
        if let Role::Producer { packet, .. } = mem::replace(&mut self.role, Role::Consumer) {
            tracing::debug!(node = self.node, to = packet.to(), "frame stripped, releasing token");
            station.complete_send()?;
            return Ok(Step::Emit(TOKEN));
        }
        if self.is_addressee() {
            let payload = mem::take(&mut self.payload);
            station.deliver(Packet::from_wire(self.to, self.from, payload))?;
        }
        Ok(Step::Emit(byte))
    }

    #[inline]
    fn is_addressee(&self) -> bool {
        usize::from(self.to) == self.node && !self.is_producing()
    }
}
