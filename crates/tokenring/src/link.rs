//! Depth-1 byte links between adjacent nodes.
//!
//! The link from node `i` to node `next = (i + 1) % N` is a one-slot bounded
//! channel: the slot is `next`'s `transfer_byte`, guarded by `EMPTY(next)`
//! (initially 1) and `FILLED(next)` (initially 0).
//!
//! Both operations check the shutdown flags under the lock before blocking,
//! and every semaphore wait is cancelled when the ring closes its semaphores,
//! so a worker never stays parked past the point where no peer will signal it.

use crate::{RingError, SharedRing};

impl SharedRing {
    /// Sends `byte` from `node` to its successor.
    pub fn send_byte(&self, node: usize, byte: u8) -> Result<(), RingError> {
        self.check_running(node)?;
        let next = self.config().next(node);

        self.empty[next].acquire()?;
        self.lock()?.nodes[next].transfer_byte = byte;
        self.filled[next].release()
    }

    /// Receives the next byte sent to `node`.
    pub fn recv_byte(&self, node: usize) -> Result<u8, RingError> {
        self.check_running(node)?;

        self.filled[node].acquire()?;
        let byte = self.lock()?.nodes[node].transfer_byte;
        self.empty[node].release()?;
        Ok(byte)
    }

    fn check_running(&self, node: usize) -> Result<(), RingError> {
        if node >= self.config().nodes {
            return Err(RingError::InvalidPacket(format!(
                "node {node} outside ring of {} nodes",
                self.config().nodes
            )));
        }
        if self.lock()?.should_stop(node) {
            Err(RingError::Shutdown)
        } else {
            Ok(())
        }
    }
}
