//! Node worker: the receive loop driving one [`Engine`].

#[cfg(debug_assertions)]
use crate::invariants::{
    debug_assert_counter_advanced, debug_assert_producer_active, debug_assert_single_producer,
};
use crate::protocol::{Claim, Engine, Station, Step, TOKEN};
use crate::{Packet, RingError, SharedRing};
use std::sync::Arc;

/// How a node worker left its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeExit {
    /// Saw the token with nothing to send after being told to terminate.
    Terminated,
    /// Woken or stopped by shutdown at a blocking point.
    Cancelled,
    /// Hit a fatal error; the error is recorded in the shared state.
    Failed,
}

/// [`Station`] backed by the shared ring.
struct NodeStation<'a> {
    ring: &'a SharedRing,
    node: usize,
}

impl Station for NodeStation<'_> {
    fn claim_token(&mut self) -> Result<Claim, RingError> {
        // Check and claim in one critical section: the driver fills the slot
        // under this same lock.
        let mut state = self.ring.lock()?;
        if let Some(packet) = state.nodes[self.node].outbound.clone() {
            state.active_producers += 1;
            state.peak_producers = state.peak_producers.max(state.active_producers);
            #[cfg(debug_assertions)]
            debug_assert_single_producer!(self.node, state.active_producers);
            return Ok(Claim::Send(packet));
        }
        if state.should_stop(self.node) {
            Ok(Claim::Stop)
        } else {
            Ok(Claim::Pass)
        }
    }

    fn deliver(&mut self, packet: Packet) -> Result<(), RingError> {
        let trace = self.ring.config().trace_payloads;
        let mut state = self.ring.lock()?;
        let record = &mut state.nodes[self.node];
        let _old = record.received;
        record.received += 1;
        #[cfg(debug_assertions)]
        debug_assert_counter_advanced!("received", self.node, _old, record.received);

        if trace {
            tracing::info!(
                node = self.node,
                from = packet.from(),
                len = packet.length(),
                payload = %String::from_utf8_lossy(packet.payload()),
                "packet delivered"
            );
        } else {
            tracing::debug!(
                node = self.node,
                from = packet.from(),
                len = packet.length(),
                "packet delivered"
            );
        }
        record.last_received = Some(packet);
        Ok(())
    }

    fn complete_send(&mut self) -> Result<(), RingError> {
        {
            let mut state = self.ring.lock()?;
            #[cfg(debug_assertions)]
            debug_assert_producer_active!(self.node, state.active_producers);
            state.active_producers = state.active_producers.saturating_sub(1);

            let record = &mut state.nodes[self.node];
            let _old = record.sent;
            record.sent += 1;
            record.outbound = None;
            #[cfg(debug_assertions)]
            debug_assert_counter_advanced!("sent", self.node, _old, record.sent);
        }
        // The driver may now inject the next packet for this node.
        self.ring.to_send[self.node].release()
    }
}

/// Body of the worker thread for `node`.
pub(crate) fn run_node(ring: Arc<SharedRing>, node: usize) -> NodeExit {
    let span = tracing::debug_span!("node", node);
    let _enter = span.enter();

    match node_loop(&ring, node) {
        Ok(()) => {
            tracing::debug!("terminated at token");
            NodeExit::Terminated
        }
        Err(RingError::Shutdown) => {
            tracing::debug!("cancelled by shutdown");
            NodeExit::Cancelled
        }
        Err(error) => {
            // A stuck node stalls the whole ring, so take everyone down.
            tracing::error!(%error, "node failed, aborting simulation");
            ring.record_fatal(error);
            if let Err(error) = ring.begin_shutdown() {
                tracing::error!(%error, "shutdown after failure did not complete");
            }
            NodeExit::Failed
        }
    }
}

fn node_loop(ring: &SharedRing, node: usize) -> Result<(), RingError> {
    let mut engine = Engine::new(node);
    let mut station = NodeStation { ring, node };

    // Node 0 starts the ball rolling.
    if node == 0 {
        ring.send_byte(node, TOKEN)?;
    }

    loop {
        let byte = ring.recv_byte(node)?;
        match engine.on_byte(byte, &mut station)? {
            Step::Emit(out) => ring.send_byte(node, out)?,
            Step::Exit => return Ok(()),
        }
    }
}
