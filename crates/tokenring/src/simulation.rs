use crate::backoff::Backoff;
use crate::driver::{self, PacketGenerator};
use crate::node::{run_node, NodeExit};
use crate::{Packet, RingConfig, RingError, RingStats, SharedRing, ShutdownSignal};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// A running token ring: one worker thread per node plus the caller acting
/// as driver.
///
/// Dropping a ring that was not shut down shuts it down.
pub struct TokenRing {
    ring: Arc<SharedRing>,
    workers: Vec<Option<JoinHandle<NodeExit>>>,
    generator: PacketGenerator,
    stalled: Vec<usize>,
}

impl TokenRing {
    /// Allocates the shared state and starts every node worker.
    ///
    /// If a worker fails to spawn, the ones already running are shut down and
    /// joined before the error is returned.
    pub fn start(config: RingConfig) -> Result<Self, RingError> {
        let ring = Arc::new(SharedRing::new(config)?);
        let mut workers = Vec::with_capacity(config.nodes);

        for node in 0..config.nodes {
            let worker_ring = Arc::clone(&ring);
            let spawned = thread::Builder::new()
                .name(format!("node-{node}"))
                .spawn(move || run_node(worker_ring, node));
            match spawned {
                Ok(handle) => workers.push(Some(handle)),
                Err(source) => {
                    tracing::error!(node, %source, "worker spawn failed, rolling back");
                    if let Err(error) = ring.begin_shutdown() {
                        tracing::error!(%error, "rollback shutdown did not complete");
                    }
                    join_all(&ring, &mut workers, config.join_timeout);
                    return Err(RingError::Spawn { node, source });
                }
            }
        }

        tracing::info!(nodes = config.nodes, max_data = config.max_data, "ring started");
        Ok(Self {
            generator: PacketGenerator::new(&config),
            ring,
            workers,
            stalled: Vec::new(),
        })
    }

    /// Starts a ring, injects `packets` random packets, waits for them to be
    /// delivered and shuts down.
    pub fn run(config: RingConfig, packets: usize) -> Result<RingStats, RingError> {
        let mut ring = Self::start(config)?;
        let outcome = (0..packets)
            .try_for_each(|_| ring.inject_random().map(drop))
            .and_then(|()| ring.drain(config.drain_timeout));

        // A fatal error recorded by a worker explains any failure above.
        let stats = ring.shutdown()?;
        outcome.map(|()| stats)
    }

    #[inline]
    pub fn config(&self) -> &RingConfig {
        self.ring.config()
    }

    /// Handle for triggering shutdown from another thread.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        ShutdownSignal::new(Arc::clone(&self.ring))
    }

    /// Waits for the source's outbound slot to be free and fills it.
    pub fn inject(&self, packet: Packet) -> Result<(), RingError> {
        driver::inject(&self.ring, packet)
    }

    /// Injects the next packet from the ring's generator.
    pub fn inject_random(&mut self) -> Result<Packet, RingError> {
        let packet = self.generator.next_packet();
        self.inject(packet.clone())?;
        Ok(packet)
    }

    /// Waits until every injected packet has been delivered.
    pub fn drain(&self, timeout: Option<Duration>) -> Result<(), RingError> {
        driver::drain(&self.ring, timeout)?;
        tracing::debug!("all outbound slots drained");
        Ok(())
    }

    /// Current counters. Counters are final only after [`shutdown`](Self::shutdown).
    pub fn stats(&self) -> Result<RingStats, RingError> {
        let mut stats = RingStats::snapshot(&*self.ring.lock()?);
        stats.stalled.clone_from(&self.stalled);
        Ok(stats)
    }

    /// Most recent packet delivered to `node`.
    pub fn last_received(&self, node: usize) -> Result<Option<Packet>, RingError> {
        Ok(self.ring.lock()?.nodes.get(node).and_then(|n| n.last_received.clone()))
    }

    /// Terminates the ring and returns the final counters.
    ///
    /// Marks every node for termination, closes every semaphore so parked
    /// workers wake, then joins each worker for at most `join_timeout`.
    /// Workers that do not finish are detached and listed in
    /// [`RingStats::stalled`]. If a worker hit a fatal error, that error is
    /// returned instead of the counters.
    ///
    /// Calling this again is harmless: there is nothing left to join and the
    /// same outcome comes back.
    pub fn shutdown(&mut self) -> Result<RingStats, RingError> {
        if self.ring.begin_shutdown()? {
            tracing::info!("shutting down ring");
        }
        let timeout = self.ring.config().join_timeout;
        let stalled = join_all(&self.ring, &mut self.workers, timeout);
        self.stalled.extend(stalled);

        let state = self.ring.lock()?;
        if let Some(fatal) = &state.fatal {
            return Err(fatal.clone());
        }
        let mut stats = RingStats::snapshot(&state);
        drop(state);
        stats.stalled.clone_from(&self.stalled);
        Ok(stats)
    }
}

impl Drop for TokenRing {
    fn drop(&mut self) {
        if self.workers.iter().any(Option::is_some) {
            if let Err(error) = self.ring.begin_shutdown() {
                tracing::error!(%error, "shutdown on drop did not complete");
            }
            join_all(&self.ring, &mut self.workers, self.ring.config().join_timeout);
        }
    }
}

/// Joins every remaining worker; returns the nodes whose workers timed out.
fn join_all(
    ring: &SharedRing,
    workers: &mut [Option<JoinHandle<NodeExit>>],
    timeout: Duration,
) -> Vec<usize> {
    let mut stalled = Vec::new();
    for (node, slot) in workers.iter_mut().enumerate() {
        let Some(handle) = slot.take() else { continue };
        match join_within(handle, timeout) {
            Some(Ok(exit)) => tracing::debug!(node, ?exit, "worker joined"),
            Some(Err(())) => {
                tracing::error!(node, "worker panicked");
                ring.record_fatal(RingError::violation(node, "worker panicked"));
            }
            None => {
                tracing::warn!(node, ?timeout, "worker did not exit in time, detaching");
                stalled.push(node);
            }
        }
    }
    stalled
}

/// Bounded join. `None` means the deadline passed; the handle is dropped,
/// which detaches the thread.
fn join_within(handle: JoinHandle<NodeExit>, timeout: Duration) -> Option<Result<NodeExit, ()>> {
    let deadline = Instant::now() + timeout;
    let mut backoff = Backoff::new();
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return None;
        }
        backoff.snooze();
    }
    Some(handle.join().map_err(drop))
}
