//! Shutdown signalling.

use crate::{RingError, SharedRing};
use std::sync::Arc;

impl SharedRing {
    /// Starts termination.
    ///
    /// This will:
    /// 1. Set `cleanup_in_progress` and every node's `terminate` flag
    /// 2. Close every link and slot semaphore, waking all parked workers
    ///
    /// Returns `true` for the call that actually started shutdown. Safe to
    /// call any number of times.
    pub(crate) fn begin_shutdown(&self) -> Result<bool, RingError> {
        let first = match self.lock() {
            Ok(mut state) => {
                let first = !state.cleanup_in_progress;
                state.cleanup_in_progress = true;
                for record in &mut state.nodes {
                    record.terminate = true;
                }
                first
            }
            Err(error) => {
                // Flags are unreachable, but waiters must still be woken.
                let _ = self.close_all();
                return Err(error);
            }
        };
        self.close_all()?;
        Ok(first)
    }

    /// Returns `true` once shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.lock().map_or(true, |state| state.cleanup_in_progress)
    }
}

/// A cloneable handle for triggering shutdown from another thread.
///
/// Only the first call has effect; later calls are no-ops. Joining the
/// workers and collecting statistics stays with
/// [`TokenRing::shutdown`](crate::TokenRing::shutdown).
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    ring: Arc<SharedRing>,
}

impl ShutdownSignal {
    pub(crate) fn new(ring: Arc<SharedRing>) -> Self {
        Self { ring }
    }

    /// Marks every node for termination and wakes every blocked worker.
    pub fn shutdown(&self) {
        match self.ring.begin_shutdown() {
            Ok(true) => tracing::debug!("shutdown signalled"),
            Ok(false) => {}
            Err(error) => tracing::error!(%error, "shutdown signal failed"),
        }
    }

    /// Returns `true` if shutdown has been initiated.
    pub fn is_shutdown(&self) -> bool {
        self.ring.is_shutting_down()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RingConfig;

    #[test]
    fn test_begin_shutdown_sets_flags_once() {
        let ring = SharedRing::new(RingConfig::new(3, 8)).unwrap();
        assert!(!ring.is_shutting_down());
        assert!(ring.begin_shutdown().unwrap());
        assert!(!ring.begin_shutdown().unwrap());

        let state = ring.lock().unwrap();
        assert!(state.cleanup_in_progress);
        assert!(state.nodes.iter().all(|n| n.terminate));
        drop(state);
        assert!(ring.filled.iter().all(|s| s.is_closed()));
    }

    #[test]
    fn test_signal_is_shared_by_clones() {
        let signal = ShutdownSignal::new(Arc::new(SharedRing::new(RingConfig::new(2, 8)).unwrap()));
        let other = signal.clone();
        other.shutdown();
        assert!(signal.is_shutdown());
        signal.shutdown();
    }
}
