//! TokenRing - Byte-Level Token Ring LAN Simulator
//!
//! A fixed ring of node worker threads passes a circulating permission token
//! and data frames one byte at a time. The "wire" between neighbours is a
//! single shared byte guarded by a pair of counting semaphores; all other
//! shared state sits behind one mutual-exclusion lock.
//!
//! # Key Features
//!
//! - Depth-1 links with `EMPTY`/`FILLED` semaphore pairs (automatic back-pressure)
//! - Explicit per-node protocol state machine, testable without threads
//! - Source stripping: a frame goes all the way round before the token moves on
//! - Cancellable semaphores: shutdown wakes every parked worker, no lost wakeups
//! - Bounded worker joins during shutdown
//!
//! # Example
//!
//! ```
//! use tokenring_rs::{Packet, RingConfig, TokenRing};
//!
//! let config = RingConfig::new(3, 16);
//! let mut ring = TokenRing::start(config).unwrap();
//!
//! ring.inject(Packet::new(&config, 0, 2, b"TEST".to_vec()).unwrap()).unwrap();
//! ring.drain(None).unwrap();
//!
//! let stats = ring.shutdown().unwrap();
//! assert_eq!(stats.nodes[0].sent, 1);
//! assert_eq!(stats.nodes[2].received, 1);
//! ```

mod backoff;
mod config;
mod driver;
mod error;
mod invariants;
mod link;
mod metrics;
mod node;
pub mod protocol;
mod semaphore;
mod shutdown;
mod simulation;
mod state;

pub use backoff::Backoff;
pub use config::{RingConfig, MAX_DATA, N_NODES, REFERENCE_CONFIG, SMALL_RING_CONFIG};
pub use driver::PacketGenerator;
pub use error::RingError;
pub use metrics::{NodeStats, RingStats};
pub use node::NodeExit;
pub use semaphore::Semaphore;
pub use shutdown::ShutdownSignal;
pub use simulation::TokenRing;
pub use state::{NodeRecord, Packet, RingState, SharedRing};
