//! Loom-based concurrency tests for the link and shutdown protocol.
//!
//! Run with: `cargo test --features loom --test loom_tests --release`
//!
//! Loom exhaustively explores all possible thread interleavings to find
//! concurrency bugs that might only occur under specific scheduling.

#![cfg(feature = "loom")]

use loom::sync::{Arc, Condvar, Mutex};
use loom::thread;

/// Simplified closable semaphore for loom testing.
///
/// Same protocol as the crate's `Semaphore`: permits and the closed flag
/// share one mutex, and `close` notifies every waiter.
struct LoomSemaphore {
    state: Mutex<(usize, bool)>,
    ready: Condvar,
}

impl LoomSemaphore {
    fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new((permits, false)),
            ready: Condvar::new(),
        }
    }

    /// Returns `false` if closed.
    fn acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        loop {
            if state.1 {
                return false;
            }
            if state.0 > 0 {
                state.0 -= 1;
                return true;
            }
            state = self.ready.wait(state).unwrap();
        }
    }

    fn release(&self) {
        self.state.lock().unwrap().0 += 1;
        self.ready.notify_one();
    }

    fn close(&self) {
        self.state.lock().unwrap().1 = true;
        self.ready.notify_all();
    }
}

/// One depth-1 link: EMPTY / FILLED pair around a single byte slot.
struct LoomLink {
    empty: LoomSemaphore,
    filled: LoomSemaphore,
    slot: Mutex<u8>,
}

impl LoomLink {
    fn new() -> Self {
        Self {
            empty: LoomSemaphore::new(1),
            filled: LoomSemaphore::new(0),
            slot: Mutex::new(0),
        }
    }

    fn send(&self, byte: u8) -> bool {
        if !self.empty.acquire() {
            return false;
        }
        *self.slot.lock().unwrap() = byte;
        self.filled.release();
        true
    }

    fn recv(&self) -> Option<u8> {
        if !self.filled.acquire() {
            return None;
        }
        let byte = *self.slot.lock().unwrap();
        self.empty.release();
        Some(byte)
    }

    fn close(&self) {
        self.empty.close();
        self.filled.close();
    }
}

/// Bytes cross a link in order, once each, under every interleaving.
#[test]
fn loom_link_fifo() {
    loom::model(|| {
        let link = Arc::new(LoomLink::new());
        let tx = Arc::clone(&link);

        let sender = thread::spawn(move || {
            assert!(tx.send(1));
            assert!(tx.send(2));
        });

        assert_eq!(link.recv(), Some(1));
        assert_eq!(link.recv(), Some(2));
        sender.join().unwrap();
    });
}

/// A receiver parked on an empty link is always woken by close.
#[test]
fn loom_close_wakes_receiver() {
    loom::model(|| {
        let link = Arc::new(LoomLink::new());
        let rx = Arc::clone(&link);

        let receiver = thread::spawn(move || rx.recv());
        link.close();

        assert_eq!(receiver.join().unwrap(), None);
    });
}

/// A sender parked on a full link is always woken by close, and never
/// overwrites the unread byte.
#[test]
fn loom_close_wakes_sender_on_full_link() {
    loom::model(|| {
        let link = Arc::new(LoomLink::new());
        assert!(link.send(7));
        let tx = Arc::clone(&link);

        let sender = thread::spawn(move || tx.send(8));
        link.close();

        assert!(!sender.join().unwrap());
        assert_eq!(*link.slot.lock().unwrap(), 7);
    });
}

/// Two-node ring: each node receives, then forwards. One token circulates
/// twice and nobody deadlocks.
#[test]
fn loom_two_node_token_pass() {
    loom::model(|| {
        let into_0 = Arc::new(LoomLink::new());
        let into_1 = Arc::new(LoomLink::new());

        assert!(into_1.send(b'0'));

        let (rx, tx) = (Arc::clone(&into_1), Arc::clone(&into_0));
        let node1 = thread::spawn(move || {
            let token = rx.recv().unwrap();
            assert!(tx.send(token));
        });

        let token = into_0.recv().unwrap();
        assert_eq!(token, b'0');
        node1.join().unwrap();
    });
}
