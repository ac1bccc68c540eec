//! Property-based tests for the ring protocol.
//!
//! Coverage:
//! - Engine (no threads): relaying is transparent, producers strip their own
//!   frame and release the token exactly once
//! - TokenRing (threads): every injected packet is sent once and received once

use proptest::prelude::*;
use std::time::Duration;
use tokenring_rs::protocol::{Claim, Engine, Station, Step, FRAME, TOKEN};
use tokenring_rs::{Packet, RingConfig, RingError, TokenRing};

#[derive(Default)]
struct Recorder {
    pending: Option<Packet>,
    delivered: Vec<Packet>,
    completed: usize,
}

impl Station for Recorder {
    fn claim_token(&mut self) -> Result<Claim, RingError> {
        Ok(self.pending.take().map_or(Claim::Pass, Claim::Send))
    }

    fn deliver(&mut self, packet: Packet) -> Result<(), RingError> {
        self.delivered.push(packet);
        Ok(())
    }

    fn complete_send(&mut self) -> Result<(), RingError> {
        self.completed += 1;
        Ok(())
    }
}

fn wire(packet: &Packet) -> Vec<u8> {
    let mut bytes = vec![FRAME, packet.to() as u8, packet.from() as u8, packet.length()];
    bytes.extend_from_slice(packet.payload());
    bytes
}

/// (nodes, node under test, from, to, payload) with `from != node` and `from != to`.
fn frame_strategy() -> impl Strategy<Value = (usize, usize, usize, usize, Vec<u8>)> {
    (3usize..10).prop_flat_map(|nodes| {
        (
            Just(nodes),
            0..nodes,
            0..nodes,
            0..nodes,
            prop::collection::vec(any::<u8>(), 1..=32),
        )
            .prop_filter("distinct roles", |(_, node, from, to, _)| from != node && from != to)
    })
}

// =============================================================================
// Relaying is transparent
// "A consumer forwards every byte unchanged; only the addressee records it."
// =============================================================================

proptest! {
    #[test]
    fn prop_consumer_relays_unchanged((nodes, node, from, to, payload) in frame_strategy()) {
        let config = RingConfig::new(nodes, 32);
        let packet = Packet::new(&config, from, to, payload).unwrap();
        let bytes = wire(&packet);

        let mut engine = Engine::new(node);
        let mut station = Recorder::default();
        for &b in &bytes {
            prop_assert_eq!(engine.on_byte(b, &mut station).unwrap(), Step::Emit(b));
        }

        if to == node {
            prop_assert_eq!(station.delivered, vec![packet]);
        } else {
            prop_assert!(station.delivered.is_empty());
        }
        prop_assert_eq!(station.completed, 0);
    }
}

// =============================================================================
// Source stripping
// "A producer fed its own returning frame emits that frame, then the token,
//  and completes exactly one send."
// =============================================================================

proptest! {
    #[test]
    fn prop_producer_strips_own_frame((nodes, _node, from, to, payload) in frame_strategy()) {
        let config = RingConfig::new(nodes, 32);
        let packet = Packet::new(&config, from, to, payload).unwrap();
        let mut expected = wire(&packet);
        expected.push(TOKEN);

        let mut engine = Engine::new(from);
        let mut station = Recorder { pending: Some(packet), ..Default::default() };

        let mut emitted = Vec::new();
        let mut incoming = TOKEN;
        loop {
            match engine.on_byte(incoming, &mut station).unwrap() {
                Step::Emit(b) => emitted.push(b),
                Step::Exit => prop_assert!(false, "producer exited"),
            }
            if !engine.is_producing() {
                break;
            }
            incoming = *emitted.last().unwrap();
        }

        prop_assert_eq!(emitted, expected);
        prop_assert_eq!(station.completed, 1);
        prop_assert!(station.delivered.is_empty());
    }
}

// =============================================================================
// Conservation
// "sum(sent) == sum(received) == K after clean shutdown"
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn prop_counts_balance(nodes in 2usize..6, packets in 0usize..25, seed in any::<u64>()) {
        let config = RingConfig::new(nodes, 24)
            .with_seed(seed)
            .with_drain_timeout(Duration::from_secs(20));
        let stats = TokenRing::run(config, packets).unwrap();

        prop_assert_eq!(stats.total_sent(), packets as u64);
        prop_assert_eq!(stats.total_received(), packets as u64);
        prop_assert!(stats.peak_producers <= 1);
        prop_assert!(stats.stalled.is_empty());
    }
}
