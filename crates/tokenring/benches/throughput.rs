use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::thread;
use tokenring_rs::{RingConfig, SharedRing, TokenRing};

const PACKETS: usize = 50;
const LINK_BYTES: u64 = 100_000;

fn bench_link(c: &mut Criterion) {
    let mut group = c.benchmark_group("link");
    group.throughput(Throughput::Elements(LINK_BYTES));

    group.bench_function("depth1_handoff", |b| {
        b.iter(|| {
            let ring = Arc::new(SharedRing::new(RingConfig::new(2, 8)).unwrap());
            let tx = Arc::clone(&ring);
            let sender = thread::spawn(move || {
                for i in 0..LINK_BYTES {
                    tx.send_byte(0, i as u8).unwrap();
                }
            });
            for _ in 0..LINK_BYTES {
                black_box(ring.recv_byte(1).unwrap());
            }
            sender.join().unwrap();
        });
    });

    group.finish();
}

fn bench_ring(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(PACKETS as u64));
    group.sample_size(10);

    for nodes in [3usize, 7, 16] {
        group.bench_with_input(BenchmarkId::new("packets", nodes), &nodes, |b, &nodes| {
            b.iter(|| {
                let config = RingConfig::new(nodes, 64).with_seed(1);
                let stats = TokenRing::run(config, PACKETS).unwrap();
                black_box(stats.total_received());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_link, bench_ring);
criterion_main!(benches);
