//! # Token Ring Simulator
//!
//! Simulates a token ring LAN with a fixed number of nodes, sends
//! `<PACKETS>` randomly generated packets around it, then prints per-node
//! statistics.
//!
//! ## Running
//!
//! ```bash
//! # Reference ring (7 nodes), 100 packets
//! cargo run -p tokenring-rs --bin token-ring --release -- 100
//!
//! # Small ring, reproducible, payloads traced on delivery
//! cargo run -p tokenring-rs --bin token-ring -- 10 --nodes 3 --max-data 16 --seed 1 --trace
//! ```
//!
//! Exit status: 0 on success, 1 on bad arguments or setup failure, 4 on a
//! synchronization failure, 5 on a protocol violation.

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tokenring_rs::{RingConfig, TokenRing, MAX_DATA, N_NODES};

/// Token ring LAN simulator
#[derive(Parser, Debug)]
#[command(name = "token-ring")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of packets to send around the ring
    packets: usize,

    /// Ring size
    #[arg(short, long, default_value_t = N_NODES)]
    nodes: usize,

    /// Maximum payload length (1-255)
    #[arg(short, long, default_value_t = MAX_DATA)]
    max_data: usize,

    /// Seed for the packet generator
    #[arg(short, long)]
    seed: Option<u64>,

    /// Log each delivered payload
    #[arg(short, long)]
    trace: bool,

    /// Per-worker join timeout during shutdown, in milliseconds
    #[arg(long, default_value_t = 5_000)]
    join_timeout_ms: u64,

    /// Give up draining after this many milliseconds
    #[arg(long)]
    drain_timeout_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = RingConfig::new(cli.nodes, cli.max_data)
        .with_trace_payloads(cli.trace)
        .with_join_timeout(Duration::from_millis(cli.join_timeout_ms));
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    if let Some(ms) = cli.drain_timeout_ms {
        config = config.with_drain_timeout(Duration::from_millis(ms));
    }

    match TokenRing::run(config, cli.packets) {
        Ok(stats) => {
            print!("{stats}");
            if !stats.stalled.is_empty() {
                tracing::warn!(stalled = ?stats.stalled, "some workers were detached");
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("Simulation failed: {error}");
            ExitCode::from(error.exit_code() as u8)
        }
    }
}
