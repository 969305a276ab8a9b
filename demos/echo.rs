//! Echo host and pooled client in one process.
//!
//! Starts a framed echo server, sends a 10 MB payload ten times through a
//! single-connection pool, and checks both directions byte for byte.
//!
//! Run with: cargo run --example echo
//! Logs: RUST_LOG=pooled_tcp=debug cargo run --example echo

use std::time::Duration;

use anyhow::{Context, Result, bail};
use pooled_tcp::{Client, PoolOptions, Server};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Configuration
// ============================================================================

const PAYLOAD_LEN: usize = 10_000_000;
const ROUNDS: usize = 10;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data = generate(PAYLOAD_LEN);

    let server = Server::bind("127.0.0.1:0").await.context("bind host")?;
    let expected = data.clone();
    server.spawn(move |input: Vec<u8>| {
        if first_mismatch(&expected, &input).is_none() {
            info!("SEND: PASS");
        } else {
            warn!("SEND: NOT PASS");
        }
        Ok::<_, std::io::Error>(input)
    });

    let options = PoolOptions::new(server.local_addr().to_string())
        .with_sizes(1, 1)
        .with_idle_timeout(Duration::from_millis(100))
        .with_wait_timeout(Duration::from_millis(10))
        .with_reap_period(Duration::from_secs(1));
    let client = Client::connect(options).await.context("connect client")?;

    for round in 0..ROUNDS {
        let output = client.send(&data).await.context("send")?;
        match first_mismatch(&data, &output) {
            None => info!(round, "RECEIVE: PASS"),
            Some(at) => {
                warn!(round, at, "RECEIVE: NOT PASS");
                bail!("echo mismatch at byte {at} in round {round}");
            }
        }
    }

    client.close().await.context("close client")?;
    server.shutdown();
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn generate(len: usize) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}

/// Returns the first differing index, or the shorter length on a size mismatch.
fn first_mismatch(a: &[u8], b: &[u8]) -> Option<usize> {
    if a.len() != b.len() {
        return Some(a.len().min(b.len()));
    }
    a.iter().zip(b).position(|(x, y)| x != y)
}
