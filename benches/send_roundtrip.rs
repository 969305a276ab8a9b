//! Pooled request/response benchmarks.
//!
//! Measures `Client::send` against a loopback echo server:
//! - Payload sizes: 64 B, 4 KiB, 256 KiB
//! - Concurrency: 1, 8 in-flight sends
//!
//! Run with: cargo bench --bench send_roundtrip
//! Results saved to: target/criterion/

use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use pooled_tcp::{Client, PoolOptions, Server};
use tokio::runtime::Runtime;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const PAYLOAD_SIZES: &[usize] = &[64, 4 * 1024, 256 * 1024];
const CONCURRENCY: &[usize] = &[1, 8];

// ============================================================================
// Setup
// ============================================================================

fn setup(rt: &Runtime, max_size: usize) -> Client {
    rt.block_on(async {
        let server = Server::bind("127.0.0.1:0").await.expect("bind");
        server.spawn(|input: Vec<u8>| Ok::<_, std::io::Error>(input));

        let options = PoolOptions::new(server.local_addr().to_string())
            .with_sizes(1, max_size)
            .with_wait_timeout(Duration::from_millis(1));
        Client::connect(options).await.expect("client")
    })
}

// ============================================================================
// Benchmark: Single Send
// ============================================================================

fn bench_send(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let client = setup(&rt, 1);

    let mut group = c.benchmark_group("send");
    for &size in PAYLOAD_SIZES {
        let payload = vec![0xA5u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.to_async(&rt)
                .iter(|| async { client.send(payload).await.expect("send") });
        });
    }
    group.finish();

    rt.block_on(client.close()).expect("close");
}

// ============================================================================
// Benchmark: Concurrent Sends
// ============================================================================

fn bench_concurrent_send(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let client = setup(&rt, 8);
    let payload = vec![0x5Au8; 4 * 1024];

    let mut group = c.benchmark_group("concurrent_send");
    group.measurement_time(Duration::from_secs(10));

    for &tasks in CONCURRENCY {
        group.bench_with_input(BenchmarkId::new("tasks", tasks), &tasks, |b, &tasks| {
            b.to_async(&rt).iter(|| {
                let client = client.clone();
                let payload = payload.clone();
                async move {
                    let mut handles = Vec::with_capacity(tasks);
                    for _ in 0..tasks {
                        let client = client.clone();
                        let payload = payload.clone();
                        handles.push(tokio::spawn(async move { client.send(&payload).await }));
                    }
                    for handle in handles {
                        handle.await.expect("join").expect("send");
                    }
                }
            });
        });
    }
    group.finish();

    rt.block_on(client.close()).expect("close");
}

criterion_group!(benches, bench_send, bench_concurrent_send);
criterion_main!(benches);
