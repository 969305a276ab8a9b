//! End-to-end tests against a loopback [`Server`].

use std::io::Error as IoError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pooled_tcp::{Client, Error, PoolOptions, Server, read_frame, write_frame};
use tokio::net::TcpListener;

fn echo(input: Vec<u8>) -> Result<Vec<u8>, IoError> {
    Ok(input)
}

async fn spawn_echo_server() -> (Arc<Server>, SocketAddr) {
    let server = Server::bind("127.0.0.1:0").await.expect("bind");
    let addr = server.local_addr();
    server.spawn(echo);
    (server, addr)
}

fn scenario_options(addr: SocketAddr) -> PoolOptions {
    PoolOptions::new(addr.to_string())
        .with_sizes(1, 3)
        .with_idle_timeout(Duration::from_millis(100))
        .with_wait_timeout(Duration::from_millis(10))
        .with_reap_period(Duration::from_secs(1))
}

#[tokio::test]
async fn send_hello_roundtrip() {
    let (server, addr) = spawn_echo_server().await;
    let client = Client::connect(scenario_options(addr)).await.expect("client");

    let reply = client.send(b"hello").await.expect("send");
    assert_eq!(reply, b"hello");
    assert_eq!(client.live_count(), 1);

    client.close().await.expect("close");
    assert_eq!(client.live_count(), 0);
    server.shutdown();
}

#[tokio::test]
async fn repeated_large_payloads_reuse_one_connection() {
    let (server, addr) = spawn_echo_server().await;
    let options = scenario_options(addr).with_sizes(1, 1);
    let client = Client::connect(options).await.expect("client");

    let data: Vec<u8> = (0..1_000_000u32).map(|i| (i % 251) as u8).collect();
    for _ in 0..5 {
        let reply = client.send(&data).await.expect("send");
        assert_eq!(reply.len(), data.len());
        assert!(reply == data);
    }
    assert_eq!(client.live_count(), 1);

    client.close().await.expect("close");
    server.shutdown();
}

#[tokio::test]
async fn concurrent_sends_stay_within_max() {
    let (server, addr) = spawn_echo_server().await;
    let client = Client::connect(scenario_options(addr)).await.expect("client");

    let mut tasks = Vec::new();
    for i in 0..12u8 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                match client.send(&[i; 32]).await {
                    Ok(reply) => return reply,
                    Err(Error::PoolExhausted { .. }) => tokio::task::yield_now().await,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.expect("join"), vec![i as u8; 32]);
    }
    assert!(client.live_count() <= 3);

    client.close().await.expect("close");
    server.shutdown();
}

#[tokio::test]
async fn dead_peer_is_not_retained() {
    // A host that answers once, then hangs up.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let request = read_frame(&mut stream).await.expect("read");
        write_frame(&mut stream, &request).await.expect("write");
    });

    let options = scenario_options(addr).with_sizes(1, 1);
    let client = Client::connect(options).await.expect("client");

    assert_eq!(client.send(b"first").await.expect("send"), b"first");

    let err = client.send(b"second").await.unwrap_err();
    assert!(err.is_connection_broken(), "unexpected error: {err}");
    assert_eq!(client.live_count(), 0);
    assert_eq!(client.idle_count(), 0);
}

#[tokio::test]
async fn connect_fails_when_host_is_down() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let options = scenario_options(addr).with_connect_timeout(Duration::from_secs(1));
    let err = Client::connect(options).await.unwrap_err();
    assert!(matches!(err, Error::Dial { .. }));
}

#[tokio::test]
async fn idle_connections_are_reaped_to_minimum() {
    let (server, addr) = spawn_echo_server().await;
    let options = scenario_options(addr)
        .with_sizes(1, 3)
        .with_idle_timeout(Duration::from_millis(30))
        .with_reap_period(Duration::from_millis(10));
    let client = Client::connect(options).await.expect("client");

    let pool = client.pool();
    let a = pool.acquire().await.expect("a");
    let b = pool.acquire().await.expect("b");
    let c = pool.acquire().await.expect("c");
    assert_eq!(client.live_count(), 3);
    drop((a, b, c));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(client.live_count(), 1);

    client.close().await.expect("close");
    server.shutdown();
}
