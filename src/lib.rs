//! Pooled TCP client with length-prefixed framing.
//!
//! This library keeps a bounded pool of persistent connections to one
//! remote address and exchanges length-prefixed binary messages over them,
//! so callers can issue request/response calls without a handshake per
//! call.
//!
//! # Architecture
//!
//! - **Framer**: `uint32 little-endian length || payload`, chunked I/O
//! - **Connection**: one live stream plus a last-activity timestamp
//! - **Pool**: bounded idle queue plus a live counter; grows on demand
//! - **Idle Reaper**: samples one idle connection per period and evicts it
//!   if stale, never below `min_size`
//! - **Client**: acquire, exchange, release
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use pooled_tcp::{Client, PoolOptions, Result, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Echo host
//!     let server = Server::bind("127.0.0.1:0").await?;
//!     server.spawn(|input: Vec<u8>| Ok::<_, std::io::Error>(input));
//!
//!     // Pooled client
//!     let options = PoolOptions::new(server.local_addr().to_string())
//!         .with_sizes(1, 3)
//!         .with_idle_timeout(Duration::from_millis(100))
//!         .with_wait_timeout(Duration::from_millis(10));
//!     let client = Client::connect(options).await?;
//!
//!     let reply = client.send(b"hello").await?;
//!     assert_eq!(reply, b"hello");
//!
//!     client.close().await?;
//!     server.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`] facade and [`PoolOptions`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | Framing and the server-side [`Processor`] |
//! | [`transport`] | [`Pool`], [`Connection`], [`Server`] |

// ============================================================================
// Modules
// ============================================================================

/// Client facade and configuration.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Wire protocol.
///
/// Length-prefixed frames and the request processor trait.
pub mod protocol;

/// TCP transport layer.
///
/// Connection pool, idle reaper, dialer and accept loop.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, PoolOptions};

// Error types
pub use error::{BoxError, Error, Result};

// Protocol types
pub use protocol::{Processor, read_frame, receive, write_frame};

// Transport types
pub use transport::{
    Connection, Dialer, Pool, PooledConnection, Server, TcpDialer, serve_connection,
};
