//! Outbound connection factory.
//!
//! The pool never opens sockets itself; it asks a [`Dialer`] for a fresh
//! byte stream. [`TcpDialer`] is the default and connects over TCP.

// ============================================================================
// Imports
// ============================================================================

use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

// ============================================================================
// Dialer
// ============================================================================

/// Produces a bidirectional byte stream for an address.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    /// Stream type handed to pooled connections.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Opens a new stream to `addr`.
    async fn dial(&self, addr: &str) -> IoResult<Self::Stream>;
}

// ============================================================================
// TcpDialer
// ============================================================================

/// Dials plain TCP with `TCP_NODELAY` enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcpDialer {
    /// Upper bound on a single connect attempt.
    connect_timeout: Option<Duration>,
}

impl TcpDialer {
    /// Creates a dialer without a connect timeout.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connect_timeout: None,
        }
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub const fn with_connect_timeout(mut self, connect_timeout: Option<Duration>) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(&self, addr: &str) -> IoResult<TcpStream> {
        let stream = match self.connect_timeout {
            Some(limit) => timeout(limit, TcpStream::connect(addr))
                .await
                .map_err(|_| IoError::new(ErrorKind::TimedOut, "connect timed out"))??,
            None => TcpStream::connect(addr).await?,
        };

        // Requests are small and latency bound.
        stream.set_nodelay(true)?;

        trace!(addr, "TCP stream connected");
        Ok(stream)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_dialer_connects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr").to_string();

        let stream = TcpDialer::new().dial(&addr).await.expect("dial");
        assert!(stream.nodelay().expect("nodelay"));
    }

    #[tokio::test]
    async fn test_tcp_dialer_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr").to_string();
        drop(listener);

        let result = TcpDialer::new()
            .with_connect_timeout(Some(Duration::from_secs(1)))
            .dial(&addr)
            .await;
        assert!(result.is_err());
    }
}
