//! Request/response client over a connection pool.
//!
//! The [`Client`] hides pooling and framing: each [`send`](Client::send)
//! checks out a connection, performs one exchange, and hands the connection
//! back (or discards it if the stream broke).
//!
//! # Example
//!
//! ```no_run
//! use pooled_tcp::{Client, PoolOptions};
//!
//! # async fn example() -> pooled_tcp::Result<()> {
//! let client = Client::connect(PoolOptions::new("127.0.0.1:3000")).await?;
//! let reply = client.send(b"hello").await?;
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::error::Result;
use crate::transport::{Dialer, Pool, TcpDialer};

use super::options::PoolOptions;

// ============================================================================
// Client
// ============================================================================

/// Pooled request/response client.
///
/// Cheap to clone; clones share the pool.
pub struct Client<D: Dialer = TcpDialer> {
    /// Shared connection pool.
    pool: Arc<Pool<D>>,
}

impl<D: Dialer> Clone for Client<D> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
        }
    }
}

impl<D: Dialer> fmt::Debug for Client<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("addr", &self.pool.options().addr)
            .field("live", &self.pool.live_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Constructors
// ============================================================================

impl Client<TcpDialer> {
    /// Creates a TCP client and pre-fills its pool.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if the options are invalid
    /// - [`Error::Dial`](crate::Error::Dial) if a pre-fill dial fails
    pub async fn connect(options: PoolOptions) -> Result<Self> {
        let pool = Pool::new(options).await?;
        Ok(Self { pool })
    }
}

impl<D: Dialer> Client<D> {
    /// Creates a client using a custom dialer.
    ///
    /// # Errors
    ///
    /// Same as [`Client::connect`].
    pub async fn with_dialer(options: PoolOptions, dialer: D) -> Result<Self> {
        let pool = Pool::with_dialer(options, dialer).await?;
        Ok(Self { pool })
    }
}

// ============================================================================
// Client - Public API
// ============================================================================

impl<D: Dialer> Client<D> {
    /// Sends `input` as one frame and returns the response frame.
    ///
    /// # Errors
    ///
    /// - [`Error::PoolClosed`](crate::Error::PoolClosed) after [`close`](Self::close)
    /// - [`Error::PoolExhausted`](crate::Error::PoolExhausted) if every connection is busy
    /// - [`Error::Dial`](crate::Error::Dial) if growing the pool fails
    /// - [`Error::Framing`](crate::Error::Framing) or
    ///   [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) if the
    ///   stream broke; that connection is dropped from the pool
    ///
    /// Dropping the returned future before it resolves also drops the
    /// connection from the pool.
    pub async fn send(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut conn = self.pool.acquire().await?;
        let output = conn.exchange(input).await?;

        trace!(sent = input.len(), received = output.len(), "Exchange complete");
        Ok(output)
    }

    /// Closes every pooled connection.
    ///
    /// # Errors
    ///
    /// The first error encountered while draining.
    pub async fn close(&self) -> Result<()> {
        self.pool.close().await
    }

    /// Returns the underlying pool.
    #[inline]
    #[must_use]
    pub fn pool(&self) -> &Arc<Pool<D>> {
        &self.pool
    }

    /// Returns the number of live connections.
    #[inline]
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.pool.live_count()
    }

    /// Returns the number of idle connections.
    #[inline]
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.pool.idle_count()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::error::Error;
    use crate::transport::pool::tests::{EchoDialer, options};

    #[tokio::test]
    async fn test_send_echo() {
        let client = Client::with_dialer(options(1, 3), EchoDialer::default())
            .await
            .expect("client");

        let reply = client.send(b"hello").await.expect("send");
        assert_eq!(reply, b"hello");
        assert_eq!(client.live_count(), 1);
        assert_eq!(client.idle_count(), 1);

        client.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_send_empty_payload() {
        let client = Client::with_dialer(options(1, 1), EchoDialer::default())
            .await
            .expect("client");

        assert!(client.send(b"").await.expect("send").is_empty());
        client.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_timed_out_send_does_not_leak_reply() {
        let client = Client::with_dialer(
            options(1, 1),
            EchoDialer::slow(Duration::from_millis(100)),
        )
        .await
        .expect("client");

        let timed_out = tokio::time::timeout(Duration::from_millis(20), client.send(b"first")).await;
        assert!(timed_out.is_err());
        assert_eq!(client.live_count(), 0);
        assert_eq!(client.idle_count(), 0);

        let reply = client.send(b"second").await.expect("send");
        assert_eq!(reply, b"second");
        assert_eq!(client.live_count(), 1);

        client.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_send_after_close_is_pool_closed() {
        let client = Client::with_dialer(options(1, 1), EchoDialer::default())
            .await
            .expect("client");

        client.close().await.expect("close");
        let err = client.send(b"hello").await.unwrap_err();
        assert!(matches!(err, Error::PoolClosed));
    }

    #[tokio::test]
    async fn test_clones_share_pool() {
        let client = Client::with_dialer(options(0, 2), EchoDialer::default())
            .await
            .expect("client");
        let other = client.clone();

        other.send(b"x").await.expect("send");
        assert_eq!(client.live_count(), 1);

        client.close().await.expect("close");
        assert_eq!(other.live_count(), 0);
    }

    #[tokio::test]
    async fn test_debug_shows_addr() {
        let client = Client::with_dialer(
            options(0, 1).with_wait_timeout(Duration::from_millis(1)),
            EchoDialer::default(),
        )
        .await
        .expect("client");

        assert!(format!("{client:?}").contains("mem:0"));
    }
}
