//! A single pooled connection.
//!
//! Wraps one live byte stream together with the instant it was last
//! handed back to the pool. A [`Connection`] has exactly one owner at a
//! time: the idle queue, one caller of [`Pool::acquire`](super::Pool::acquire),
//! or the idle reaper.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::Result as IoResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::error::Result;
use crate::protocol::{read_frame, write_frame};

// ============================================================================
// Constants
// ============================================================================

/// Source of process-unique connection ids (log correlation only).
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// Connection
// ============================================================================

/// One live byte stream plus its last-activity timestamp.
pub struct Connection<S> {
    /// Process-unique id.
    id: u64,
    /// Underlying stream.
    stream: S,
    /// Last time the connection was created or released.
    last_active: Instant,
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("idle_for", &self.idle_for())
            .finish_non_exhaustive()
    }
}

impl<S> Connection<S> {
    /// Wraps a freshly dialed stream.
    pub(crate) fn new(stream: S) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            stream,
            last_active: Instant::now(),
        }
    }

    /// Returns the connection id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns when the connection was last active.
    #[inline]
    #[must_use]
    pub fn last_active(&self) -> Instant {
        self.last_active
    }

    /// Returns how long the connection has been idle.
    #[inline]
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }

    /// Returns `true` if idle strictly longer than `limit`.
    #[inline]
    #[must_use]
    pub fn is_idle_longer_than(&self, limit: Duration) -> bool {
        self.idle_for() > limit
    }

    /// Marks the connection as active now.
    #[inline]
    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Performs one framed request/response exchange.
    ///
    /// # Errors
    ///
    /// Any framing error. The connection must be discarded afterwards.
    pub async fn exchange(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        write_frame(&mut self.stream, input).await?;
        read_frame(&mut self.stream).await
    }

    /// Shuts the stream down. The socket is released when `self` drops.
    pub async fn close(mut self) -> IoResult<()> {
        self.stream.shutdown().await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::duplex;

    use crate::protocol::receive;

    #[test]
    fn test_ids_are_unique() {
        let a = Connection::new(());
        let b = Connection::new(());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_touch_resets_idle_time() {
        let mut conn = Connection::new(());
        conn.last_active = Instant::now() - Duration::from_secs(5);
        assert!(conn.is_idle_longer_than(Duration::from_secs(1)));

        conn.touch();
        assert!(!conn.is_idle_longer_than(Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_exchange_reads_framed_reply() {
        let (client, mut server) = duplex(1024);
        let mut conn = Connection::new(client);

        let peer = tokio::spawn(async move {
            let echo = |input: Vec<u8>| Ok::<_, std::io::Error>(input);
            receive(&mut server, &echo).await
        });

        let reply = conn.exchange(b"hello").await.expect("exchange");
        assert_eq!(reply, b"hello");
        peer.await.expect("join").expect("receive");
    }

    #[tokio::test]
    async fn test_exchange_after_peer_close_fails() {
        let (client, server) = duplex(1024);
        drop(server);

        let mut conn = Connection::new(client);
        let err = conn.exchange(b"hello").await.unwrap_err();
        assert!(err.is_connection_broken());
    }
}
