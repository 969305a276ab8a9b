//! Accepting side of the framed protocol.
//!
//! # Connection Flow
//!
//! 1. [`Server::bind`] binds a TCP listener (port 0 picks a free port)
//! 2. [`Server::run`] accepts connections and spawns one task per peer
//! 3. Each task calls [`serve_connection`]: read frame, process, write frame,
//!    repeated until the peer closes or an error occurs
//! 4. [`Server::shutdown`] stops the accept loop

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::protocol::{Processor, receive};

// ============================================================================
// Constants
// ============================================================================

/// How often the accept loop re-checks the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// serve_connection
// ============================================================================

/// Serves framed requests on one stream until the peer goes away.
///
/// # Errors
///
/// Returns `Ok(())` when the peer closes cleanly between frames, otherwise
/// the first framing or processor error.
pub async fn serve_connection<S, P>(mut stream: S, processor: &P) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    P: Processor + ?Sized,
{
    let mut served: u64 = 0;

    loop {
        match receive(&mut stream, processor).await {
            Ok(()) => served += 1,
            Err(Error::ConnectionClosed) => {
                debug!(served, "Peer closed connection");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }
}

// ============================================================================
// Server
// ============================================================================

/// TCP server speaking the framed protocol.
///
/// # Example
///
/// ```ignore
/// let server = Server::bind("127.0.0.1:0").await?;
/// let addr = server.local_addr();
///
/// let echo = |input: Vec<u8>| Ok::<_, std::io::Error>(input);
/// let task = server.spawn(echo);
///
/// // ...
///
/// server.shutdown();
/// task.await?;
/// ```
#[derive(Debug)]
pub struct Server {
    /// Bound listener.
    listener: TcpListener,

    /// Actual bound address.
    local_addr: SocketAddr,

    /// Shutdown flag.
    shutdown: AtomicBool,
}

impl Server {
    /// Binds a listener to `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Arc<Self>> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        debug!(%local_addr, "Server bound");

        Ok(Arc::new(Self {
            listener,
            local_addr,
            shutdown: AtomicBool::new(false),
        }))
    }

    /// Returns the bound address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Signals the accept loop to stop.
    ///
    /// Connections already being served keep running until their peer
    /// closes.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Runs the accept loop on a background task.
    pub fn spawn<P>(self: &Arc<Self>, processor: P) -> JoinHandle<()>
    where
        P: Processor + 'static,
    {
        tokio::spawn(Arc::clone(self).run(processor))
    }

    /// Accepts connections until [`shutdown`](Self::shutdown) is called.
    pub async fn run<P>(self: Arc<Self>, processor: P)
    where
        P: Processor + 'static,
    {
        let processor = Arc::new(processor);
        info!(local_addr = %self.local_addr, "Server accepting connections");

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                debug!("Accept loop shutting down");
                break;
            }

            // Accept with timeout to allow checking shutdown flag
            match timeout(ACCEPT_POLL_INTERVAL, self.listener.accept()).await {
                Ok(Ok((stream, addr))) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!(error = %e, ?addr, "Failed to set TCP_NODELAY");
                    }

                    debug!(?addr, "Connection accepted");
                    let processor = Arc::clone(&processor);
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, &*processor).await {
                            warn!(error = %e, ?addr, "Connection handling failed");
                        }
                    });
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Accept failed");
                }
                Err(_) => continue,
            }
        }

        info!(local_addr = %self.local_addr, "Server stopped");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Error as IoError;

    use tokio::io::duplex;
    use tokio::net::TcpStream;

    use crate::protocol::{read_frame, write_frame};

    fn echo(input: Vec<u8>) -> std::result::Result<Vec<u8>, IoError> {
        Ok(input)
    }

    #[tokio::test]
    async fn test_serve_connection_until_peer_closes() {
        let (mut client, server) = duplex(1024);
        let task = tokio::spawn(async move { serve_connection(server, &echo).await });

        for msg in [&b"one"[..], b"", b"three"] {
            write_frame(&mut client, msg).await.expect("write");
            assert_eq!(read_frame(&mut client).await.expect("read"), msg);
        }
        drop(client);

        task.await.expect("join").expect("clean close");
    }

    #[tokio::test]
    async fn test_serve_connection_reports_processor_error() {
        let (mut client, server) = duplex(1024);
        let reject = |_: Vec<u8>| Err::<Vec<u8>, _>("unsupported");
        let task = tokio::spawn(async move { serve_connection(server, &reject).await });

        write_frame(&mut client, b"x").await.expect("write");
        let err = task.await.expect("join").unwrap_err();
        assert!(matches!(err, Error::Processor(_)));
    }

    #[tokio::test]
    async fn test_server_bind_random_port() {
        let server = Server::bind("127.0.0.1:0").await.expect("bind");
        assert!(server.local_addr().port() > 0);
    }

    #[tokio::test]
    async fn test_server_echo_and_shutdown() {
        let server = Server::bind("127.0.0.1:0").await.expect("bind");
        let task = server.spawn(echo);

        let mut stream = TcpStream::connect(server.local_addr())
            .await
            .expect("connect");
        write_frame(&mut stream, b"ping").await.expect("write");
        assert_eq!(read_frame(&mut stream).await.expect("read"), b"ping");

        server.shutdown();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("accept loop should stop")
            .expect("join");
    }
}
