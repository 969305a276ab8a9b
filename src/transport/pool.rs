//! Bounded pool of persistent connections to a single address.
//!
//! Idle connections wait in a FIFO queue; the live count tracks every
//! connection that exists, idle or checked out.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                    Pool                      │
//! │                                              │
//! │  live: AtomicUsize   (0 ..= max_size)        │
//! │  lifecycle: Mutex    (grow / shrink)         │
//! │                                              │
//! │  idle queue (bounded, FIFO)                  │
//! │  ┌──────┬──────┬──────┐                      │
//! │  │ conn │ conn │ conn │ ◄── release          │
//! │  └──────┴──────┴──────┘ ──► acquire / reaper │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Checking a connection in or out of the queue needs no lock. Dialing and
//! closing happen under `lifecycle`. Discarding a broken connection only
//! decrements the live count, so it can take the pool below `min_size`;
//! the next `acquire` grows it back. A non-forced shrink makes its floor
//! check and its decrement in one atomic step, so it never races a discard
//! under the floor.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::client::PoolOptions;
use crate::error::{Error, Result};

use super::connection::Connection;
use super::dialer::{Dialer, TcpDialer};
use super::reaper;

// ============================================================================
// Constants
// ============================================================================

/// How often a draining shrink re-checks the live count while waiting.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// Types
// ============================================================================

/// Connection type held by a pool using dialer `D`.
pub type PoolConnection<D> = Connection<<D as Dialer>::Stream>;

// ============================================================================
// Pool
// ============================================================================

/// Bounded pool of reusable connections.
///
/// Always handled through `Arc<Pool>`; the idle reaper keeps only a weak
/// reference.
///
/// # Example
///
/// ```ignore
/// let pool = Pool::new(PoolOptions::new("127.0.0.1:3000")).await?;
///
/// let mut conn = pool.acquire().await?;
/// let reply = conn.exchange(b"hello").await?;
/// drop(conn); // back to the idle queue
///
/// pool.close().await?;
/// ```
pub struct Pool<D: Dialer = TcpDialer> {
    /// Address, sizing and timing.
    options: PoolOptions,

    /// Stream factory.
    dialer: D,

    /// Connections that exist, idle or checked out.
    live: AtomicUsize,

    /// Set once `close` starts.
    closed: AtomicBool,

    /// Serializes grow and shrink.
    lifecycle: AsyncMutex<()>,

    /// Idle queue, sending side.
    idle_tx: mpsc::Sender<PoolConnection<D>>,

    /// Idle queue, receiving side. Waiters are served in FIFO order.
    idle_rx: AsyncMutex<mpsc::Receiver<PoolConnection<D>>>,

    /// Fires `true` when the pool closes.
    shutdown_tx: watch::Sender<bool>,

    /// Idle reaper task.
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl<D: Dialer> fmt::Debug for Pool<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("addr", &self.options.addr)
            .field("live", &self.live_count())
            .field("idle", &self.idle_count())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Pool - Constructor
// ============================================================================

impl Pool<TcpDialer> {
    /// Creates a TCP pool and pre-fills `min_size` connections.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the options are invalid
    /// - [`Error::Dial`] if any pre-fill dial fails
    pub async fn new(options: PoolOptions) -> Result<Arc<Self>> {
        let dialer = TcpDialer::new().with_connect_timeout(options.connect_timeout);
        Self::with_dialer(options, dialer).await
    }
}

impl<D: Dialer> Pool<D> {
    /// Creates a pool using a custom dialer.
    ///
    /// Dials `min_size` connections one after another. If any dial fails,
    /// every connection created so far is closed and the dial error is
    /// returned. On success the idle reaper is started.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the options are invalid
    /// - [`Error::Dial`] if any pre-fill dial fails
    pub async fn with_dialer(options: PoolOptions, dialer: D) -> Result<Arc<Self>> {
        options.validate()?;

        let (idle_tx, idle_rx) = mpsc::channel(options.max_size);
        let (shutdown_tx, _) = watch::channel(false);

        let pool = Arc::new(Self {
            options,
            dialer,
            live: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            lifecycle: AsyncMutex::new(()),
            idle_tx,
            idle_rx: AsyncMutex::new(idle_rx),
            shutdown_tx,
            reaper: Mutex::new(None),
        });

        for _ in 0..pool.options.min_size {
            if let Err(e) = pool.fill().await {
                warn!(addr = %pool.options.addr, error = %e, "Pool pre-fill failed, tearing down");
                if let Err(close_err) = pool.close().await {
                    warn!(error = %close_err, "Teardown after failed pre-fill reported an error");
                }
                return Err(e);
            }
        }

        let handle = reaper::spawn(&pool);
        *pool.reaper.lock() = Some(handle);

        info!(
            addr = %pool.options.addr,
            min = pool.options.min_size,
            max = pool.options.max_size,
            "Pool started"
        );

        Ok(pool)
    }
}

// ============================================================================
// Pool - Public API
// ============================================================================

impl<D: Dialer> Pool<D> {
    /// Returns the pool options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    /// Returns the number of live connections (idle + checked out).
    #[inline]
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Returns the number of connections waiting in the idle queue.
    #[inline]
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle_tx.max_capacity() - self.idle_tx.capacity()
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Checks out a connection.
    ///
    /// Waits up to `wait_timeout` for an idle connection. If none shows up,
    /// dials one new connection and hands it out directly. An empty but
    /// open pool skips the wait.
    ///
    /// The returned guard releases the connection when dropped.
    ///
    /// # Errors
    ///
    /// - [`Error::PoolClosed`] if the pool has been closed
    /// - [`Error::PoolExhausted`] if the pool is at `max_size`
    /// - [`Error::Dial`] if dialing the new connection fails
    pub async fn acquire(self: &Arc<Self>) -> Result<PooledConnection<D>> {
        if self.is_closed() {
            return Err(Error::PoolClosed);
        }

        let conn = if self.live_count() == 0 {
            self.grow().await?
        } else {
            match timeout(self.options.wait_timeout, self.dequeue()).await {
                Ok(Some(conn)) => conn,
                Ok(None) => return Err(Error::PoolClosed),
                Err(_) => {
                    trace!(
                        wait_ms = self.options.wait_timeout.as_millis() as u64,
                        "No idle connection, growing pool"
                    );
                    self.grow().await?
                }
            }
        };

        trace!(conn_id = conn.id(), "Connection acquired");
        Ok(PooledConnection::new(Arc::clone(self), conn))
    }

    /// Returns a connection to the idle queue with a fresh timestamp.
    ///
    /// Must be called once per detached connection that is still usable.
    pub fn release(&self, mut conn: PoolConnection<D>) {
        conn.touch();
        trace!(conn_id = conn.id(), "Connection released");
        self.enqueue(conn);
    }

    /// Closes one connection and decrements the live count.
    ///
    /// With `conn == None` an idle connection is taken from the queue,
    /// waiting for one to be released if necessary. Without `force` the
    /// pool never drops below `min_size`; the connection goes back to the
    /// idle queue instead.
    ///
    /// Returns `true` when the pool is empty afterwards.
    ///
    /// # Errors
    ///
    /// - [`Error::PoolEmpty`] if no connection is live
    /// - [`Error::BelowMinimum`] if a non-forced shrink would go under `min_size`
    /// - [`Error::Io`] if closing the stream fails (the connection is still removed)
    pub async fn shrink(&self, conn: Option<PoolConnection<D>>, force: bool) -> Result<bool> {
        if self.live_count() == 0 {
            return Err(Error::PoolEmpty);
        }

        // Wait outside `lifecycle`: whoever holds the connection we are
        // waiting for may need the lock to hand it back.
        let conn = match conn {
            Some(conn) => conn,
            None => match self.dequeue_while_live().await {
                Some(conn) => conn,
                None => return Err(Error::PoolEmpty),
            },
        };

        let _guard = self.lifecycle.lock().await;

        let live = if force {
            self.decrement_live()
        } else {
            match self.decrement_above(self.options.min_size) {
                Some(live) => live,
                None => {
                    self.enqueue(conn);
                    return Err(Error::BelowMinimum {
                        min_size: self.options.min_size,
                    });
                }
            }
        };
        let conn_id = conn.id();

        if let Err(e) = conn.close().await {
            warn!(conn_id, live, error = %e, "Connection close failed");
            return Err(Error::Io(e));
        }

        debug!(conn_id, live, force, "Connection closed");
        Ok(live == 0)
    }

    /// Closes every connection and stops the reaper.
    ///
    /// Best effort: keeps shrinking until the pool is empty and returns the
    /// first error seen. Waits for checked-out connections to come back.
    ///
    /// # Errors
    ///
    /// The first error returned by an individual shrink.
    pub async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.shutdown_tx.send_replace(true);

        info!(addr = %self.options.addr, live = self.live_count(), "Pool closing");

        let mut first_error = None;
        while self.live_count() > 0 {
            match self.shrink(None, true).await {
                Ok(true) | Err(Error::PoolEmpty) => break,
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "Error while draining pool");
                    first_error.get_or_insert(e);
                }
            }
        }

        let handle = self.reaper.lock().take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Idle reaper task failed");
        }

        info!(addr = %self.options.addr, "Pool closed");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Pool - Internals
// ============================================================================

impl<D: Dialer> Pool<D> {
    /// Dials one connection and counts it as live.
    async fn grow(&self) -> Result<PoolConnection<D>> {
        let _guard = self.lifecycle.lock().await;

        if self.is_closed() {
            return Err(Error::PoolClosed);
        }

        if self.live_count() >= self.options.max_size {
            return Err(Error::PoolExhausted {
                max_size: self.options.max_size,
            });
        }

        let stream = self
            .dialer
            .dial(&self.options.addr)
            .await
            .map_err(|e| Error::dial(&self.options.addr, e))?;

        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        let conn = Connection::new(stream);

        debug!(conn_id = conn.id(), live, addr = %self.options.addr, "Connection dialed");
        Ok(conn)
    }

    /// Dials one connection straight into the idle queue.
    async fn fill(&self) -> Result<()> {
        let conn = self.grow().await?;
        self.enqueue(conn);
        Ok(())
    }

    /// Waits for the next idle connection.
    pub(crate) async fn dequeue(&self) -> Option<PoolConnection<D>> {
        self.idle_rx.lock().await.recv().await
    }

    /// Like [`dequeue`](Self::dequeue), but gives up once nothing is live.
    ///
    /// A checked-out connection that gets discarded never reaches the idle
    /// queue, so a plain wait could hang forever.
    async fn dequeue_while_live(&self) -> Option<PoolConnection<D>> {
        loop {
            match timeout(DRAIN_POLL_INTERVAL, self.dequeue()).await {
                Ok(conn) => return conn,
                Err(_) if self.live_count() == 0 => return None,
                Err(_) => continue,
            }
        }
    }

    /// Puts a connection in the idle queue without touching its timestamp.
    pub(crate) fn enqueue(&self, conn: PoolConnection<D>) {
        if let Err(e) = self.idle_tx.try_send(conn) {
            // Only reachable if the live count drifted above max_size.
            let conn = e.into_inner();
            warn!(conn_id = conn.id(), "Idle queue rejected connection, discarding");
            self.discard(conn);
        }
    }

    /// Drops a broken connection and uncounts it.
    pub(crate) fn discard(&self, conn: PoolConnection<D>) {
        let live = self.decrement_live();
        debug!(conn_id = conn.id(), live, "Connection discarded");
    }

    /// Returns a receiver for the close signal.
    pub(crate) fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Saturating decrement; returns the new count.
    fn decrement_live(&self) -> usize {
        let previous = self
            .live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .unwrap_or(0);
        previous.saturating_sub(1)
    }

    /// Decrements only while the count stays at or above `floor`.
    ///
    /// Returns the new count, or `None` if the count is already at `floor`.
    fn decrement_above(&self, floor: usize) -> Option<usize> {
        self.live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n > floor).then(|| n - 1)
            })
            .ok()
            .map(|previous| previous - 1)
    }
}

// ============================================================================
// PooledConnection
// ============================================================================

/// Checked-out connection that returns itself to the pool on drop.
///
/// A connection that failed at the stream level is discarded instead of
/// returned.
pub struct PooledConnection<D: Dialer = TcpDialer> {
    /// Owning pool.
    pool: Arc<Pool<D>>,
    /// Present until dropped or detached.
    conn: Option<PoolConnection<D>>,
    /// Set after a stream-level failure.
    broken: bool,
}

impl<D: Dialer> fmt::Debug for PooledConnection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("conn", &self.conn)
            .field("broken", &self.broken)
            .finish_non_exhaustive()
    }
}

impl<D: Dialer> PooledConnection<D> {
    fn new(pool: Arc<Pool<D>>, conn: PoolConnection<D>) -> Self {
        Self {
            pool,
            conn: Some(conn),
            broken: false,
        }
    }

    /// Performs one framed request/response exchange.
    ///
    /// A stream-level failure marks the connection broken. So does dropping
    /// this future before it completes: the stream may hold half a request
    /// or an unread response.
    ///
    /// # Errors
    ///
    /// Any framing error from the exchange.
    pub async fn exchange(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(Error::ConnectionClosed);
        };

        let was_broken = self.broken;
        self.broken = true;

        let result = conn.exchange(input).await;
        match &result {
            Err(e) if e.is_connection_broken() => {
                debug!(conn_id = conn.id(), error = %e, "Connection broken during exchange");
            }
            _ => self.broken = was_broken,
        }
        result
    }

    /// Marks the connection so that dropping the guard discards it.
    #[inline]
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    /// Returns `true` if the connection will be discarded on drop.
    #[inline]
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Returns the wrapped connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> Option<&PoolConnection<D>> {
        self.conn.as_ref()
    }

    /// Takes the connection out of the guard.
    ///
    /// The caller becomes responsible for handing it back through
    /// [`Pool::release`] or [`Pool::shrink`].
    #[must_use]
    pub fn detach(mut self) -> Option<PoolConnection<D>> {
        self.conn.take()
    }
}

impl<D: Dialer> Drop for PooledConnection<D> {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        if self.broken {
            self.pool.discard(conn);
        } else {
            self.pool.release(conn);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
