//! Background eviction of idle connections.
//!
//! Every `reap_period` the reaper takes one connection from the idle queue.
//! If it has been idle longer than `idle_timeout` it is shrunk (never below
//! `min_size`); otherwise it goes straight back to the tail of the queue.
//!
//! Only one connection is sampled per period, so a stale connection is
//! evicted within roughly `reap_period * live_count`.
//!
//! The task holds a weak pool reference and stops when the pool closes or
//! is dropped.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, trace, warn};

use crate::error::Error;

use super::dialer::Dialer;
use super::pool::{Pool, PoolConnection};

// ============================================================================
// Spawn
// ============================================================================

/// Starts the reaper for `pool`.
pub(crate) fn spawn<D: Dialer>(pool: &Arc<Pool<D>>) -> JoinHandle<()> {
    let shutdown = pool.subscribe_shutdown();
    let period = pool.options().reap_period;
    tokio::spawn(run(Arc::downgrade(pool), shutdown, period))
}

// ============================================================================
// Loop
// ============================================================================

async fn run<D: Dialer>(pool: Weak<Pool<D>>, mut shutdown: watch::Receiver<bool>, period: Duration) {
    debug!(period_ms = period.as_millis() as u64, "Idle reaper started");

    loop {
        tokio::select! {
            _ = sleep(period) => {}
            _ = shutdown.changed() => break,
        }

        if *shutdown.borrow() {
            break;
        }

        let Some(pool) = pool.upgrade() else {
            break;
        };

        if pool.is_closed() {
            break;
        }

        if pool.live_count() == 0 {
            continue;
        }

        tokio::select! {
            conn = pool.dequeue() => {
                if let Some(conn) = conn {
                    inspect(&pool, conn).await;
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    debug!("Idle reaper terminated");
}

/// Evicts `conn` if stale, otherwise requeues it untouched.
///
/// A closing pool gets the connection back; `close` drains it.
async fn inspect<D: Dialer>(pool: &Pool<D>, conn: PoolConnection<D>) {
    let idle_timeout = pool.options().idle_timeout;

    if pool.is_closed() || !conn.is_idle_longer_than(idle_timeout) {
        pool.enqueue(conn);
        return;
    }

    let conn_id = conn.id();
    let idle_ms = conn.idle_for().as_millis() as u64;

    match pool.shrink(Some(conn), false).await {
        Ok(_) => debug!(conn_id, idle_ms, live = pool.live_count(), "Evicted idle connection"),
        Err(Error::BelowMinimum { min_size }) => {
            trace!(conn_id, min_size, "Idle connection kept at pool minimum");
        }
        Err(e) => warn!(conn_id, error = %e, "Idle eviction failed"),
    }
}

// ============================================================================
// Tests
// ============================================================================
