//! Pool and client configuration.
//!
//! Provides a type-safe interface for the address, sizing, and timing
//! parameters shared by [`Pool`](crate::transport::Pool) and
//! [`Client`](super::Client).
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use pooled_tcp::PoolOptions;
//!
//! let options = PoolOptions::new("127.0.0.1:3000")
//!     .with_sizes(1, 3)
//!     .with_idle_timeout(Duration::from_millis(100))
//!     .with_wait_timeout(Duration::from_millis(10))
//!     .with_reap_period(Duration::from_secs(1));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default remote address.
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

/// Default number of connections kept open at all times.
pub const DEFAULT_MIN_SIZE: usize = 1;

/// Default upper bound on open connections.
pub const DEFAULT_MAX_SIZE: usize = 4;

/// Default time a connection may sit idle before eviction.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Default wait for an idle connection before growing the pool.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(10);

/// Default interval between idle reaper samples.
pub const DEFAULT_REAP_PERIOD: Duration = Duration::from_secs(1);

// ============================================================================
// PoolOptions
// ============================================================================

/// Connection pool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolOptions {
    /// Remote address in `host:port` form.
    pub addr: String,

    /// Connections dialed up front and never reaped.
    pub min_size: usize,

    /// Maximum connections alive at once (idle + checked out).
    pub max_size: usize,

    /// Idle time after which the reaper may close a connection.
    pub idle_timeout: Duration,

    /// How long `acquire` waits for an idle connection before dialing.
    pub wait_timeout: Duration,

    /// Sleep between reaper samples.
    pub reap_period: Duration,

    /// Upper bound on a single connect attempt.
    pub connect_timeout: Option<Duration>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::new(DEFAULT_ADDR)
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl PoolOptions {
    /// Creates options for `addr` with default sizing and timing.
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            min_size: DEFAULT_MIN_SIZE,
            max_size: DEFAULT_MAX_SIZE,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            reap_period: DEFAULT_REAP_PERIOD,
            connect_timeout: None,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl PoolOptions {
    /// Sets the remote address.
    #[inline]
    #[must_use]
    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Sets the minimum pool size.
    #[inline]
    #[must_use]
    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    /// Sets the maximum pool size.
    #[inline]
    #[must_use]
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets both pool bounds.
    #[inline]
    #[must_use]
    pub fn with_sizes(mut self, min_size: usize, max_size: usize) -> Self {
        self.min_size = min_size;
        self.max_size = max_size;
        self
    }

    /// Sets the idle eviction threshold.
    #[inline]
    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Sets the wait before growing the pool.
    #[inline]
    #[must_use]
    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    /// Sets the reaper period.
    #[inline]
    #[must_use]
    pub fn with_reap_period(mut self, reap_period: Duration) -> Self {
        self.reap_period = reap_period;
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = Some(connect_timeout);
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl PoolOptions {
    /// Checks the options for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the address is empty, `max_size` is zero,
    /// `min_size` exceeds `max_size`, or `reap_period` is zero.
    ///
    /// `max_size` sizes the bounded idle queue, and a zero-capacity
    /// `tokio::sync::mpsc` channel panics on creation.
    pub fn validate(&self) -> Result<()> {
        if self.addr.trim().is_empty() {
            return Err(Error::config("address must not be empty"));
        }

        if self.max_size == 0 {
            return Err(Error::config("max_size must be at least 1"));
        }

        if self.min_size > self.max_size {
            return Err(Error::config(format!(
                "min_size ({}) exceeds max_size ({})",
                self.min_size, self.max_size
            )));
        }

        if self.reap_period.is_zero() {
            return Err(Error::config("reap_period must be non-zero"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
