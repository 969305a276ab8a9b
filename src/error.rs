//! Error types for the pooled TCP client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use pooled_tcp::{Client, PoolOptions, Result};
//!
//! async fn example() -> Result<()> {
//!     let client = Client::connect(PoolOptions::new("127.0.0.1:3000")).await?;
//!     let reply = client.send(b"hello").await?;
//!     client.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Dial`], [`Error::ConnectionClosed`] |
//! | Pool | [`Error::PoolExhausted`], [`Error::PoolClosed`], [`Error::PoolEmpty`], [`Error::BelowMinimum`] |
//! | Protocol | [`Error::Framing`], [`Error::FrameTooLarge`] |
//! | Application | [`Error::Processor`] |
//! | External | [`Error::Io`] |

// ============================================================================
// Imports
// ============================================================================

use std::error::Error as StdError;
use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

/// Boxed error returned by application processors.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when pool options fail validation.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Dialing the remote address failed.
    #[error("Failed to dial {addr}: {source}")]
    Dial {
        /// Address that was dialed.
        addr: String,
        /// Underlying connect failure.
        #[source]
        source: IoError,
    },

    /// Peer closed the connection before a frame started.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Pool Errors
    // ========================================================================
    /// Pool is at `max_size` and no idle connection became available.
    #[error("Connection pool is full ({max_size} connections)")]
    PoolExhausted {
        /// Configured maximum pool size.
        max_size: usize,
    },

    /// Every connection in the pool has already been closed.
    #[error("All connections in connection pool are already closed")]
    PoolClosed,

    /// Shrink was requested on a pool with no live connections.
    #[error("Connection pool is empty")]
    PoolEmpty,

    /// Non-forced shrink would drop the pool under its floor.
    #[error("Pool size cannot be lower than minimum of {min_size} connections")]
    BelowMinimum {
        /// Configured minimum pool size.
        min_size: usize,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Short or failed read/write of a frame.
    ///
    /// The connection is unusable after this error.
    #[error("Framing error while trying to {stage}: {source}")]
    Framing {
        /// Step of the exchange that failed.
        stage: &'static str,
        /// Underlying stream error.
        #[source]
        source: IoError,
    },

    /// Payload does not fit in the 32-bit length prefix.
    #[error("Frame of {len} bytes exceeds the 4-byte length prefix")]
    FrameTooLarge {
        /// Payload length in bytes.
        len: usize,
    },

    // ========================================================================
    // Application Errors
    // ========================================================================
    /// Error returned verbatim by the application processor.
    #[error("Processor error: {0}")]
    Processor(#[source] BoxError),

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a dial error.
    #[inline]
    pub fn dial(addr: impl Into<String>, source: IoError) -> Self {
        Self::Dial {
            addr: addr.into(),
            source,
        }
    }

    /// Creates a framing error for the given exchange step.
    #[inline]
    pub fn framing(stage: &'static str, source: IoError) -> Self {
        Self::Framing { stage, source }
    }

    /// Creates a processor error.
    #[inline]
    pub fn processor(err: impl Into<BoxError>) -> Self {
        Self::Processor(err.into())
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error comes from pool bookkeeping.
    #[inline]
    #[must_use]
    pub fn is_pool_error(&self) -> bool {
        matches!(
            self,
            Self::PoolExhausted { .. } | Self::PoolClosed | Self::PoolEmpty | Self::BelowMinimum { .. }
        )
    }

    /// Returns `true` if the connection that produced this error must be
    /// discarded instead of returned to the pool.
    #[inline]
    #[must_use]
    pub fn is_connection_broken(&self) -> bool {
        matches!(
            self,
            Self::Framing { .. } | Self::ConnectionClosed | Self::Io(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PoolExhausted { .. } | Self::Dial { .. } | Self::ConnectionClosed
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
