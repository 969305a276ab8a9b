//! TCP transport layer.
//!
//! This module owns every socket the crate opens or accepts.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                         ┌──────────────────┐
//! │  Client          │                         │  Server          │
//! │                  │    framed messages      │                  │
//! │  Pool            │◄───────────────────────►│  accept loop     │
//! │  → Connection    │   uint32 LE || payload  │  → Processor     │
//! │  → Idle Reaper   │                         │                  │
//! └──────────────────┘                         └──────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Pool::new` - Dial `min_size` connections, start the reaper
//! 2. `Pool::acquire` - Check out an idle connection (or grow by one)
//! 3. `PooledConnection::exchange` - One framed request/response
//! 4. Drop the guard - Back to the idle queue, or discarded if broken
//! 5. `Pool::close` - Drain and close every connection
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Stream plus last-activity timestamp |
//! | `dialer` | Outbound stream factory |
//! | `pool` | Bounded connection pool |
//! | `reaper` | Idle connection eviction |
//! | `server` | Accept loop and per-connection serving |

// ============================================================================
// Submodules
// ============================================================================

/// Single pooled connection.
pub mod connection;

/// Outbound stream factory.
pub mod dialer;

/// Bounded connection pool.
pub mod pool;

/// Background idle eviction.
mod reaper;

/// Accepting side.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Connection;
pub use dialer::{Dialer, TcpDialer};
pub use pool::{Pool, PoolConnection, PooledConnection};
pub use server::{Server, serve_connection};
