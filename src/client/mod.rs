//! Client facade and configuration.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Send a request, get a response, over a pooled connection |
//! | [`PoolOptions`] | Address, pool bounds and timing |

// ============================================================================
// Submodules
// ============================================================================

/// Client implementation.
pub mod core;

/// Pool and client options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::Client;
pub use options::PoolOptions;
