//! Wire protocol: length-prefixed frames and the server-side processor.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Frame encoding/decoding over async byte streams |
//! | `processor` | Application callback for the accepting side |

// ============================================================================
// Submodules
// ============================================================================

/// Length-prefixed framing.
pub mod frame;

/// Request-to-response callback.
pub mod processor;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::{LENGTH_PREFIX_LEN, MAX_CHUNK_SIZE, read_frame, receive, write_frame};
pub use processor::Processor;
