//! Application callback invoked on the accepting side.
//!
//! A [`Processor`] turns one request payload into one response payload.
//! Plain synchronous closures implement it directly:
//!
//! ```ignore
//! let echo = |input: Vec<u8>| Ok::<_, std::io::Error>(input);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use async_trait::async_trait;

use crate::error::BoxError;

// ============================================================================
// Processor
// ============================================================================

/// Maps an input payload to an output payload.
///
/// Errors are propagated verbatim to the caller of
/// [`receive`](super::frame::receive) as [`Error::Processor`](crate::Error::Processor).
#[async_trait]
pub trait Processor: Send + Sync {
    /// Processes one request payload.
    async fn process(&self, input: Vec<u8>) -> StdResult<Vec<u8>, BoxError>;
}

#[async_trait]
impl<F, E> Processor for F
where
    F: Fn(Vec<u8>) -> StdResult<Vec<u8>, E> + Send + Sync,
    E: Into<BoxError>,
{
    async fn process(&self, input: Vec<u8>) -> StdResult<Vec<u8>, BoxError> {
        self(input).map_err(Into::into)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    struct Reverse;

    #[async_trait]
    impl Processor for Reverse {
        async fn process(&self, mut input: Vec<u8>) -> StdResult<Vec<u8>, BoxError> {
            input.reverse();
            Ok(input)
        }
    }

    #[tokio::test]
    async fn test_closure_processor() {
        let echo = |input: Vec<u8>| Ok::<_, std::io::Error>(input);
        let output = echo.process(b"ping".to_vec()).await.expect("process");
        assert_eq!(output, b"ping");
    }

    #[tokio::test]
    async fn test_closure_error_is_boxed() {
        let failing = |_: Vec<u8>| Err::<Vec<u8>, _>("nope");
        let err = failing.process(Vec::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[tokio::test]
    async fn test_struct_processor_through_arc() {
        let processor: Arc<dyn Processor> = Arc::new(Reverse);
        let output = processor.process(b"abc".to_vec()).await.expect("process");
        assert_eq!(output, b"cba");
    }
}
