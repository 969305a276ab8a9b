//! Length-prefixed message framing.
//!
//! Every message on the wire, in either direction, is a 4-byte
//! little-endian unsigned length followed by that many payload bytes:
//!
//! ```text
//! +----------------+---------------------------+
//! | length: u32 LE | payload: `length` bytes   |
//! +----------------+---------------------------+
//! | 4B             | 0..=u32::MAX              |
//! +----------------+---------------------------+
//! ```
//!
//! There is no magic number, version field, or checksum. Payloads are
//! read and written in chunks of at most [`MAX_CHUNK_SIZE`] bytes.

// ============================================================================
// Imports
// ============================================================================

use std::io::{Error as IoError, ErrorKind};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{Error, Result};

use super::processor::Processor;

// ============================================================================
// Constants
// ============================================================================

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Largest slice handed to a single read or write call.
pub const MAX_CHUNK_SIZE: usize = 64 * 1024;

// ============================================================================
// Write
// ============================================================================

/// Writes one frame: the length prefix, then the payload in chunks.
///
/// # Errors
///
/// - [`Error::FrameTooLarge`] if the payload does not fit in a `u32`
/// - [`Error::Framing`] if the stream fails mid-write
pub async fn write_frame<S>(stream: &mut S, payload: &[u8]) -> Result<()>
where
    S: AsyncWrite + Unpin + ?Sized,
{
    let len = u32::try_from(payload.len()).map_err(|_| Error::FrameTooLarge {
        len: payload.len(),
    })?;

    stream
        .write_all(&len.to_le_bytes())
        .await
        .map_err(|e| Error::framing("write length prefix", e))?;

    for chunk in payload.chunks(MAX_CHUNK_SIZE) {
        stream
            .write_all(chunk)
            .await
            .map_err(|e| Error::framing("write payload", e))?;
    }

    stream
        .flush()
        .await
        .map_err(|e| Error::framing("flush", e))?;

    trace!(len, "Frame written");
    Ok(())
}

// ============================================================================
// Read
// ============================================================================

/// Reads one frame and returns its payload.
///
/// # Errors
///
/// - [`Error::ConnectionClosed`] if the peer closed before sending a prefix
/// - [`Error::Framing`] on a short read or stream failure
pub async fn read_frame<S>(stream: &mut S) -> Result<Vec<u8>>
where
    S: AsyncRead + Unpin + ?Sized,
{
    let mut prefix = [0u8; LENGTH_PREFIX_LEN];
    read_prefix(stream, &mut prefix).await?;
    let len = u32::from_le_bytes(prefix) as usize;

    // Grow as bytes arrive; a bogus length must not allocate up front.
    let mut payload = Vec::with_capacity(len.min(MAX_CHUNK_SIZE));
    let mut remaining = len;
    while remaining > 0 {
        let chunk = remaining.min(MAX_CHUNK_SIZE);
        let start = payload.len();
        payload.resize(start + chunk, 0);
        stream
            .read_exact(&mut payload[start..])
            .await
            .map_err(|e| Error::framing("read payload", e))?;
        remaining -= chunk;
    }

    trace!(len, "Frame read");
    Ok(payload)
}

/// Fills the length prefix, telling a clean close apart from a torn prefix.
async fn read_prefix<S>(stream: &mut S, prefix: &mut [u8; LENGTH_PREFIX_LEN]) -> Result<()>
where
    S: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < LENGTH_PREFIX_LEN {
        let n = stream
            .read(&mut prefix[filled..])
            .await
            .map_err(|e| Error::framing("read length prefix", e))?;

        if n == 0 {
            if filled == 0 {
                return Err(Error::ConnectionClosed);
            }
            return Err(Error::framing(
                "read length prefix",
                IoError::new(ErrorKind::UnexpectedEof, "stream ended inside length prefix"),
            ));
        }
        filled += n;
    }
    Ok(())
}

// ============================================================================
// Exchange
// ============================================================================

/// Serves one request on the accepting side.
///
/// Reads a frame, hands the payload to `processor`, and writes the
/// processor's output back as a frame.
///
/// # Errors
///
/// Any framing error, or [`Error::Processor`] if the processor fails. The
/// stream should be dropped after an error.
pub async fn receive<S, P>(stream: &mut S, processor: &P) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
    P: Processor + ?Sized,
{
    let input = read_frame(stream).await?;
    let output = processor.process(input).await.map_err(Error::Processor)?;
    write_frame(stream, &output).await
}

// ============================================================================
// Tests
// ============================================================================
