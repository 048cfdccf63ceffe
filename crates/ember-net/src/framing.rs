//! Length-prefixed framing for ordered byte streams.
//!
//! ```text
//! +-------------------+--------------------+
//! | length (4 bytes)  |   payload          |
//! | u32 little-endian |   (length bytes)   |
//! +-------------------+--------------------+
//! ```
//!
//! The length does not include the prefix itself. Sync messages are small,
//! so the default payload limit is 64 KiB.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::messages::{Message, MessageError, deserialize_message, serialize_message};

/// Configuration for the framing layer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum allowed payload size in bytes.
    pub max_payload_size: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: 65_536,
        }
    }
}

impl FrameConfig {
    /// Rejects a declared payload length above the limit.
    fn check_len(&self, size: u32) -> Result<usize, FrameError> {
        if size > self.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size,
                max: self.max_payload_size,
            });
        }
        Ok(size as usize)
    }
}

/// Errors that can occur during framing operations.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge {
        /// Declared or attempted payload size in bytes, saturated at `u32::MAX`.
        size: u32,
        /// Limit in force on this end of the stream.
        max: u32,
    },

    /// The peer closed the stream before a complete frame arrived.
    #[error("connection closed")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A complete frame arrived but did not decode as a message.
    #[error("bad message: {0}")]
    Message(#[from] MessageError),
}

/// EOF anywhere inside a frame means the peer hung up.
fn closed_on_eof(e: std::io::Error) -> FrameError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        FrameError::ConnectionClosed
    } else {
        FrameError::Io(e)
    }
}

/// Reads a single length-prefixed frame and returns its payload.
pub async fn read_frame<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    config: &FrameConfig,
) -> Result<Vec<u8>, FrameError> {
    let mut prefix = [0u8; 4];
    reader.read_exact(&mut prefix).await.map_err(closed_on_eof)?;
    let len = config.check_len(u32::from_le_bytes(prefix))?;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(closed_on_eof)?;
    Ok(payload)
}

/// Writes a single length-prefixed frame and flushes. Nothing is written if
/// the payload is over the limit.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    payload: &[u8],
    config: &FrameConfig,
) -> Result<(), FrameError> {
    let len = config.check_len(u32::try_from(payload.len()).unwrap_or(u32::MAX))?;

    let mut frame = Vec::with_capacity(4 + len);
    frame.extend_from_slice(&(len as u32).to_le_bytes());
    frame.extend_from_slice(payload);
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame and decodes it as a [`Message`].
///
/// A decode failure consumes the frame, so the stream stays aligned and the
/// caller may keep reading.
pub async fn read_message<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    config: &FrameConfig,
) -> Result<Message, FrameError> {
    let payload = read_frame(reader, config).await?;
    Ok(deserialize_message(&payload)?)
}

/// Encodes `msg` and writes it as one frame.
pub async fn write_message<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg: &Message,
    config: &FrameConfig,
) -> Result<(), FrameError> {
    let payload = serialize_message(msg)?;
    write_frame(writer, &payload, config).await
}
