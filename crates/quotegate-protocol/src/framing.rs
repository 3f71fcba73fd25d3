//! Length-prefixed message framing.
//!
//! Every message on the wire is `LEN (4 bytes, big-endian, unsigned)`
//! followed by `LEN` body bytes. Reads yield exactly one message per call
//! and preserve order on a single connection.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::FrameError;

/// Maximum allowed frame body size (5 MiB).
pub const MAX_FRAME_SIZE: usize = 5 * 1024 * 1024;

/// Read one length-prefixed frame from the stream.
///
/// The declared length is checked against [`MAX_FRAME_SIZE`] before any
/// body byte is read, so an oversized announcement costs the peer nothing
/// but the 4-byte header.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge {
            len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

/// Write one length-prefixed frame to the stream.
///
/// Short writes are retried to completion; the frame is flushed before
/// returning.
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    if body.len() > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge {
            len: body.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    writer.write_all(&(body.len() as u32).to_be_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Try to split one frame off the front of a receive buffer.
///
/// For buffered or non-blocking transports. Returns `Ok(None)` while fewer
/// than `4 + LEN` bytes are available; no bytes are consumed in that case.
/// On success returns the body and the total number of bytes consumed,
/// header included.
pub fn decode_buffered(buf: &[u8]) -> Result<Option<(Vec<u8>, usize)>, FrameError> {
    if buf.len() < 4 {
        return Ok(None);
    }

    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge {
            len,
            max: MAX_FRAME_SIZE,
        });
    }

    if buf.len() < 4 + len {
        return Ok(None);
    }

    Ok(Some((buf[4..4 + len].to_vec(), 4 + len)))
}
