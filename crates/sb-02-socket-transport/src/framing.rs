//! # Wire Framing
//!
//! Byte-exact protocol spoken on every bus connection.
//!
//! ```text
//! server → client, once, right after accept:
//! ┌──────────────────────────┐
//! │ 00 00 00 00              │  handshake token (i32 LE, value 0)
//! └──────────────────────────┘
//!
//! then, in both directions, any number of frames:
//! ┌──────────────────────────┬───────────────────────────┐
//! │ N (i32 LE)               │ N bytes: encoded envelope │
//! └──────────────────────────┴───────────────────────────┘
//! ```
//!
//! A zero-length frame is legal. A stream that ends inside a frame, or
//! before the handshake is complete, is an error, never a silent EOF.

use std::io::{Read, Write};

use crate::error::FramingError;

/// Value sent by the server to open a connection.
pub const HANDSHAKE_TOKEN: i32 = 0;

/// Size of the handshake and of every length prefix.
pub const PREFIX_LEN: usize = 4;

/// Largest payload that fits the signed 32 bit length prefix.
pub const MAX_FRAME_LEN: usize = i32::MAX as usize;

/// Send the handshake token.
///
/// # Errors
///
/// Returns [`FramingError::Io`] if the write fails.
pub fn write_handshake<W: Write>(writer: &mut W) -> Result<(), FramingError> {
    writer.write_all(&HANDSHAKE_TOKEN.to_le_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Read and verify the handshake token.
///
/// # Errors
///
/// - [`FramingError::Io`] on a short read.
/// - [`FramingError::HandshakeMismatch`] if the token is not zero.
pub fn read_handshake<R: Read>(reader: &mut R) -> Result<(), FramingError> {
    let actual = read_i32(reader)?;
    if actual != HANDSHAKE_TOKEN {
        return Err(FramingError::HandshakeMismatch {
            expected: HANDSHAKE_TOKEN,
            actual,
        });
    }
    Ok(())
}

/// Write one length-prefixed frame and flush it.
///
/// # Errors
///
/// - [`FramingError::FrameTooLarge`] if `payload` exceeds [`MAX_FRAME_LEN`];
///   nothing is written in that case.
/// - [`FramingError::Io`] if the write fails.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), FramingError> {
    let len = i32::try_from(payload.len()).map_err(|_| FramingError::FrameTooLarge(payload.len()))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one length-prefixed frame, blocking until it is complete.
///
/// # Errors
///
/// - [`FramingError::Io`] on a short read, including a stream closed
///   between frames.
/// - [`FramingError::NegativeLength`] for a negative length prefix.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, FramingError> {
    let len = read_i32(reader)?;
    let len = usize::try_from(len).map_err(|_| FramingError::NegativeLength(len))?;

    // Grow with the data actually received instead of trusting the prefix
    // for a single up-front allocation.
    let mut payload = Vec::with_capacity(len.min(64 * 1024));
    let read = reader.take(len as u64).read_to_end(&mut payload)?;
    if read != len {
        return Err(FramingError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("stream closed after {read} of {len} payload bytes"),
        )));
    }
    Ok(payload)
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32, FramingError> {
    let mut raw = [0u8; PREFIX_LEN];
    reader.read_exact(&mut raw)?;
    Ok(i32::from_le_bytes(raw))
}
