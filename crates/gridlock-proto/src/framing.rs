//! Length-prefixed CBOR framing.
//!
//! Wire layout: `[body length: u32 BE][CBOR body]`. The length prefix lets
//! the reader allocate exactly once per frame; [`MAX_FRAME_SIZE`] bounds that
//! allocation against untrusted peers.
//!
//! These helpers are sans-IO. The server reads the 4-byte prefix, then
//! `read_exact`s the body and hands it to [`decode_body`].

use bytes::BufMut;
use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Maximum frame body size in bytes (64 KiB).
///
/// Game messages are tiny; the cap exists purely to bound allocation from a
/// hostile length prefix.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Size of the length prefix in bytes.
pub const PREFIX_SIZE: usize = 4;

/// Encode a message as a length-prefixed frame into `dst`.
///
/// # Errors
///
/// - [`ProtocolError::Encode`] if CBOR serialization fails
/// - [`ProtocolError::FrameTooLarge`] if the encoded body exceeds
///   [`MAX_FRAME_SIZE`]
pub fn encode_frame<T: Serialize>(msg: &T, dst: &mut impl BufMut) -> Result<(), ProtocolError> {
    let mut body = Vec::new();
    ciborium::ser::into_writer(msg, &mut body)
        .map_err(|e| ProtocolError::Encode(e.to_string()))?;

    if body.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge { size: body.len(), max: MAX_FRAME_SIZE });
    }

    dst.put_u32(body.len() as u32);
    dst.put_slice(&body);

    Ok(())
}

/// Validate a body length read from a length prefix.
///
/// # Errors
///
/// [`ProtocolError::FrameTooLarge`] if `len` exceeds [`MAX_FRAME_SIZE`].
pub fn check_body_len(len: usize) -> Result<(), ProtocolError> {
    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge { size: len, max: MAX_FRAME_SIZE });
    }
    Ok(())
}

/// Decode a frame body (the bytes after the length prefix).
///
/// # Errors
///
/// [`ProtocolError::Decode`] if the body is not a valid CBOR encoding of `T`.
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ProtocolError> {
    ciborium::de::from_reader(body).map_err(|e| ProtocolError::Decode(e.to_string()))
}

/// Decode one complete frame from the front of `buf`.
///
/// Returns the message and the number of bytes consumed. Intended for tests
/// and synchronous readers; the async server reads prefix and body directly.
///
/// # Errors
///
/// - [`ProtocolError::FrameTruncated`] if `buf` holds less than one frame
/// - [`ProtocolError::FrameTooLarge`] if the prefix claims an oversized body
/// - [`ProtocolError::Decode`] if the body is malformed
pub fn decode_frame<T: DeserializeOwned>(buf: &[u8]) -> Result<(T, usize), ProtocolError> {
    if buf.len() < PREFIX_SIZE {
        return Err(ProtocolError::FrameTruncated { expected: PREFIX_SIZE, actual: buf.len() });
    }

    let mut prefix = [0u8; PREFIX_SIZE];
    prefix.copy_from_slice(&buf[..PREFIX_SIZE]);
    let body_len = u32::from_be_bytes(prefix) as usize;
    check_body_len(body_len)?;

    let total = PREFIX_SIZE + body_len;
    if buf.len() < total {
        return Err(ProtocolError::FrameTruncated {
            expected: body_len,
            actual: buf.len() - PREFIX_SIZE,
        });
    }

    let msg = decode_body(&buf[PREFIX_SIZE..total])?;
    Ok((msg, total))
}
