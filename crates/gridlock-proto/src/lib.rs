//! Wire protocol for the Gridlock match server.
//!
//! Messages travel as length-prefixed CBOR: a 4-byte big-endian body length
//! followed by the CBOR-encoded message. CBOR was chosen because it is
//! self-describing (field names embedded), compact, and needs no code
//! generation; adding a message variant stays backward compatible for readers
//! that match exhaustively.
//!
//! The crate is sans-IO: [`framing`] encodes into caller-provided buffers and
//! decodes from byte slices. The server owns the async reads and writes.

pub mod framing;
pub mod message;
pub mod types;

pub use framing::{MAX_FRAME_SIZE, decode_body, encode_frame};
pub use message::{ClientMessage, PlayerInfo, ServerMessage};
pub use types::Mark;

/// Errors from encoding or decoding protocol frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Frame body exceeds [`MAX_FRAME_SIZE`].
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Claimed or actual body size.
        size: usize,
        /// Maximum permitted body size.
        max: usize,
    },

    /// Frame body is shorter than the length prefix claims.
    #[error("frame truncated: expected {expected} bytes, got {actual}")]
    FrameTruncated {
        /// Bytes the length prefix claims.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// CBOR encoding failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// CBOR decoding failed.
    #[error("decode error: {0}")]
    Decode(String),
}
