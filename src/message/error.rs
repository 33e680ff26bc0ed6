//! Errors raised while sizing or decoding message headers.

use thiserror::Error;

use super::MESSAGE_HEADER_LEN;

/// Payload shape tags outside the closed set understood by this crate.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    /// The header's kind tag names no known payload shape.
    #[error("unknown payload kind {0}")]
    UnknownKind(u32),
    /// The image header names no known pixel format.
    #[error("unknown image pixel format {0}")]
    UnknownImageFormat(u32),
}

/// Errors produced by [`MessageHeader`](super::MessageHeader) operations.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    /// The header describes a payload shape this protocol version does not know.
    #[error("invalid payload shape: {0}")]
    InvalidPayloadShape(#[from] ShapeError),
    /// The header does not carry the message magic number.
    #[error("message header magic mismatch: found {found:#010x}")]
    BadMagic {
        /// Magic value found in the header.
        found: u32,
    },
    /// Fewer bytes than a full header were supplied.
    #[error("message header truncated: {available} of {MESSAGE_HEADER_LEN} bytes")]
    Truncated {
        /// Number of bytes available to the decoder.
        available: usize,
    },
    /// The fixed layout could not be encoded or decoded.
    #[error("message header {operation} failed")]
    Codec {
        /// Either `"encoding"` or `"decoding"`.
        operation: &'static str,
    },
    /// The element count or byte length does not fit in `usize`.
    #[error("message size overflows the address space")]
    SizeOverflow,
}
