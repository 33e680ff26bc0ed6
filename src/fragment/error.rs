//! Error and status types emitted by the chunking and reassembly layer.
//!
//! Each stage owns a small enum so the session can tell configuration
//! mistakes apart from corrupt peers while tests match on precise variants.

use std::num::NonZeroUsize;

use thiserror::Error;

use super::{ChunkIndex, MessageId};
use crate::message::MessageError;

/// Result of placing a chunk into a [`ReassemblyBuffer`](super::ReassemblyBuffer).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkStatus {
    /// The chunk had not been seen before.
    Placed,
    /// The chunk was already received; its bytes were overwritten in place.
    Duplicate,
}

/// Errors produced while deriving a [`ChunkPlan`](super::ChunkPlan).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    /// The MTU leaves no room for payload after the packet header.
    #[error("mtu {mtu} is too small: packets need more than {header_len} bytes")]
    MtuTooSmall {
        /// Configured transport MTU.
        mtu: usize,
        /// Encoded packet header length.
        header_len: usize,
    },
    /// The padded buffer length does not fit in `usize`.
    #[error("chunk plan for {message_size} bytes overflows the address space")]
    SizeOverflow {
        /// Message length that was being planned.
        message_size: usize,
    },
}

/// Errors produced when placing a chunk.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    /// The chunk index lies beyond the message's chunk count.
    #[error("chunk {index} out of range for message with {chunks_count} chunks")]
    ChunkIndexOutOfRange {
        /// Offending chunk index.
        index: ChunkIndex,
        /// Number of chunks in the message.
        chunks_count: usize,
    },
    /// The chunk's byte range does not fit inside the buffer.
    #[error("chunk bytes {start}..{end} exceed buffer of {size} bytes")]
    ChunkOffsetOutOfRange {
        /// First byte the chunk would write.
        start: usize,
        /// One past the last byte the chunk would write.
        end: usize,
        /// Physical buffer length.
        size: usize,
    },
}

/// Errors produced while creating a [`ReassemblyBuffer`](super::ReassemblyBuffer).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    /// The message header could not be sized.
    #[error(transparent)]
    Message(#[from] MessageError),
    /// The chunk plan could not be derived.
    #[error(transparent)]
    Plan(#[from] PlanError),
    /// The allocator refused the buffer or status bitmap.
    #[error("failed to allocate {bytes} bytes for message buffer")]
    AllocationFailed {
        /// Requested allocation size.
        bytes: usize,
    },
    /// Message-level packet fields disagree with the padded-buffer model.
    #[error(
        "inconsistent geometry for message {message_id}: {size} bytes in {chunks_count} chunks \
         of {chunk_size_max}"
    )]
    InconsistentGeometry {
        /// Message the packet belongs to.
        message_id: MessageId,
        /// Declared buffer size.
        size: usize,
        /// Declared chunk count.
        chunks_count: usize,
        /// Declared full chunk size.
        chunk_size_max: usize,
    },
    /// The declared message exceeds the configured reassembly cap.
    #[error("message {message_id} of {size} bytes exceeds limit of {limit} bytes")]
    MessageTooLarge {
        /// Message the packet belongs to.
        message_id: MessageId,
        /// Declared buffer size.
        size: usize,
        /// Configured cap.
        limit: NonZeroUsize,
    },
}

/// Errors produced when a received packet fails framing validation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// Fewer bytes than a packet header arrived.
    #[error("truncated packet: {received} bytes is shorter than the packet header")]
    TruncatedPacket {
        /// Number of bytes received.
        received: usize,
    },
    /// The header does not carry the packet magic number.
    #[error("packet header magic mismatch: found {found:#010x}")]
    BadMagic {
        /// Magic value found in the header.
        found: u32,
    },
    /// The packet length disagrees with the header's chunk size.
    #[error("packet length {received} does not match declared chunk of {chunk_size} bytes")]
    SizeMismatch {
        /// Chunk size declared by the header.
        chunk_size: usize,
        /// Number of bytes received.
        received: usize,
    },
    /// The chunk index is not below the message's chunk count.
    #[error("chunk index {index} out of range for {chunks_count} chunks")]
    ChunkIndexOutOfRange {
        /// Chunk index declared by the header.
        index: ChunkIndex,
        /// Chunk count declared by the header.
        chunks_count: usize,
    },
    /// A chunk is larger than the full chunk size, or short without being last.
    #[error("chunk {index} carries {chunk_size} bytes but full chunks are {chunk_size_max} bytes")]
    ChunkSizeInvalid {
        /// Chunk index declared by the header.
        index: ChunkIndex,
        /// Chunk size declared by the header.
        chunk_size: usize,
        /// Full chunk size declared by the header.
        chunk_size_max: usize,
    },
    /// A header field does not fit in `usize` on this platform.
    #[error("packet header field {field} does not fit in usize")]
    FieldOverflow {
        /// Name of the offending field.
        field: &'static str,
    },
    /// The header bytes could not be decoded.
    #[error("failed to decode packet header: {0}")]
    Decode(String),
}

/// Errors produced by [`ReassemblyRegistry`](super::ReassemblyRegistry).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A buffer for this message is already registered.
    #[error("reassembly buffer for message {message_id} already registered")]
    DuplicateEntry {
        /// Message that already has a buffer.
        message_id: MessageId,
    },
}

/// Reasons a fully received message fails validation.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum IntegrityError {
    /// The assembled message header is invalid.
    #[error("assembled message header is invalid: {0}")]
    Header(#[from] MessageError),
    /// The assembled header names a different message than its packets.
    #[error("message {message_id} carries a header for message {header_index}")]
    IndexMismatch {
        /// Identifier carried by every packet of the message.
        message_id: MessageId,
        /// Index found in the assembled header.
        header_index: u64,
    },
    /// The header's declared size disagrees with the buffer's physical size.
    #[error("message header declares {expected} bytes but buffer holds {actual}")]
    SizeMismatch {
        /// Size computed from the assembled header.
        expected: usize,
        /// Physical (padded) buffer size.
        actual: usize,
    },
}
