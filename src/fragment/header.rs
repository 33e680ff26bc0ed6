//! Packet framing: the header prefixed to every chunk on the wire.
//!
//! A packet is `[PacketHeader][chunk payload]`. The header repeats the
//! message-level geometry (`msg_size`, `msg_chunks_count`, `chunk_size_max`)
//! in every packet so any one of them is enough to allocate the receiving
//! buffer.

use bincode::{Decode, Encode, decode_from_slice, encode_into_slice, error::EncodeError};

use super::{ChunkError, ChunkIndex, MessageId, PacketError, ReassemblyBuffer};
use crate::byte_order::wire_config;

/// Magic number closing every valid packet header.
pub const PACKET_MAGIC: u32 = 0x55AA_AA55;

/// Encoded length of a [`PacketHeader`]: six `u64` fields and the `u32` magic.
pub const PACKET_HEADER_LEN: usize = 6 * 8 + 4;

/// On-wire field order, kept separate so only validated headers escape
/// [`PacketHeader::parse`].
#[derive(Clone, Copy, Debug, Encode, Decode)]
struct RawPacketHeader {
    msg_index: u64,
    msg_size: u64,
    msg_chunks_count: u64,
    chunk_index: u64,
    chunk_size: u64,
    chunk_size_max: u64,
    magic: u32,
}

/// Validated framing for one wire packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketHeader {
    message_id: MessageId,
    message_size: usize,
    chunks_count: usize,
    chunk_index: ChunkIndex,
    chunk_size: usize,
    chunk_size_max: usize,
}

impl PacketHeader {
    /// Build the header for chunk `index` of an outbound `buffer`.
    ///
    /// Every chunk, the last included, claims a full `chunk_size_max`
    /// payload; the buffer is padded to a chunk multiple so the bytes exist.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::ChunkIndexOutOfRange`] when `index` is not a
    /// chunk of `buffer`.
    pub fn for_chunk(buffer: &ReassemblyBuffer, index: ChunkIndex) -> Result<Self, ChunkError> {
        if index.get() >= buffer.chunks_count() {
            return Err(ChunkError::ChunkIndexOutOfRange {
                index,
                chunks_count: buffer.chunks_count(),
            });
        }
        Ok(Self {
            message_id: buffer.message_id(),
            message_size: buffer.size(),
            chunks_count: buffer.chunks_count(),
            chunk_index: index,
            chunk_size: buffer.chunk_size_max(),
            chunk_size_max: buffer.chunk_size_max(),
        })
    }

    /// Assemble a header from raw parts.
    ///
    /// No validation happens here; use [`PacketHeader::parse`] for bytes read
    /// from a peer.
    #[must_use]
    pub const fn from_parts(
        message_id: MessageId,
        message_size: usize,
        chunks_count: usize,
        chunk_index: ChunkIndex,
        chunk_size: usize,
        chunk_size_max: usize,
    ) -> Self {
        Self {
            message_id,
            message_size,
            chunks_count,
            chunk_index,
            chunk_size,
            chunk_size_max,
        }
    }

    /// Message the packet belongs to.
    #[must_use]
    pub const fn message_id(&self) -> MessageId { self.message_id }

    /// Padded length of the whole message buffer.
    #[must_use]
    pub const fn message_size(&self) -> usize { self.message_size }

    /// Number of chunks in the message.
    #[must_use]
    pub const fn chunks_count(&self) -> usize { self.chunks_count }

    /// Position of this packet's chunk.
    #[must_use]
    pub const fn chunk_index(&self) -> ChunkIndex { self.chunk_index }

    /// Payload bytes in this packet.
    #[must_use]
    pub const fn chunk_size(&self) -> usize { self.chunk_size }

    /// Payload bytes in a full-size packet.
    #[must_use]
    pub const fn chunk_size_max(&self) -> usize { self.chunk_size_max }

    /// Total packet length: header plus chunk payload.
    #[must_use]
    pub const fn packet_len(&self) -> usize { PACKET_HEADER_LEN + self.chunk_size }

    /// Encode the header into its fixed wire layout.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if bincode rejects the header.
    pub fn encode(&self) -> Result<[u8; PACKET_HEADER_LEN], EncodeError> {
        let raw = RawPacketHeader {
            msg_index: self.message_id.get(),
            msg_size: self.message_size as u64,
            msg_chunks_count: self.chunks_count as u64,
            chunk_index: self.chunk_index.get() as u64,
            chunk_size: self.chunk_size as u64,
            chunk_size_max: self.chunk_size_max as u64,
            magic: PACKET_MAGIC,
        };
        let mut bytes = [0_u8; PACKET_HEADER_LEN];
        encode_into_slice(raw, &mut bytes, wire_config())?;
        Ok(bytes)
    }

    /// Validate a received packet and return its header.
    ///
    /// `packet` is everything read for one packet: header and payload.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::TruncatedPacket`] when `packet` is shorter than
    /// [`PACKET_HEADER_LEN`], [`PacketError::BadMagic`] on a framing tag
    /// mismatch, [`PacketError::SizeMismatch`] when the length disagrees with
    /// the declared chunk size, [`PacketError::ChunkIndexOutOfRange`] when
    /// the chunk index is not below the chunk count, and
    /// [`PacketError::ChunkSizeInvalid`] when a chunk exceeds
    /// `chunk_size_max` or is short without being the last.
    pub fn parse(packet: &[u8]) -> Result<Self, PacketError> {
        let Some(header_bytes) = packet.get(..PACKET_HEADER_LEN) else {
            return Err(PacketError::TruncatedPacket {
                received: packet.len(),
            });
        };
        let (raw, _) = decode_from_slice::<RawPacketHeader, _>(header_bytes, wire_config())
            .map_err(|err| PacketError::Decode(err.to_string()))?;

        if raw.magic != PACKET_MAGIC {
            return Err(PacketError::BadMagic { found: raw.magic });
        }

        let header = Self {
            message_id: MessageId::new(raw.msg_index),
            message_size: to_usize(raw.msg_size, "msg_size")?,
            chunks_count: to_usize(raw.msg_chunks_count, "msg_chunks_count")?,
            chunk_index: ChunkIndex::new(to_usize(raw.chunk_index, "chunk_index")?),
            chunk_size: to_usize(raw.chunk_size, "chunk_size")?,
            chunk_size_max: to_usize(raw.chunk_size_max, "chunk_size_max")?,
        };

        let expected = header.chunk_size.checked_add(PACKET_HEADER_LEN);
        if expected != Some(packet.len()) {
            return Err(PacketError::SizeMismatch {
                chunk_size: header.chunk_size,
                received: packet.len(),
            });
        }

        if header.chunk_index.get() >= header.chunks_count {
            return Err(PacketError::ChunkIndexOutOfRange {
                index: header.chunk_index,
                chunks_count: header.chunks_count,
            });
        }

        let is_last = header.chunk_index.get().checked_add(1) == Some(header.chunks_count);
        let oversized = header.chunk_size > header.chunk_size_max;
        let short_inner = header.chunk_size < header.chunk_size_max && !is_last;
        if oversized || short_inner {
            return Err(PacketError::ChunkSizeInvalid {
                index: header.chunk_index,
                chunk_size: header.chunk_size,
                chunk_size_max: header.chunk_size_max,
            });
        }

        Ok(header)
    }
}

fn to_usize(value: u64, field: &'static str) -> Result<usize, PacketError> {
    usize::try_from(value).map_err(|_| PacketError::FieldOverflow { field })
}
