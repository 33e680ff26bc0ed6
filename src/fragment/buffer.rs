//! Per-message reconstruction state.
//!
//! A [`ReassemblyBuffer`] owns the padded byte region of one message and a
//! received flag per chunk. Outbound messages are composed directly into one
//! (see [`ReassemblyBuffer::for_send`]); inbound ones are allocated from the
//! geometry carried by their first packet and filled chunk by chunk.

use std::num::NonZeroUsize;

use log::debug;

use super::{
    BufferError,
    ChunkError,
    ChunkIndex,
    ChunkPlan,
    ChunkStatus,
    IntegrityError,
    MessageId,
    PacketHeader,
};
use crate::message::{MESSAGE_HEADER_LEN, MessageError, MessageHeader};

/// Byte buffer and chunk bitmap for exactly one message.
///
/// Releasing the buffer is dropping it (or consuming it with
/// [`ReassemblyBuffer::into_data`]); there is no separate freed state.
#[derive(Debug)]
pub struct ReassemblyBuffer {
    message_id: MessageId,
    chunk_size_max: usize,
    received: Vec<bool>,
    received_count: usize,
    data: Vec<u8>,
}

impl ReassemblyBuffer {
    /// Allocate a buffer for sending the message described by `header` over
    /// packets of `mtu` bytes.
    ///
    /// The encoded header is written at the start of the buffer; the producer
    /// fills the payload through [`ReassemblyBuffer::payload_mut`].
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Message`] if the header cannot be sized,
    /// [`BufferError::Plan`] if the MTU is too small, and
    /// [`BufferError::AllocationFailed`] if memory is exhausted.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunkwire::{
    ///     fragment::{PACKET_HEADER_LEN, ReassemblyBuffer},
    ///     message::{MESSAGE_HEADER_LEN, MessageHeader, PayloadShape, PointCloudShape},
    /// };
    ///
    /// let header = MessageHeader::new(
    ///     7,
    ///     0,
    ///     PayloadShape::PointCloud(PointCloudShape {
    ///         point_count: 100,
    ///         ..PointCloudShape::default()
    ///     }),
    /// );
    /// let buffer = ReassemblyBuffer::for_send(&header, 1024).expect("buffer");
    /// let chunk = 1024 - PACKET_HEADER_LEN;
    /// assert_eq!(buffer.chunk_size_max(), chunk);
    /// assert_eq!(buffer.chunks_count(), (MESSAGE_HEADER_LEN + 1200).div_ceil(chunk));
    /// assert_eq!(buffer.message_id().get(), 7);
    /// ```
    pub fn for_send(header: &MessageHeader, mtu: usize) -> Result<Self, BufferError> {
        let message_size = header.message_size()?;
        let plan = ChunkPlan::new(message_size, mtu)?;
        let mut buffer = Self::allocate(
            MessageId::new(header.index()),
            plan.chunk_size().get(),
            plan.chunk_count(),
            plan.buffer_size(),
        )?;
        let encoded = header.to_bytes()?;
        if let Some(start) = buffer.data.get_mut(..MESSAGE_HEADER_LEN) {
            start.copy_from_slice(&encoded);
        }
        Ok(buffer)
    }

    /// Allocate a buffer for the message announced by `packet`.
    ///
    /// Any packet of the message will do: the message-level fields are the
    /// same in all of them.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::InconsistentGeometry`] when the announced size
    /// is not `chunks_count * chunk_size_max`, [`BufferError::MessageTooLarge`]
    /// when it exceeds `max_message_size`, and
    /// [`BufferError::AllocationFailed`] if memory is exhausted.
    pub fn for_receive(
        packet: &PacketHeader,
        max_message_size: NonZeroUsize,
    ) -> Result<Self, BufferError> {
        let message_id = packet.message_id();
        let geometry_error = BufferError::InconsistentGeometry {
            message_id,
            size: packet.message_size(),
            chunks_count: packet.chunks_count(),
            chunk_size_max: packet.chunk_size_max(),
        };
        let Some(chunk_size) = NonZeroUsize::new(packet.chunk_size_max()) else {
            return Err(geometry_error);
        };
        if packet.message_size() > max_message_size.get() {
            return Err(BufferError::MessageTooLarge {
                message_id,
                size: packet.message_size(),
                limit: max_message_size,
            });
        }
        let plan = ChunkPlan::with_chunk_size(packet.message_size(), chunk_size)?;
        if plan.chunk_count() != packet.chunks_count() || plan.buffer_size() != packet.message_size()
        {
            return Err(geometry_error);
        }
        Self::allocate(
            message_id,
            chunk_size.get(),
            plan.chunk_count(),
            plan.buffer_size(),
        )
    }

    fn allocate(
        message_id: MessageId,
        chunk_size_max: usize,
        chunks_count: usize,
        size: usize,
    ) -> Result<Self, BufferError> {
        Ok(Self {
            message_id,
            chunk_size_max,
            received: zeroed(chunks_count, false)?,
            received_count: 0,
            data: zeroed(size, 0_u8)?,
        })
    }

    /// Message this buffer reconstructs.
    #[must_use]
    pub const fn message_id(&self) -> MessageId { self.message_id }

    /// Physical buffer length, padded to a whole number of chunks.
    #[must_use]
    pub fn size(&self) -> usize { self.data.len() }

    /// Number of chunks making up the message.
    #[must_use]
    pub fn chunks_count(&self) -> usize { self.received.len() }

    /// Payload bytes in a full chunk.
    #[must_use]
    pub const fn chunk_size_max(&self) -> usize { self.chunk_size_max }

    /// Number of distinct chunks received so far.
    #[must_use]
    pub const fn received_count(&self) -> usize { self.received_count }

    /// Whether chunk `index` has been received.
    #[must_use]
    pub fn is_received(&self, index: ChunkIndex) -> bool {
        self.received.get(index.get()).copied().unwrap_or(false)
    }

    /// Whether every chunk has been received.
    #[must_use]
    pub fn is_complete(&self) -> bool { self.received_count == self.received.len() }

    /// The whole buffer: message header, payload and trailing padding.
    #[must_use]
    pub fn data(&self) -> &[u8] { &self.data }

    /// Everything after the message header, padding included.
    #[must_use]
    pub fn payload(&self) -> &[u8] { self.data.get(MESSAGE_HEADER_LEN..).unwrap_or_default() }

    /// Mutable view of everything after the message header.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        self.data
            .get_mut(MESSAGE_HEADER_LEN..)
            .unwrap_or_default()
    }

    /// Bytes of chunk `index`, as sent on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::ChunkIndexOutOfRange`] when `index` is not below
    /// the chunk count, and [`ChunkError::ChunkOffsetOutOfRange`] when the
    /// chunk's range runs past the end of the buffer.
    pub fn chunk(&self, index: ChunkIndex) -> Result<&[u8], ChunkError> {
        let chunks_count = self.received.len();
        if index.get() >= chunks_count {
            return Err(ChunkError::ChunkIndexOutOfRange {
                index,
                chunks_count,
            });
        }
        let size = self.data.len();
        let start = index.offset(self.chunk_size_max).unwrap_or(usize::MAX);
        let end = start.saturating_add(self.chunk_size_max);
        self.data
            .get(start..end)
            .ok_or(ChunkError::ChunkOffsetOutOfRange { start, end, size })
    }

    /// Copy `payload` into chunk `index` and mark it received.
    ///
    /// Delivering the same chunk twice overwrites the same range and is
    /// reported as [`ChunkStatus::Duplicate`]; it is never counted twice.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::ChunkIndexOutOfRange`] when `index` is not below
    /// the chunk count, and [`ChunkError::ChunkOffsetOutOfRange`] when the
    /// payload would run past the end of the buffer.
    pub fn put_chunk(&mut self, index: ChunkIndex, payload: &[u8]) -> Result<ChunkStatus, ChunkError> {
        let chunks_count = self.received.len();
        let Some(flag) = self.received.get_mut(index.get()) else {
            return Err(ChunkError::ChunkIndexOutOfRange {
                index,
                chunks_count,
            });
        };

        let size = self.data.len();
        let start = index.offset(self.chunk_size_max).unwrap_or(usize::MAX);
        let end = start.saturating_add(payload.len());
        let Some(target) = self.data.get_mut(start..end) else {
            return Err(ChunkError::ChunkOffsetOutOfRange { start, end, size });
        };
        target.copy_from_slice(payload);

        let status = if *flag {
            ChunkStatus::Duplicate
        } else {
            *flag = true;
            self.received_count += 1;
            ChunkStatus::Placed
        };
        debug!(
            "message {}: chunk {index} {status:?} ({}/{chunks_count})",
            self.message_id, self.received_count
        );
        Ok(status)
    }

    /// Place the payload of a validated packet.
    ///
    /// # Errors
    ///
    /// See [`ReassemblyBuffer::put_chunk`].
    pub fn put_packet(&mut self, header: &PacketHeader, payload: &[u8]) -> Result<ChunkStatus, ChunkError> {
        let body = payload.get(..header.chunk_size()).unwrap_or(payload);
        self.put_chunk(header.chunk_index(), body)
    }

    /// Decode the message header at the start of the buffer.
    ///
    /// # Errors
    ///
    /// Returns the decoder's [`MessageError`].
    pub fn message_header(&self) -> Result<MessageHeader, MessageError> {
        MessageHeader::decode(&self.data)
    }

    /// Check a complete buffer against the header it carries.
    ///
    /// The header must decode and name the message its packets carried, and
    /// the message size it declares must pad to exactly this buffer's size
    /// under its chunk geometry.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityError::Header`] for an undecodable header,
    /// [`IntegrityError::IndexMismatch`] when the header's index differs from
    /// the packets' message id and [`IntegrityError::SizeMismatch`] when the
    /// sizes disagree.
    pub fn validate(&self) -> Result<MessageHeader, IntegrityError> {
        let header = self.message_header()?;
        if header.index() != self.message_id.get() {
            return Err(IntegrityError::IndexMismatch {
                message_id: self.message_id,
                header_index: header.index(),
            });
        }
        let expected = header.message_size()?;
        let actual = self.data.len();
        let padded = NonZeroUsize::new(self.chunk_size_max)
            .and_then(|chunk| ChunkPlan::with_chunk_size(expected, chunk).ok())
            .map(|plan| plan.buffer_size());
        if padded != Some(actual) {
            return Err(IntegrityError::SizeMismatch { expected, actual });
        }
        Ok(header)
    }

    /// Consume the buffer, returning its bytes.
    #[must_use]
    pub fn into_data(self) -> Vec<u8> { self.data }
}

fn zeroed<T: Copy>(len: usize, value: T) -> Result<Vec<T>, BufferError> {
    let mut items = Vec::new();
    items
        .try_reserve_exact(len)
        .map_err(|_| BufferError::AllocationFailed {
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
        })?;
    items.resize(len, value);
    Ok(items)
}
