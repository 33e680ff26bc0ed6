//! Chunk geometry derived from a message size and a transport MTU.

use std::num::NonZeroUsize;

use super::{PACKET_HEADER_LEN, PlanError};

/// How a message of a given size is cut into MTU-sized packets.
///
/// The buffer is always padded up to a whole number of chunks, so
/// `buffer_size >= message_size` and bytes past the message inside the last
/// chunk are transmitted as padding.
///
/// # Examples
///
/// ```
/// use chunkwire::fragment::{ChunkPlan, PACKET_HEADER_LEN};
///
/// let plan = ChunkPlan::new(1_000, PACKET_HEADER_LEN + 300).expect("mtu fits header");
/// assert_eq!(plan.chunk_size().get(), 300);
/// assert_eq!(plan.chunk_count(), 4);
/// assert_eq!(plan.buffer_size(), 1_200);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkPlan {
    chunk_size: NonZeroUsize,
    chunk_count: usize,
    buffer_size: usize,
}

impl ChunkPlan {
    /// Plan `message_size` bytes over a transport carrying `mtu`-byte packets.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::MtuTooSmall`] when `mtu <= PACKET_HEADER_LEN`, or
    /// [`PlanError::SizeOverflow`] when the padded size does not fit in
    /// `usize`.
    pub fn new(message_size: usize, mtu: usize) -> Result<Self, PlanError> {
        Self::with_chunk_size(message_size, chunk_size_for_mtu(mtu)?)
    }

    /// Plan `message_size` bytes using an explicit full chunk size.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::SizeOverflow`] when the padded size does not fit
    /// in `usize`.
    pub fn with_chunk_size(message_size: usize, chunk_size: NonZeroUsize) -> Result<Self, PlanError> {
        let chunk_count = message_size.div_ceil(chunk_size.get());
        let buffer_size = chunk_count
            .checked_mul(chunk_size.get())
            .ok_or(PlanError::SizeOverflow { message_size })?;
        Ok(Self {
            chunk_size,
            chunk_count,
            buffer_size,
        })
    }

    /// Payload bytes carried by a full chunk.
    #[must_use]
    pub const fn chunk_size(&self) -> NonZeroUsize { self.chunk_size }

    /// Number of packets the message needs.
    #[must_use]
    pub const fn chunk_count(&self) -> usize { self.chunk_count }

    /// Padded buffer length, a whole multiple of the chunk size.
    #[must_use]
    pub const fn buffer_size(&self) -> usize { self.buffer_size }
}

/// Payload bytes available in one packet of `mtu` bytes.
///
/// # Errors
///
/// Returns [`PlanError::MtuTooSmall`] when the header alone fills the MTU.
pub fn chunk_size_for_mtu(mtu: usize) -> Result<NonZeroUsize, PlanError> {
    mtu.checked_sub(PACKET_HEADER_LEN)
        .and_then(NonZeroUsize::new)
        .ok_or(PlanError::MtuTooSmall {
            mtu,
            header_len: PACKET_HEADER_LEN,
        })
}
