//! Identifiers used to address messages and the chunks within them.

use derive_more::{Display, From, Into};

/// Sequence number of a logical message, shared by all of its packets.
///
/// # Examples
///
/// ```
/// use chunkwire::fragment::MessageId;
/// let id = MessageId::new(42);
/// assert_eq!(id.get(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0}")]
pub struct MessageId(u64);

impl MessageId {
    /// Wrap a raw message index.
    #[must_use]
    pub const fn new(value: u64) -> Self { Self(value) }

    /// Return the raw message index.
    #[must_use]
    pub const fn get(self) -> u64 { self.0 }
}

/// Zero-based position of a chunk within its message.
///
/// Chunk `i` always covers the byte range starting at `i * chunk_size_max`
/// of the message buffer, so the index alone locates the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
#[display("{_0}")]
pub struct ChunkIndex(usize);

impl ChunkIndex {
    /// Wrap a raw chunk position.
    #[must_use]
    pub const fn new(value: usize) -> Self { Self(value) }

    /// The first chunk of every message.
    #[must_use]
    pub const fn zero() -> Self { Self(0) }

    /// Return the raw chunk position.
    #[must_use]
    pub const fn get(self) -> usize { self.0 }

    /// Byte offset of this chunk inside a buffer cut into `chunk_size_max`
    /// pieces, or `None` if it overflows.
    #[must_use]
    pub const fn offset(self, chunk_size_max: usize) -> Option<usize> {
        self.0.checked_mul(chunk_size_max)
    }
}

impl TryFrom<u64> for ChunkIndex {
    type Error = std::num::TryFromIntError;

    fn try_from(value: u64) -> Result<Self, Self::Error> { usize::try_from(value).map(Self) }
}
