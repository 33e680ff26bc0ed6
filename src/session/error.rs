//! Errors surfaced by sessions.

use std::io;

use thiserror::Error;

use super::{ConfigError, Role};
use crate::fragment::{
    BufferError,
    ChunkError,
    ChunkIndex,
    IntegrityError,
    MessageId,
    PacketError,
    RegistryError,
};

/// Why an inbound packet was discarded.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PacketFault {
    /// Framing validation failed.
    #[error(transparent)]
    Framing(#[from] PacketError),
    /// The chunk does not fit the buffer it addresses.
    #[error(transparent)]
    Bounds(#[from] ChunkError),
    /// The message-level fields cannot describe a buffer.
    #[error(transparent)]
    Geometry(BufferError),
}

/// Errors produced by [`ConnectionSession`](super::ConnectionSession) and
/// the sender and receiver it drives.
///
/// Only [`SessionError::Config`] and [`SessionError::Transport`] raised by
/// `open` end a session. The others describe a single packet or message and
/// are counted by the session before being reported.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The configuration was rejected before opening.
    #[error("invalid session configuration: {0}")]
    Config(#[from] ConfigError),
    /// The transport failed outside of a message.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
    /// The operation is not available for this role.
    #[error("{operation} is not supported by a {role}")]
    WrongRole {
        /// Role of the session.
        role: Role,
        /// Attempted operation.
        operation: &'static str,
    },
    /// A packet header could not be encoded.
    #[error("failed to encode packet header: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    /// The buffer was planned for a different packet size.
    #[error("message {message_id} uses {packet_len}-byte packets but the session mtu is {mtu}")]
    MtuMismatch {
        /// Message being sent.
        message_id: MessageId,
        /// Packet length implied by the buffer.
        packet_len: usize,
        /// Session MTU.
        mtu: usize,
    },
    /// Transmission stopped part way through a message.
    #[error("sending message {message_id} aborted at chunk {chunk_index}: {source}")]
    SendAborted {
        /// Message being sent.
        message_id: MessageId,
        /// First chunk that was not delivered.
        chunk_index: ChunkIndex,
        /// Transport error that stopped the send.
        #[source]
        source: io::Error,
    },
    /// A received packet was malformed and has been dropped.
    #[error("corrupted packet: {0}")]
    CorruptedPacket(#[from] PacketFault),
    /// A buffer for a new inbound message could not be allocated.
    #[error("no memory for message {message_id}: {source}")]
    AllocationFailed {
        /// Message that was dropped.
        message_id: MessageId,
        /// Underlying buffer error.
        #[source]
        source: BufferError,
    },
    /// A complete message failed validation and has been dropped.
    #[error("corrupted message {message_id}: {source}")]
    CorruptedMessage {
        /// Message that was dropped.
        message_id: MessageId,
        /// Validation failure.
        #[source]
        source: IntegrityError,
    },
    /// A buffer was registered twice for the same message.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl SessionError {
    /// Classify a buffer creation failure for an inbound message.
    pub(crate) fn from_buffer(message_id: MessageId, error: BufferError) -> Self {
        match error {
            BufferError::AllocationFailed { .. } => Self::AllocationFailed {
                message_id,
                source: error,
            },
            other => Self::CorruptedPacket(PacketFault::Geometry(other)),
        }
    }
}
