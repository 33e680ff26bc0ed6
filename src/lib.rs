#![doc(html_root_url = "https://docs.rs/chunkwire/latest")]
//! Public API for the `chunkwire` library.
//!
//! `chunkwire` moves large messages (point clouds and camera frames) over
//! transports that carry bounded packets. A sender composes a message into a
//! padded buffer and cuts it into MTU-sized chunks, each framed by a fixed
//! packet header. A receiver validates every packet, places its chunk into a
//! per-message reassembly buffer and reports the message once all chunks
//! have arrived and the assembled header checks out.
//!
//! - [`message`] encodes and sizes message headers.
//! - [`fragment`] plans chunks, frames packets and reassembles buffers.
//! - [`transport`] abstracts TCP, local datagram and in-process links.
//! - [`session`] drives the send path and the receive state machine.

pub mod byte_order;
pub mod fragment;
pub mod grid;
pub mod message;
pub mod metrics;
pub mod session;
pub mod transport;

pub use fragment::{
    ChunkIndex,
    ChunkPlan,
    MessageId,
    PACKET_HEADER_LEN,
    PacketHeader,
    ReassemblyBuffer,
    ReassemblyRegistry,
};
pub use message::{MESSAGE_HEADER_LEN, MessageHeader, PayloadShape};
pub use metrics::{
    Direction,
    MESSAGES_COMPLETED,
    MESSAGES_FAILED,
    PACKETS_TOTAL,
    REGISTRY_OVERRUNS,
};
pub use session::{ConnectionSession, Received, Role, SessionConfig, SessionError};
