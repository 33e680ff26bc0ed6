//! Message chunking and reassembly.
//!
//! This module holds the engine that cuts a message buffer into MTU-sized
//! packets and stitches packets back into buffers on the receiving side.
//! Each sub-module covers one concept: chunk geometry, packet framing, the
//! per-message buffer and the registry of in-flight buffers.

pub mod buffer;
pub mod error;
pub mod header;
pub mod ids;
pub mod plan;
pub mod registry;

pub use buffer::ReassemblyBuffer;
pub use error::{
    BufferError,
    ChunkError,
    ChunkStatus,
    IntegrityError,
    PacketError,
    PlanError,
    RegistryError,
};
pub use header::{PACKET_HEADER_LEN, PACKET_MAGIC, PacketHeader};
pub use ids::{ChunkIndex, MessageId};
pub use plan::{ChunkPlan, chunk_size_for_mtu};
pub use registry::ReassemblyRegistry;
