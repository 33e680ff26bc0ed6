//! Application message headers and the size arithmetic derived from them.
//!
//! A message is a fixed-size [`MessageHeader`] followed by a payload whose
//! length is fully determined by the header's [`PayloadShape`]. Both ends use
//! [`MessageHeader::message_size`] to size buffers: the sender before
//! chunking, the receiver after reassembly to validate what arrived.

pub mod error;
pub mod header;
pub mod shape;

pub use error::{MessageError, ShapeError};
pub use header::{MESSAGE_HEADER_LEN, MESSAGE_MAGIC, MessageHeader};
pub use shape::{ImageFormat, ImageShape, POINT_WIDTH, PayloadShape, PointCloudShape};
