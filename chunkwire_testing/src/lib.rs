//! Test utilities for `chunkwire`.
//!
//! Provides a serialised log capture fixture, builders for composed
//! messages and their wire packets, and a metrics snapshot reader.
//!
//! ```rust
//! use chunkwire_testing::{filled_point_cloud, packets_of};
//!
//! let buffer = filled_point_cloud(7, 100, 1024);
//! let packets = packets_of(&buffer);
//! assert_eq!(packets.len(), buffer.chunks_count());
//! assert!(packets.iter().all(|packet| packet.len() == 1024));
//! ```

pub mod logging;
pub mod metrics;
pub mod packets;

pub use logging::{LoggerHandle, logger};
pub use metrics::counter_value;
pub use packets::{filled_point_cloud, packets_of};
