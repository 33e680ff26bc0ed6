//! Metric helpers for `chunkwire`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. With the `metrics` feature
//! disabled the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::counter;

/// Name of the counter tracking packets moved by sessions.
pub const PACKETS_TOTAL: &str = "chunkwire_packets_total";
/// Name of the counter tracking messages reassembled and validated.
pub const MESSAGES_COMPLETED: &str = "chunkwire_messages_completed_total";
/// Name of the counter tracking send and receive failures.
pub const MESSAGES_FAILED: &str = "chunkwire_failures_total";
/// Name of the counter tracking reassembly registry overruns.
pub const REGISTRY_OVERRUNS: &str = "chunkwire_registry_overruns_total";

/// Direction of packet movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Packets received from a peer.
    Inbound,
    /// Packets sent to a peer.
    Outbound,
}

impl Direction {
    /// Label value used for the `direction` label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Record a packet moved in the given direction.
pub fn inc_packets(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(PACKETS_TOTAL, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record a message that reassembled and validated.
pub fn inc_completed() {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_COMPLETED).increment(1);
}

/// Record a session failure.
pub fn inc_failures() {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_FAILED).increment(1);
}

/// Record a registry overrun.
pub fn inc_overruns() {
    #[cfg(feature = "metrics")]
    counter!(REGISTRY_OVERRUNS).increment(1);
}
