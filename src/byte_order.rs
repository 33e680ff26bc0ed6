//! Helpers for explicit network byte-order conversions.
//!
//! These helpers keep Clippy expectations scoped to the conversion points so
//! header codecs can remain explicit about wire endianness without repeating
//! lint annotations.

use bincode::config::{self, Config};

/// Bincode configuration shared by the fixed-layout wire headers: big-endian
/// with fixed-width integers.
pub(crate) fn wire_config() -> impl Config {
    config::standard()
        .with_big_endian()
        .with_fixed_int_encoding()
}

/// Serialise a `u32` in network byte order (big-endian).
///
/// # Examples
///
/// ```
/// use chunkwire::byte_order::write_network_u32;
///
/// assert_eq!(write_network_u32(0x55AA_55AA), [0x55, 0xAA, 0x55, 0xAA]);
/// ```
#[must_use]
pub fn write_network_u32(value: u32) -> [u8; 4] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    value.to_be_bytes()
}

/// Parse a network-order `u32` from its on-wire representation.
///
/// # Examples
///
/// ```
/// use chunkwire::byte_order::read_network_u32;
///
/// assert_eq!(read_network_u32([0x12, 0x34, 0x56, 0x78]), 0x1234_5678);
/// ```
#[must_use]
pub fn read_network_u32(bytes: [u8; 4]) -> u32 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    u32::from_be_bytes(bytes)
}

/// Serialise a `u64` in network byte order (big-endian).
#[must_use]
pub fn write_network_u64(value: u64) -> [u8; 8] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    value.to_be_bytes()
}

/// Parse a network-order `u64` from its on-wire representation.
#[must_use]
pub fn read_network_u64(bytes: [u8; 8]) -> u64 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    u64::from_be_bytes(bytes)
}

/// Serialise an `f32` as its IEEE-754 bit pattern in network byte order.
#[must_use]
pub fn write_network_f32(value: f32) -> [u8; 4] { write_network_u32(value.to_bits()) }

/// Parse an `f32` from its network-order IEEE-754 bit pattern.
#[must_use]
pub fn read_network_f32(bytes: [u8; 4]) -> f32 { f32::from_bits(read_network_u32(bytes)) }

/// Serialise an `f64` as its IEEE-754 bit pattern in network byte order.
#[must_use]
pub fn write_network_f64(value: f64) -> [u8; 8] { write_network_u64(value.to_bits()) }

/// Parse an `f64` from its network-order IEEE-754 bit pattern.
#[must_use]
pub fn read_network_f64(bytes: [u8; 8]) -> f64 { f64::from_bits(read_network_u64(bytes)) }
