//! Builders for composed messages and the packets a sender would emit.

use chunkwire::{
    fragment::{ChunkIndex, PacketHeader, ReassemblyBuffer},
    message::{MessageHeader, PayloadShape, PointCloudShape},
};

/// Compose a point-cloud message whose payload bytes follow a fixed
/// pattern, so reassembled copies can be compared byte for byte.
///
/// # Panics
///
/// Panics if the buffer cannot be allocated for `mtu`.
#[must_use]
pub fn filled_point_cloud(index: u64, point_count: u64, mtu: usize) -> ReassemblyBuffer {
    let header = MessageHeader::new(
        index,
        index * 1_000,
        PayloadShape::PointCloud(PointCloudShape {
            tracker_state: 1,
            point_count,
            ..PointCloudShape::default()
        }),
    );
    let mut buffer = ReassemblyBuffer::for_send(&header, mtu).expect("compose test message");
    for (offset, byte) in buffer.payload_mut().iter_mut().enumerate() {
        *byte = u8::try_from(offset % 251).expect("below 251");
    }
    buffer
}

/// Encode every chunk of `buffer` as a wire packet, in index order.
///
/// # Panics
///
/// Panics if a header cannot be encoded.
#[must_use]
pub fn packets_of(buffer: &ReassemblyBuffer) -> Vec<Vec<u8>> {
    (0..buffer.chunks_count())
        .map(ChunkIndex::new)
        .map(|index| {
            let header = PacketHeader::for_chunk(buffer, index).expect("chunk in range");
            let mut packet = header.encode().expect("encode header").to_vec();
            packet.extend_from_slice(buffer.chunk(index).expect("chunk bytes"));
            packet
        })
        .collect()
}
