//! Tests for per-message buffers: geometry, chunk placement and validation.

use std::num::NonZeroUsize;

use proptest::prelude::*;
use rstest::rstest;

use crate::{
    fragment::{
        BufferError,
        ChunkError,
        ChunkIndex,
        ChunkStatus,
        IntegrityError,
        MessageId,
        PACKET_HEADER_LEN,
        PacketHeader,
        ReassemblyBuffer,
    },
    message::{
        ImageFormat,
        ImageShape,
        MESSAGE_HEADER_LEN,
        MessageError,
        MessageHeader,
        PayloadShape,
        PointCloudShape,
    },
};

const LIMIT: NonZeroUsize = NonZeroUsize::new(1 << 24).expect("non-zero");

fn cloud_header(index: u64, point_count: u64) -> MessageHeader {
    MessageHeader::new(
        index,
        0,
        PayloadShape::PointCloud(PointCloudShape {
            point_count,
            ..PointCloudShape::default()
        }),
    )
}

fn filled_send_buffer(index: u64, point_count: u64, mtu: usize) -> ReassemblyBuffer {
    let mut buffer =
        ReassemblyBuffer::for_send(&cloud_header(index, point_count), mtu).expect("send buffer");
    for (offset, byte) in buffer.payload_mut().iter_mut().enumerate() {
        *byte = (offset % 251) as u8;
    }
    buffer
}

fn receive_buffer_for(source: &ReassemblyBuffer) -> ReassemblyBuffer {
    let first = PacketHeader::for_chunk(source, ChunkIndex::zero()).expect("chunk 0 exists");
    ReassemblyBuffer::for_receive(&first, LIMIT).expect("receive buffer")
}

#[test]
fn send_buffer_carries_encoded_header_and_padding() {
    let header = cloud_header(7, 100);
    let buffer = ReassemblyBuffer::for_send(&header, 1024).expect("send buffer");
    let chunk = 1024 - PACKET_HEADER_LEN;

    assert_eq!(buffer.message_id(), MessageId::new(7));
    assert_eq!(buffer.chunk_size_max(), chunk);
    assert_eq!(
        buffer.chunks_count(),
        (MESSAGE_HEADER_LEN + 1200).div_ceil(chunk)
    );
    assert_eq!(buffer.size(), buffer.chunks_count() * chunk);
    assert_eq!(buffer.size() % buffer.chunk_size_max(), 0);
    assert_eq!(buffer.received_count(), 0);
    assert_eq!(buffer.message_header(), Ok(header));
}

#[test]
fn send_buffer_rejects_small_mtu() {
    let err = ReassemblyBuffer::for_send(&cloud_header(1, 10), PACKET_HEADER_LEN)
        .expect_err("mtu without payload room must fail");
    assert!(matches!(err, BufferError::Plan(_)));
}

#[rstest]
#[case::single_chunk(1, 1_000)]
#[case::several_chunks(500, 256)]
#[case::tiny_chunks(40, PACKET_HEADER_LEN + 1)]
fn put_chunk_one_past_end_is_out_of_range(#[case] points: u64, #[case] mtu: usize) {
    let mut buffer = ReassemblyBuffer::for_send(&cloud_header(3, points), mtu).expect("buffer");
    let past_end = ChunkIndex::new(buffer.chunks_count());
    let chunk = vec![0_u8; buffer.chunk_size_max()];

    assert_eq!(
        buffer.put_chunk(past_end, &chunk),
        Err(ChunkError::ChunkIndexOutOfRange {
            index: past_end,
            chunks_count: buffer.chunks_count(),
        })
    );
    assert_eq!(buffer.received_count(), 0);
}

#[test]
fn put_chunk_rejects_payload_running_past_buffer() {
    let mut buffer = ReassemblyBuffer::for_send(&cloud_header(3, 50), 256).expect("buffer");
    let last = ChunkIndex::new(buffer.chunks_count() - 1);
    let oversized = vec![1_u8; buffer.chunk_size_max() + 1];

    let err = buffer
        .put_chunk(last, &oversized)
        .expect_err("write past the end must fail");
    assert!(matches!(err, ChunkError::ChunkOffsetOutOfRange { .. }));
    assert!(!buffer.is_received(last));
}

#[test]
fn chunk_past_the_end_is_an_error() {
    let buffer = filled_send_buffer(4, 100, 256);
    let past_end = ChunkIndex::new(buffer.chunks_count());
    assert_eq!(
        buffer.chunk(past_end),
        Err(ChunkError::ChunkIndexOutOfRange {
            index: past_end,
            chunks_count: buffer.chunks_count(),
        })
    );
}

#[test]
fn duplicate_chunk_does_not_double_count() {
    let source = filled_send_buffer(9, 200, 512);
    let mut target = receive_buffer_for(&source);
    let chunk = source.chunk(ChunkIndex::zero()).expect("chunk 0");

    assert_eq!(
        target.put_chunk(ChunkIndex::zero(), chunk),
        Ok(ChunkStatus::Placed)
    );
    let snapshot = target.data().to_vec();
    let complete_before = target.is_complete();

    assert_eq!(
        target.put_chunk(ChunkIndex::zero(), chunk),
        Ok(ChunkStatus::Duplicate)
    );
    assert_eq!(target.received_count(), 1);
    assert_eq!(target.is_complete(), complete_before);
    assert_eq!(target.data(), snapshot.as_slice());
}

#[test]
fn receive_buffer_rejects_inconsistent_geometry() {
    let header = PacketHeader::from_parts(MessageId::new(4), 1_000, 3, ChunkIndex::zero(), 300, 300);
    let err = ReassemblyBuffer::for_receive(&header, LIMIT).expect_err("geometry must be checked");
    assert!(matches!(err, BufferError::InconsistentGeometry { .. }));
}

#[test]
fn receive_buffer_rejects_zero_chunk_size() {
    let header = PacketHeader::from_parts(MessageId::new(4), 0, 0, ChunkIndex::zero(), 0, 0);
    let err = ReassemblyBuffer::for_receive(&header, LIMIT).expect_err("zero chunks are invalid");
    assert!(matches!(err, BufferError::InconsistentGeometry { .. }));
}

#[test]
fn receive_buffer_enforces_size_cap() {
    let limit = NonZeroUsize::new(1_024).expect("non-zero");
    let header = PacketHeader::from_parts(MessageId::new(5), 2_048, 2, ChunkIndex::zero(), 1_024, 1_024);
    assert_eq!(
        ReassemblyBuffer::for_receive(&header, limit).expect_err("too large"),
        BufferError::MessageTooLarge {
            message_id: MessageId::new(5),
            size: 2_048,
            limit,
        }
    );
}

#[test]
fn completed_copy_validates_against_its_header() {
    let source = filled_send_buffer(11, 333, 700);
    let mut target = receive_buffer_for(&source);
    for index in (0..source.chunks_count()).map(ChunkIndex::new) {
        let chunk = source.chunk(index).expect("chunk in range");
        target.put_chunk(index, chunk).expect("chunk placed");
    }

    assert!(target.is_complete());
    assert_eq!(target.validate(), Ok(cloud_header(11, 333)));
}

#[test]
fn validation_rejects_header_with_wrong_size() {
    let source = filled_send_buffer(12, 10, 400);
    let mut target = receive_buffer_for(&source);
    let mut first = source.chunk(ChunkIndex::zero()).expect("chunk 0").to_vec();
    // Claim an image far larger than the buffer in the assembled header.
    let lying = MessageHeader::new(
        12,
        0,
        PayloadShape::Image(ImageShape {
            format: ImageFormat::Rgba,
            width: 1_000,
            height: 1_000,
        }),
    );
    first[..MESSAGE_HEADER_LEN].copy_from_slice(&lying.to_bytes().expect("encode"));
    target.put_chunk(ChunkIndex::zero(), &first).expect("placed");

    assert_eq!(
        target.validate(),
        Err(IntegrityError::SizeMismatch {
            expected: MESSAGE_HEADER_LEN + 4_000_000,
            actual: target.size(),
        })
    );
}

#[test]
fn validation_rejects_header_naming_another_message() {
    let source = filled_send_buffer(5, 10, 400);
    let first = PacketHeader::for_chunk(&source, ChunkIndex::zero()).expect("chunk 0");
    let relabelled = PacketHeader::from_parts(
        MessageId::new(9),
        first.message_size(),
        first.chunks_count(),
        ChunkIndex::zero(),
        first.chunk_size(),
        first.chunk_size_max(),
    );
    let mut target = ReassemblyBuffer::for_receive(&relabelled, LIMIT).expect("receive buffer");
    target
        .put_chunk(ChunkIndex::zero(), source.chunk(ChunkIndex::zero()).expect("chunk 0"))
        .expect("placed");

    assert!(target.is_complete());
    assert_eq!(
        target.validate(),
        Err(IntegrityError::IndexMismatch {
            message_id: MessageId::new(9),
            header_index: 5,
        })
    );
}

#[test]
fn validation_rejects_missing_message_magic() {
    let source = filled_send_buffer(13, 10, 400);
    let mut target = receive_buffer_for(&source);
    let zeros = vec![0_u8; target.chunk_size_max()];
    target.put_chunk(ChunkIndex::zero(), &zeros).expect("placed");

    assert_eq!(
        target.validate(),
        Err(IntegrityError::Header(MessageError::BadMagic { found: 0 }))
    );
}

fn shuffled_indices() -> impl Strategy<Value = (u64, usize, Vec<usize>)> {
    (1_u64..400, 1_usize..600).prop_flat_map(|(points, room)| {
        let mtu = PACKET_HEADER_LEN + room;
        let count = (MESSAGE_HEADER_LEN + points as usize * 12).div_ceil(room);
        (
            Just(points),
            Just(mtu),
            Just((0..count).collect::<Vec<_>>()).prop_shuffle(),
        )
    })
}

proptest! {
    #[test]
    fn chunks_in_any_order_rebuild_identical_bytes((points, mtu, order) in shuffled_indices()) {
        let source = filled_send_buffer(21, points, mtu);
        let mut target = receive_buffer_for(&source);
        prop_assert_eq!(order.len(), source.chunks_count());

        for index in order.into_iter().map(ChunkIndex::new) {
            prop_assert!(!target.is_complete());
            let chunk = source.chunk(index).expect("chunk in range");
            prop_assert_eq!(target.put_chunk(index, chunk), Ok(ChunkStatus::Placed));
        }

        prop_assert!(target.is_complete());
        prop_assert_eq!(target.data(), source.data());
    }
}
