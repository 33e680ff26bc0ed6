//! Session tests over the in-process transport.

use std::{io, time::Duration};

use async_trait::async_trait;
use rstest::rstest;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::{
    byte_order::{write_network_u32, write_network_u64},
    fragment::{
        ChunkIndex,
        ChunkStatus,
        IntegrityError,
        MessageId,
        PACKET_HEADER_LEN,
        PacketError,
        PacketHeader,
        ReassemblyBuffer,
    },
    message::{MESSAGE_HEADER_LEN, MessageError, MessageHeader, PayloadShape, PointCloudShape},
    transport::{Datagram, PacketSink, PacketSource, memory},
};

const POLL: Duration = Duration::from_millis(5);

fn config(mtu: usize) -> SessionConfig {
    SessionConfig::new(Role::LocalReceiver)
        .with_server_name("memory")
        .with_mtu(mtu)
        .with_poll_timeout(POLL)
}

fn compose(index: u64, point_count: u64, mtu: usize) -> ReassemblyBuffer {
    let header = MessageHeader::new(
        index,
        1_000 + index,
        PayloadShape::PointCloud(PointCloudShape {
            tracker_state: 1,
            point_count,
            ..PointCloudShape::default()
        }),
    );
    let mut buffer = ReassemblyBuffer::for_send(&header, mtu).expect("send buffer");
    for (offset, byte) in buffer.payload_mut().iter_mut().enumerate() {
        *byte = (offset % 241) as u8;
    }
    buffer
}

async fn packets_of(buffer: &ReassemblyBuffer, mtu: usize) -> Vec<Vec<u8>> {
    let (sink, mut source) = memory::channel(buffer.chunks_count());
    let mut sender = Sender::new(sink, mtu);
    sender.send(buffer).await.expect("send");
    assert_eq!(sender.failures(), 0);

    let mut packets = Vec::new();
    let mut scratch = vec![0_u8; mtu];
    while let Some(datagram) = source
        .receive(&mut scratch, Duration::from_millis(1))
        .await
        .expect("receive")
    {
        packets.push(scratch[..datagram.len].to_vec());
    }
    packets
}

fn linked_receiver(config: &SessionConfig) -> (memory::MemorySink, Receiver<memory::MemorySource>) {
    let (sink, source) = memory::channel(256);
    (sink, Receiver::new(source, config))
}

#[tokio::test(start_paused = true)]
async fn point_cloud_of_one_hundred_points_over_1024_byte_packets() {
    let mtu = 1024;
    let buffer = compose(7, 100, mtu);
    let chunk_size = mtu - PACKET_HEADER_LEN;
    let message_size = MESSAGE_HEADER_LEN + 1200;
    assert_eq!(buffer.chunks_count(), message_size.div_ceil(chunk_size));

    let packets = packets_of(&buffer, mtu).await;
    assert_eq!(packets.len(), buffer.chunks_count());
    let first = PacketHeader::parse(&packets[0]).expect("valid packet");
    assert_eq!(first.message_id(), MessageId::new(7));
    assert_eq!(first.chunk_size(), chunk_size);

    let (mut sink, mut receiver) = linked_receiver(&config(mtu));
    let (last, rest) = packets.split_last().expect("at least one packet");
    for packet in rest {
        memory_send(&mut sink, packet).await;
        assert!(matches!(
            receiver.receive().await.expect("receive"),
            Received::Partial { .. }
        ));
    }
    memory_send(&mut sink, last).await;
    let Received::Ready(message) = receiver.receive().await.expect("receive") else {
        panic!("message should be complete");
    };
    assert_eq!(message.header().index(), 7);
    assert_eq!(message.data(), buffer.data());
    assert_eq!(message.payload().len(), 1200);
    let owned = message.take().expect("registered");
    assert_eq!(owned.message_id(), MessageId::new(7));
    assert!(receiver.registry().is_empty());
    assert_eq!(receiver.failures(), 0);
}

async fn memory_send(sink: &mut memory::MemorySink, packet: &[u8]) {
    sink.send(packet).await.expect("memory send");
}

#[rstest]
#[case::ascending(|n: usize| (0..n).collect::<Vec<_>>())]
#[case::descending(|n: usize| (0..n).rev().collect::<Vec<_>>())]
#[case::odd_then_even(|n: usize| (0..n).filter(|i| i % 2 == 1).chain((0..n).filter(|i| i % 2 == 0)).collect::<Vec<_>>())]
#[tokio::test(start_paused = true)]
async fn packets_in_any_order_rebuild_the_message(#[case] order: fn(usize) -> Vec<usize>) {
    let mtu = 300;
    let buffer = compose(3, 250, mtu);
    let packets = packets_of(&buffer, mtu).await;
    let (mut sink, mut receiver) = linked_receiver(&config(mtu));

    let order = order(packets.len());
    let (last, rest) = order.split_last().expect("packets");
    for &index in rest {
        memory_send(&mut sink, &packets[index]).await;
        assert!(matches!(
            receiver.receive().await.expect("receive"),
            Received::Partial { .. }
        ));
    }
    memory_send(&mut sink, &packets[*last]).await;
    match receiver.receive().await.expect("receive") {
        Received::Ready(message) => {
            assert_eq!(message.data(), buffer.data());
            message.release();
        }
        other => panic!("expected a complete message, got {other:?}"),
    }
    assert!(receiver.registry().is_empty());
}

#[tokio::test(start_paused = true)]
async fn repeated_packet_is_not_counted_twice() {
    let mtu = 200;
    let buffer = compose(4, 40, mtu);
    let packets = packets_of(&buffer, mtu).await;
    let (mut sink, mut receiver) = linked_receiver(&config(mtu));

    memory_send(&mut sink, &packets[0]).await;
    memory_send(&mut sink, &packets[0]).await;
    receiver.receive().await.expect("receive");
    match receiver.receive().await.expect("receive") {
        Received::Partial {
            status, received, ..
        } => {
            assert_eq!(status, ChunkStatus::Duplicate);
            assert_eq!(received, 1);
        }
        other => panic!("expected partial progress, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn packet_with_wrong_magic_is_counted_and_dropped() {
    let mtu = 200;
    let buffer = compose(5, 40, mtu);
    let packets = packets_of(&buffer, mtu).await;
    let (mut sink, mut receiver) = linked_receiver(&config(mtu));

    memory_send(&mut sink, &packets[0]).await;
    receiver.receive().await.expect("receive");
    let before: Vec<_> = receiver.registry().ids().collect();
    let received_before = receiver
        .registry()
        .find(MessageId::new(5))
        .map(ReassemblyBuffer::received_count);

    let mut corrupt = packets[1].clone();
    corrupt[48..52].copy_from_slice(&write_network_u32(0x0BAD_F00D));
    memory_send(&mut sink, &corrupt).await;
    match receiver.receive().await.expect("receive") {
        Received::Dropped(SessionError::CorruptedPacket(PacketFault::Framing(err))) => {
            assert_eq!(err, PacketError::BadMagic { found: 0x0BAD_F00D });
        }
        other => panic!("expected a dropped packet, got {other:?}"),
    }

    assert_eq!(receiver.failures(), 1);
    assert_eq!(receiver.registry().ids().collect::<Vec<_>>(), before);
    assert_eq!(
        receiver
            .registry()
            .find(MessageId::new(5))
            .map(ReassemblyBuffer::received_count),
        received_before
    );
}

#[tokio::test(start_paused = true)]
async fn truncated_packet_is_dropped() {
    let (mut sink, mut receiver) = linked_receiver(&config(200));
    memory_send(&mut sink, &[0_u8; 10]).await;
    assert!(matches!(
        receiver.receive().await.expect("receive"),
        Received::Dropped(SessionError::CorruptedPacket(PacketFault::Framing(
            PacketError::TruncatedPacket { received: 10 }
        )))
    ));
    assert_eq!(receiver.failures(), 1);
    assert!(receiver.registry().is_empty());
}

#[tokio::test(start_paused = true)]
async fn message_with_corrupt_header_is_dropped_whole() {
    let mtu = 400;
    let buffer = compose(6, 10, mtu);
    let header_magic = MESSAGE_HEADER_LEN - 4..MESSAGE_HEADER_LEN;
    let packets = {
        let mut raw = packets_of(&buffer, mtu).await;
        raw[0][PACKET_HEADER_LEN + header_magic.start..PACKET_HEADER_LEN + header_magic.end]
            .copy_from_slice(&[0; 4]);
        raw
    };
    let (mut sink, mut receiver) = linked_receiver(&config(mtu));

    assert_eq!(packets.len(), 1);
    memory_send(&mut sink, &packets[0]).await;
    match receiver.receive().await.expect("receive") {
        Received::Dropped(SessionError::CorruptedMessage { message_id, source }) => {
            assert_eq!(message_id, MessageId::new(6));
            assert_eq!(
                source,
                IntegrityError::Header(MessageError::BadMagic { found: 0 })
            );
        }
        other => panic!("expected a dropped message, got {other:?}"),
    }
    assert!(receiver.registry().is_empty());
    assert_eq!(receiver.failures(), 1);
}

#[tokio::test(start_paused = true)]
async fn message_relabelled_in_transit_leaves_other_entries_alone() {
    let mtu = 400;
    let (mut sink, mut receiver) = linked_receiver(&config(mtu));

    let in_flight = packets_of(&compose(5, 200, mtu), mtu).await;
    memory_send(&mut sink, &in_flight[0]).await;
    assert!(matches!(
        receiver.receive().await.expect("receive"),
        Received::Partial { .. }
    ));

    let mut relabelled = packets_of(&compose(5, 10, mtu), mtu).await;
    assert_eq!(relabelled.len(), 1);
    relabelled[0][..8].copy_from_slice(&write_network_u64(9));
    memory_send(&mut sink, &relabelled[0]).await;
    match receiver.receive().await.expect("receive") {
        Received::Dropped(SessionError::CorruptedMessage { message_id, source }) => {
            assert_eq!(message_id, MessageId::new(9));
            assert_eq!(
                source,
                IntegrityError::IndexMismatch {
                    message_id: MessageId::new(9),
                    header_index: 5,
                }
            );
        }
        other => panic!("expected a dropped message, got {other:?}"),
    }
    assert_eq!(
        receiver.registry().ids().collect::<Vec<_>>(),
        vec![MessageId::new(5)]
    );
    assert_eq!(receiver.failures(), 1);
}

#[tokio::test(start_paused = true)]
async fn ready_message_is_released_by_its_packet_id() {
    let mtu = 400;
    let (mut sink, mut receiver) = linked_receiver(&config(mtu));

    let in_flight = packets_of(&compose(3, 200, mtu), mtu).await;
    memory_send(&mut sink, &in_flight[0]).await;
    receiver.receive().await.expect("receive");

    let complete = packets_of(&compose(4, 10, mtu), mtu).await;
    memory_send(&mut sink, &complete[0]).await;
    let Received::Ready(message) = receiver.receive().await.expect("receive") else {
        panic!("message should be complete");
    };
    assert_eq!(message.message_id(), MessageId::new(4));
    message.release();
    assert_eq!(
        receiver.registry().ids().collect::<Vec<_>>(),
        vec![MessageId::new(3)]
    );
}

#[tokio::test(start_paused = true)]
async fn new_messages_past_the_limit_clear_the_registry() {
    let mtu = 120;
    let config = config(mtu).with_max_entries(2);
    let (mut sink, mut receiver) = linked_receiver(&config);

    for index in 0..3 {
        let packets = packets_of(&compose(index, 40, mtu), mtu).await;
        memory_send(&mut sink, &packets[0]).await;
        receiver.receive().await.expect("receive");
    }

    assert_eq!(receiver.registry().len(), 1);
    assert!(receiver.registry().find(MessageId::new(2)).is_some());
}

#[tokio::test(start_paused = true)]
async fn oversized_message_is_rejected_before_allocation() {
    let mtu = 200;
    let config = config(mtu).with_max_message_size(std::num::NonZeroUsize::new(256).expect("non-zero"));
    let packets = packets_of(&compose(8, 100, mtu), mtu).await;
    let (mut sink, mut receiver) = linked_receiver(&config);

    memory_send(&mut sink, &packets[0]).await;
    assert!(matches!(
        receiver.receive().await.expect("receive"),
        Received::Dropped(SessionError::CorruptedPacket(PacketFault::Geometry(_)))
    ));
    assert!(receiver.registry().is_empty());
}

#[tokio::test(start_paused = true)]
async fn idle_link_reports_no_message() {
    let (_sink, mut receiver) = linked_receiver(&config(200));
    assert!(matches!(
        receiver.receive().await.expect("receive"),
        Received::Idle
    ));
    assert_eq!(receiver.failures(), 0);
}

#[tokio::test(start_paused = true)]
async fn send_stops_at_first_transport_failure() {
    let mtu = 200;
    let (sink, source) = memory::channel(1);
    drop(source);
    let mut sender = Sender::new(sink, mtu);

    let err = sender
        .send(&compose(9, 40, mtu))
        .await
        .expect_err("closed link must fail");
    assert!(matches!(
        err,
        SessionError::SendAborted {
            chunk_index,
            ..
        } if chunk_index == ChunkIndex::zero()
    ));
    assert_eq!(sender.failures(), 1);
}

#[tokio::test(start_paused = true)]
async fn send_rejects_buffer_planned_for_other_mtu() {
    let (sink, _source) = memory::channel(8);
    let mut sender = Sender::new(sink, 512);
    assert!(matches!(
        sender.send(&compose(1, 10, 256)).await,
        Err(SessionError::MtuMismatch { mtu: 512, .. })
    ));
    assert_eq!(sender.failures(), 1);
}

#[tokio::test(start_paused = true)]
async fn loop_delivers_payloads_until_cancelled() {
    let mtu = 160;
    let buffer = compose(12, 30, mtu);
    let packets = packets_of(&buffer, mtu).await;
    let (mut sink, mut receiver) = linked_receiver(&config(mtu));
    for packet in &packets {
        memory_send(&mut sink, packet).await;
    }

    let token = CancellationToken::new();
    let mut seen = Vec::new();
    let delivered = receiver
        .run_until_cancelled(&token, |header, payload| {
            seen.push((header.index(), payload.len()));
            token.cancel();
        })
        .await
        .expect("loop");

    assert_eq!(delivered, 1);
    assert_eq!(seen, vec![(12, 360)]);
    assert!(receiver.registry().is_empty());
}

/// Source whose reads always fail, counting reopen requests.
#[derive(Debug, Default)]
struct FailingSource {
    reopened: usize,
}

#[async_trait]
impl PacketSource for FailingSource {
    async fn receive(&mut self, _buf: &mut [u8], _wait: Duration) -> io::Result<Option<Datagram>> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer reset"))
    }

    async fn reopen(&mut self) -> io::Result<()> {
        self.reopened += 1;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn watchdog_reopens_stalled_transport() {
    let mut receiver =
        Receiver::new(FailingSource::default(), &config(200)).with_watchdog(Duration::from_secs(2));

    for _ in 0..3 {
        assert!(matches!(
            receiver.receive().await.expect("receive"),
            Received::Dropped(SessionError::Transport(_))
        ));
    }
    assert_eq!(receiver.failures(), 3);

    tokio::time::advance(Duration::from_secs(3)).await;
    receiver.receive().await.expect("receive");
    assert_eq!(receiver.failures(), 1);
    assert_eq!(receiver.into_inner().reopened, 1);
}
