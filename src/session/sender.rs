//! Send path: cut a composed message into packets and transmit them.

use std::io;

use bytes::BytesMut;
use log::{debug, warn};

use super::{PacketFault, SessionError};
use crate::{
    fragment::{ChunkIndex, PACKET_HEADER_LEN, PacketHeader, ReassemblyBuffer},
    metrics::{self, Direction},
    transport::{PacketSink, PeerAddr},
};

/// Sending side of a session over any [`PacketSink`].
#[derive(Debug)]
pub struct Sender<T> {
    sink: T,
    mtu: usize,
    scratch: BytesMut,
    failures: u64,
}

impl<T: PacketSink> Sender<T> {
    /// Wrap `sink`, sending packets of at most `mtu` bytes.
    #[must_use]
    pub fn new(sink: T, mtu: usize) -> Self {
        Self {
            sink,
            mtu,
            scratch: BytesMut::with_capacity(mtu),
            failures: 0,
        }
    }

    /// Packet size this sender was configured with.
    #[must_use]
    pub const fn mtu(&self) -> usize { self.mtu }

    /// Number of messages that failed to send.
    #[must_use]
    pub const fn failures(&self) -> u64 { self.failures }

    /// Address of the underlying sink.
    #[must_use]
    pub fn local_addr(&self) -> Option<PeerAddr> { self.sink.local_addr() }

    /// Consume the sender, returning the sink.
    pub fn into_inner(self) -> T { self.sink }

    /// Transmit every chunk of `buffer` in ascending index order.
    ///
    /// The first transport failure stops the message; remaining chunks are
    /// not sent and the failure counter is incremented.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MtuMismatch`] when `buffer` was planned for a
    /// different MTU, [`SessionError::SendAborted`] when the sink fails or
    /// accepts a short write, and [`SessionError::Encode`] if a header cannot
    /// be encoded.
    pub async fn send(&mut self, buffer: &ReassemblyBuffer) -> Result<(), SessionError> {
        let result = self.send_chunks(buffer).await;
        if let Err(err) = &result {
            self.failures += 1;
            metrics::inc_failures();
            warn!("message {} not sent: {err}", buffer.message_id());
        }
        result
    }

    async fn send_chunks(&mut self, buffer: &ReassemblyBuffer) -> Result<(), SessionError> {
        let message_id = buffer.message_id();
        let packet_len = buffer.chunk_size_max() + PACKET_HEADER_LEN;
        if packet_len != self.mtu {
            return Err(SessionError::MtuMismatch {
                message_id,
                packet_len,
                mtu: self.mtu,
            });
        }
        for chunk_index in (0..buffer.chunks_count()).map(ChunkIndex::new) {
            let header = PacketHeader::for_chunk(buffer, chunk_index)
                .map_err(PacketFault::from)?;
            let chunk = buffer.chunk(chunk_index).map_err(PacketFault::from)?;
            self.scratch.clear();
            self.scratch.extend_from_slice(&header.encode()?);
            self.scratch.extend_from_slice(chunk);

            let aborted = |source| SessionError::SendAborted {
                message_id,
                chunk_index,
                source,
            };
            let sent = self.sink.send(&self.scratch).await.map_err(aborted)?;
            if sent != self.scratch.len() {
                return Err(aborted(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("sink accepted {sent} of {} bytes", self.scratch.len()),
                )));
            }
            metrics::inc_packets(Direction::Outbound);
        }
        debug!(
            "message {message_id} sent in {} packets",
            buffer.chunks_count()
        );
        Ok(())
    }
}
