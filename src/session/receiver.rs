//! Receive path: validate packets, place chunks and surface complete
//! messages.

use std::{num::NonZeroUsize, time::Duration};

use log::{debug, warn};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info_span};

use super::{PacketFault, SessionConfig, SessionError, Watchdog};
use crate::{
    fragment::{
        BufferError,
        ChunkStatus,
        MessageId,
        PACKET_HEADER_LEN,
        PacketHeader,
        ReassemblyBuffer,
        ReassemblyRegistry,
    },
    message::{MESSAGE_HEADER_LEN, MessageHeader},
    metrics::{self, Direction},
    transport::{PacketSource, PeerAddr},
};

/// Outcome of one bounded receive.
#[derive(Debug)]
pub enum Received<'a> {
    /// Nothing arrived within the poll timeout.
    Idle,
    /// A chunk was placed; its message is still incomplete.
    Partial {
        /// Message the chunk belongs to.
        message_id: MessageId,
        /// Whether the chunk was new or a repeat.
        status: ChunkStatus,
        /// Distinct chunks received so far.
        received: usize,
        /// Chunks in the message.
        chunks_count: usize,
    },
    /// A packet or message was discarded and counted as a failure.
    Dropped(SessionError),
    /// A message completed and passed validation.
    Ready(ReadyMessage<'a>),
}

/// A validated message still held by the registry.
///
/// The buffer stays registered until [`ReadyMessage::release`] or
/// [`ReadyMessage::take`] is called.
#[derive(Debug)]
pub struct ReadyMessage<'a> {
    registry: &'a mut ReassemblyRegistry,
    message_id: MessageId,
    header: MessageHeader,
    message_size: usize,
}

impl ReadyMessage<'_> {
    /// Decoded message header.
    #[must_use]
    pub const fn header(&self) -> &MessageHeader { &self.header }

    /// Identifier the message's packets carried; the registry key.
    #[must_use]
    pub const fn message_id(&self) -> MessageId { self.message_id }

    /// The whole reassembled buffer, padding included.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.registry
            .find(self.message_id())
            .map(ReassemblyBuffer::data)
            .unwrap_or_default()
    }

    /// Payload bytes declared by the header, without padding.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        self.data()
            .get(MESSAGE_HEADER_LEN..self.message_size)
            .unwrap_or_default()
    }

    /// Drop the buffer from the registry.
    pub fn release(self) { self.registry.delete(self.message_id()); }

    /// Unregister the buffer and hand it to the caller.
    #[must_use]
    pub fn take(self) -> Option<ReassemblyBuffer> { self.registry.remove(self.message_id()) }
}

/// Receiving side of a session over any [`PacketSource`].
#[derive(Debug)]
pub struct Receiver<T> {
    source: T,
    registry: ReassemblyRegistry,
    scratch: Vec<u8>,
    max_message_size: NonZeroUsize,
    poll_timeout: Duration,
    watchdog: Option<Watchdog>,
    failures: u64,
}

impl<T: PacketSource> Receiver<T> {
    /// Wrap `source` using the limits in `config`.
    ///
    /// The watchdog is off; see [`Receiver::with_watchdog`].
    #[must_use]
    pub fn new(source: T, config: &SessionConfig) -> Self {
        Self {
            source,
            registry: ReassemblyRegistry::new(config.max_entries()),
            scratch: vec![0; config.mtu()],
            max_message_size: config.max_message_size(),
            poll_timeout: config.poll_timeout(),
            watchdog: None,
            failures: 0,
        }
    }

    /// Reset the transport when a read fails more than `timeout` after the
    /// last successful one.
    #[must_use]
    pub fn with_watchdog(mut self, timeout: Duration) -> Self {
        self.watchdog = Some(Watchdog::new(timeout));
        self
    }

    /// Number of packets and messages dropped since the session (re)opened.
    #[must_use]
    pub const fn failures(&self) -> u64 { self.failures }

    /// In-flight buffers.
    #[must_use]
    pub const fn registry(&self) -> &ReassemblyRegistry { &self.registry }

    /// Address of the underlying source.
    #[must_use]
    pub fn local_addr(&self) -> Option<PeerAddr> { self.source.local_addr() }

    /// Consume the receiver, returning the source.
    pub fn into_inner(self) -> T { self.source }

    /// Wait for one packet and advance the reassembly state machine.
    ///
    /// Per-packet and per-message errors are counted and reported as
    /// [`Received::Dropped`]; the session stays usable.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] only when a watchdog reset could
    /// not reopen the transport.
    pub async fn receive(&mut self) -> Result<Received<'_>, SessionError> {
        let datagram = match self.source.receive(&mut self.scratch, self.poll_timeout).await {
            Ok(None) => return Ok(Received::Idle),
            Ok(Some(datagram)) => datagram,
            Err(err) => {
                self.reset_if_stalled().await?;
                return Ok(self.dropped(SessionError::Transport(err)));
            }
        };
        if let Some(watchdog) = self.watchdog.as_mut() {
            watchdog.feed();
        }
        metrics::inc_packets(Direction::Inbound);

        let (header, status) = match self.place(datagram.len) {
            Ok(placed) => placed,
            Err(err) => return Ok(self.dropped(err)),
        };
        let message_id = header.message_id();
        let Some(buffer) = self.registry.find(message_id) else {
            return Ok(Received::Idle);
        };
        if !buffer.is_complete() {
            return Ok(Received::Partial {
                message_id,
                status,
                received: buffer.received_count(),
                chunks_count: buffer.chunks_count(),
            });
        }

        match buffer.validate().and_then(|header| {
            let size = header.message_size()?;
            Ok((header, size))
        }) {
            Ok((header, message_size)) => {
                metrics::inc_completed();
                debug!("message {message_id} complete ({message_size} bytes)");
                Ok(Received::Ready(ReadyMessage {
                    registry: &mut self.registry,
                    message_id,
                    header,
                    message_size,
                }))
            }
            Err(source) => {
                self.registry.delete(message_id);
                Ok(self.dropped(SessionError::CorruptedMessage { message_id, source }))
            }
        }
    }

    /// Receive until `token` is cancelled, passing each validated message to
    /// `handler` and releasing it afterwards.
    ///
    /// The token is checked between packets; a pending wait ends within the
    /// poll timeout. Returns the number of messages delivered.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Receiver::receive`].
    pub async fn run_until_cancelled<F>(
        &mut self,
        token: &CancellationToken,
        mut handler: F,
    ) -> Result<u64, SessionError>
    where
        F: FnMut(&MessageHeader, &[u8]),
    {
        let mut delivered = 0;
        while !token.is_cancelled() {
            if let Received::Ready(message) = self.receive().await? {
                handler(message.header(), message.payload());
                message.release();
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Validate the packet in the scratch buffer and place its chunk.
    fn place(&mut self, len: usize) -> Result<(PacketHeader, ChunkStatus), SessionError> {
        let packet = self.scratch.get(..len).unwrap_or_default();
        let header = PacketHeader::parse(packet).map_err(PacketFault::from)?;
        let payload = packet.get(PACKET_HEADER_LEN..).unwrap_or_default();
        let message_id = header.message_id();

        let status = if let Some(buffer) = self.registry.find_mut(message_id) {
            if !matches_geometry(buffer, &header) {
                return Err(PacketFault::Geometry(BufferError::InconsistentGeometry {
                    message_id,
                    size: header.message_size(),
                    chunks_count: header.chunks_count(),
                    chunk_size_max: header.chunk_size_max(),
                })
                .into());
            }
            buffer.put_packet(&header, payload).map_err(PacketFault::from)?
        } else {
            let mut buffer = ReassemblyBuffer::for_receive(&header, self.max_message_size)
                .map_err(|err| SessionError::from_buffer(message_id, err))?;
            let status = buffer.put_packet(&header, payload).map_err(PacketFault::from)?;
            self.registry.enforce_capacity();
            self.registry.insert(buffer)?;
            status
        };
        Ok((header, status))
    }

    fn dropped(&mut self, err: SessionError) -> Received<'static> {
        self.failures += 1;
        metrics::inc_failures();
        warn!("dropped inbound data: {err}");
        Received::Dropped(err)
    }

    async fn reset_if_stalled(&mut self) -> Result<(), SessionError> {
        let Some(watchdog) = self.watchdog else {
            return Ok(());
        };
        if !watchdog.expired() {
            return Ok(());
        }
        warn!(
            "no data for more than {:?}; resetting connection",
            watchdog.timeout()
        );
        self.source
            .reopen()
            .instrument(info_span!("session.reopen", failures = self.failures))
            .await?;
        self.registry.clear();
        self.failures = 0;
        self.watchdog = Some(Watchdog::new(watchdog.timeout()));
        Ok(())
    }
}

fn matches_geometry(buffer: &ReassemblyBuffer, header: &PacketHeader) -> bool {
    buffer.size() == header.message_size()
        && buffer.chunks_count() == header.chunks_count()
        && buffer.chunk_size_max() == header.chunk_size_max()
}
