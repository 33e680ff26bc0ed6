//! In-process packet link.
//!
//! Packets travel through a bounded channel as [`Bytes`]. A packet longer
//! than the receiver's buffer is truncated, as a datagram socket would.

use std::{io, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::{sync::mpsc, time::timeout};

use super::{Datagram, PacketSink, PacketSource, PeerAddr};

/// Create a linked sink and source holding up to `capacity` queued packets.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use chunkwire::transport::{PacketSink, PacketSource, memory};
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let (mut sink, mut source) = memory::channel(4);
/// sink.send(b"ping").await.expect("send");
/// let mut buf = [0_u8; 16];
/// let datagram = source
///     .receive(&mut buf, Duration::from_millis(10))
///     .await
///     .expect("receive")
///     .expect("packet");
/// assert_eq!(&buf[..datagram.len], b"ping");
/// # });
/// ```
#[must_use]
pub fn channel(capacity: usize) -> (MemorySink, MemorySource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (MemorySink { tx }, MemorySource { rx })
}

/// Sending half of [`channel`].
#[derive(Clone, Debug)]
pub struct MemorySink {
    tx: mpsc::Sender<Bytes>,
}

#[async_trait]
impl PacketSink for MemorySink {
    async fn send(&mut self, packet: &[u8]) -> io::Result<usize> {
        self.tx
            .send(Bytes::copy_from_slice(packet))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "memory link closed"))?;
        Ok(packet.len())
    }

    fn local_addr(&self) -> Option<PeerAddr> { Some(PeerAddr::Memory) }
}

/// Receiving half of [`channel`].
#[derive(Debug)]
pub struct MemorySource {
    rx: mpsc::Receiver<Bytes>,
}

#[async_trait]
impl PacketSource for MemorySource {
    async fn receive(&mut self, buf: &mut [u8], wait: Duration) -> io::Result<Option<Datagram>> {
        let Ok(next) = timeout(wait, self.rx.recv()).await else {
            return Ok(None);
        };
        let Some(packet) = next else {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "memory link closed",
            ));
        };
        let len = packet.len().min(buf.len());
        buf[..len].copy_from_slice(&packet[..len]);
        Ok(Some(Datagram {
            len,
            source: Some(PeerAddr::Memory),
        }))
    }

    async fn reopen(&mut self) -> io::Result<()> { Ok(()) }

    fn local_addr(&self) -> Option<PeerAddr> { Some(PeerAddr::Memory) }
}
