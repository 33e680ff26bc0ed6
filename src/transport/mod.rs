//! Packet transports consumed by sessions.
//!
//! A session never touches sockets directly. It is handed a [`PacketSink`]
//! or [`PacketSource`] that moves whole packets, and only ever asks it to
//! send one packet or to wait a bounded time for the next one.

use std::{fmt, io, net::SocketAddr, path::PathBuf, time::Duration};

use async_trait::async_trait;

pub mod local;
pub mod memory;
pub mod tcp;

/// Address of a packet's origin, as reported by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerAddr {
    /// A TCP peer.
    Tcp(SocketAddr),
    /// A named local socket; `None` when the peer is unbound.
    Local(Option<PathBuf>),
    /// An in-process channel.
    Memory,
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "tcp://{addr}"),
            Self::Local(Some(path)) => write!(f, "local://{}", path.display()),
            Self::Local(None) => f.write_str("local://<unnamed>"),
            Self::Memory => f.write_str("memory://"),
        }
    }
}

/// One packet read by a [`PacketSource`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Datagram {
    /// Number of bytes written into the caller's buffer.
    pub len: usize,
    /// Where the packet came from, when the transport knows.
    pub source: Option<PeerAddr>,
}

/// Outbound half of a transport.
///
/// Each call carries exactly one packet. Stream transports write it whole;
/// datagram transports send it as one datagram.
#[async_trait]
pub trait PacketSink: Send {
    /// Transmit `packet`, returning the number of bytes accepted.
    async fn send(&mut self, packet: &[u8]) -> io::Result<usize>;

    /// Address this end is bound to, if any.
    fn local_addr(&self) -> Option<PeerAddr> { None }
}

/// Inbound half of a transport.
///
/// A packet fills at most `buf`; stream transports read exactly `buf.len()`
/// bytes per packet.
#[async_trait]
pub trait PacketSource: Send {
    /// Wait at most `wait` for a packet and copy it into `buf`.
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    async fn receive(&mut self, buf: &mut [u8], wait: Duration) -> io::Result<Option<Datagram>>;

    /// Tear the transport down and bring it back up with its original
    /// settings.
    async fn reopen(&mut self) -> io::Result<()>;

    /// Address this end is bound to, if any.
    fn local_addr(&self) -> Option<PeerAddr> { None }
}
