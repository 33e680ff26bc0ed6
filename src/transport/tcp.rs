//! TCP stream transport.
//!
//! Packets are written back to back on the stream with no extra framing, so
//! both ends must agree on the packet length (the session MTU). The receiver
//! binds when opened and accepts its single peer lazily, inside the bounded
//! wait of [`PacketSource::receive`].

use std::{io, net::SocketAddr, time::Duration};

use async_trait::async_trait;
use log::{info, warn};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::{Instant, timeout_at},
};

use super::{Datagram, PacketSink, PacketSource, PeerAddr};

/// Client end of a stream session.
#[derive(Debug)]
pub struct StreamSender {
    stream: TcpStream,
}

impl StreamSender {
    /// Connect to a stream receiver at `host:port`.
    ///
    /// # Errors
    ///
    /// Returns any error raised while resolving or connecting.
    pub async fn connect(host: &str, port: u16) -> io::Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        info!("connected to stream receiver at {}", stream.peer_addr()?);
        Ok(Self { stream })
    }

    /// Address of the receiver.
    ///
    /// # Errors
    ///
    /// Propagates the socket error if the peer address is unavailable.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> { self.stream.peer_addr() }
}

#[async_trait]
impl PacketSink for StreamSender {
    async fn send(&mut self, packet: &[u8]) -> io::Result<usize> {
        self.stream.write_all(packet).await?;
        Ok(packet.len())
    }

    fn local_addr(&self) -> Option<PeerAddr> { self.stream.local_addr().ok().map(PeerAddr::Tcp) }
}

/// Server end of a stream session.
#[derive(Debug)]
pub struct StreamReceiver {
    addr: SocketAddr,
    listener: Option<TcpListener>,
    peer: Option<(TcpStream, SocketAddr)>,
}

impl StreamReceiver {
    /// Bind a listener on `host:port`.
    ///
    /// Port `0` picks an ephemeral port; the chosen address is kept so a
    /// reopened receiver listens on the same port.
    ///
    /// # Errors
    ///
    /// Returns any error raised while resolving or binding.
    pub async fn bind(host: &str, port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind((host, port)).await?;
        let addr = listener.local_addr()?;
        info!("listening for stream sender on {addr}");
        Ok(Self {
            addr,
            listener: Some(listener),
            peer: None,
        })
    }

    /// Address the listener is bound to.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr { self.addr }

    /// Whether a sender is currently connected.
    #[must_use]
    pub const fn is_connected(&self) -> bool { self.peer.is_some() }

    async fn accept_until(&mut self, deadline: Instant) -> io::Result<bool> {
        let Some(listener) = self.listener.as_ref() else {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "stream receiver has no listener",
            ));
        };
        match timeout_at(deadline, listener.accept()).await {
            Err(_) => Ok(false),
            Ok(accepted) => {
                let (stream, peer) = accepted?;
                info!("accepted stream sender {peer}");
                self.peer = Some((stream, peer));
                Ok(true)
            }
        }
    }
}

#[async_trait]
impl PacketSource for StreamReceiver {
    async fn receive(&mut self, buf: &mut [u8], wait: Duration) -> io::Result<Option<Datagram>> {
        let deadline = Instant::now() + wait;
        if self.peer.is_none() && !self.accept_until(deadline).await? {
            return Ok(None);
        }
        let Some((stream, peer)) = self.peer.as_mut() else {
            return Ok(None);
        };
        let peer = *peer;
        match timeout_at(deadline, stream.readable()).await {
            Err(_) => return Ok(None),
            Ok(ready) => ready?,
        }
        if let Err(err) = stream.read_exact(buf).await {
            warn!("stream sender {peer} lost: {err}");
            self.peer = None;
            return Err(err);
        }
        Ok(Some(Datagram {
            len: buf.len(),
            source: Some(PeerAddr::Tcp(peer)),
        }))
    }

    async fn reopen(&mut self) -> io::Result<()> {
        self.peer = None;
        self.listener = None;
        let listener = TcpListener::bind(self.addr).await?;
        info!("listening again for stream sender on {}", self.addr);
        self.listener = Some(listener);
        Ok(())
    }

    fn local_addr(&self) -> Option<PeerAddr> { Some(PeerAddr::Tcp(self.addr)) }
}
