//! Local datagram transport over named Unix sockets.
//!
//! Both ends bind a filesystem name. The files are removed again when the
//! endpoint is dropped; a stale receiver file is removed before binding.

use std::{
    fs,
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use log::{debug, info};
use tokio::{net::UnixDatagram, time::timeout};

use super::{Datagram, PacketSink, PacketSource, PeerAddr};

fn remove_stale(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

fn unlink_on_drop(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        debug!("failed to remove socket file {}: {err}", path.display());
    }
}

/// Sending end bound to its own name and addressing the receiver's name.
#[derive(Debug)]
pub struct LocalSender {
    socket: UnixDatagram,
    path: PathBuf,
    server: PathBuf,
}

impl LocalSender {
    /// Bind `client` and direct packets at `server`.
    ///
    /// # Errors
    ///
    /// Returns any error raised while binding `client`.
    pub fn bind(client: impl Into<PathBuf>, server: impl Into<PathBuf>) -> io::Result<Self> {
        let path = client.into();
        let socket = UnixDatagram::bind(&path)?;
        let server = server.into();
        info!(
            "local sender {} addressing {}",
            path.display(),
            server.display()
        );
        Ok(Self {
            socket,
            path,
            server,
        })
    }
}

#[async_trait]
impl PacketSink for LocalSender {
    async fn send(&mut self, packet: &[u8]) -> io::Result<usize> {
        self.socket.send_to(packet, &self.server).await
    }

    fn local_addr(&self) -> Option<PeerAddr> { Some(PeerAddr::Local(Some(self.path.clone()))) }
}

impl Drop for LocalSender {
    fn drop(&mut self) { unlink_on_drop(&self.path); }
}

/// Receiving end bound to the server name.
#[derive(Debug)]
pub struct LocalReceiver {
    socket: UnixDatagram,
    path: PathBuf,
}

impl LocalReceiver {
    /// Bind `server`, replacing any stale socket file left behind.
    ///
    /// # Errors
    ///
    /// Returns any error raised while removing the stale file or binding.
    pub fn bind(server: impl Into<PathBuf>) -> io::Result<Self> {
        let path = server.into();
        remove_stale(&path)?;
        let socket = UnixDatagram::bind(&path)?;
        info!("local receiver bound to {}", path.display());
        Ok(Self { socket, path })
    }
}

#[async_trait]
impl PacketSource for LocalReceiver {
    async fn receive(&mut self, buf: &mut [u8], wait: Duration) -> io::Result<Option<Datagram>> {
        let Ok(received) = timeout(wait, self.socket.recv_from(buf)).await else {
            return Ok(None);
        };
        let (len, addr) = received?;
        Ok(Some(Datagram {
            len,
            source: Some(PeerAddr::Local(addr.as_pathname().map(Path::to_path_buf))),
        }))
    }

    async fn reopen(&mut self) -> io::Result<()> {
        remove_stale(&self.path)?;
        self.socket = UnixDatagram::bind(&self.path)?;
        info!("local receiver rebound to {}", self.path.display());
        Ok(())
    }

    fn local_addr(&self) -> Option<PeerAddr> { Some(PeerAddr::Local(Some(self.path.clone()))) }
}

impl Drop for LocalReceiver {
    fn drop(&mut self) { unlink_on_drop(&self.path); }
}
