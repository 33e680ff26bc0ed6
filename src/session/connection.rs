//! Role-dispatching session over the built-in transports.

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span};

use super::{Receiver, Received, Role, Sender, SessionConfig, SessionError};
use crate::{
    fragment::ReassemblyBuffer,
    message::MessageHeader,
    transport::{
        PeerAddr,
        local::{LocalReceiver, LocalSender},
        tcp::{StreamReceiver, StreamSender},
    },
};

/// Transport-specific state for each role.
#[derive(Debug)]
enum Endpoint {
    StreamSender(Sender<StreamSender>),
    StreamReceiver(Receiver<StreamReceiver>),
    LocalSender(Sender<LocalSender>),
    LocalReceiver(Receiver<LocalReceiver>),
}

/// One end of a message link, opened from a [`SessionConfig`].
///
/// Exactly one task drives a session. Sender roles accept
/// [`ConnectionSession::send`]; receiver roles accept
/// [`ConnectionSession::receive`] and
/// [`ConnectionSession::run_until_cancelled`]. The other combination fails
/// with [`SessionError::WrongRole`].
#[derive(Debug)]
pub struct ConnectionSession {
    config: SessionConfig,
    endpoint: Endpoint,
}

impl ConnectionSession {
    /// Validate `config` and open the transport for its role.
    ///
    /// Stream senders connect immediately; stream receivers bind and accept
    /// their peer during the first receives.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] for an invalid configuration and
    /// [`SessionError::Transport`] when the socket cannot be opened.
    pub async fn open(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let span = info_span!("session.open", role = %config.role(), mtu = config.mtu());
        let endpoint = open_endpoint(&config).instrument(span).await?;
        info!(role = %config.role(), "session open");
        Ok(Self { config, endpoint })
    }

    /// Configuration the session was opened with.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig { &self.config }

    /// Role taken from the configuration.
    #[must_use]
    pub const fn role(&self) -> Role { self.config.role() }

    /// Messages and packets that failed since the session opened.
    #[must_use]
    pub fn failures(&self) -> u64 {
        match &self.endpoint {
            Endpoint::StreamSender(sender) => sender.failures(),
            Endpoint::LocalSender(sender) => sender.failures(),
            Endpoint::StreamReceiver(receiver) => receiver.failures(),
            Endpoint::LocalReceiver(receiver) => receiver.failures(),
        }
    }

    /// Address of this end of the link.
    #[must_use]
    pub fn local_addr(&self) -> Option<PeerAddr> {
        match &self.endpoint {
            Endpoint::StreamSender(sender) => sender.local_addr(),
            Endpoint::LocalSender(sender) => sender.local_addr(),
            Endpoint::StreamReceiver(receiver) => receiver.local_addr(),
            Endpoint::LocalReceiver(receiver) => receiver.local_addr(),
        }
    }

    /// Send a composed message.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WrongRole`] on a receiver, otherwise the
    /// errors of [`Sender::send`].
    pub async fn send(&mut self, buffer: &ReassemblyBuffer) -> Result<(), SessionError> {
        let role = self.config.role();
        match &mut self.endpoint {
            Endpoint::StreamSender(sender) => sender.send(buffer).await,
            Endpoint::LocalSender(sender) => sender.send(buffer).await,
            Endpoint::StreamReceiver(_) | Endpoint::LocalReceiver(_) => Err(wrong_role(role, "send")),
        }
    }

    /// Wait for one packet.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WrongRole`] on a sender, otherwise the errors
    /// of [`Receiver::receive`].
    pub async fn receive(&mut self) -> Result<Received<'_>, SessionError> {
        let role = self.config.role();
        match &mut self.endpoint {
            Endpoint::StreamReceiver(receiver) => receiver.receive().await,
            Endpoint::LocalReceiver(receiver) => receiver.receive().await,
            Endpoint::StreamSender(_) | Endpoint::LocalSender(_) => Err(wrong_role(role, "receive")),
        }
    }

    /// Receive messages until `token` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WrongRole`] on a sender, otherwise the errors
    /// of [`Receiver::run_until_cancelled`].
    pub async fn run_until_cancelled<F>(
        &mut self,
        token: &CancellationToken,
        handler: F,
    ) -> Result<u64, SessionError>
    where
        F: FnMut(&MessageHeader, &[u8]),
    {
        let role = self.config.role();
        match &mut self.endpoint {
            Endpoint::StreamReceiver(receiver) => receiver.run_until_cancelled(token, handler).await,
            Endpoint::LocalReceiver(receiver) => receiver.run_until_cancelled(token, handler).await,
            Endpoint::StreamSender(_) | Endpoint::LocalSender(_) => {
                Err(wrong_role(role, "run_until_cancelled"))
            }
        }
    }

    /// Close the transport, releasing in-flight buffers and removing any
    /// socket files.
    pub fn close(self) {
        info!(role = %self.config.role(), failures = self.failures(), "session closed");
    }
}

fn wrong_role(role: Role, operation: &'static str) -> SessionError {
    SessionError::WrongRole { role, operation }
}

async fn open_endpoint(config: &SessionConfig) -> Result<Endpoint, SessionError> {
    let endpoint = match config.role() {
        Role::StreamSender => {
            let sink = StreamSender::connect(config.server_name(), config.port()).await?;
            Endpoint::StreamSender(Sender::new(sink, config.mtu()))
        }
        Role::StreamReceiver => {
            let source = StreamReceiver::bind(config.server_name(), config.port()).await?;
            Endpoint::StreamReceiver(
                Receiver::new(source, config).with_watchdog(config.watchdog_timeout()),
            )
        }
        Role::LocalSender => {
            let sink = LocalSender::bind(config.client_name(), config.server_name())?;
            Endpoint::LocalSender(Sender::new(sink, config.mtu()))
        }
        Role::LocalReceiver => {
            let source = LocalReceiver::bind(config.server_name())?;
            Endpoint::LocalReceiver(Receiver::new(source, config))
        }
    };
    Ok(endpoint)
}
