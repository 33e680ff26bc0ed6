//! Session configuration.

use std::{fmt, num::NonZeroUsize, time::Duration};

use thiserror::Error;

use crate::fragment::{PACKET_HEADER_LEN, PlanError, chunk_size_for_mtu};

/// Connection role: which direction packets flow and over which transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Connects to a TCP receiver and sends messages.
    StreamSender,
    /// Listens on a TCP port and receives messages.
    StreamReceiver,
    /// Sends datagrams to a named local socket.
    LocalSender,
    /// Receives datagrams on a named local socket.
    LocalReceiver,
}

impl Role {
    /// Whether this role transmits messages.
    #[must_use]
    pub const fn is_sender(self) -> bool { matches!(self, Self::StreamSender | Self::LocalSender) }

    /// Whether this role runs over a TCP stream.
    #[must_use]
    pub const fn is_stream(self) -> bool { matches!(self, Self::StreamSender | Self::StreamReceiver) }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StreamSender => "stream sender",
            Self::StreamReceiver => "stream receiver",
            Self::LocalSender => "local sender",
            Self::LocalReceiver => "local receiver",
        })
    }
}

/// Errors detected by [`SessionConfig::validate`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The MTU leaves no room for chunk payload.
    #[error(transparent)]
    MtuTooSmall(#[from] PlanError),
    /// The registry must hold at least one in-flight message.
    #[error("max_entries must be at least 1")]
    NoRegistryCapacity,
    /// A required socket name is empty.
    #[error("{field} must not be empty for a {role}")]
    MissingName {
        /// Role being configured.
        role: Role,
        /// Name of the missing setting.
        field: &'static str,
    },
    /// A timeout is zero.
    #[error("{field} must be greater than zero")]
    ZeroTimeout {
        /// Name of the offending setting.
        field: &'static str,
    },
}

/// Default MTU for stream sessions.
pub const DEFAULT_MTU: usize = 14_600;
/// Default MTU for local datagram sessions.
pub const DEFAULT_LOCAL_MTU: usize = 65_536;
/// Default number of in-flight messages before the registry overruns.
pub const DEFAULT_MAX_ENTRIES: usize = 10;
/// Default bounded wait for one packet.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(2);
/// Default time without a successful read before a failing stream is reset.
pub const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_secs(2);
/// Default cap on a single reassembled message.
pub const DEFAULT_MAX_MESSAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(256 * 1024 * 1024) {
    Some(size) => size,
    None => NonZeroUsize::MIN,
};

/// Everything needed to open a [`ConnectionSession`](super::ConnectionSession).
///
/// `server_name` is the TCP host (or bind address) for stream roles and the
/// receiver's socket path for local roles. `client_name` is the local
/// sender's own socket path and is ignored by the other roles.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use chunkwire::session::{Role, SessionConfig};
///
/// let config = SessionConfig::new(Role::StreamReceiver)
///     .with_server_name("127.0.0.1")
///     .with_port(5050)
///     .with_mtu(1_500)
///     .with_watchdog_timeout(Duration::from_secs(5));
/// assert!(config.validate().is_ok());
/// assert_eq!(config.max_entries(), 10);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    role: Role,
    server_name: String,
    client_name: String,
    port: u16,
    mtu: usize,
    max_entries: usize,
    max_message_size: NonZeroUsize,
    poll_timeout: Duration,
    watchdog_timeout: Duration,
}

impl SessionConfig {
    /// Configuration for `role` with default limits.
    #[must_use]
    pub fn new(role: Role) -> Self {
        let mtu = if role.is_stream() {
            DEFAULT_MTU
        } else {
            DEFAULT_LOCAL_MTU
        };
        Self {
            role,
            server_name: String::new(),
            client_name: String::new(),
            port: 0,
            mtu,
            max_entries: DEFAULT_MAX_ENTRIES,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            watchdog_timeout: DEFAULT_WATCHDOG_TIMEOUT,
        }
    }

    /// Set the host or receiver socket path.
    #[must_use]
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Set the local sender's socket path.
    #[must_use]
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Set the TCP port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the packet size, header included.
    #[must_use]
    pub const fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    /// Set the registry overrun threshold.
    #[must_use]
    pub const fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set the largest message a receiver will allocate.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: NonZeroUsize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the bounded wait for one packet.
    #[must_use]
    pub const fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the watchdog window for stream receivers.
    #[must_use]
    pub const fn with_watchdog_timeout(mut self, timeout: Duration) -> Self {
        self.watchdog_timeout = timeout;
        self
    }

    /// Role the session plays.
    #[must_use]
    pub const fn role(&self) -> Role { self.role }

    /// Receiver host, bind address or socket path.
    #[must_use]
    pub fn server_name(&self) -> &str { &self.server_name }

    /// Socket path a local sender binds.
    #[must_use]
    pub fn client_name(&self) -> &str { &self.client_name }

    /// TCP port of the stream roles.
    #[must_use]
    pub const fn port(&self) -> u16 { self.port }

    /// Length of every packet on the wire.
    #[must_use]
    pub const fn mtu(&self) -> usize { self.mtu }

    /// In-flight messages held before the registry overruns.
    #[must_use]
    pub const fn max_entries(&self) -> usize { self.max_entries }

    /// Largest message a receiver will allocate.
    #[must_use]
    pub const fn max_message_size(&self) -> NonZeroUsize { self.max_message_size }

    /// Bounded wait for each receive.
    #[must_use]
    pub const fn poll_timeout(&self) -> Duration { self.poll_timeout }

    /// Silence tolerated before a stream receiver resets its link.
    #[must_use]
    pub const fn watchdog_timeout(&self) -> Duration { self.watchdog_timeout }

    /// Check the settings before any socket is opened.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MtuTooSmall`] when `mtu` does not exceed the
    /// packet header ([`PACKET_HEADER_LEN`] bytes), and the other
    /// [`ConfigError`] variants for missing names, zero timeouts or a zero
    /// registry size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        chunk_size_for_mtu(self.mtu)?;
        if self.max_entries == 0 {
            return Err(ConfigError::NoRegistryCapacity);
        }
        if self.server_name.is_empty() {
            return Err(ConfigError::MissingName {
                role: self.role,
                field: "server_name",
            });
        }
        if self.role == Role::LocalSender && self.client_name.is_empty() {
            return Err(ConfigError::MissingName {
                role: self.role,
                field: "client_name",
            });
        }
        if self.poll_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                field: "poll_timeout",
            });
        }
        if self.watchdog_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                field: "watchdog_timeout",
            });
        }
        Ok(())
    }
}
