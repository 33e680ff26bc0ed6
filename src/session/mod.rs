//! Connection sessions: the send path, the receive state machine and the
//! role-dispatching [`ConnectionSession`].
//!
//! [`Sender`] and [`Receiver`] are generic over the transport traits in
//! [`crate::transport`], so the same state machine runs over TCP, local
//! sockets or an in-process channel. [`ConnectionSession`] picks the
//! transport from a [`SessionConfig`].

pub mod config;
mod connection;
pub mod error;
mod receiver;
mod sender;
mod watchdog;

pub use config::{ConfigError, Role, SessionConfig};
pub use connection::ConnectionSession;
pub use error::{PacketFault, SessionError};
pub use receiver::{ReadyMessage, Received, Receiver};
pub use sender::Sender;
pub use watchdog::Watchdog;

#[cfg(test)]
mod tests;
