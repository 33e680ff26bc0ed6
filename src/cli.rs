//! Command line interface for the `chunkwire` binary.
//!
//! Each subcommand opens one session role. The definitions are also used by
//! the build script to render the manual page.

use std::{net::SocketAddr, path::PathBuf};

use clap::{Args, Parser, Subcommand};

/// Command line arguments for the `chunkwire` binary.
#[derive(Debug, Parser)]
#[command(
    name = "chunkwire",
    version,
    about = "Send and receive chunked point-cloud messages"
)]
pub struct Cli {
    /// Serve Prometheus metrics on this address.
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
    #[command(subcommand)]
    pub command: Command,
}

/// Session role to run.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream synthetic point clouds to a TCP receiver.
    SendTcp(TcpSendArgs),
    /// Accept one TCP sender and print received messages.
    ReceiveTcp(TcpReceiveArgs),
    /// Send synthetic point clouds to a local socket.
    SendLocal(LocalSendArgs),
    /// Receive messages on a local socket.
    ReceiveLocal(LocalReceiveArgs),
}

/// Shape and pacing of the synthetic point clouds.
#[derive(Debug, Args)]
pub struct GridArgs {
    /// Distance between neighbouring points.
    #[arg(long, default_value_t = 0.1)]
    pub step: f32,
    /// Extent of the grid along its first axis.
    #[arg(long, default_value_t = 4.0)]
    pub width: f32,
    /// Extent of the grid along its second axis.
    #[arg(long, default_value_t = 6.0)]
    pub height: f32,
    /// Pause between messages, in milliseconds.
    #[arg(long, default_value_t = 330)]
    pub interval_ms: u64,
    /// Stop after this many messages.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Debug, Args)]
pub struct TcpSendArgs {
    /// Receiver host name or address.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    /// Receiver port.
    #[arg(short, long)]
    pub port: u16,
    /// Packet size in bytes, header included.
    #[arg(long, default_value_t = 14_600)]
    pub mtu: usize,
    #[command(flatten)]
    pub grid: GridArgs,
}

#[derive(Debug, Args)]
pub struct TcpReceiveArgs {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,
    /// Port to listen on.
    #[arg(short, long)]
    pub port: u16,
    /// Packet size in bytes, header included.
    #[arg(long, default_value_t = 14_600)]
    pub mtu: usize,
    /// In-flight messages kept before the registry is cleared.
    #[arg(long, default_value_t = 10)]
    pub max_entries: usize,
    /// Seconds without data before a failing connection is reset.
    #[arg(long, default_value_t = 2)]
    pub watchdog_secs: u64,
}

#[derive(Debug, Args)]
pub struct LocalSendArgs {
    /// Receiver socket path.
    #[arg(long)]
    pub server: PathBuf,
    /// Socket path this sender binds.
    #[arg(long)]
    pub client: PathBuf,
    /// Packet size in bytes, header included.
    #[arg(long, default_value_t = 65_536)]
    pub mtu: usize,
    #[command(flatten)]
    pub grid: GridArgs,
}

#[derive(Debug, Args)]
pub struct LocalReceiveArgs {
    /// Socket path to bind.
    #[arg(long)]
    pub server: PathBuf,
    /// Packet size in bytes, header included.
    #[arg(long, default_value_t = 65_536)]
    pub mtu: usize,
    /// In-flight messages kept before the registry is cleared.
    #[arg(long, default_value_t = 10)]
    pub max_entries: usize,
}
