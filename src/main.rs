//! Demo binary: send synthetic point clouds or print received messages.

mod cli;

use std::{
    error::Error,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use chunkwire::{
    grid::PointGrid,
    session::{ConnectionSession, Role, SessionConfig},
};
use clap::Parser;
use cli::{Cli, Command, GridArgs};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Some(addr) = cli.metrics_addr {
        install_metrics_exporter(addr)?;
    }

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("stopping");
            ctrl_c.cancel();
        }
    });

    match cli.command {
        Command::SendTcp(args) => {
            let config = SessionConfig::new(Role::StreamSender)
                .with_server_name(args.host)
                .with_port(args.port)
                .with_mtu(args.mtu);
            send(config, &args.grid, &token).await?;
        }
        Command::SendLocal(args) => {
            let config = SessionConfig::new(Role::LocalSender)
                .with_server_name(args.server.to_string_lossy())
                .with_client_name(args.client.to_string_lossy())
                .with_mtu(args.mtu);
            send(config, &args.grid, &token).await?;
        }
        Command::ReceiveTcp(args) => {
            let config = SessionConfig::new(Role::StreamReceiver)
                .with_server_name(args.bind)
                .with_port(args.port)
                .with_mtu(args.mtu)
                .with_max_entries(args.max_entries)
                .with_watchdog_timeout(Duration::from_secs(args.watchdog_secs));
            receive(config, &token).await?;
        }
        Command::ReceiveLocal(args) => {
            let config = SessionConfig::new(Role::LocalReceiver)
                .with_server_name(args.server.to_string_lossy())
                .with_mtu(args.mtu)
                .with_max_entries(args.max_entries);
            receive(config, &token).await?;
        }
    }
    Ok(())
}

#[expect(
    clippy::integer_division_remainder_used,
    reason = "tokio::select! expands to modulus internally"
)]
async fn send(
    config: SessionConfig,
    args: &GridArgs,
    token: &CancellationToken,
) -> Result<(), Box<dyn Error>> {
    let mut session = ConnectionSession::open(config).await?;
    let mtu = session.config().mtu();
    let grid = PointGrid {
        step: args.step,
        width: args.width,
        height: args.height,
    };
    info!(points = grid.point_count(), "sending point clouds");

    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
    let mut index = 0_u64;
    while args.count.is_none_or(|count| index < count) {
        tokio::select! {
            biased;

            () = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let buffer = grid.compose(index, timestamp_ns(), mtu)?;
        match session.send(&buffer).await {
            Ok(()) => info!(index, chunks = buffer.chunks_count(), "message sent"),
            Err(err) => warn!(index, error = %err, "message failed to send"),
        }
        index += 1;
    }
    info!(sent = index, failures = session.failures(), "sender finished");
    session.close();
    Ok(())
}

async fn receive(config: SessionConfig, token: &CancellationToken) -> Result<(), Box<dyn Error>> {
    let mut session = ConnectionSession::open(config).await?;
    let delivered = session
        .run_until_cancelled(token, |header, payload| {
            info!(
                index = header.index(),
                timestamp_ns = header.timestamp_ns(),
                bytes = payload.len(),
                "message received"
            );
        })
        .await?;
    info!(delivered, failures = session.failures(), "receiver finished");
    session.close();
    Ok(())
}

fn timestamp_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
}

#[cfg(feature = "metrics")]
fn install_metrics_exporter(addr: std::net::SocketAddr) -> Result<(), Box<dyn Error>> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    info!(%addr, "serving metrics");
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_metrics_exporter(addr: std::net::SocketAddr) -> Result<(), Box<dyn Error>> {
    warn!(%addr, "built without the metrics feature; exporter not started");
    Ok(())
}
