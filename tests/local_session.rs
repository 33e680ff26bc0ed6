//! End-to-end sessions over named local sockets.

use std::time::Duration;

use chunkwire::session::{ConnectionSession, Role, SessionConfig};
use chunkwire_testing::filled_point_cloud;

mod common;

use common::{POLL, next_message, socket_path};

const MTU: usize = 1024;

async fn open_pair(tag: &str) -> (ConnectionSession, ConnectionSession) {
    let server = socket_path(&format!("{tag}-server"));
    let client = socket_path(&format!("{tag}-client"));
    let receiver = ConnectionSession::open(
        SessionConfig::new(Role::LocalReceiver)
            .with_server_name(server.to_string_lossy())
            .with_mtu(MTU)
            .with_poll_timeout(POLL),
    )
    .await
    .expect("bind receiver");
    let sender = ConnectionSession::open(
        SessionConfig::new(Role::LocalSender)
            .with_server_name(server.to_string_lossy())
            .with_client_name(client.to_string_lossy())
            .with_mtu(MTU),
    )
    .await
    .expect("bind sender");
    (sender, receiver)
}

#[tokio::test]
async fn messages_cross_a_local_link_intact() {
    let (mut sender, mut receiver) = open_pair("roundtrip").await;

    for index in 1..=3 {
        let buffer = filled_point_cloud(index, 150, MTU);
        assert_eq!(buffer.chunks_count(), 2);
        sender.send(&buffer).await.expect("send");

        let (received_index, data) = next_message(&mut receiver, 8)
            .await
            .expect("receive")
            .expect("message completes");
        assert_eq!(received_index, index);
        assert_eq!(data, buffer.data());
    }
    assert_eq!(receiver.failures(), 0);
}

#[tokio::test]
async fn closing_sessions_removes_socket_files() {
    let (sender, receiver) = open_pair("cleanup").await;
    let server = socket_path("cleanup-server");
    let client = socket_path("cleanup-client");
    assert!(server.exists());
    assert!(client.exists());

    sender.close();
    receiver.close();
    assert!(!server.exists());
    assert!(!client.exists());
}

#[tokio::test]
async fn receiver_rebinds_over_a_stale_socket_file() {
    let server = socket_path("stale-server");
    std::fs::write(&server, b"").expect("create stale file");

    let config = SessionConfig::new(Role::LocalReceiver)
        .with_server_name(server.to_string_lossy())
        .with_poll_timeout(Duration::from_millis(10));
    let receiver = ConnectionSession::open(config).await.expect("bind receiver");
    receiver.close();
    assert!(!server.exists());
}
