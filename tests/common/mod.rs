//! Shared utilities for integration tests.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::{path::PathBuf, time::Duration};

use chunkwire::session::{ConnectionSession, Received, SessionError};

/// Poll timeout used by integration sessions.
pub const POLL: Duration = Duration::from_millis(200);

/// A socket path under the temporary directory unique to this process.
pub fn socket_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("chunkwire-{}-{name}.sock", std::process::id()))
}

/// Receive until a message completes, returning its header index and bytes.
///
/// Gives up after `attempts` receives.
pub async fn next_message(
    session: &mut ConnectionSession,
    attempts: usize,
) -> Result<Option<(u64, Vec<u8>)>, SessionError> {
    for _ in 0..attempts {
        if let Received::Ready(message) = session.receive().await? {
            let index = message.header().index();
            let data = message.take().map(chunkwire::ReassemblyBuffer::into_data);
            return Ok(data.map(|data| (index, data)));
        }
    }
    Ok(None)
}
