//! Discord IPC named-pipe discovery for Windows.
//!
//! The service listens on `\\.\pipe\discord-ipc-N` for slots 0-9; the
//! first pipe that opens wins.

use tokio::net::windows::named_pipe::{ClientOptions, NamedPipeClient};

use crate::error::IpcError;

/// The connection type used on this platform.
pub type Endpoint = NamedPipeClient;

/// Number of IPC pipe slots the service may listen on (0-9).
const MAX_IPC_SLOTS: u32 = 10;

/// Tries each candidate pipe and returns the first successful connection.
pub async fn connect_endpoint() -> Result<Endpoint, IpcError> {
    for i in 0..MAX_IPC_SLOTS {
        let name = format!(r"\\.\pipe\discord-ipc-{i}");
        if let Ok(pipe) = ClientOptions::new().open(&name) {
            return Ok(pipe);
        }
    }
    Err(IpcError::NotAvailable)
}
