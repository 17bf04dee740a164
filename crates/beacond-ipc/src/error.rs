//! IPC client error types

use thiserror::Error;

/// Errors arising from the Discord IPC client.
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload too large: {size} bytes (max {max})", max = crate::frame::MAX_PAYLOAD_SIZE)]
    PayloadTooLarge { size: usize },

    #[error("presence service IPC not available")]
    NotAvailable,

    #[error("not connected")]
    NotConnected,

    #[error("unexpected handshake response opcode: {0}")]
    UnexpectedOpcode(u32),

    #[error("handshake rejected: {message}")]
    HandshakeRejected { message: String },

    #[error("timed out waiting for handshake response")]
    HandshakeTimeout,
}
