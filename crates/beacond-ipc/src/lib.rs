//! # beacond-ipc - Presence Service IPC Client
//!
//! Client for Discord's local IPC endpoint (a Unix domain socket or a
//! Windows named pipe, never a network socket). Provides:
//!
//! - [`frame`] - the length-prefixed binary frame codec shared by both
//!   directions of the protocol
//! - [`Client`] - connection lifecycle: endpoint discovery, handshake,
//!   `SET_ACTIVITY` commands, best-effort clear on close
//! - Platform endpoint discovery, selected at build time: one
//!   implementation per OS behind a single `connect_endpoint()` entry
//!   point (`conn_unix` / `conn_windows`)

pub mod client;
pub mod error;
pub mod frame;

#[cfg(unix)]
#[path = "conn_unix.rs"]
mod conn;

#[cfg(windows)]
#[path = "conn_windows.rs"]
mod conn;

pub use client::{Activity, Assets, Button, Client, Timestamps};
pub use error::IpcError;
pub use frame::{
    decode_frame, encode_frame, MAX_PAYLOAD_SIZE, OP_CLOSE, OP_FRAME, OP_HANDSHAKE,
};
