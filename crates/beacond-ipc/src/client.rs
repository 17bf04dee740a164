//! Connection lifecycle and command framing for the Discord IPC client.
//!
//! [`Client`] owns the endpoint handle and a strictly increasing request
//! nonce behind one mutex: the daemon loop may trigger a reconnect while a
//! shutdown path issues its best-effort clear, and both must not interleave
//! writes on the same stream.

use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

use crate::conn::{connect_endpoint, Endpoint};
use crate::error::IpcError;
use crate::frame::{decode_frame, encode_frame, OP_FRAME, OP_HANDSHAKE};

/// How long to wait for the handshake response frame.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

// ─────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────

fn is_zero(n: &i64) -> bool {
    *n == 0
}

/// Start timestamp for an activity's elapsed timer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Timestamps {
    #[serde(skip_serializing_if = "is_zero")]
    pub start: i64,
}

/// Image keys and tooltip text for an activity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Assets {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub large_image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub large_text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub small_image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub small_text: String,
}

/// A clickable button in an activity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Button {
    pub label: String,
    pub url: String,
}

/// A Rich Presence activity as transmitted on the wire.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Activity {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub details: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Timestamps>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<Assets>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

// ─────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────

/// Connection state: the endpoint handle plus the per-connection nonce.
#[derive(Default)]
struct Connection {
    endpoint: Option<Endpoint>,
    nonce: u64,
}

/// A client for the presence service's local IPC endpoint.
pub struct Client {
    /// Application (OAuth2 client) identifier sent in the handshake.
    app_id: String,
    inner: Mutex<Connection>,
}

impl Client {
    /// Creates a client for the given application ID. No connection is
    /// attempted until [`Client::connect`].
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            inner: Mutex::new(Connection::default()),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Discovers the service endpoint and performs the handshake.
    /// Any previous connection is dropped first, so this doubles as the
    /// reconnect path.
    pub async fn connect(&self) -> Result<(), IpcError> {
        let mut conn = self.inner.lock().await;
        conn.endpoint = None;

        let mut endpoint = connect_endpoint().await?;
        match self.handshake(&mut endpoint).await {
            Ok(()) => {
                conn.endpoint = Some(endpoint);
                conn.nonce = 0;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Sends the opcode-0 handshake and validates the response frame.
    async fn handshake(&self, endpoint: &mut Endpoint) -> Result<(), IpcError> {
        let payload = serde_json::to_vec(&json!({
            "v": 1,
            "client_id": self.app_id,
        }))?;
        let frame = encode_frame(OP_HANDSHAKE, &payload)?;
        endpoint.write_all(&frame).await?;

        let (opcode, response) = timeout(HANDSHAKE_TIMEOUT, decode_frame(endpoint))
            .await
            .map_err(|_| IpcError::HandshakeTimeout)??;
        if opcode != OP_FRAME {
            return Err(IpcError::UnexpectedOpcode(opcode));
        }

        let response: serde_json::Value = serde_json::from_slice(&response)?;
        if response.get("evt").and_then(|v| v.as_str()) == Some("ERROR") {
            let message = response
                .pointer("/data/message")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error")
                .to_string();
            return Err(IpcError::HandshakeRejected { message });
        }

        Ok(())
    }

    /// Publishes an activity. `None` clears the presence.
    pub async fn set_activity(&self, activity: Option<&Activity>) -> Result<(), IpcError> {
        let mut conn = self.inner.lock().await;
        send_command(
            &mut conn,
            "SET_ACTIVITY",
            json!({
                "pid": std::process::id(),
                "activity": activity,
            }),
        )
        .await
    }

    /// Clears the presence.
    pub async fn clear_activity(&self) -> Result<(), IpcError> {
        self.set_activity(None).await
    }

    /// Best-effort clears the presence, then releases the endpoint.
    pub async fn close(&self) {
        let mut conn = self.inner.lock().await;
        if conn.endpoint.is_none() {
            return;
        }
        let clear = json!({
            "pid": std::process::id(),
            "activity": serde_json::Value::Null,
        });
        if let Err(e) = send_command(&mut conn, "SET_ACTIVITY", clear).await {
            debug!("clear on close failed: {e}");
        }
        conn.endpoint = None;
    }

    /// Reports whether the client currently holds a connection.
    pub async fn connected(&self) -> bool {
        self.inner.lock().await.endpoint.is_some()
    }
}

/// Encodes `{cmd, args, nonce}` as an opcode-1 frame and writes it.
/// Fire-and-forget: no response is awaited.
async fn send_command(
    conn: &mut Connection,
    cmd: &str,
    args: serde_json::Value,
) -> Result<(), IpcError> {
    let Some(endpoint) = conn.endpoint.as_mut() else {
        return Err(IpcError::NotConnected);
    };

    conn.nonce += 1;
    let payload = serde_json::to_vec(&json!({
        "cmd": cmd,
        "args": args,
        "nonce": conn.nonce.to_string(),
    }))?;

    let frame = encode_frame(OP_FRAME, &payload)?;
    match endpoint.write_all(&frame).await {
        Ok(()) => Ok(()),
        Err(e) => {
            // A failed write leaves the stream in an unknown state.
            conn.endpoint = None;
            Err(IpcError::Io(e))
        }
    }
}
