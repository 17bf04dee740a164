//! End-to-end smoke test for the IPC client against a fake presence
//! service listening on a Unix socket.
//!
//! The endpoint discovery honors `$XDG_RUNTIME_DIR`, so the fake service
//! binds `discord-ipc-0` inside a temp dir and the client finds it through
//! the normal candidate scan. Scenarios share one test function because
//! they mutate the process environment.

#![cfg(unix)]

use serde_json::{json, Value};
use tokio::net::{UnixListener, UnixStream};

use beacond_ipc::{
    decode_frame, encode_frame, Activity, Client, IpcError, Timestamps, OP_FRAME, OP_HANDSHAKE,
};

async fn respond_handshake(stream: &mut UnixStream, response: Value) -> Value {
    let (opcode, payload) = decode_frame(stream).await.unwrap();
    assert_eq!(opcode, OP_HANDSHAKE);
    let handshake: Value = serde_json::from_slice(&payload).unwrap();

    let body = serde_json::to_vec(&response).unwrap();
    let frame = encode_frame(OP_FRAME, &body).unwrap();
    tokio::io::AsyncWriteExt::write_all(stream, &frame)
        .await
        .unwrap();

    handshake
}

#[tokio::test]
async fn ipc_client_handshake_commands_and_close() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("XDG_RUNTIME_DIR", dir.path());

    // ── Scenario 1: successful handshake, command framing, clear-on-close.
    let listener = UnixListener::bind(dir.path().join("discord-ipc-0")).unwrap();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let handshake = respond_handshake(
            &mut stream,
            json!({"evt": "READY", "data": {"v": 1}}),
        )
        .await;
        assert_eq!(handshake["v"], 1);
        assert_eq!(handshake["client_id"], "990011");

        // First command: the published activity.
        let (opcode, payload) = decode_frame(&mut stream).await.unwrap();
        assert_eq!(opcode, OP_FRAME);
        let cmd: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(cmd["cmd"], "SET_ACTIVITY");
        assert_eq!(cmd["nonce"], "1");
        assert_eq!(cmd["args"]["activity"]["details"], "Working on: demo");
        assert!(cmd["args"]["pid"].as_i64().unwrap() > 0);

        // Second command: the best-effort clear issued by close().
        let (_, payload) = decode_frame(&mut stream).await.unwrap();
        let cmd: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(cmd["cmd"], "SET_ACTIVITY");
        assert_eq!(cmd["nonce"], "2");
        assert!(cmd["args"]["activity"].is_null());
    });

    let client = Client::new("990011");
    client.connect().await.unwrap();
    assert!(client.connected().await);

    let activity = Activity {
        details: "Working on: demo".to_string(),
        timestamps: Some(Timestamps { start: 1700000000 }),
        ..Activity::default()
    };
    client.set_activity(Some(&activity)).await.unwrap();
    client.close().await;
    assert!(!client.connected().await);

    server.await.unwrap();

    // ── Scenario 2: the service answers the handshake with an error event.
    std::fs::remove_file(dir.path().join("discord-ipc-0")).unwrap();
    let listener = UnixListener::bind(dir.path().join("discord-ipc-0")).unwrap();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        respond_handshake(
            &mut stream,
            json!({"evt": "ERROR", "data": {"message": "invalid client id"}}),
        )
        .await;
    });

    let client = Client::new("990011");
    let err = client.connect().await.unwrap_err();
    match err {
        IpcError::HandshakeRejected { message } => assert_eq!(message, "invalid client id"),
        other => panic!("expected HandshakeRejected, got {other:?}"),
    }
    assert!(!client.connected().await);
    server.await.unwrap();

    // ── Scenario 3: no endpoint anywhere.
    std::fs::remove_file(dir.path().join("discord-ipc-0")).unwrap();
    let client = Client::new("990011");
    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, IpcError::NotAvailable));
}
