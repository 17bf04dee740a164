//! Binary frame codec for the Discord IPC protocol.
//!
//! Every message in both directions is one frame: an 8-byte little-endian
//! header (u32 opcode, u32 payload length) followed by exactly that many
//! payload bytes. The declared length is validated against
//! [`MAX_PAYLOAD_SIZE`] before any receive buffer is allocated, bounding
//! memory use against a misbehaving peer.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::IpcError;

/// Opcode for the initial IPC handshake.
pub const OP_HANDSHAKE: u32 = 0;
/// Opcode for a standard data frame.
pub const OP_FRAME: u32 = 1;
/// Opcode for a close notification.
pub const OP_CLOSE: u32 = 2;

/// Byte length of the frame header: 4-byte LE opcode + 4-byte LE length.
const FRAME_HEADER_SIZE: usize = 8;

/// Maximum allowed payload size (1 MiB).
pub const MAX_PAYLOAD_SIZE: usize = 1 << 20;

/// Builds a frame: `[4-byte LE opcode][4-byte LE length][payload]`.
pub fn encode_frame(opcode: u32, payload: &[u8]) -> Result<Vec<u8>, IpcError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(IpcError::PayloadTooLarge {
            size: payload.len(),
        });
    }
    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&opcode.to_le_bytes());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Reads a single frame from `reader`.
///
/// Short reads are absorbed by `read_exact`; they are not protocol
/// violations. Unknown opcodes are returned to the caller untouched, since
/// the command layer, not the framing layer, interprets payload semantics.
pub async fn decode_frame<R>(reader: &mut R) -> Result<(u32, Vec<u8>), IpcError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_SIZE];
    reader.read_exact(&mut header).await?;

    let opcode = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

    if length > MAX_PAYLOAD_SIZE {
        return Err(IpcError::PayloadTooLarge { size: length });
    }

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await?;

    Ok((opcode, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let payload = br#"{"v":1,"client_id":"12345"}"#;
        let frame = encode_frame(OP_HANDSHAKE, payload).unwrap();
        assert_eq!(frame.len(), FRAME_HEADER_SIZE + payload.len());

        let (opcode, decoded) = decode_frame(&mut frame.as_slice()).await.unwrap();
        assert_eq!(opcode, OP_HANDSHAKE);
        assert_eq!(decoded, payload);
    }

    #[tokio::test]
    async fn test_round_trip_empty_payload() {
        let frame = encode_frame(OP_CLOSE, b"").unwrap();
        let (opcode, decoded) = decode_frame(&mut frame.as_slice()).await.unwrap();
        assert_eq!(opcode, OP_CLOSE);
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_encode_header_layout() {
        let frame = encode_frame(OP_FRAME, b"abc").unwrap();
        assert_eq!(&frame[0..4], &1u32.to_le_bytes());
        assert_eq!(&frame[4..8], &3u32.to_le_bytes());
        assert_eq!(&frame[8..], b"abc");
    }

    #[test]
    fn test_encode_rejects_oversize() {
        let oversized = vec![0u8; MAX_PAYLOAD_SIZE + 1];
        let err = encode_frame(OP_FRAME, &oversized).unwrap_err();
        assert!(matches!(err, IpcError::PayloadTooLarge { .. }));
    }

    #[test]
    fn test_encode_accepts_exact_boundary() {
        let max = vec![0u8; MAX_PAYLOAD_SIZE];
        assert!(encode_frame(OP_FRAME, &max).is_ok());
    }

    #[tokio::test]
    async fn test_decode_rejects_oversize_before_allocating() {
        let mut frame = Vec::new();
        frame.extend_from_slice(&OP_FRAME.to_le_bytes());
        frame.extend_from_slice(&((MAX_PAYLOAD_SIZE as u32) + 1).to_le_bytes());

        let err = decode_frame(&mut frame.as_slice()).await.unwrap_err();
        assert!(matches!(err, IpcError::PayloadTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_decode_passes_through_unknown_opcode() {
        let frame = encode_frame(7, b"future").unwrap();
        let (opcode, payload) = decode_frame(&mut frame.as_slice()).await.unwrap();
        assert_eq!(opcode, 7);
        assert_eq!(payload, b"future");
    }

    #[tokio::test]
    async fn test_decode_truncated_stream_errors() {
        let frame = encode_frame(OP_FRAME, b"full payload").unwrap();
        let err = decode_frame(&mut &frame[..frame.len() - 3]).await.unwrap_err();
        assert!(matches!(err, IpcError::Io(_)));
    }

    #[tokio::test]
    async fn test_decode_multiple_sequential_frames() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&encode_frame(OP_HANDSHAKE, b"one").unwrap());
        stream.extend_from_slice(&encode_frame(OP_FRAME, b"two").unwrap());

        let mut reader = stream.as_slice();
        let (op1, p1) = decode_frame(&mut reader).await.unwrap();
        let (op2, p2) = decode_frame(&mut reader).await.unwrap();
        assert_eq!((op1, p1.as_slice()), (OP_HANDSHAKE, b"one".as_slice()));
        assert_eq!((op2, p2.as_slice()), (OP_FRAME, b"two".as_slice()));
    }
}
