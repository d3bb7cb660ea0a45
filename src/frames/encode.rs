use bytes::{BufMut, Bytes, BytesMut};

use super::Opcode;
use crate::{
    error::CloseReason,
    role::{self, RolePolicy},
};

/// Split `payload` into a TEXT/BINARY frame followed by CONTINUATION
/// frames of at most `max_frame_payload` bytes each. The last frame carries
/// FIN. An empty payload still produces one (empty, final) frame.
pub fn encode_data<R: RolePolicy>(
    payload: &[u8],
    opcode: Opcode,
    max_frame_payload: usize,
) -> Vec<Bytes> {
    let chunk_size = max_frame_payload.max(1);
    let mut frames = Vec::with_capacity(payload.len().div_ceil(chunk_size).max(1));
    let mut iter = payload.chunks(chunk_size).peekable();
    let role = role::label::<R>();

    if iter.peek().is_none() {
        frames.push(encode_frame::<R>(opcode, true, &[]));
    }

    let mut first = true;
    while let Some(chunk) = iter.next() {
        tracing::trace!(
            opcode = ?opcode,
            len = chunk.len(),
            "{role} encoding DATA"
        );

        let opcode = if first {
            first = false;
            opcode
        } else {
            Opcode::Cont
        };
        frames.push(encode_frame::<R>(opcode, iter.peek().is_none(), chunk));
    }

    tracing::debug!(
        len = payload.len(),
        frames = frames.len(),
        "{role} encoded DATA"
    );
    frames
}

/// Single PING, PONG or CLOSE frame. Payloads over 125 bytes are truncated.
pub fn encode_control<R: RolePolicy>(opcode: Opcode, payload: &[u8]) -> Bytes {
    debug_assert!(opcode.is_control());
    encode_frame::<R>(opcode, true, &payload[..payload.len().min(125)])
}

/// CLOSE frame carrying `reason` and as much of `text` as fits.
pub fn close_frame<R: RolePolicy>(reason: CloseReason, text: &str) -> Bytes {
    // limit text length to 123
    let mut len = text.len().min(123);
    while !text.is_char_boundary(len) {
        len -= 1;
    }

    let mut buf = BytesMut::with_capacity(2 + len);
    buf.extend_from_slice(&<[u8; 2]>::from(reason));
    buf.extend_from_slice(&text.as_bytes()[..len]);
    encode_control::<R>(Opcode::Close, &buf)
}

// sets Opcode, FIN, MASK and optionally masks payload
fn encode_frame<R: RolePolicy>(opcode: Opcode, fin: bool, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(payload.len() + 14);
    buf.put_u8(if fin { 0x80 } else { 0 } | opcode.as_u8());

    let mask_bit = if R::CLIENT { 0x80 } else { 0 };
    // push LEN
    #[allow(clippy::cast_possible_truncation)]
    match payload.len() {
        0..=125 => buf.put_u8(mask_bit | payload.len() as u8),
        126..=65535 => {
            buf.put_u8(mask_bit | 126);
            buf.put_u16(payload.len() as u16);
        }
        _ => {
            buf.put_u8(mask_bit | 127);
            buf.put_u64(payload.len() as u64);
        }
    }

    // Clients must SEND masked
    if R::CLIENT {
        let mut mask_key = [0u8; 4];
        rand::fill(&mut mask_key);
        buf.extend_from_slice(&mask_key);

        let start = buf.len();
        buf.extend_from_slice(payload);
        crate::protocol::mask(&mut buf[start..], mask_key);
    } else {
        buf.extend_from_slice(payload);
    }

    buf.freeze()
}
