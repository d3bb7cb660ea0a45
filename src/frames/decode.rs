use std::marker::PhantomData;

use bytes::BytesMut;

use super::{DecodedFrame, Opcode};
use crate::{Config, role::RolePolicy};

type Result<T> = std::result::Result<T, FrameParseError>;

#[derive(Debug)]
pub enum FrameState {
    Complete(DecodedFrame),
    Incomplete,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameParseError {
    ProtoError,
    SizeErr,
}

/// Splits whole frames off the front of a byte buffer, one direction of a
/// connection.
///
/// A frame is only taken once all of its bytes are buffered, so every
/// [`DecodedFrame`] handed out is coalesced and keeps its exact wire bytes.
pub struct FrameDecoder<P: RolePolicy> {
    buf: BytesMut,
    max_payload: usize,
    _p: PhantomData<P>,
}

#[derive(Debug)]
struct Header {
    is_fin: bool,
    opcode: Opcode,
    mask_key: Option<[u8; 4]>,
    /// Bytes before the payload, mask key included.
    len: usize,
    payload_len: usize,
}

impl<P: RolePolicy> FrameDecoder<P> {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            buf: BytesMut::new(),
            max_payload: config.max_frame_payload,
            _p: PhantomData,
        }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) { self.buf.extend_from_slice(bytes); }

    /// Bytes received but not yet consumed by a frame.
    #[must_use]
    pub fn buffered(&self) -> usize { self.buf.len() }

    /// `Ok(None)` means the buffer ran dry between frames, `Incomplete`
    /// that a frame has started but not all of its bytes are here yet.
    pub fn next_frame(&mut self) -> Result<Option<FrameState>> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let Some(header) = self.peek_header()? else {
            return Ok(Some(FrameState::Incomplete));
        };
        if self.buf.len() < header.len + header.payload_len {
            tracing::trace!(
                buffered = self.buf.len(),
                need = header.len + header.payload_len,
                "waiting for frame bytes"
            );
            return Ok(Some(FrameState::Incomplete));
        }

        let raw = self.buf.split_to(header.len + header.payload_len).freeze();
        let payload = match header.mask_key {
            Some(key) => {
                let mut payload = BytesMut::from(&raw[header.len..]);
                crate::protocol::mask(&mut payload, key);
                payload.freeze()
            }
            None => raw.slice(header.len..),
        };

        if header.opcode == Opcode::Close && !is_valid_close_payload(&payload) {
            tracing::warn!("invalid close payload");
            return Err(FrameParseError::ProtoError);
        }

        tracing::trace!(
            opcode = ?header.opcode,
            fin = header.is_fin,
            payload_len = payload.len(),
            raw_len = raw.len(),
            "frame decoded"
        );
        Ok(Some(FrameState::Complete(DecodedFrame {
            opcode: header.opcode,
            payload,
            raw,
            is_fin: header.is_fin,
        })))
    }

    // Validates the header without consuming it; `None` until it is all here.
    fn peek_header(&mut self) -> Result<Option<Header>> {
        let (b0, b1) = match self.buf[..] {
            [b0, b1, ..] => (b0, b1),
            _ => return Ok(None),
        };

        // 0   | 1 2 3 | 4 5 6 7
        // Fin | Rsv   | Opcode
        // no extensions are negotiated so every RSV bit must be clear
        if b0 & 0b0111_0000 > 0 {
            tracing::warn!("invalid RSV bits");
            return Err(FrameParseError::ProtoError);
        }
        let opcode = match Opcode::try_from(b0 & 0b1111) {
            Ok(op) if !op.is_reserved() => op,
            _ => {
                tracing::warn!(opcode = b0 & 0b1111, "invalid opcode");
                return Err(FrameParseError::ProtoError);
            }
        };
        let is_fin = b0 & 0b1000_0000 > 0;

        // 0    | 1 2 3 4 5 6 7
        // Mask | Payload len
        let masked = b1 & 0b1000_0000 > 0;
        // Servers must NOT mask message
        if P::SERVER != masked {
            tracing::warn!(masked, "message mask violates policy");
            return Err(FrameParseError::ProtoError);
        }

        let short_len = b1 & 0b0111_1111;
        // control frames must be FIN and max 125B payload
        if opcode.is_control() && (!is_fin || short_len > 125) {
            tracing::warn!(opcode = ?opcode, "invalid control frame received");
            return Err(FrameParseError::ProtoError);
        }

        let (payload_len, mut len) = match short_len {
            126 => match self.buf.get(2..4) {
                Some(&[hi, lo]) => (usize::from(u16::from_be_bytes([hi, lo])), 4),
                _ => return Ok(None),
            },
            127 => {
                let Some(Ok(bytes)) = self.buf.get(2..10).map(<[u8; 8]>::try_from) else {
                    return Ok(None);
                };
                let len = usize::try_from(u64::from_be_bytes(bytes)).map_err(|_| {
                    tracing::warn!("frame exceeded maximum size");
                    FrameParseError::SizeErr
                })?;
                (len, 10)
            }
            n => (usize::from(n), 2),
        };

        if payload_len > self.max_payload {
            tracing::warn!(
                len = payload_len,
                max = self.max_payload,
                "payload larger than maximum size"
            );
            self.buf.clear();
            return Err(FrameParseError::SizeErr);
        }

        let mask_key = if masked {
            let Some(Ok(key)) = self.buf.get(len..len + 4).map(<[u8; 4]>::try_from) else {
                return Ok(None);
            };
            len += 4;
            Some(key)
        } else {
            None
        };

        Ok(Some(Header {
            is_fin,
            opcode,
            mask_key,
            len,
            payload_len,
        }))
    }
}

fn is_valid_close_payload(bytes: &[u8]) -> bool {
    match bytes.len() {
        0 => true,
        1 => false,
        _ => {
            let code = u16::from_be_bytes([bytes[0], bytes[1]]);
            matches!(code, 1000..=1003 | 1007..=1011 | 3000..=4999)
                && std::str::from_utf8(&bytes[2..]).is_ok()
        }
    }
}
