use bytes::Bytes;

use super::Opcode;

/// Value of a frame accessor that depends on the frame's own bytes having
/// been buffered.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Buffered<T> {
    Ready(T),
    /// The frame is still receiving bytes at the bit level.
    Pending,
}

impl<T> Buffered<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(v) => Some(v),
            Self::Pending => None,
        }
    }
}

/// A single parsed WebSocket frame as seen by message reassembly.
///
/// Implementors own header decoding, unmasking and buffering of their own
/// payload; [`MessageAssembler`](crate::MessageAssembler) only reads them.
pub trait Frame {
    fn opcode(&self) -> Opcode;

    /// The FIN bit.
    fn is_final(&self) -> bool;

    /// Whether all of this frame's payload bytes have arrived.
    fn is_coalesced(&self) -> bool;

    /// Decoded (unmasked) application payload.
    fn payload(&self) -> Buffered<&[u8]>;

    fn payload_len(&self) -> Buffered<usize>;

    /// The frame's encoded representation as it appeared on the wire.
    fn contents(&self) -> &[u8];
}

/// Frame that has been fully read off the wire by
/// [`FrameDecoder`](super::FrameDecoder).
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub(crate) opcode: Opcode,
    pub(crate) payload: Bytes,
    pub(crate) raw: Bytes,
    pub(crate) is_fin: bool,
}

impl DecodedFrame {
    /// Unmasked payload as a shared buffer.
    #[must_use]
    pub fn payload_bytes(&self) -> &Bytes { &self.payload }
}

impl Frame for DecodedFrame {
    fn opcode(&self) -> Opcode { self.opcode }

    fn is_final(&self) -> bool { self.is_fin }

    fn is_coalesced(&self) -> bool { true }

    fn payload(&self) -> Buffered<&[u8]> { Buffered::Ready(&self.payload) }

    fn payload_len(&self) -> Buffered<usize> { Buffered::Ready(self.payload.len()) }

    fn contents(&self) -> &[u8] { &self.raw }
}
