use std::fmt;

/// Close reason codes as specified in
/// [RFC 6455](https://www.rfc-editor.org/rfc/rfc6455.html#section-7.4)
#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Normal close
    Normal = 1000,
    /// Going away
    GoingAway = 1001,
    /// Websocket protocol violation
    ProtoError = 1002,
    /// Unsupported data type
    DataType = 1003,
    /// Reserved code, should never be seen
    Rsv = 1004,
    /// No reason code provided
    NoneGiven = 1005,
    /// Abnormal closure
    Abnormal = 1006,
    /// Invalid UTF-8 in Text message
    DataError = 1007,
    /// Generic policy violation
    Policy = 1008,
    /// Messages are too big
    TooBig = 1009,
    /// Unsupported extensions
    Extension = 1010,
    /// An unexpected condition that prevented the request from being fulfilled
    Unexpected = 1011,
    /// TLS error
    Tls = 1015,
    /// Other valid codes with unknown meanings
    Unknown = 4000, // private use code
}

impl CloseReason {
    #[must_use]
    pub fn code(self) -> u16 { self as u16 }
}

/// Converts a reason code to bytes of the appropriate endianness.
impl From<CloseReason> for [u8; 2] {
    fn from(value: CloseReason) -> Self { value.code().to_be_bytes() }
}

impl From<u16> for CloseReason {
    fn from(code: u16) -> Self {
        match code {
            1000 => CloseReason::Normal,
            1001 => CloseReason::GoingAway,
            1002 => CloseReason::ProtoError,
            1003 => CloseReason::DataType,
            1004 => CloseReason::Rsv,
            1005 => CloseReason::NoneGiven,
            1006 => CloseReason::Abnormal,
            1007 => CloseReason::DataError,
            1008 => CloseReason::Policy,
            1009 => CloseReason::TooBig,
            1010 => CloseReason::Extension,
            1011 => CloseReason::Unexpected,
            1015 => CloseReason::Tls,
            _ => CloseReason::Unknown,
        }
    }
}

impl From<[u8; 2]> for CloseReason {
    fn from(bytes: [u8; 2]) -> Self { CloseReason::from(u16::from_be_bytes(bytes)) }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?} ({})", self.code())
    }
}

/// Frame sequences a message refuses to accept.
///
/// Every variant must be relayed to the peer as a
/// [`CloseReason::ProtoError`] close.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// A CONTINUATION frame arrived with no message to continue.
    UnexpectedContinuation,
    /// A TEXT/BINARY (or other non-continuation) frame arrived before the
    /// current message received its final fragment.
    UnfinishedMessage,
    /// A frame arrived after the message's final fragment.
    MessageComplete,
}

impl ProtocolViolation {
    #[must_use]
    pub fn close_reason(self) -> CloseReason { CloseReason::ProtoError }
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnexpectedContinuation => "continuation frame without a message to continue",
            Self::UnfinishedMessage => "new message started before the previous one finished",
            Self::MessageComplete => "frame received after the final fragment",
        })
    }
}

impl std::error::Error for ProtocolViolation {}

/// Local contract violations when reading a message. None of these are
/// sent to the peer; ordering faults are [`ProtocolViolation`]s instead.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// Payload requested before the final fragment was fully buffered.
    NotReady,
    /// Opcode requested before any frame was added.
    EmptyMessage,
    /// Indexed read past the end of the frame sequence.
    OutOfRange {
        /// The requested index.
        index: usize,
        /// Number of frames held.
        len: usize,
    },
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => f.write_str("message has not been put back together yet"),
            Self::EmptyMessage => f.write_str("no frames have been added to this message"),
            Self::OutOfRange { index, len } => {
                write!(f, "frame index {index} out of range for message of {len} frames")
            }
        }
    }
}

impl std::error::Error for MessageError {}
