use bytes::Bytes;

use crate::CloseReason;

/// Assembled messages received from an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Valid UTF-8 message.
    Text(String),
    /// Binary message bytes.
    Binary(Vec<u8>),
}

impl Message {
    /// If the type is `Message::Text`, returns a reference to the internal `String`, otherwise
    /// `None`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Message::Binary(..) => None,
            Message::Text(s) => Some(s),
        }
    }

    /// Returns a reference to the data as bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Message::Binary(b) => b,
            Message::Text(s) => s.as_bytes(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize { self.as_bytes().len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Everything a connection's read side can report to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A complete data message.
    Message(Message),
    /// Peer sent a PING with this payload; the owner should answer with a PONG.
    Ping(Bytes),
    Pong(Bytes),
    /// Peer started the closing handshake.
    Close {
        /// `None` when the close frame carried no status code.
        reason: Option<CloseReason>,
        text: String,
    },
    /// The peer broke the protocol. The owner must close with this reason and
    /// stop reading.
    Error(CloseReason),
    /// The byte stream ended.
    Closed,
}
