use crate::{MAX_FRAME_PAYLOAD, MAX_MESSAGE_SIZE};

/// Size limits applied while reading frames and assembling messages.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    /// Largest payload a single frame may carry.
    pub max_frame_payload: usize,
    /// Largest payload a reassembled message may reach.
    pub max_message_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_frame_payload: MAX_FRAME_PAYLOAD,
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

impl Config {
    #[must_use]
    pub fn with_max_frame_payload(mut self, len: usize) -> Self {
        self.max_frame_payload = len;
        self
    }

    #[must_use]
    pub fn with_max_message_size(mut self, len: usize) -> Self {
        self.max_message_size = len;
        self
    }
}
