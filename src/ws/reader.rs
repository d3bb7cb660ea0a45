use std::mem;

use crate::{
    CloseReason, Config, MessageAssembler,
    frames::{DecodedFrame, FrameDecoder, FrameParseError, FrameState, Opcode},
    role::{self, RolePolicy},
    ws::{Event, Message},
};

/// Read side of one connection: turns raw bytes into [`Event`]s.
///
/// Control frames are reported as soon as they are decoded, even in the
/// middle of a fragmented message. Data frames are handed to a
/// [`MessageAssembler`], which is replaced by a fresh one each time a
/// message completes.
pub struct MessageReader<R: RolePolicy> {
    decoder: FrameDecoder<R>,
    message: MessageAssembler<DecodedFrame>,
    config: Config,
}

impl<R: RolePolicy> MessageReader<R> {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            decoder: FrameDecoder::new(&config),
            message: MessageAssembler::new(),
            config,
        }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) { self.decoder.push_bytes(bytes); }

    /// The message currently being reassembled.
    #[must_use]
    pub fn pending(&self) -> &MessageAssembler<DecodedFrame> { &self.message }

    /// Next event that the buffered bytes complete, or `Ok(None)` if more
    /// bytes are needed.
    ///
    /// After an `Err` the stream is unusable; the caller must close the
    /// connection with the returned reason.
    pub fn next_event(&mut self) -> Result<Option<Event>, CloseReason> {
        loop {
            let frame = match self.decoder.next_frame() {
                Ok(Some(FrameState::Complete(frame))) => frame,
                // break to read more bytes
                Ok(Some(FrameState::Incomplete) | None) => return Ok(None),
                Err(FrameParseError::ProtoError) => return Err(CloseReason::ProtoError),
                Err(FrameParseError::SizeErr) => return Err(CloseReason::TooBig),
            };

            if let Some(event) = self.handle_frame(frame)? {
                return Ok(Some(event));
            }
        }
    }

    fn handle_frame(&mut self, frame: DecodedFrame) -> Result<Option<Event>, CloseReason> {
        match frame.opcode {
            Opcode::Ping => {
                tracing::debug!("received PING");
                Ok(Some(Event::Ping(frame.payload)))
            }
            Opcode::Pong => {
                tracing::debug!("received PONG");
                Ok(Some(Event::Pong(frame.payload)))
            }
            Opcode::Close => Ok(Some(close_event(&frame))),
            Opcode::Text | Opcode::Bin | Opcode::Cont => self.handle_message(frame),
            Opcode::Reserved(_) => Err(CloseReason::ProtoError),
        }
    }

    // Build message out of frames
    fn handle_message(&mut self, frame: DecodedFrame) -> Result<Option<Event>, CloseReason> {
        tracing::trace!(
            held = self.message.count(),
            opcode = ?frame.opcode,
            role = role::label::<R>(),
            "handling message"
        );

        self.message
            .add_frame(frame)
            .map_err(|violation| violation.close_reason())?;

        let len = self.message.payload_len();
        if len > self.config.max_message_size {
            tracing::warn!(
                len,
                max = self.config.max_message_size,
                "message exceeded maximum size"
            );
            return Err(CloseReason::TooBig);
        }

        if !self.message.is_coalesced() {
            return Ok(None);
        }

        let done = mem::take(&mut self.message);
        let payload = done.payload().map_err(|e| {
            tracing::warn!(error = %e, "coalesced message without payload");
            CloseReason::Unexpected
        })?;

        let msg = if done.is_binary() {
            Message::Binary(payload.to_vec())
        } else {
            // if invalid UTF-8 immediately close connection
            let text = String::from_utf8(payload.to_vec()).map_err(|_| {
                tracing::warn!("invalid UTF-8 in text message");
                CloseReason::DataError
            })?;
            Message::Text(text)
        };
        tracing::debug!(
            binary = done.is_binary(),
            frames = done.count(),
            total_len = msg.len(),
            "message assembly complete"
        );
        Ok(Some(Event::Message(msg)))
    }
}

fn close_event(frame: &DecodedFrame) -> Event {
    // the decoder only lets through empty or well-formed close payloads
    let (reason, text) = match frame.payload.as_ref() {
        [hi, lo, text @ ..] => (
            Some(CloseReason::from([*hi, *lo])),
            String::from_utf8_lossy(text).into_owned(),
        ),
        _ => (None, String::new()),
    };
    tracing::info!(reason = ?reason, "received Close frame");
    Event::Close { reason, text }
}
