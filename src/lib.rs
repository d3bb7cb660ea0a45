#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::empty_docs,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::missing_safety_doc
)]

//! WebSocket (RFC 6455) message reassembly.
//!
//! [`MessageAssembler`] is the core: it takes the frames of one message in
//! arrival order, enforces the fragmentation rules and exposes the
//! reassembled payload. [`MessageReader`] and [`recv_loop`] wrap it with a
//! frame decoder to read whole connections.

mod config;
mod error;
pub mod frames;
mod protocol;
pub mod role;
mod ws;

pub use config::Config;
pub use error::{CloseReason, MessageError, ProtocolViolation};
pub use protocol::{Completion, Frames, MessageAssembler};
pub use ws::{Event, Message, MessageReader, recv_loop};

pub(crate) const MAX_FRAME_PAYLOAD: usize = 32 * 1024;
pub(crate) const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
