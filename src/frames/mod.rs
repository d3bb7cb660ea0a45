mod decode;
mod encode;
mod frame;
mod opcode;

pub use decode::{FrameDecoder, FrameParseError, FrameState};
pub use encode::{close_frame, encode_control, encode_data};
pub use frame::{Buffered, DecodedFrame, Frame};
pub use opcode::Opcode;
