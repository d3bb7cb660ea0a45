mod event;
mod reader;
mod recv_loop;

pub use event::{Event, Message};
pub use reader::MessageReader;
pub use recv_loop::recv_loop;
