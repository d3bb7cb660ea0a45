#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Opcode {
    Cont,
    Text,
    Bin,
    Close,
    Ping,
    Pong,
    /// 0x3-0x7 and 0xB-0xF, only meaningful with a negotiated extension.
    Reserved(u8),
}

impl Opcode {
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Cont => 0x0,
            Self::Text => 0x1,
            Self::Bin => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xA,
            Self::Reserved(b) => b,
        }
    }

    /// Control opcodes have the high bit of the nibble set.
    #[must_use]
    pub fn is_control(self) -> bool { self.as_u8() & 0x8 != 0 }

    #[must_use]
    pub fn is_reserved(self) -> bool { matches!(self, Self::Reserved(_)) }
}

impl TryFrom<u8> for Opcode {
    type Error = ();

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        Ok(match b {
            0x0 => Self::Cont,
            0x1 => Self::Text,
            0x2 => Self::Bin,
            0x8 => Self::Close,
            0x9 => Self::Ping,
            0xA => Self::Pong,
            0x3..=0x7 | 0xB..=0xF => Self::Reserved(b),
            _ => return Err(()),
        })
    }
}
