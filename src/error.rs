use thiserror::Error;

/// A fatal condition raised by the virtual machine. Every fault ends the
/// session; the step that raised it leaves the machine untouched.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    #[error("invalid opcode 0x{opcode:04x}")]
    InvalidOpcode { opcode: u16 },

    #[error("no font glyph for value 0x{value:02x}")]
    InvalidGlyphIndex { value: u8 },

    #[error("no key with index 0x{value:02x}")]
    InvalidKey { value: u8 },

    #[error("call stack overflow (depth limit reached)")]
    StackOverflow,

    #[error("return with an empty call stack")]
    StackUnderflow,

    #[error("memory access out of bounds (0x{addr:04x}, {len} bytes)")]
    MemoryOutOfBounds { addr: u16, len: usize },

    #[error("program is {size} bytes, at most {max} fit in memory")]
    ProgramTooLarge { size: usize, max: usize },
}
