/// Result type for CHIP-8 CPU cycle execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chip8Result {
    /// Nothing observable outside the machine changed.
    Continue,
    /// The display grid changed and has to be presented again.
    Redraw,
    /// `Fx0A` found no key pressed and rewound the program counter,
    /// so the same instruction is issued again on the next cycle.
    AwaitingKey,
    /// The fetched word matches no instruction. Execution continues with
    /// the following word.
    Unrecognized { opcode: u16, address: u16 },
}

impl Chip8Result {
    pub fn is_dirty(self) -> bool {
        matches!(self, Chip8Result::Redraw)
    }
}

/// Fatal conditions that stop a CHIP-8 run
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Chip8Error {
    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomLoadError { size: usize, max_size: usize },

    #[error("Memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: usize },

    #[error("Stack overflow: call nesting exceeded {depth} levels")]
    StackOverflow { depth: usize },

    #[error("Stack underflow: attempted to return from a subroutine with empty call stack")]
    StackUnderflow,
}

pub const DISPLAY_X: usize = 64;
pub const DISPLAY_Y: usize = 32;
/// A type alias for the CHIP-8 display buffer representation
pub type Display<T> = [[T; DISPLAY_X]; DISPLAY_Y];
