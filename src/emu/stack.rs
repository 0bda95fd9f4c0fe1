use super::Chip8Error;

pub const DEFAULT_STACK_DEPTH: usize = 16;

/// Bounded LIFO of subroutine return addresses.
pub struct CallStack {
    frames: Vec<u16>,
    depth: usize,
}

impl CallStack {
    pub fn new(depth: usize) -> Self {
        Self {
            frames: Vec::with_capacity(depth),
            depth,
        }
    }

    pub fn push(&mut self, address: u16) -> Result<(), Chip8Error> {
        if self.frames.len() >= self.depth {
            return Err(Chip8Error::StackOverflow { depth: self.depth });
        }
        self.frames.push(address);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16, Chip8Error> {
        self.frames.pop().ok_or(Chip8Error::StackUnderflow)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Return addresses, oldest first.
    pub fn frames(&self) -> &[u16] {
        &self.frames
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new(DEFAULT_STACK_DEPTH)
    }
}
