use super::{Chip8Error, FONT, FONT_START_ADDRESS};

pub const MEMORY_SIZE: usize = 4096;
pub const ROM_START_ADDRESS: usize = 0x200;

/// Flat 4KB address space. Every access is bounds checked.
pub struct Memory {
    bytes: [u8; MEMORY_SIZE],
}

impl Memory {
    /// Zeroed memory with the font table in place.
    pub fn new() -> Self {
        let mut memory = Memory {
            bytes: [0; MEMORY_SIZE],
        };
        memory.bytes[FONT_START_ADDRESS..FONT_START_ADDRESS + FONT.len()].copy_from_slice(&FONT);
        memory
    }

    /// Copies a program verbatim to `ROM_START_ADDRESS`.
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        let rom_end = ROM_START_ADDRESS + rom.len();
        self.bytes
            .get_mut(ROM_START_ADDRESS..rom_end)
            .ok_or(Chip8Error::RomLoadError {
                size: rom.len(),
                max_size: MEMORY_SIZE - ROM_START_ADDRESS,
            })?
            .copy_from_slice(rom);

        Ok(())
    }

    pub fn read(&self, address: usize) -> Result<u8, Chip8Error> {
        self.bytes
            .get(address)
            .copied()
            .ok_or(Chip8Error::MemoryOutOfBounds { address })
    }

    pub fn write(&mut self, address: usize, value: u8) -> Result<(), Chip8Error> {
        let cell = self
            .bytes
            .get_mut(address)
            .ok_or(Chip8Error::MemoryOutOfBounds { address })?;
        *cell = value;
        Ok(())
    }

    /// Reads the big-endian word at `address` and `address + 1`.
    pub fn read_word(&self, address: usize) -> Result<u16, Chip8Error> {
        let high = self.read(address)?;
        let low = self.read(address + 1)?;

        Ok(u16::from_be_bytes([high, low]))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_is_loaded_at_base() {
        let memory = Memory::new();
        assert_eq!(memory.read(FONT_START_ADDRESS).unwrap(), 0xF0);
        assert_eq!(memory.read(FONT_START_ADDRESS + 5).unwrap(), 0x20);
        assert_eq!(memory.read(ROM_START_ADDRESS).unwrap(), 0x00);
    }

    #[test]
    fn rom_fills_up_to_end_of_memory() {
        let mut memory = Memory::new();
        let rom = vec![0xAB; MEMORY_SIZE - ROM_START_ADDRESS];
        memory.load_rom(&rom).unwrap();
        assert_eq!(memory.read(MEMORY_SIZE - 1).unwrap(), 0xAB);
    }

    #[test]
    fn oversized_rom_is_rejected() {
        let mut memory = Memory::new();
        let rom = vec![0; MEMORY_SIZE - ROM_START_ADDRESS + 1];
        assert_eq!(
            memory.load_rom(&rom),
            Err(Chip8Error::RomLoadError {
                size: rom.len(),
                max_size: MEMORY_SIZE - ROM_START_ADDRESS,
            })
        );
    }

    #[test]
    fn word_reads_are_big_endian() {
        let mut memory = Memory::new();
        memory.load_rom(&[0x12, 0x34]).unwrap();
        assert_eq!(memory.read_word(ROM_START_ADDRESS).unwrap(), 0x1234);
    }

    #[test]
    fn out_of_bounds_access_fails() {
        let mut memory = Memory::new();
        assert_eq!(
            memory.read_word(MEMORY_SIZE - 1),
            Err(Chip8Error::MemoryOutOfBounds {
                address: MEMORY_SIZE
            })
        );
        assert_eq!(
            memory.write(MEMORY_SIZE, 1),
            Err(Chip8Error::MemoryOutOfBounds {
                address: MEMORY_SIZE
            })
        );
    }
}
