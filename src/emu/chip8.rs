use rand::{SeedableRng, rngs::StdRng};

use super::{
    CallStack, Chip8Config, Chip8Error, Chip8Result, DISPLAY_X, DISPLAY_Y, Display, Keypad,
    Memory, Opcode, Quirks, ROM_START_ADDRESS,
};

/// CHIP-8 virtual machine state
pub struct Chip8 {
    /// 4KB memory with the font loaded at `FONT_START_ADDRESS`
    pub(crate) memory: Memory,
    /// Display buffer: 64x32 monochrome pixels
    pub(crate) display: Display<bool>,

    /// Program counter: address of the next instruction to execute
    pub(crate) pc: u16,
    /// Index register: used for memory operations
    pub(crate) i: u16,
    /// General-purpose registers V0-VF (VF is used as a flag register)
    pub(crate) v: [u8; 16],
    /// Call stack for subroutine returns
    pub(crate) stack: CallStack,

    /// Delay timer: decrements at 60Hz until it reaches 0
    pub(crate) delay_timer: u8,
    /// Sound timer: decrements at 60Hz, beeps while non-zero
    pub(crate) sound_timer: u8,

    pub(crate) quirks: Quirks,
    /// Source for `Cxnn`
    pub(crate) rng: StdRng,
}

impl Chip8 {
    pub fn new(config: Chip8Config) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Chip8 {
            memory: Memory::new(),
            display: [[false; DISPLAY_X]; DISPLAY_Y],
            pc: ROM_START_ADDRESS as u16,
            i: 0,
            v: [0; 16],
            stack: CallStack::new(config.stack_depth),
            delay_timer: 0,
            sound_timer: 0,
            quirks: config.quirks,
            rng,
        }
    }

    /// Loads a ROM into memory and points the program counter at it.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        self.memory.load_rom(rom)?;
        self.pc = ROM_START_ADDRESS as u16;
        log::debug!("loaded {} byte ROM at {:#05X}", rom.len(), ROM_START_ADDRESS);

        Ok(())
    }

    /// Executes a single CPU cycle (fetch, decode, execute).
    pub fn cpu_cycle(&mut self, keypad: &dyn Keypad) -> Result<Chip8Result, Chip8Error> {
        let address = self.pc;
        let opcode = self.fetch()?;
        log::trace!("{address:#05X}: {opcode:#06X}");

        let result = self.execute(Opcode::decode(opcode), keypad)?;
        if let Chip8Result::Unrecognized { opcode, address } = result {
            log::warn!("unknown opcode {opcode:#06X} at {address:#05X}, skipping");
        }

        Ok(result)
    }

    /// Updates the delay and sound timers. Should be called at 60Hz.
    pub fn timers_cycle(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Returns true if the sound timer is greater than zero, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.sound_timer > 0
    }

    pub fn display(&self) -> &Display<bool> {
        &self.display
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn registers(&self) -> &[u8; 16] {
        &self.v
    }

    pub fn stack(&self) -> &CallStack {
        &self.stack
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    /// Fetches the next 16-bit opcode from memory and advances past it.
    fn fetch(&mut self) -> Result<u16, Chip8Error> {
        let opcode = self.memory.read_word(usize::from(self.pc))?;
        self.pc = self.pc.wrapping_add(2);

        Ok(opcode)
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new(Chip8Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emu::{KeypadState, MEMORY_SIZE};

    #[test]
    fn fetch_advances_by_one_word() {
        let mut chip8 = Chip8::default();
        chip8.load(&[0x60, 0x07, 0x61, 0x08]).unwrap();

        let keypad = KeypadState::new();
        chip8.cpu_cycle(&keypad).unwrap();
        assert_eq!(chip8.pc(), 0x202);
        chip8.cpu_cycle(&keypad).unwrap();
        assert_eq!(chip8.pc(), 0x204);
        assert_eq!(chip8.registers()[..2], [0x07, 0x08]);
    }

    #[test]
    fn unknown_opcode_is_reported_and_skipped() {
        let mut chip8 = Chip8::default();
        chip8.load(&[0xFF, 0xFF, 0x60, 0x01]).unwrap();

        let keypad = KeypadState::new();
        assert_eq!(
            chip8.cpu_cycle(&keypad),
            Ok(Chip8Result::Unrecognized {
                opcode: 0xFFFF,
                address: 0x200
            })
        );
        assert_eq!(chip8.pc(), 0x202);
        assert_eq!(chip8.cpu_cycle(&keypad), Ok(Chip8Result::Continue));
        assert_eq!(chip8.registers()[0], 1);
    }

    #[test]
    fn fetch_past_end_of_memory_is_fatal() {
        let mut chip8 = Chip8::default();
        chip8.pc = (MEMORY_SIZE - 1) as u16;

        assert_eq!(
            chip8.cpu_cycle(&KeypadState::new()),
            Err(Chip8Error::MemoryOutOfBounds {
                address: MEMORY_SIZE
            })
        );
    }

    #[test]
    fn timers_never_go_below_zero() {
        let mut chip8 = Chip8::default();
        chip8.delay_timer = 3;
        chip8.sound_timer = 1;

        for _ in 0..5 {
            chip8.timers_cycle();
        }
        assert_eq!(chip8.delay_timer(), 0);
        assert_eq!(chip8.sound_timer(), 0);
        assert!(!chip8.should_beep());
    }

    #[test]
    fn timers_follow_saturating_countdown() {
        for start in [0u8, 1, 7, 60, 255] {
            for ticks in [0u32, 1, 6, 61, 300] {
                let mut chip8 = Chip8::default();
                chip8.delay_timer = start;
                for _ in 0..ticks {
                    chip8.timers_cycle();
                }
                let expected = (start as u32).saturating_sub(ticks) as u8;
                assert_eq!(chip8.delay_timer(), expected);
            }
        }
    }
}
