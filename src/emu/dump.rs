//! Plain-text renderings of machine state, used when a run dies.

use std::fmt;

use super::{CallStack, Chip8, Display, Memory};

impl Chip8 {
    /// Everything at once: header line, registers, stack, display and memory.
    pub fn dump(&self) -> StateDump<'_> {
        StateDump(self)
    }

    pub fn dump_registers(&self) -> RegisterDump<'_> {
        RegisterDump(&self.v)
    }

    pub fn dump_stack(&self) -> StackDump<'_> {
        StackDump(&self.stack)
    }

    pub fn dump_display(&self) -> DisplayDump<'_> {
        DisplayDump(&self.display)
    }

    pub fn dump_memory(&self) -> MemoryDump<'_> {
        MemoryDump(&self.memory)
    }
}

pub struct StateDump<'a>(&'a Chip8);

impl fmt::Display for StateDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chip8 = self.0;
        writeln!(
            f,
            "PC: {:#05X}  I: {:#05X}  DT: {}  ST: {}",
            chip8.pc, chip8.i, chip8.delay_timer, chip8.sound_timer
        )?;
        write!(f, "{}", chip8.dump_registers())?;
        write!(f, "{}", chip8.dump_stack())?;
        write!(f, "{}", chip8.dump_display())?;
        write!(f, "{}", chip8.dump_memory())
    }
}

/// Four registers per line, decimal then hex.
pub struct RegisterDump<'a>(&'a [u8; 16]);

impl fmt::Display for RegisterDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== REGISTERS ==")?;
        for (row, chunk) in self.0.chunks(4).enumerate() {
            let line: Vec<String> = chunk
                .iter()
                .enumerate()
                .map(|(col, value)| format!("V{:X}: {value:>3} ({value:02X})", row * 4 + col))
                .collect();
            writeln!(f, "{}", line.join("  "))?;
        }
        Ok(())
    }
}

/// Return addresses, oldest first.
pub struct StackDump<'a>(&'a CallStack);

impl fmt::Display for StackDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== STACK ({}/{}) ==", self.0.len(), self.0.depth())?;
        for (level, address) in self.0.frames().iter().enumerate() {
            writeln!(f, "{level:>2}: {address:#05X}")?;
        }
        Ok(())
    }
}

pub struct DisplayDump<'a>(&'a Display<bool>);

impl fmt::Display for DisplayDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== DISPLAY ==")?;
        for row in self.0 {
            let line: String = row.iter().map(|&on| if on { 'X' } else { ' ' }).collect();
            writeln!(f, "|{line}|")?;
        }
        Ok(())
    }
}

/// 16 bytes per line, prefixed with the decimal and hex address.
pub struct MemoryDump<'a>(&'a Memory);

impl fmt::Display for MemoryDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== MEMORY ==")?;
        for (line, chunk) in self.0.as_slice().chunks(16).enumerate() {
            let address = line * 16;
            write!(f, "{address:>4} ({address:03X}).")?;
            for byte in chunk {
                write!(f, " {byte:02X}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
