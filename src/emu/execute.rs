use rand::Rng;

use super::{
    Chip8, Chip8Error, Chip8Result, DISPLAY_X, DISPLAY_Y, FONT_GLYPH_SIZE, FONT_START_ADDRESS,
    Keypad, Opcode, OpcodeALU,
};
use crate::u4;

impl Chip8 {
    /// Executes an already fetched instruction. The program counter points past it.
    pub(crate) fn execute(
        &mut self,
        opcode: Opcode,
        keypad: &dyn Keypad,
    ) -> Result<Chip8Result, Chip8Error> {
        match opcode {
            Opcode::ClearDisplay => {
                self.display = [[false; DISPLAY_X]; DISPLAY_Y];
                return Ok(Chip8Result::Redraw);
            }
            Opcode::Jump { nnn } => {
                self.pc = nnn.into();
            }
            Opcode::JumpWithOffset { nnn } => {
                let offset = if self.quirks.jump_offset_uses_vx {
                    self.v[nnn.high_nibble()]
                } else {
                    self.v[0]
                };
                self.pc = u16::from(nnn) + u16::from(offset);
            }
            Opcode::Call { nnn } => {
                self.stack.push(self.pc)?;
                log::debug!("call {:#05X}, depth {}", u16::from(nnn), self.stack.len());
                self.pc = nnn.into();
            }
            Opcode::Return => {
                self.pc = self.stack.pop()?;
                log::debug!("return to {:#05X}, depth {}", self.pc, self.stack.len());
            }
            Opcode::SkipRegEqualImm { x, nn } => {
                self.skip_if(self.v[x] == nn);
            }
            Opcode::SkipRegNotEqualImm { x, nn } => {
                self.skip_if(self.v[x] != nn);
            }
            Opcode::SkipRegEqualReg { x, y } => {
                self.skip_if(self.v[x] == self.v[y]);
            }
            Opcode::SkipRegNotEqualReg { x, y } => {
                self.skip_if(self.v[x] != self.v[y]);
            }
            Opcode::SetRegImm { x, nn } => {
                self.v[x] = nn;
            }
            Opcode::AddRegImm { x, nn } => {
                self.v[x] = self.v[x].wrapping_add(nn);
            }
            Opcode::ALU { x, y, op } => {
                self.execute_alu(x, y, op);
            }
            Opcode::Random { x, nn } => {
                let rand_byte: u8 = self.rng.random();
                self.v[x] = rand_byte & nn;
            }
            Opcode::SetIndexImm { nnn } => {
                self.i = nnn.into();
            }
            Opcode::AddIndexReg { x } => {
                self.i = self.i.wrapping_add(self.v[x].into());
                if self.quirks.index_overflow_sets_vf {
                    self.v[0xF] = u8::from(self.i > 0x0FFF);
                }
            }
            Opcode::Draw { x, y, n } => {
                return self.execute_draw(x, y, n);
            }
            Opcode::SkipIfPressed { x } => {
                self.skip_if(keypad.is_pressed(u4::from_low_bits(self.v[x])));
            }
            Opcode::SkipIfNotPressed { x } => {
                self.skip_if(!keypad.is_pressed(u4::from_low_bits(self.v[x])));
            }
            Opcode::WaitForKey { x } => {
                return Ok(self.execute_wait_for_key(x, keypad));
            }
            Opcode::ReadDelayTimer { x } => {
                self.v[x] = self.delay_timer;
            }
            Opcode::SetDelayTimer { x } => {
                self.delay_timer = self.v[x];
            }
            Opcode::SetSoundTimer { x } => {
                self.sound_timer = self.v[x];
            }
            Opcode::FontChar { x } => {
                let digit = self.v[x] & 0x0F;
                self.i = (FONT_START_ADDRESS + usize::from(digit) * FONT_GLYPH_SIZE) as u16;
            }
            Opcode::BCD { x } => {
                let value = self.v[x];
                let base = usize::from(self.i);
                self.memory.write(base, value / 100)?;
                self.memory.write(base + 1, (value / 10) % 10)?;
                self.memory.write(base + 2, value % 10)?;
            }
            Opcode::StoreRegs { x } => {
                let base = usize::from(self.i);
                for reg_index in 0..=usize::from(x) {
                    self.memory.write(base + reg_index, self.v[reg_index])?;
                }
                self.advance_index_after_block(x);
            }
            Opcode::LoadRegs { x } => {
                let base = usize::from(self.i);
                for reg_index in 0..=usize::from(x) {
                    self.v[reg_index] = self.memory.read(base + reg_index)?;
                }
                self.advance_index_after_block(x);
            }
            Opcode::Unknown(opcode) => {
                return Ok(Chip8Result::Unrecognized {
                    opcode,
                    address: self.pc.wrapping_sub(2),
                });
            }
        };

        Ok(Chip8Result::Continue)
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.pc = self.pc.wrapping_add(2);
        }
    }

    fn advance_index_after_block(&mut self, x: u4) {
        if self.quirks.block_ops_increment_index {
            self.i = self.i.wrapping_add(u16::from(x.get()) + 1);
        }
    }

    // Flags are computed from the operands before Vx is written, and VF is
    // written last so it holds the flag even when x is F.
    fn execute_alu(&mut self, x: u4, y: u4, op: OpcodeALU) {
        match op {
            OpcodeALU::Set => self.v[x] = self.v[y],
            OpcodeALU::Or => self.v[x] |= self.v[y],
            OpcodeALU::And => self.v[x] &= self.v[y],
            OpcodeALU::Xor => self.v[x] ^= self.v[y],
            OpcodeALU::Add => {
                let (res, overflow) = self.v[x].overflowing_add(self.v[y]);
                self.v[x] = res;
                self.v[0xF] = u8::from(overflow);
            }
            OpcodeALU::Sub => {
                let no_borrow = self.v[x] >= self.v[y];
                self.v[x] = self.v[x].wrapping_sub(self.v[y]);
                self.v[0xF] = u8::from(no_borrow);
            }
            OpcodeALU::SubReverse => {
                let no_borrow = self.v[y] >= self.v[x];
                self.v[x] = self.v[y].wrapping_sub(self.v[x]);
                self.v[0xF] = u8::from(no_borrow);
            }
            OpcodeALU::ShiftRight => {
                let value = self.shift_source(x, y);
                self.v[x] = value >> 1;
                self.v[0xF] = value & 1;
            }
            OpcodeALU::ShiftLeft => {
                let value = self.shift_source(x, y);
                self.v[x] = value << 1;
                self.v[0xF] = (value >> 7) & 1;
            }
        }
    }

    fn shift_source(&self, x: u4, y: u4) -> u8 {
        if self.quirks.shift_copies_vy {
            self.v[y]
        } else {
            self.v[x]
        }
    }

    /// XOR-blits an 8xN sprite from `I`. The origin wraps, the sprite body clips.
    fn execute_draw(&mut self, x: u4, y: u4, n: u4) -> Result<Chip8Result, Chip8Error> {
        let x_pos = self.v[x] as usize % DISPLAY_X;
        let y_pos = self.v[y] as usize % DISPLAY_Y;

        // Don't draw out of bounds
        let row_count = std::cmp::min(usize::from(n), DISPLAY_Y - y_pos);
        let col_count = std::cmp::min(8, DISPLAY_X - x_pos);

        let mut any_erased = false;
        for row in 0..row_count {
            let sprite_byte = self.memory.read(usize::from(self.i) + row)?;

            for col in 0..col_count {
                // If current sprite bit is non-zero
                if (sprite_byte & (0x80 >> col)) != 0 {
                    let pixel = &mut self.display[y_pos + row][x_pos + col];

                    // Flip the pixel
                    *pixel ^= true;

                    if !*pixel {
                        any_erased = true;
                    }
                }
            }
        }

        self.v[0xF] = u8::from(any_erased);
        Ok(Chip8Result::Redraw)
    }

    fn execute_wait_for_key(&mut self, x: u4, keypad: &dyn Keypad) -> Chip8Result {
        match keypad.first_pressed() {
            Some(key) => {
                self.v[x] = key.get();
                Chip8Result::Continue
            }
            None => {
                // Repeat this instruction until a key is pressed
                self.pc = self.pc.wrapping_sub(2);
                Chip8Result::AwaitingKey
            }
        }
    }
}
