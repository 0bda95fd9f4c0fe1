//! CHIP-8 interpreter core: machine state, instruction set and a wall-clock
//! runner. Input, output and sound reach the machine through the [`Keypad`],
//! [`Screen`] and [`Buzzer`] traits, so the core never touches a window or an
//! audio device itself.

mod emu;
mod nibble;

pub use emu::*;
pub use nibble::{u4, u12};
