mod chip8;
mod devices;
mod dump;
mod execute;
mod font;
mod memory;
mod opcode;
mod quirks;
mod runner;
mod stack;
mod types;

pub use chip8::*;
pub use devices::*;
pub use dump::*;
pub use font::*;
pub use memory::*;
pub use opcode::*;
pub use quirks::*;
pub use runner::*;
pub use stack::*;
pub use types::*;
