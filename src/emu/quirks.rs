use super::DEFAULT_STACK_DEPTH;

/// Behaviours that differ between historical CHIP-8 interpreters.
///
/// Chosen once before a run starts; programs written for one interpreter
/// often break under another, so none of these has a single correct value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    /// `8xy6`/`8xyE` copy `Vy` into `Vx` before shifting.
    pub shift_copies_vy: bool,
    /// `Bxnn` jumps to `Vx + xnn` instead of `V0 + xnn`.
    pub jump_offset_uses_vx: bool,
    /// `Fx1E` sets `VF` when `I` leaves the 12-bit address range.
    pub index_overflow_sets_vf: bool,
    /// `Fx55`/`Fx65` leave `I` pointing past the last register touched.
    pub block_ops_increment_index: bool,
}

impl Quirks {
    /// The original COSMAC VIP interpreter.
    pub const fn cosmac() -> Self {
        Self {
            shift_copies_vy: true,
            jump_offset_uses_vx: false,
            index_overflow_sets_vf: false,
            block_ops_increment_index: true,
        }
    }

    /// SUPER-CHIP and most interpreters written since.
    pub const fn modern() -> Self {
        Self {
            shift_copies_vy: false,
            jump_offset_uses_vx: true,
            index_overflow_sets_vf: true,
            block_ops_increment_index: false,
        }
    }
}

impl Default for Quirks {
    fn default() -> Self {
        Self {
            shift_copies_vy: true,
            jump_offset_uses_vx: true,
            index_overflow_sets_vf: false,
            block_ops_increment_index: false,
        }
    }
}

/// Everything fixed for the lifetime of a `Chip8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chip8Config {
    pub quirks: Quirks,
    /// Maximum call nesting before `2nnn` fails.
    pub stack_depth: usize,
    /// Seed for `Cxnn`; `None` draws from the operating system.
    pub seed: Option<u64>,
}

impl Default for Chip8Config {
    fn default() -> Self {
        Self {
            quirks: Quirks::default(),
            stack_depth: DEFAULT_STACK_DEPTH,
            seed: None,
        }
    }
}
