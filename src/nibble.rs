use std::fmt;
use std::ops::{Index, IndexMut};

/// A 4-bit unsigned integer (nibble).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(non_camel_case_types)]
pub struct u4(u8);

impl u4 {
    /// Creates a new `u4` from a `u8`.
    ///
    /// Panics if the value is greater than 0x0F.
    pub const fn new(value: u8) -> Self {
        assert!(value <= 0x0F, "u4 value must be in range 0x0-0xF");
        Self(value)
    }

    /// Creates a new `u4` from the low four bits of a `u8`.
    pub const fn from_low_bits(value: u8) -> Self {
        Self(value & 0x0F)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Iterates over all sixteen values in ascending order.
    pub fn all() -> impl Iterator<Item = u4> {
        (0..=0x0F).map(u4)
    }
}

impl From<u4> for usize {
    fn from(v: u4) -> usize {
        v.0 as usize
    }
}

impl From<u4> for u8 {
    fn from(v: u4) -> u8 {
        v.0
    }
}

impl fmt::UpperHex for u4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}

impl<T> Index<u4> for [T; 16] {
    type Output = T;

    fn index(&self, index: u4) -> &Self::Output {
        &self[index.0 as usize]
    }
}

impl<T> IndexMut<u4> for [T; 16] {
    fn index_mut(&mut self, index: u4) -> &mut Self::Output {
        &mut self[index.0 as usize]
    }
}

/// A 12-bit unsigned integer, the address operand of `nnn` instructions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(non_camel_case_types)]
pub struct u12(u16);

impl u12 {
    /// Creates a new `u12` from a `u16`.
    ///
    /// Panics if the value is greater than 0x0FFF.
    pub const fn new(value: u16) -> Self {
        assert!(value <= 0x0FFF, "u12 value must be in range 0x000-0xFFF");
        Self(value)
    }

    /// Creates a new `u12` from the low twelve bits of an instruction word.
    pub const fn from_low_bits(value: u16) -> Self {
        Self(value & 0x0FFF)
    }

    /// The top nibble, which doubles as a register index for `Bxnn`.
    pub const fn high_nibble(self) -> u4 {
        u4((self.0 >> 8) as u8)
    }
}

impl From<u12> for u16 {
    fn from(v: u12) -> u16 {
        v.0
    }
}

impl From<u12> for usize {
    fn from(v: u12) -> usize {
        v.0 as usize
    }
}

impl fmt::UpperHex for u12 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}
