//! Plain Z80 register file.

use crate::Z80Registers;

/// Z80 registers.
///
/// Engines may embed this and forward [`Z80Registers`] to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,

    pub a_alt: u8,
    pub f_alt: u8,

    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
    pub i: u8,
    pub r: u8,
}

impl Registers {
    /// Get DE register pair.
    #[must_use]
    pub const fn de(&self) -> u16 {
        (self.d as u16) << 8 | self.e as u16
    }

    /// Set DE register pair.
    pub fn set_de(&mut self, value: u16) {
        self.d = (value >> 8) as u8;
        self.e = value as u8;
    }
}

impl Z80Registers for Registers {
    fn a(&self) -> u8 {
        self.a
    }

    fn set_a(&mut self, value: u8) {
        self.a = value;
    }

    fn f(&self) -> u8 {
        self.f
    }

    fn set_f(&mut self, value: u8) {
        self.f = value;
    }

    fn a_alt(&self) -> u8 {
        self.a_alt
    }

    fn de(&self) -> u16 {
        Registers::de(self)
    }

    fn set_de(&mut self, value: u16) {
        Registers::set_de(self, value);
    }

    fn ix(&self) -> u16 {
        self.ix
    }

    fn set_ix(&mut self, value: u16) {
        self.ix = value;
    }

    fn pc(&self) -> u16 {
        self.pc
    }

    fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    fn inc_r(&mut self, n: u8) {
        self.r = (self.r & 0x80) | (self.r.wrapping_add(n) & 0x7F);
    }
}
