//! Instruction engine trait.

use crate::Z80Bus;

/// Register and flag access needed by machine-level traps.
///
/// Flash loading and tape saving bypass the ROM routines and patch the
/// registers those routines would have left behind.
pub trait Z80Registers {
    fn a(&self) -> u8;
    fn set_a(&mut self, value: u8);
    fn f(&self) -> u8;
    fn set_f(&mut self, value: u8);
    /// Accumulator of the alternate register set.
    fn a_alt(&self) -> u8;
    fn de(&self) -> u16;
    fn set_de(&mut self, value: u16);
    fn ix(&self) -> u16;
    fn set_ix(&mut self, value: u16);
    fn pc(&self) -> u16;
    fn set_pc(&mut self, value: u16);

    /// Advance the memory refresh register by `n`, preserving bit 7.
    fn inc_r(&mut self, n: u8);
}

/// A Z80 instruction engine.
///
/// The engine is a black box to the machine: it executes one instruction
/// per call, charging all of its time through the bus.
pub trait InstructionEngine: Z80Registers {
    /// Execute one instruction. When `check_int` is set the engine polls
    /// [`Z80Bus::is_active_int`] afterwards and accepts the interrupt if
    /// enabled.
    fn execute<B: Z80Bus>(&mut self, bus: &mut B, check_int: bool);

    /// Poll the INT line once, outside instruction execution.
    fn check_int<B: Z80Bus>(&mut self, bus: &mut B);

    /// Power-on reset.
    fn reset(&mut self);
}
