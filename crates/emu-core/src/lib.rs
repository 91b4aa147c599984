//! Collaborator traits for a cycle-accurate Z80 machine core.
//!
//! The instruction decoder is not part of this workspace. It plugs in through
//! [`InstructionEngine`] and reaches memory and I/O exclusively through
//! [`Z80Bus`], which is where every cycle gets charged.

mod bus;
mod cpu;
pub mod flags;
mod registers;

pub use bus::Z80Bus;
pub use cpu::{InstructionEngine, Z80Registers};
pub use registers::Registers;
