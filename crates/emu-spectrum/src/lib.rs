//! Cycle-accurate ZX Spectrum machine core.
//!
//! Covers the 48K, 128K and Pentagon models. The crate schedules one video
//! frame at a time, charges every memory and port access its contended
//! cost, and plays TAP/TZX tapes as a timed EAR signal (or loads them
//! instantly through the ROM loader).
//!
//! The Z80 instruction decoder is not part of this crate. Any engine
//! implementing [`emu_core::InstructionEngine`] plugs into [`Spectrum`].

mod audio;
pub mod ay;
mod bus;
mod config;
mod error;
pub mod handoff;
mod memory;
pub mod ports;
mod spectrum;
pub mod tape;
mod timing;

pub use audio::{AudioMixer, SPEAKER_VALUES, speaker_level};
pub use bus::SpectrumBus;
pub use config::{BANK_SIZE, ConfigFile, SpectrumConfig, SpectrumModel};
pub use error::{ConfigError, TapeError};
pub use memory::Memory;
pub use spectrum::{LD_BYTES_ADDR, LD_BYTES_RET, Spectrum};
pub use tape::{Notice, NoticeLevel, TapeDeck, TapeFormat, TapeStatus, TapeTiming};
pub use timing::{HALT_SENTINEL, MachineTiming};
