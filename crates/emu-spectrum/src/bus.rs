//! Spectrum bus: memory and I/O routing with contention.
//!
//! Every access charges its T-states straight into the frame counter. A
//! contended access first adds the ULA's wait states for the current
//! T-state, then the access's own length.
//!
//! # I/O contention
//!
//! | High byte contended | Bit 0 | Pattern           |
//! |---------------------|-------|-------------------|
//! | no                  | 0     | N:1, C:3          |
//! | no                  | 1     | N:4               |
//! | yes                 | 0     | C:1, C:3          |
//! | yes                 | 1     | C:1, C:1, C:1, C:1|
//!
//! # Port decoding
//!
//! - `$xxFE` read, bit 0 clear on write: ULA (keyboard, EAR, border, beeper)
//! - `$xx1F` read: Kempston joystick
//! - `$FFFD` / `$BFFD`: AY register select / data
//! - `$7FFD` (bits 15 and 1 clear): 128K paging
//!
//! Anything else reads the floating bus.

use emu_core::Z80Bus;
use sinclair_ula::Ula;

use crate::audio::{AudioMixer, speaker_level};
use crate::ay::AyRegisters;
use crate::memory::Memory;
use crate::ports::IoPorts;
use crate::tape::{TapeDeck, TapeStatus};
use crate::timing::{HALT_SENTINEL, MachineTiming};
use crate::{ConfigError, SpectrumConfig, SpectrumModel};

/// Everything the CPU can reach, plus the frame counter it charges.
pub struct SpectrumBus {
    pub timing: MachineTiming,
    pub memory: Memory,
    pub ula: Ula,
    pub ports: IoPorts,
    pub ay: AyRegisters,
    pub audio: AudioMixer,
    pub tape: TapeDeck,
    model: SpectrumModel,
    ay_enabled: bool,
    kempston_enabled: bool,
}

impl SpectrumBus {
    pub fn new(config: &SpectrumConfig) -> Result<Self, ConfigError> {
        let mut tape = TapeDeck::new(config.tape_timing);
        tape.set_save_path(config.save_path.clone());
        Ok(Self {
            timing: MachineTiming::new(config.model, config.late_timing),
            memory: Memory::new(config)?,
            ula: Ula::new(config.model.ula()),
            ports: IoPorts::new(),
            ay: AyRegisters::new(),
            audio: AudioMixer::new(config.model, config.ay),
            tape,
            model: config.model,
            ay_enabled: config.ay,
            kempston_enabled: config.kempston,
        })
    }

    /// Swap in a new configuration. Memory is rebuilt; the tape stays in.
    pub fn reconfigure(&mut self, config: &SpectrumConfig) -> Result<(), ConfigError> {
        self.memory = Memory::new(config)?;
        self.model = config.model;
        self.ay_enabled = config.ay;
        self.kempston_enabled = config.kempston;
        self.timing.late_timing = u32::from(config.late_timing);
        self.audio.configure(config.model, config.ay);
        self.tape.set_timing(config.tape_timing);
        self.tape.set_save_path(config.save_path.clone());
        self.reset();
        Ok(())
    }

    /// Power-on state for everything but RAM contents and the tape image.
    /// The global T-state count keeps running.
    pub fn reset(&mut self) {
        let now = self.timing.now();
        self.timing = MachineTiming::new(self.model, self.timing.late_timing != 0);
        self.timing.global_tstates = now;
        self.memory.reset();
        self.ula.reset(self.model.ula());
        self.ay.reset();
        self.audio.reset();
        self.tape.stop();
    }

    #[must_use]
    pub fn model(&self) -> SpectrumModel {
        self.model
    }

    /// Charge `tstates`, plus the ULA's wait states if `contended`.
    pub fn draw(&mut self, tstates: u32, contended: bool) {
        if contended {
            self.timing.tstates += self.ula.contention(self.timing.tstates);
        }
        self.timing.tstates += tstates;
    }

    fn contended(&self, addr: u16) -> bool {
        self.memory.is_contended(usize::from(addr >> 14))
    }

    /// Second half of an I/O cycle, charged before the port is decoded.
    fn io_late_contention(&mut self, port: u16, contended: bool) {
        if port & 0x0001 == 0 {
            self.draw(3, true);
        } else if contended {
            for _ in 0..3 {
                self.draw(1, true);
            }
        } else {
            self.draw(3, false);
        }
    }

    fn read_ula_port(&mut self, port: u16) -> u8 {
        let mut result = self.ports.read_keyboard((port >> 8) as u8);
        if self.tape.status() == TapeStatus::Loading {
            if self.tape.poll(self.timing.now()) {
                result |= 0x40;
            } else {
                result &= !0x40;
            }
        }
        result | 0xA0
    }

    fn floating_bus(&self) -> u8 {
        let memory = &self.memory;
        self.ula
            .floating_bus(self.timing.tstates, |offset| memory.read_screen(offset))
    }
}

impl Z80Bus for SpectrumBus {
    fn fetch_opcode(&mut self, address: u16) -> u8 {
        self.draw(4, self.contended(address));
        self.memory.read(address)
    }

    fn peek8(&mut self, address: u16) -> u8 {
        self.draw(3, self.contended(address));
        self.memory.read(address)
    }

    fn poke8(&mut self, address: u16, value: u8) {
        self.draw(3, self.contended(address));
        self.memory.write(address, value);
    }

    fn peek16(&mut self, address: u16) -> u16 {
        let high = address.wrapping_add(1);
        if address >> 14 != high >> 14 {
            let lo = self.peek8(address);
            let hi = self.peek8(high);
            return u16::from_le_bytes([lo, hi]);
        }
        if self.contended(address) {
            self.draw(3, true);
            self.draw(3, true);
        } else {
            self.draw(6, false);
        }
        u16::from_le_bytes([self.memory.read(address), self.memory.read(high)])
    }

    fn poke16(&mut self, address: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        let high = address.wrapping_add(1);
        if address >> 14 != high >> 14 {
            self.poke8(address, lo);
            self.poke8(high, hi);
            return;
        }
        if self.contended(address) {
            self.draw(3, true);
            self.draw(3, true);
        } else {
            self.draw(6, false);
        }
        self.memory.write(address, lo);
        self.memory.write(high, hi);
    }

    fn address_on_bus(&mut self, address: u16, tstates: u32) {
        if self.contended(address) {
            for _ in 0..tstates {
                self.draw(1, true);
            }
        } else {
            self.draw(tstates, false);
        }
    }

    fn input(&mut self, port: u16) -> u8 {
        let contended = self.contended(port);
        self.draw(1, contended);
        self.io_late_contention(port, contended);

        if self.kempston_enabled && port & 0x00FF == 0x1F {
            return self.ports.kempston();
        }

        if port & 0x00FF == 0xFE {
            return self.read_ula_port(port);
        }

        if self.ay_enabled && (port >> 8) & 0xC0 == 0xC0 && port & 0x0002 == 0 {
            return self.ay.read_data();
        }

        let data = self.floating_bus();
        if self.model.read_repages() && port & 0x8002 == 0 {
            self.memory.write_bank_register(data);
        }
        data
    }

    fn output(&mut self, port: u16, value: u8) {
        let contended = self.contended(port);
        self.draw(1, contended);

        if port & 0x0001 == 0 {
            let tstates = self.timing.tstates;
            self.ula.set_border_colour(value, tstates);
            let level = speaker_level(value, self.tape.ear_bit());
            self.audio.set_level(level, tstates);
        }

        if self.ay_enabled && port & 0x8002 == 0x8000 {
            if port & 0x4000 != 0 {
                self.ay.select_register(value);
            } else {
                self.audio.ay_catch_up(&self.ay, self.timing.tstates);
                self.ay.write_data(value);
            }
        }

        self.io_late_contention(port, contended);

        if self.model.has_paging() && port & 0x8002 == 0 {
            self.memory.write_bank_register(value);
        }
    }

    fn is_active_int(&self) -> bool {
        self.timing.is_active_int()
    }

    fn halt(&mut self) {
        self.timing.tstates |= HALT_SENTINEL;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use format_spectrum_tap::write_block;

    use super::*;
    use crate::config::BANK_SIZE;
    use crate::tape::TapeFormat;

    fn make_bus(model: SpectrumModel) -> SpectrumBus {
        let roms = vec![vec![0; BANK_SIZE]; model.rom_count()];
        SpectrumBus::new(&SpectrumConfig::new(model, roms)).expect("valid config")
    }

    /// T-states charged by `op` starting at `start`.
    fn cost(bus: &mut SpectrumBus, start: u32, op: impl FnOnce(&mut SpectrumBus)) -> u32 {
        bus.timing.tstates = start;
        op(bus);
        bus.timing.tstates - start
    }

    #[test]
    fn contended_read_waits_for_the_ula() {
        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        assert_eq!(cost(&mut bus, 14335, |b| {
                b.peek8(0x4000);
            }), 9);
        assert_eq!(cost(&mut bus, 14335, |b| {
                b.peek8(0x8000);
            }), 3);
        assert_eq!(cost(&mut bus, 0, |b| {
                b.peek8(0x4000);
            }), 3);
        assert_eq!(cost(&mut bus, 14335, |b| {
                b.fetch_opcode(0x4000);
            }), 10);
    }

    #[test]
    fn straddling_word_costs_two_byte_reads() {
        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        for start in [14335, 14340, 20000, 0] {
            let first = cost(&mut bus, start, |b| {
                b.peek8(0x7FFF);
            });
            let second = cost(&mut bus, start + first, |b| {
                b.peek8(0x8000);
            });
            let word = cost(&mut bus, start, |b| {
                b.peek16(0x7FFF);
            });
            assert_eq!(word, first + second, "start {start}");

            let first = cost(&mut bus, start, |b| b.poke8(0x7FFF, 0));
            let second = cost(&mut bus, start + first, |b| b.poke8(0x8000, 0));
            let word = cost(&mut bus, start, |b| b.poke16(0x7FFF, 0));
            assert_eq!(word, first + second, "start {start}");
        }
    }

    #[test]
    fn word_within_a_page_is_little_endian() {
        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        bus.poke16(0x8000, 0x1234);
        assert_eq!(bus.memory.read(0x8000), 0x34);
        assert_eq!(bus.memory.read(0x8001), 0x12);
        assert_eq!(bus.peek16(0x8000), 0x1234);
        assert_eq!(cost(&mut bus, 14335, |b| {
                b.peek16(0x8000);
            }), 6);
        assert_eq!(cost(&mut bus, 14335, |b| {
                b.peek16(0x4000);
            }), 17);
    }

    #[test]
    fn address_on_bus_charges_per_cycle_when_contended() {
        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        assert_eq!(cost(&mut bus, 14335, |b| b.address_on_bus(0x8000, 5)), 5);
        assert_eq!(cost(&mut bus, 14335, |b| b.address_on_bus(0x4000, 2)), 6 + 1 + 1);
    }

    #[test]
    fn uncontended_port_cycles_take_four_tstates() {
        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        assert_eq!(cost(&mut bus, 0, |b| {
                b.input(0x00FF);
            }), 4);
        assert_eq!(cost(&mut bus, 0, |b| {
                b.input(0x40FF);
            }), 4);
        assert_eq!(cost(&mut bus, 0, |b| b.output(0x00FE, 0)), 4);

        let mut pentagon = make_bus(SpectrumModel::Pentagon);
        assert_eq!(cost(&mut pentagon, 14335, |b| {
                b.input(0x40FE);
            }), 4);
    }

    #[test]
    fn keyboard_rows_are_selected_by_high_byte() {
        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        assert_eq!(bus.input(0xFEFE), 0xBF);
        bus.ports.set_key(0, 1, true); // Z
        assert_eq!(bus.input(0xFEFE), 0xBD);
        assert_eq!(bus.input(0xFDFE), 0xBF);
        assert_eq!(bus.input(0x00FE), 0xBD);
    }

    #[test]
    fn ear_bit_follows_tape_while_loading() {
        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        let mut image = Vec::new();
        write_block(&mut image, 0xFF, &[0x55]).expect("write to vec");
        bus.tape
            .insert("t.tap", Box::new(Cursor::new(image)), TapeFormat::Tap)
            .expect("valid image");

        bus.tape.play(bus.timing.now());
        assert_eq!(bus.input(0xFEFE) & 0x40, 0x40);
        bus.timing.tstates = 3000;
        assert_eq!(bus.input(0xFEFE) & 0x40, 0);

        bus.tape.stop();
        bus.timing.tstates = 6000;
        assert_eq!(bus.input(0xFEFE), 0xBF);
    }

    #[test]
    fn kempston_can_be_disabled() {
        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        bus.ports.set_kempston(0x11);
        assert_eq!(bus.input(0x001F), 0x11);

        let mut config = SpectrumConfig::new(SpectrumModel::Spectrum48K, vec![vec![0; BANK_SIZE]]);
        config.kempston = false;
        let mut bus = SpectrumBus::new(&config).expect("valid config");
        bus.ports.set_kempston(0x11);
        assert_eq!(bus.input(0x001F), 0xFF);
    }

    #[test]
    fn ay_registers_are_reached_through_ports() {
        let mut bus = make_bus(SpectrumModel::Spectrum128K);
        bus.output(0xFFFD, 7);
        bus.output(0xBFFD, 0x38);
        assert_eq!(bus.ay.selected(), 7);
        assert_eq!(bus.input(0xFFFD), 0x38);

        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        bus.output(0xFFFD, 7);
        assert_eq!(bus.ay.selected(), 0);
    }

    #[test]
    fn border_and_beeper_follow_ula_writes() {
        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        bus.timing.tstates = 1000;
        bus.output(0x00FE, 0x12);
        assert_eq!(bus.ula.border_colour(), 2);
        assert_eq!(bus.ula.border_changes().len(), 1);
        assert_eq!(bus.audio.level(), speaker_level(0x12, false));
    }

    #[test]
    fn paging_port_switches_banks_until_locked() {
        let mut bus = make_bus(SpectrumModel::Spectrum128K);
        bus.output(0x7FFD, 0x03);
        assert_eq!(bus.memory.bank_register(), 0x03);
        assert!(bus.memory.is_contended(3));

        bus.output(0x7FFD, 0x24);
        assert!(bus.memory.is_locked());
        bus.output(0x7FFD, 0x01);
        assert_eq!(bus.memory.bank_register(), 0x24);

        bus.reset();
        assert!(!bus.memory.is_locked());
        bus.output(0x7FFD, 0x01);
        assert_eq!(bus.memory.bank_register(), 0x01);

        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        bus.output(0x7FFD, 0x03);
        assert_eq!(bus.memory.bank_register(), 0);
    }

    #[test]
    fn reading_paging_port_repages_on_128k_only() {
        let mut bus = make_bus(SpectrumModel::Spectrum128K);
        bus.timing.tstates = 0;
        assert_eq!(bus.input(0x7FFD), 0xFF);
        assert_eq!(bus.memory.bank_register(), 0xFF);
        assert!(bus.memory.is_locked());

        let mut bus = make_bus(SpectrumModel::Pentagon);
        assert_eq!(bus.input(0x7FFD), 0xFF);
        assert_eq!(bus.memory.bank_register(), 0);
    }

    #[test]
    fn floating_bus_shows_screen_fetches() {
        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        bus.memory.write(0x4000, 0xAA);
        bus.memory.write(0x5800, 0x47);
        // The value is sampled after the 4-cycle I/O access.
        bus.timing.tstates = 14338 - 4;
        assert_eq!(bus.input(0x00FF), 0xAA);
        bus.timing.tstates = 14339 - 4;
        assert_eq!(bus.input(0x00FF), 0x47);
        bus.timing.tstates = 0;
        assert_eq!(bus.input(0x00FF), 0xFF);
    }

    #[test]
    fn halt_sets_the_sentinel() {
        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        bus.timing.tstates = 100;
        bus.halt();
        assert!(bus.timing.is_halted());
        assert_eq!(bus.timing.tstates & !HALT_SENTINEL, 100);
    }
}
