//! Spectrum memory: ROM images, eight 16K RAM banks and 128K paging.
//!
//! Layout:
//! - $0000-$3FFF: ROM (writes ignored). ROM 0 or 1 on 128K machines (bit 4 of $7FFD)
//! - $4000-$7FFF: Always RAM bank 5 (contended)
//! - $8000-$BFFF: Always RAM bank 2
//! - $C000-$FFFF: Switchable RAM bank 0-7 (bits 0-2 of $7FFD), bank 0 on 48K
//!
//! Bit 3 of $7FFD selects the shadow screen (bank 7 instead of bank 5).
//! Bit 5 of $7FFD locks the bank register until reset.
//!
//! A 48K machine uses banks 5, 2 and 0 only, which gives the same layout.

use crate::config::BANK_SIZE;
use crate::{ConfigError, SpectrumConfig, SpectrumModel};

/// What a 16K address slot currently maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Rom(usize),
    Ram(usize),
}

pub struct Memory {
    model: SpectrumModel,
    roms: Vec<Box<[u8; BANK_SIZE]>>,
    ram: [Box<[u8; BANK_SIZE]>; 8],
    slots: [Slot; 4],
    contended: [bool; 4],
    /// $7FFD register value.
    bank_reg: u8,
    locked: bool,
}

impl Memory {
    pub fn new(config: &SpectrumConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let roms = config
            .roms
            .iter()
            .take(config.model.rom_count())
            .map(|rom| {
                let mut image = Box::new([0u8; BANK_SIZE]);
                image.copy_from_slice(rom);
                image
            })
            .collect();

        let mut memory = Self {
            model: config.model,
            roms,
            ram: std::array::from_fn(|_| Box::new([0u8; BANK_SIZE])),
            slots: [Slot::Rom(0), Slot::Ram(5), Slot::Ram(2), Slot::Ram(0)],
            contended: [false; 4],
            bank_reg: 0,
            locked: false,
        };
        memory.reset();
        Ok(memory)
    }

    /// Power-on mapping. Clears the paging lock; RAM contents survive.
    pub fn reset(&mut self) {
        self.bank_reg = 0;
        self.locked = false;
        self.apply_bank_register();
    }

    fn apply_bank_register(&mut self) {
        let bank = usize::from(self.bank_reg & 0x07);
        let rom = if self.model.has_paging() {
            usize::from((self.bank_reg >> 4) & 1)
        } else {
            0
        };
        self.slots = [Slot::Rom(rom), Slot::Ram(5), Slot::Ram(2), Slot::Ram(bank)];
        let contends = self.model.has_contention();
        self.contended = [false, contends, false, contends && bank & 1 != 0];
    }

    /// Write the bank register ($7FFD). Ignored on 48K and once locked.
    pub fn write_bank_register(&mut self, value: u8) {
        if !self.model.has_paging() || self.locked {
            return;
        }
        self.bank_reg = value;
        self.locked = value & 0x20 != 0;
        self.apply_bank_register();
    }

    #[must_use]
    pub fn bank_register(&self) -> u8 {
        self.bank_reg
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether slot `page` (0-3) is currently contended.
    #[must_use]
    pub fn is_contended(&self, page: usize) -> bool {
        self.contended[page & 3]
    }

    /// ROM image mapped at $0000.
    #[must_use]
    pub fn rom_in_use(&self) -> usize {
        match self.slots[0] {
            Slot::Rom(index) | Slot::Ram(index) => index,
        }
    }

    /// RAM bank holding the displayed screen (5 or 7).
    #[must_use]
    pub fn screen_bank(&self) -> usize {
        if self.bank_reg & 0x08 != 0 { 7 } else { 5 }
    }

    /// Read from the displayed screen bank, `offset` relative to its start.
    #[must_use]
    pub fn read_screen(&self, offset: u16) -> u8 {
        self.ram[self.screen_bank()][usize::from(offset) & (BANK_SIZE - 1)]
    }

    fn slot(&self, page: usize) -> &[u8; BANK_SIZE] {
        match self.slots[page & 3] {
            Slot::Rom(index) => &self.roms[index],
            Slot::Ram(bank) => &self.ram[bank],
        }
    }

    /// Writable view of slot `page`; `None` for the ROM slot.
    pub fn slot_mut(&mut self, page: usize) -> Option<&mut [u8; BANK_SIZE]> {
        match self.slots[page & 3] {
            Slot::Rom(_) => None,
            Slot::Ram(bank) => Some(&mut self.ram[bank]),
        }
    }

    /// Read a byte with no timing side effects.
    #[must_use]
    pub fn read(&self, addr: u16) -> u8 {
        self.slot(usize::from(addr >> 14))[usize::from(addr & 0x3FFF)]
    }

    /// Write a byte with no timing side effects. Writes to ROM are dropped.
    pub fn write(&mut self, addr: u16, value: u8) {
        if let Some(slot) = self.slot_mut(usize::from(addr >> 14)) {
            slot[usize::from(addr & 0x3FFF)] = value;
        }
    }

    /// Copy `bytes` to `addr` onwards, one 16K slot at a time. The ROM slot is
    /// skipped and nothing is written past $FFFF.
    pub fn load(&mut self, addr: u16, bytes: &[u8]) {
        let mut addr = usize::from(addr);
        let mut rest = bytes;
        while !rest.is_empty() && addr <= 0xFFFF {
            let page = addr >> 14;
            let offset = addr & (BANK_SIZE - 1);
            let n = rest.len().min(BANK_SIZE - offset);
            let (chunk, tail) = rest.split_at(n);
            if let Some(slot) = self.slot_mut(page) {
                slot[offset..offset + n].copy_from_slice(chunk);
            }
            rest = tail;
            addr += n;
        }
    }

    /// Direct access to a physical RAM bank.
    #[must_use]
    pub fn bank(&self, bank: usize) -> &[u8; BANK_SIZE] {
        &self.ram[bank & 7]
    }
}
