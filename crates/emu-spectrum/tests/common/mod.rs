//! Scripted instruction engine for scheduler tests.
//!
//! Decodes just enough Z80 to drive the machine: NOP, HALT, JP nn, RET,
//! LD A,n, IN A,(n), OUT (n),A, DI and EI. Unknown opcodes execute as NOP.
//! Interrupts are mode 1.

#![allow(dead_code)]

use emu_core::{InstructionEngine, Registers, Z80Bus, Z80Registers};
use emu_spectrum::{BANK_SIZE, Spectrum, SpectrumConfig, SpectrumModel};

#[derive(Debug, Default)]
pub struct MockCpu {
    pub regs: Registers,
    pub iff1: bool,
    pub halted: bool,
    /// EI was the last instruction; interrupts wait one more.
    ei_delay: bool,
    pub interrupts: u32,
    /// Every value read by IN A,(n).
    pub inputs: Vec<u8>,
}

impl MockCpu {
    fn push<B: Z80Bus>(&mut self, bus: &mut B, value: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(2);
        bus.poke16(self.regs.sp, value);
    }

    fn fetch_operand<B: Z80Bus>(&mut self, bus: &mut B) -> u8 {
        let value = bus.peek8(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }
}

impl Z80Registers for MockCpu {
    fn a(&self) -> u8 {
        self.regs.a
    }
    fn set_a(&mut self, value: u8) {
        self.regs.a = value;
    }
    fn f(&self) -> u8 {
        self.regs.f
    }
    fn set_f(&mut self, value: u8) {
        self.regs.f = value;
    }
    fn a_alt(&self) -> u8 {
        self.regs.a_alt
    }
    fn de(&self) -> u16 {
        self.regs.de()
    }
    fn set_de(&mut self, value: u16) {
        self.regs.set_de(value);
    }
    fn ix(&self) -> u16 {
        self.regs.ix
    }
    fn set_ix(&mut self, value: u16) {
        self.regs.ix = value;
    }
    fn pc(&self) -> u16 {
        self.regs.pc
    }
    fn set_pc(&mut self, value: u16) {
        self.regs.pc = value;
    }
    fn inc_r(&mut self, n: u8) {
        self.regs.inc_r(n);
    }
}

impl InstructionEngine for MockCpu {
    fn execute<B: Z80Bus>(&mut self, bus: &mut B, check_int: bool) {
        self.regs.inc_r(1);
        if self.halted {
            bus.fetch_opcode(self.regs.pc);
        } else {
            let op = bus.fetch_opcode(self.regs.pc);
            self.regs.pc = self.regs.pc.wrapping_add(1);
            self.ei_delay = false;
            match op {
                0x76 => {
                    self.halted = true;
                    bus.halt();
                }
                0xC3 => {
                    self.regs.pc = bus.peek16(self.regs.pc);
                }
                0xC9 => {
                    self.regs.pc = bus.peek16(self.regs.sp);
                    self.regs.sp = self.regs.sp.wrapping_add(2);
                }
                0x3E => {
                    self.regs.a = self.fetch_operand(bus);
                }
                0xDB => {
                    let n = self.fetch_operand(bus);
                    let port = u16::from(self.regs.a) << 8 | u16::from(n);
                    self.regs.a = bus.input(port);
                    self.inputs.push(self.regs.a);
                }
                0xD3 => {
                    let n = self.fetch_operand(bus);
                    let port = u16::from(self.regs.a) << 8 | u16::from(n);
                    bus.output(port, self.regs.a);
                }
                0xF3 => self.iff1 = false,
                0xFB => {
                    self.iff1 = true;
                    self.ei_delay = true;
                }
                _ => {}
            }
        }
        if check_int {
            self.check_int(bus);
        }
    }

    fn check_int<B: Z80Bus>(&mut self, bus: &mut B) {
        if !self.iff1 || self.ei_delay || !bus.is_active_int() {
            return;
        }
        self.iff1 = false;
        self.halted = false;
        self.interrupts += 1;
        self.regs.inc_r(1);
        bus.address_on_bus(self.regs.pc, 7);
        let pc = self.regs.pc;
        self.push(bus, pc);
        self.regs.pc = 0x0038;
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// ROM images for `model`, every one with `patches` applied.
pub fn roms(model: SpectrumModel, patches: &[(usize, &[u8])]) -> Vec<Vec<u8>> {
    let mut rom = vec![0u8; BANK_SIZE];
    for (addr, bytes) in patches {
        rom[*addr..*addr + bytes.len()].copy_from_slice(bytes);
    }
    vec![rom; model.rom_count()]
}

/// IM 1 handler at $0038 that runs long enough to leave the INT window.
pub const IM1_HANDLER: (usize, &[u8]) = (0x0038, &[0, 0, 0, 0, 0, 0, 0, 0, 0xFB, 0xC9]);

pub fn spectrum(config: SpectrumConfig) -> Spectrum<MockCpu> {
    Spectrum::new(config, MockCpu::default()).expect("valid config")
}
