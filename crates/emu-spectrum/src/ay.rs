//! AY-3-8912 register latch.
//!
//! The core only decodes the chip's ports and keeps its 16 registers. Sound
//! synthesis belongs to an [`AyRenderer`], which the audio mixer asks for
//! samples up to the current T-state before every register write so each
//! write takes effect at the right point in the frame.

/// Bits implemented in each register; reads return the masked value.
const REGISTER_MASKS: [u8; 16] = [
    0xFF, 0x0F, 0xFF, 0x0F, 0xFF, 0x0F, // tone periods
    0x1F, // noise period
    0xFF, // mixer
    0x1F, 0x1F, 0x1F, // amplitudes
    0xFF, 0xFF, // envelope period
    0x0F, // envelope shape
    0xFF, 0xFF, // I/O ports
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AyRegisters {
    selected: u8,
    regs: [u8; 16],
}

impl AyRegisters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_register(&mut self, reg: u8) {
        self.selected = reg & 0x0F;
    }

    #[must_use]
    pub fn selected(&self) -> u8 {
        self.selected
    }

    /// Write the selected register.
    pub fn write_data(&mut self, value: u8) {
        let reg = usize::from(self.selected);
        self.regs[reg] = value & REGISTER_MASKS[reg];
    }

    /// Read the selected register.
    #[must_use]
    pub fn read_data(&self) -> u8 {
        self.regs[usize::from(self.selected)]
    }

    /// All 16 registers.
    #[must_use]
    pub fn registers(&self) -> &[u8; 16] {
        &self.regs
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// AY sound synthesis.
pub trait AyRenderer: Send {
    /// Fill `out` with consecutive 8-bit samples (one per output sample
    /// period) generated from the current register state.
    fn render(&mut self, registers: &AyRegisters, out: &mut [u8]);

    /// Power-on reset of the generator state.
    fn reset(&mut self) {}
}

/// Renders silence. Used when no synthesiser is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAy;

impl AyRenderer for SilentAy {
    fn render(&mut self, _registers: &AyRegisters, out: &mut [u8]) {
        out.fill(0);
    }
}
