//! Input port state: keyboard half-rows and the Kempston joystick.
//!
//! The Spectrum keyboard is an 8×5 matrix of half-rows, read via port $FE.
//! The high byte of the port address selects which half-rows to scan: each
//! bit (A8-A15) enables one half-row. Multiple rows can be scanned
//! simultaneously by clearing multiple address bits.
//!
//! # Half-row layout
//!
//! | Addr bit | Row | Keys (bit 0-4)                |
//! |----------|-----|-------------------------------|
//! | A8       | 0   | Shift, Z, X, C, V            |
//! | A9       | 1   | A, S, D, F, G                |
//! | A10      | 2   | Q, W, E, R, T                |
//! | A11      | 3   | 1, 2, 3, 4, 5                |
//! | A12      | 4   | 0, 9, 8, 7, 6                |
//! | A13      | 5   | P, O, I, U, Y                |
//! | A14      | 6   | Enter, L, K, J, H            |
//! | A15      | 7   | Space, Sym, M, N, B          |
//!
//! A pressed key reads as 0 (active low). The host's keyboard scanner writes
//! rows here; the bus only reads them.

/// Half-row value with no key pressed.
pub const ROW_IDLE: u8 = 0xBF;

/// Kempston joystick bits (active high).
pub mod kempston {
    pub const RIGHT: u8 = 0x01;
    pub const LEFT: u8 = 0x02;
    pub const DOWN: u8 = 0x04;
    pub const UP: u8 = 0x08;
    pub const FIRE: u8 = 0x10;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoPorts {
    /// Half-rows as read from port $FE (bits 0-4 active low).
    rows: [u8; 8],
    kempston: u8,
}

impl Default for IoPorts {
    fn default() -> Self {
        Self::new()
    }
}

impl IoPorts {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: [ROW_IDLE; 8],
            kempston: 0,
        }
    }

    /// Set or clear a key. `row` is 0-7, `bit` is 0-4.
    pub fn set_key(&mut self, row: usize, bit: u8, pressed: bool) {
        if row < 8 && bit < 5 {
            if pressed {
                self.rows[row] &= !(1 << bit);
            } else {
                self.rows[row] |= 1 << bit;
            }
        }
    }

    /// Replace a whole half-row.
    pub fn set_row(&mut self, row: usize, value: u8) {
        if let Some(slot) = self.rows.get_mut(row) {
            *slot = value;
        }
    }

    pub fn release_all(&mut self) {
        self.rows = [ROW_IDLE; 8];
    }

    /// AND together every half-row whose address bit is clear in
    /// `addr_high`, starting from the idle value.
    #[must_use]
    pub fn read_keyboard(&self, addr_high: u8) -> u8 {
        self.rows
            .iter()
            .enumerate()
            .filter(|(row, _)| addr_high & (1 << row) == 0)
            .fold(ROW_IDLE, |acc, (_, &bits)| acc & bits)
    }

    pub fn set_kempston(&mut self, bits: u8) {
        self.kempston = bits & 0x1F;
    }

    #[must_use]
    pub fn kempston(&self) -> u8 {
        self.kempston
    }
}
