//! Sinclair ULA timing model.
//!
//! The ULA shares the bus with the CPU. While it fetches the display file it
//! stalls any CPU access to contended memory, and a port read that nothing
//! answers returns whatever byte the ULA happens to be fetching (the
//! "floating bus"). Both depend only on the frame-relative T-state, so this
//! crate is a stateless timing table per machine variant plus a little border
//! state for the external renderer.
//!
//! # Standalone IC
//!
//! This crate has no dependencies. Display memory is read through closures
//! passed by the caller, keeping it decoupled from any particular memory model.
//!
//! # Contention
//!
//! During the 128 T-states of each display line that fetch screen data the
//! delay pattern repeats every 8 T-states: `[6, 5, 4, 3, 2, 1, 0, 0]`.
//!
//! | Variant | T/line | First contended T-state | First floating-bus fetch |
//! |---------|--------|-------------------------|--------------------------|
//! | 48K     | 224    | 14335                   | 14338                    |
//! | 128K    | 228    | 14361                   | 14364                    |
//! | Pentagon| 224    | none                    | none                     |

/// Contention delay pattern (repeats every 8 T-states).
const CONTENTION_PATTERN: [u8; 8] = [6, 5, 4, 3, 2, 1, 0, 0];

/// T-states per display line that fetch screen data.
const FETCH_TSTATES: u32 = 128;

/// Display lines.
const SCREEN_LINES: u32 = 192;

/// Offset of the attribute file within a screen bank.
const ATTR_OFFSET: u16 = 0x1800;

/// ULA revision, selected by machine model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UlaVariant {
    /// Ferranti ULA of the 48K.
    Ferranti48,
    /// Amstrad-built ULA of the 128K/+2.
    Amstrad128,
    /// Pentagon clone: no contention, no floating bus.
    Pentagon,
}

impl UlaVariant {
    /// CPU T-states per scan line.
    #[must_use]
    pub const fn tstates_per_line(self) -> u32 {
        match self {
            Self::Ferranti48 | Self::Pentagon => 224,
            Self::Amstrad128 => 228,
        }
    }

    /// T-state of the first contended cycle, if the variant contends at all.
    #[must_use]
    pub const fn first_contended(self) -> Option<u32> {
        match self {
            Self::Ferranti48 => Some(14335),
            Self::Amstrad128 => Some(14361),
            Self::Pentagon => None,
        }
    }

    /// T-state at which the first display byte is on the bus.
    #[must_use]
    pub const fn first_fetch(self) -> Option<u32> {
        match self {
            Self::Ferranti48 => Some(14338),
            Self::Amstrad128 => Some(14364),
            Self::Pentagon => None,
        }
    }

    /// Wait states added to a contended access starting at `tstate`.
    #[must_use]
    pub fn contention(self, tstate: u32) -> u32 {
        let Some(start) = self.first_contended() else {
            return 0;
        };
        let Some((_, column)) = self.screen_position(tstate, start) else {
            return 0;
        };
        u32::from(CONTENTION_PATTERN[(column % 8) as usize])
    }

    /// Value seen on an unanswered port read at `tstate`.
    ///
    /// `read_vram` reads an offset within the currently displayed screen bank.
    #[must_use]
    pub fn floating_bus(self, tstate: u32, read_vram: impl Fn(u16) -> u8) -> u8 {
        let Some(start) = self.first_fetch() else {
            return 0xFF;
        };
        let Some((line, column)) = self.screen_position(tstate, start) else {
            return 0xFF;
        };
        // Each 8 T-state group fetches bitmap, attribute, bitmap+1, attribute+1.
        let x = ((column / 8) * 2) as u16;
        let y = line as u16;
        match column % 8 {
            0 => read_vram(bitmap_offset(y, x)),
            1 => read_vram(attr_offset(y, x)),
            2 => read_vram(bitmap_offset(y, x + 1)),
            3 => read_vram(attr_offset(y, x + 1)),
            _ => 0xFF,
        }
    }

    /// Display line and fetch column for `tstate`, if it lies in a fetch window.
    fn screen_position(self, tstate: u32, start: u32) -> Option<(u32, u32)> {
        let offset = tstate.checked_sub(start)?;
        let per_line = self.tstates_per_line();
        let line = offset / per_line;
        let column = offset % per_line;
        (line < SCREEN_LINES && column < FETCH_TSTATES).then_some((line, column))
    }
}

/// Offset of the bitmap byte for display line `y`, column `x` (0-31).
#[must_use]
pub const fn bitmap_offset(y: u16, x: u16) -> u16 {
    ((y & 0xC0) << 5) | ((y & 0x07) << 8) | ((y & 0x38) << 2) | x
}

/// Offset of the attribute byte covering display line `y`, column `x`.
#[must_use]
pub const fn attr_offset(y: u16, x: u16) -> u16 {
    ATTR_OFFSET + (y >> 3) * 32 + x
}

/// A border colour change at a frame T-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderChange {
    pub tstate: u32,
    pub colour: u8,
}

/// Per-frame ULA state consumed by the external renderer.
pub struct Ula {
    variant: UlaVariant,
    border_colour: u8,
    border_changes: Vec<BorderChange>,
    /// Set once the rest of the frame has been handed to the renderer early
    /// because the CPU halted.
    flushed: bool,
}

impl Ula {
    #[must_use]
    pub fn new(variant: UlaVariant) -> Self {
        Self {
            variant,
            border_colour: 7,
            border_changes: Vec::new(),
            flushed: false,
        }
    }

    #[must_use]
    pub fn variant(&self) -> UlaVariant {
        self.variant
    }

    /// Wait states for a contended access starting at `tstate`.
    #[must_use]
    pub fn contention(&self, tstate: u32) -> u32 {
        self.variant.contention(tstate)
    }

    #[must_use]
    pub fn floating_bus(&self, tstate: u32, read_vram: impl Fn(u16) -> u8) -> u8 {
        self.variant.floating_bus(tstate, read_vram)
    }

    /// Latch a new border colour. Returns false if the colour is unchanged.
    pub fn set_border_colour(&mut self, colour: u8, tstate: u32) -> bool {
        let colour = colour & 0x07;
        if colour == self.border_colour {
            return false;
        }
        self.border_colour = colour;
        self.border_changes.push(BorderChange { tstate, colour });
        true
    }

    #[must_use]
    pub fn border_colour(&self) -> u8 {
        self.border_colour
    }

    /// Border changes made during the current frame, in T-state order.
    #[must_use]
    pub fn border_changes(&self) -> &[BorderChange] {
        &self.border_changes
    }

    /// Complete the frame's video output in one step.
    pub fn flush(&mut self) {
        self.flushed = true;
    }

    #[must_use]
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Start a new frame: forget the previous frame's border log.
    pub fn begin_frame(&mut self) {
        self.border_changes.clear();
        self.flushed = false;
    }

    /// Power-on state for a (possibly different) variant.
    pub fn reset(&mut self, variant: UlaVariant) {
        self.variant = variant;
        self.border_colour = 7;
        self.begin_frame();
    }
}
