//! Decoded TZX block headers.

/// Location of a block's pulse data (flag byte first) within the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataSpan {
    pub offset: u64,
    pub len: u32,
}

/// Block $11: a data block with its own pulse timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurboSpeed {
    pub pilot_pulse: u16,
    pub sync1_pulse: u16,
    pub sync2_pulse: u16,
    pub zero_pulse: u16,
    pub one_pulse: u16,
    pub pilot_count: u16,
    /// Bits used in the last byte (1-8, MSB first).
    pub used_bits: u8,
    pub pause_ms: u16,
    pub data: DataSpan,
}

/// One indexed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TzxBlock {
    /// Block $10: ROM timing, explicit pause.
    StandardSpeed { pause_ms: u16, data: DataSpan },
    /// Block $11.
    TurboSpeed(TurboSpeed),
    /// Block $30.
    TextDescription(String),
}

impl TzxBlock {
    /// Pulse data, if the block carries any.
    #[must_use]
    pub fn data(&self) -> Option<DataSpan> {
        match self {
            Self::StandardSpeed { data, .. } => Some(*data),
            Self::TurboSpeed(turbo) => Some(turbo.data),
            Self::TextDescription(_) => None,
        }
    }
}
