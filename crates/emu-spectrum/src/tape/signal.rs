//! Tape signal generator: turns one block of tape data into EAR bit
//! transitions, timed against the machine's monotonic T-state counter.
//!
//! The generator is polled rather than ticked. Each poll compares the time
//! elapsed since the last transition with the length of the pulse in
//! progress and toggles the EAR level once it has run out. Polls happen on
//! every port $FE read, which is the only time the level can be observed.
//!
//! Each data bit consists of **two** equal-length pulses (one complete square
//! wave cycle). Bits are transmitted MSB first within each byte.

use serde::Deserialize;

/// T-states per millisecond at 3.5 MHz, for TZX pause fields.
pub const TSTATES_PER_MS: u64 = 3500;

// ---------------------------------------------------------------------------
// Timing profiles
// ---------------------------------------------------------------------------

/// Named pulse timing used for TAP blocks and TZX standard-speed blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingProfile {
    pub pilot: u32,
    pub sync1: u32,
    pub sync2: u32,
    pub bit0: u32,
    pub bit1: u32,
    /// Pilot pulses before a header block.
    pub header_pulses: u32,
    /// Pilot pulses before a data block.
    pub data_pulses: u32,
    /// Silence between blocks.
    pub block_pause: u64,
}

/// Timing of the ROM loader.
pub const STANDARD: TimingProfile = TimingProfile {
    pilot: 2168,
    sync1: 667,
    sync2: 735,
    bit0: 855,
    bit1: 1710,
    header_pulses: 8063,
    data_pulses: 3223,
    block_pause: 1_750_000,
};

/// Shorter pulses accepted by fast replacement loaders.
pub const FAST: TimingProfile = TimingProfile {
    pilot: 1408,
    sync1: 397,
    sync2: 317,
    bit0: 325,
    bit1: 649,
    header_pulses: 4835,
    data_pulses: 1930,
    block_pause: 875_000,
};

/// Profile selector, chosen before playback starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TapeTiming {
    #[default]
    Standard,
    Fast,
}

impl TapeTiming {
    #[must_use]
    pub fn profile(self) -> &'static TimingProfile {
        match self {
            Self::Standard => &STANDARD,
            Self::Fast => &FAST,
        }
    }
}

/// Pulse lengths for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseTiming {
    pub pilot: u32,
    pub pilot_pulses: u32,
    pub sync1: u32,
    pub sync2: u32,
    pub bit0: u32,
    pub bit1: u32,
    pub pause: u64,
}

impl PulseTiming {
    /// ROM-style timing for a block whose first byte is `flag`: headers get
    /// the long pilot tone.
    #[must_use]
    pub fn for_flag(profile: &TimingProfile, flag: u8) -> Self {
        Self {
            pilot: profile.pilot,
            pilot_pulses: if flag == 0 {
                profile.header_pulses
            } else {
                profile.data_pulses
            },
            sync1: profile.sync1,
            sync2: profile.sync2,
            bit0: profile.bit0,
            bit1: profile.bit1,
            pause: profile.block_pause,
        }
    }

    #[must_use]
    pub fn with_pause_ms(self, pause_ms: u16) -> Self {
        Self {
            pause: u64::from(pause_ms) * TSTATES_PER_MS,
            ..self
        }
    }
}

/// One block's worth of signal: timing plus the bytes to send (flag first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSignal {
    pub timing: PulseTiming,
    pub data: Vec<u8>,
    /// Bits of the last byte that are sent (1-8).
    pub used_bits: u8,
    /// Image offset of `data[0]`, for progress display.
    pub offset: u64,
}

// ---------------------------------------------------------------------------
// Playback state machine
// ---------------------------------------------------------------------------

/// Position within a block's signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Pilot tone.
    Sync,
    Sync1,
    Sync2,
    Data,
    /// Silence after the block.
    Pause,
}

/// What a poll did besides (possibly) toggling the EAR level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent {
    None,
    /// The last bit of the block has been sent; the pause begins.
    BlockDone,
    /// The pause has elapsed; the next block may start.
    PauseDone,
}

/// Playback state for the block in progress. Lives from `play()` to `stop()`.
#[derive(Debug, Clone)]
pub struct Playback {
    signal: BlockSignal,
    phase: Phase,
    /// Index of the byte being sent.
    pos: usize,
    bit_mask: u8,
    bit_pulse_len: u32,
    bit_pulse_count: u8,
    pulse_count: u32,
    /// T-state of the last transition.
    start: u64,
}

impl Playback {
    /// Prime a block: pilot tone from `now`, MSB of the first byte next.
    #[must_use]
    pub fn new(signal: BlockSignal, now: u64) -> Self {
        let bit_pulse_len = signal.timing.bit0;
        Self {
            signal,
            phase: Phase::Sync,
            pos: 0,
            bit_mask: 0x80,
            bit_pulse_len,
            bit_pulse_count: 0,
            pulse_count: 0,
            start: now,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Image offset of the byte being sent.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.signal.offset + self.pos as u64
    }

    /// Move the last transition forward, e.g. after the tape was paused.
    pub fn delay(&mut self, tstates: u64) {
        self.start += tstates;
    }

    fn current_byte(&self) -> u8 {
        self.signal.data.get(self.pos).copied().unwrap_or(0xFF)
    }

    fn bit_len(&self) -> u32 {
        if self.current_byte() & self.bit_mask != 0 {
            self.signal.timing.bit1
        } else {
            self.signal.timing.bit0
        }
    }

    /// Whether the bit now selected by `bit_mask` is past the end of the data.
    fn data_exhausted(&self) -> bool {
        let len = self.signal.data.len();
        if self.pos >= len {
            return true;
        }
        let used = self.signal.used_bits.clamp(1, 8);
        self.pos + 1 == len && used < 8 && self.bit_mask == 0x80 >> used
    }

    /// Advance to `now`, toggling `ear` at most once.
    pub fn poll(&mut self, now: u64, ear: &mut bool) -> PollEvent {
        let elapsed = now.saturating_sub(self.start);
        let timing = self.signal.timing;

        match self.phase {
            Phase::Sync => {
                if elapsed >= u64::from(timing.pilot) {
                    self.toggle(now, ear);
                    self.pulse_count += 1;
                    if self.pulse_count >= timing.pilot_pulses {
                        self.pulse_count = 0;
                        self.phase = Phase::Sync1;
                    }
                }
            }
            Phase::Sync1 => {
                if elapsed >= u64::from(timing.sync1) {
                    self.toggle(now, ear);
                    self.phase = Phase::Sync2;
                }
            }
            Phase::Sync2 => {
                if elapsed >= u64::from(timing.sync2) {
                    self.toggle(now, ear);
                    if self.data_exhausted() {
                        self.phase = Phase::Pause;
                        return PollEvent::BlockDone;
                    }
                    self.bit_pulse_len = self.bit_len();
                    self.phase = Phase::Data;
                }
            }
            Phase::Data => {
                if elapsed >= u64::from(self.bit_pulse_len) {
                    self.toggle(now, ear);
                    self.bit_pulse_count += 1;
                    if self.bit_pulse_count == 2 {
                        self.bit_pulse_count = 0;
                        self.bit_mask = self.bit_mask.rotate_right(1);
                        if self.bit_mask == 0x80 {
                            self.pos += 1;
                        }
                        if self.data_exhausted() {
                            self.phase = Phase::Pause;
                            return PollEvent::BlockDone;
                        }
                        self.bit_pulse_len = self.bit_len();
                    }
                }
            }
            Phase::Pause => {
                if elapsed >= timing.pause {
                    return PollEvent::PauseDone;
                }
            }
        }
        PollEvent::None
    }

    fn toggle(&mut self, now: u64, ear: &mut bool) {
        self.start = now;
        *ear = !*ear;
    }
}
