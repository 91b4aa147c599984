//! Per-frame audio: beeper oversampling and AY mixing.
//!
//! The beeper level is held in an oversample buffer that is filled lazily:
//! whenever the level changes, every oversample slot up to the current
//! T-state is written with the old level. At frame end the rest of the
//! buffer is filled, groups of oversamples are averaged to the output rate
//! and the AY samples for the frame are added on top.

use crate::SpectrumModel;
use crate::ay::{AyRegisters, AyRenderer, SilentAy};

/// Beeper output level, indexed by `EAR << 2 | tape ear << 1 | MIC` (bits
/// 4 and 3 of the port $FE write).
pub const SPEAKER_VALUES: [u8; 8] = [0, 19, 34, 53, 97, 101, 130, 134];

/// Beeper level for a port $FE write while the tape ear bit is `ear`.
#[must_use]
pub fn speaker_level(data: u8, ear: bool) -> u8 {
    let index = ((data >> 2) & 0x04) | (u8::from(ear) << 1) | ((data >> 3) & 0x01);
    SPEAKER_VALUES[usize::from(index)]
}

pub struct AudioMixer {
    beeper_divisor: u32,
    beeper_group: usize,
    sample_divisor: u32,
    oversamples: Vec<u8>,
    oversample_pos: usize,
    level: u8,
    ay_samples: Vec<u8>,
    ay_pos: usize,
    ay_enabled: bool,
    renderer: Box<dyn AyRenderer>,
}

impl AudioMixer {
    #[must_use]
    pub fn new(model: SpectrumModel, ay_enabled: bool) -> Self {
        let mut mixer = Self {
            beeper_divisor: 1,
            beeper_group: 1,
            sample_divisor: 1,
            oversamples: Vec::new(),
            oversample_pos: 0,
            level: 0,
            ay_samples: Vec::new(),
            ay_pos: 0,
            ay_enabled,
            renderer: Box::new(SilentAy),
        };
        mixer.configure(model, ay_enabled);
        mixer
    }

    /// Resize for `model` and drop any partial frame.
    pub fn configure(&mut self, model: SpectrumModel, ay_enabled: bool) {
        let samples = model.samples_per_frame();
        self.beeper_divisor = model.beeper_divisor();
        self.beeper_group = model.beeper_group();
        self.sample_divisor = model.sample_divisor();
        self.oversamples = vec![0; samples * self.beeper_group];
        self.ay_samples = vec![0; samples];
        self.ay_enabled = ay_enabled;
        self.oversample_pos = 0;
        self.ay_pos = 0;
        self.level = 0;
        self.renderer.reset();
    }

    /// Attach an AY synthesiser.
    pub fn set_renderer(&mut self, renderer: Box<dyn AyRenderer>) {
        self.renderer = renderer;
    }

    #[must_use]
    pub fn samples_per_frame(&self) -> usize {
        self.ay_samples.len()
    }

    #[must_use]
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Record a beeper level change at frame T-state `tstate`.
    pub fn set_level(&mut self, level: u8, tstate: u32) {
        if level == self.level {
            return;
        }
        let pos = ((tstate / self.beeper_divisor) as usize).min(self.oversamples.len());
        self.fill_oversamples(pos);
        self.level = level;
    }

    fn fill_oversamples(&mut self, pos: usize) {
        if pos > self.oversample_pos {
            self.oversamples[self.oversample_pos..pos].fill(self.level);
            self.oversample_pos = pos;
        }
    }

    /// Render AY output up to frame T-state `tstate`, before a register write.
    pub fn ay_catch_up(&mut self, registers: &AyRegisters, tstate: u32) {
        let pos = ((tstate / self.sample_divisor) as usize).min(self.ay_samples.len());
        self.render_ay(registers, pos);
    }

    fn render_ay(&mut self, registers: &AyRegisters, pos: usize) {
        if pos > self.ay_pos {
            self.renderer
                .render(registers, &mut self.ay_samples[self.ay_pos..pos]);
            self.ay_pos = pos;
        }
    }

    /// Complete the frame into `out` (replacing its contents) and start the
    /// next one. The beeper level carries over.
    pub fn finish_frame(&mut self, registers: &AyRegisters, out: &mut Vec<u8>) {
        self.fill_oversamples(self.oversamples.len());
        if self.ay_enabled {
            self.render_ay(registers, self.ay_samples.len());
        }

        out.clear();
        let group = self.beeper_group;
        for (i, chunk) in self.oversamples.chunks_exact(group).enumerate() {
            let sum: usize = chunk.iter().map(|&s| usize::from(s)).sum();
            let mut sample = sum / group;
            if self.ay_enabled {
                sample += usize::from(self.ay_samples[i]);
            }
            out.push(sample.min(255) as u8);
        }

        self.oversample_pos = 0;
        self.ay_pos = 0;
    }

    /// Silence and rewind, keeping the current geometry.
    pub fn reset(&mut self) {
        self.oversample_pos = 0;
        self.ay_pos = 0;
        self.level = 0;
        self.renderer.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConstantAy(u8);

    impl AyRenderer for ConstantAy {
        fn render(&mut self, _registers: &AyRegisters, out: &mut [u8]) {
            out.fill(self.0);
        }
    }

    #[test]
    fn speaker_table_lookup() {
        assert_eq!(speaker_level(0x00, false), 0);
        assert_eq!(speaker_level(0x10, false), 97);
        assert_eq!(speaker_level(0x10, true), 130);
        assert_eq!(speaker_level(0x18, true), 134);
        assert_eq!(speaker_level(0x08, false), 19);
    }

    #[test]
    fn silent_frame_is_all_zero() {
        let mut mixer = AudioMixer::new(SpectrumModel::Spectrum48K, false);
        let mut out = Vec::new();
        mixer.finish_frame(&AyRegisters::new(), &mut out);
        assert_eq!(out.len(), 624);
        assert!(out.iter().all(|&s| s == 0));
    }

    #[test]
    fn level_change_splits_the_frame() {
        let mut mixer = AudioMixer::new(SpectrumModel::Spectrum48K, false);
        // Oversample 16 * 7 * 100 = start of output sample 100.
        mixer.set_level(97, 16 * 7 * 100);
        let mut out = Vec::new();
        mixer.finish_frame(&AyRegisters::new(), &mut out);
        assert_eq!(out[99], 0);
        assert_eq!(out[100], 97);
        assert_eq!(out[623], 97);

        // Level persists into the next frame.
        mixer.finish_frame(&AyRegisters::new(), &mut out);
        assert!(out.iter().all(|&s| s == 97));
    }

    #[test]
    fn partial_group_is_averaged() {
        let mut mixer = AudioMixer::new(SpectrumModel::Spectrum128K, false);
        // Three of the six oversamples in output sample 0 are high.
        mixer.set_level(120, 0);
        mixer.set_level(0, 19 * 3);
        let mut out = Vec::new();
        mixer.finish_frame(&AyRegisters::new(), &mut out);
        assert_eq!(out.len(), 622);
        assert_eq!(out[0], 60);
        assert_eq!(out[1], 0);
    }

    #[test]
    fn ay_is_mixed_and_clamped() {
        let mut mixer = AudioMixer::new(SpectrumModel::Pentagon, true);
        mixer.set_renderer(Box::new(ConstantAy(200)));
        mixer.set_level(134, 0);
        let mut out = Vec::new();
        mixer.finish_frame(&AyRegisters::new(), &mut out);
        assert_eq!(out.len(), 640);
        assert!(out.iter().all(|&s| s == 255));
    }

    #[test]
    fn ay_catch_up_renders_only_elapsed_samples() {
        let mut mixer = AudioMixer::new(SpectrumModel::Spectrum48K, true);
        mixer.set_renderer(Box::new(ConstantAy(10)));
        mixer.ay_catch_up(&AyRegisters::new(), 112 * 50);
        assert_eq!(mixer.ay_pos, 50);
        mixer.set_renderer(Box::new(ConstantAy(20)));
        let mut out = Vec::new();
        mixer.finish_frame(&AyRegisters::new(), &mut out);
        assert_eq!(out[49], 10);
        assert_eq!(out[50], 20);
    }

    #[test]
    fn overshoot_past_frame_end_is_clamped() {
        let mut mixer = AudioMixer::new(SpectrumModel::Spectrum48K, true);
        mixer.set_level(19, 69_888 + 20);
        mixer.ay_catch_up(&AyRegisters::new(), 69_888 + 200);
        let mut out = Vec::new();
        mixer.finish_frame(&AyRegisters::new(), &mut out);
        assert_eq!(out.len(), 624);
    }
}
