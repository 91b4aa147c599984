//! Frame timing: the one cycle counter everything else is measured against.

use crate::SpectrumModel;

/// Set in the frame counter when the CPU halts; ends the frame's execution
/// loops early so the remaining time can be accounted for in bulk.
pub const HALT_SENTINEL: u32 = 0xFF00_0000;

/// Cycle counters and frame geometry for the active model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineTiming {
    /// T-states since the start of the current frame. Carries any overshoot
    /// past the end of the previous frame.
    pub tstates: u32,
    /// T-states at the start of the current frame since power-on.
    pub global_tstates: u64,
    pub frame_tstates: u32,
    pub int_start: u32,
    /// End of the interrupt window, late-timing adjustment included.
    pub int_end: u32,
    pub late_timing: u32,
}

impl MachineTiming {
    #[must_use]
    pub fn new(model: SpectrumModel, late_timing: bool) -> Self {
        let late = u32::from(late_timing);
        let (int_start, int_end) = model.int_window();
        Self {
            tstates: 0,
            global_tstates: 0,
            frame_tstates: model.frame_tstates(),
            int_start,
            int_end: int_end + late,
            late_timing: late,
        }
    }

    /// Monotonic T-state count, used for tape pulse timing.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.global_tstates + u64::from(self.tstates & !HALT_SENTINEL)
    }

    /// Whether the ULA holds INT low at the current T-state.
    #[must_use]
    pub fn is_active_int(&self) -> bool {
        let mut t = self.tstates + self.late_timing;
        if t >= self.frame_tstates {
            t -= self.frame_tstates;
        }
        t >= self.int_start && t < self.int_end
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.tstates & HALT_SENTINEL != 0
    }

    /// Close the frame, carrying overshoot into the next one.
    pub fn end_frame(&mut self) {
        self.global_tstates += u64::from(self.frame_tstates);
        self.tstates -= self.frame_tstates;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const MODELS: [SpectrumModel; 3] = [
        SpectrumModel::Spectrum48K,
        SpectrumModel::Spectrum128K,
        SpectrumModel::Pentagon,
    ];

    #[test]
    fn late_timing_extends_window_end() {
        let early = MachineTiming::new(SpectrumModel::Spectrum48K, false);
        let late = MachineTiming::new(SpectrumModel::Spectrum48K, true);
        assert_eq!(early.int_end, 32);
        assert_eq!(late.int_end, 33);
        assert_eq!(late.late_timing, 1);
    }

    #[test]
    fn end_frame_keeps_overshoot() {
        let mut timing = MachineTiming::new(SpectrumModel::Spectrum128K, false);
        timing.tstates = 70_908 + 11;
        timing.end_frame();
        assert_eq!(timing.tstates, 11);
        assert_eq!(timing.global_tstates, 70_908);
        assert_eq!(timing.now(), 70_919);
    }

    #[test]
    fn halted_counter_is_never_in_the_int_window() {
        let mut timing = MachineTiming::new(SpectrumModel::Spectrum48K, false);
        timing.tstates = 5 | HALT_SENTINEL;
        assert!(timing.is_halted());
        assert!(!timing.is_active_int());
        assert_eq!(timing.now(), 5);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn int_window_length_is_exact(model_index in 0usize..3, late in any::<bool>()) {
            let mut timing = MachineTiming::new(MODELS[model_index], late);
            let frame = timing.frame_tstates;
            let mut active = Vec::new();
            for t in 0..frame {
                timing.tstates = t;
                if timing.is_active_int() {
                    active.push(t);
                }
            }
            let expected = (timing.int_end - timing.int_start) as usize;
            prop_assert_eq!(active.len(), expected);

            // Consecutive modulo the frame length.
            let first = (frame - timing.late_timing) % frame;
            for (i, t) in active_in_order(&active, first).into_iter().enumerate() {
                prop_assert_eq!(t, (first + i as u32) % frame);
            }
        }
    }

    /// Rotate `active` so the run starting at `first` comes first.
    fn active_in_order(active: &[u32], first: u32) -> Vec<u32> {
        let split = active.iter().position(|&t| t == first).unwrap_or(0);
        let mut ordered = active[split..].to_vec();
        ordered.extend_from_slice(&active[..split]);
        ordered
    }
}
