//! Top-level Spectrum system and frame scheduler.
//!
//! # Frame loop
//!
//! `run_frame()` executes instructions until the frame counter reaches the
//! model's frame length (69,888 T-states on the 48K). The frame is split in
//! three so the interrupt line is only polled where it can be active:
//!
//! 1. `[0, int_end)`: execute, polling INT after each instruction
//! 2. up to `frame - int_end`: execute without polling
//! 3. up to `frame`: poll again, for late timings that wrap the window
//!
//! Overshoot past the frame end carries into the next frame. A HALT sets a
//! sentinel in the counter that ends all three loops at once; the rest of
//! the frame is then accounted for in bulk.

use std::sync::Arc;

use emu_core::InstructionEngine;
use log::{debug, info};

use crate::bus::SpectrumBus;
use crate::handoff::{AudioProducer, VsyncSignal};
use crate::tape::{TapeDeck, TapeStatus};
use crate::timing::HALT_SENTINEL;
use crate::{ConfigError, SpectrumConfig, SpectrumModel};

/// ROM address of the LD-BYTES routine (tape loading entry point).
pub const LD_BYTES_ADDR: u16 = 0x0556;

/// The `RET` that ends LD-BYTES; a flash load resumes here.
pub const LD_BYTES_RET: u16 = 0x05E2;

/// ZX Spectrum system, generic over the instruction engine.
pub struct Spectrum<E: InstructionEngine> {
    cpu: E,
    bus: SpectrumBus,
    config: SpectrumConfig,
    /// Completed frame counter.
    frame_count: u64,
    audio_out: Option<AudioProducer>,
    /// Last frame's samples when no audio consumer is attached.
    audio_frame: Vec<u8>,
    vsync: Option<Arc<VsyncSignal>>,
}

impl<E: InstructionEngine> Spectrum<E> {
    /// Create a new Spectrum from the given configuration.
    pub fn new(config: SpectrumConfig, mut cpu: E) -> Result<Self, ConfigError> {
        let bus = SpectrumBus::new(&config)?;
        cpu.reset();
        info!(
            "Spectrum {}: {} T-states per frame",
            config.model,
            config.model.frame_tstates()
        );
        Ok(Self {
            cpu,
            bus,
            config,
            frame_count: 0,
            audio_out: None,
            audio_frame: Vec::new(),
            vsync: None,
        })
    }

    /// Run one complete frame.
    pub fn run_frame(&mut self) {
        if let Some(vsync) = &self.vsync {
            vsync.wait();
        }
        self.bus.ula.begin_frame();

        let frame = self.bus.timing.frame_tstates;
        let int_end = self.bus.timing.int_end;
        self.execute_until(int_end, true);
        self.execute_until(frame - int_end, false);
        self.execute_until(frame, true);

        if self.bus.timing.is_halted() {
            self.flush_on_halt();
        }

        self.finish_audio();
        self.bus.timing.end_frame();
        self.frame_count += 1;
    }

    fn execute_until(&mut self, limit: u32, check_int: bool) {
        while self.bus.timing.tstates < limit {
            if self.cpu.pc() == LD_BYTES_ADDR && self.flash_trap_armed() {
                self.flash_load();
            }
            self.cpu.execute(&mut self.bus, check_int);
        }
    }

    fn flash_trap_armed(&self) -> bool {
        self.config.flash_load
            && self.bus.tape.is_loaded()
            && self.bus.tape.status() == TapeStatus::Stopped
            && self.bus.memory.rom_in_use() == self.config.model.basic_rom()
    }

    /// Account for the rest of a frame the CPU spends halted.
    ///
    /// A halted Z80 keeps fetching NOPs: four T-states and one refresh cycle
    /// each. The fetches run up to the late-timing point where the interrupt
    /// is sampled; if it is not taken the CPU idles on to the frame end.
    pub fn flush_on_halt(&mut self) {
        let timing = &mut self.bus.timing;
        timing.tstates &= !HALT_SENTINEL;
        let frame = timing.frame_tstates;
        let sample_at = frame - timing.late_timing;
        self.idle_until(sample_at);

        self.cpu.check_int(&mut self.bus);
        if self.bus.timing.tstates < frame {
            self.idle_until(frame);
        }
    }

    /// Charge halted fetches until the counter reaches `target`. From
    /// contended memory every fetch is charged individually; otherwise the
    /// whole stretch is added at once and the video is flushed.
    fn idle_until(&mut self, target: u32) {
        let page = usize::from(self.cpu.pc() >> 14);
        if self.bus.memory.is_contended(page) {
            while self.bus.timing.tstates < target {
                self.bus.draw(4, true);
                self.cpu.inc_r(1);
            }
        } else {
            self.bus.ula.flush();
            let timing = &mut self.bus.timing;
            let incr = target.saturating_sub(timing.tstates).div_ceil(4);
            timing.tstates += incr << 2;
            self.cpu.inc_r((incr & 0x7F) as u8);
        }
    }

    fn finish_audio(&mut self) {
        let bus = &mut self.bus;
        match &mut self.audio_out {
            Some(producer) => {
                bus.audio.finish_frame(&bus.ay, producer.buffer_mut());
                producer.submit();
            }
            None => bus.audio.finish_frame(&bus.ay, &mut self.audio_frame),
        }
    }

    /// Bypass LD-BYTES for the current tape block. On success the CPU is
    /// left on the routine's final `RET`.
    pub fn flash_load(&mut self) -> bool {
        let loaded = self.bus.tape.flash_load(&mut self.cpu, &mut self.bus.memory);
        if loaded {
            self.cpu.set_pc(LD_BYTES_RET);
        }
        loaded
    }

    /// Save the block described by A, IX and DE to the configured save file.
    pub fn save_block(&mut self) -> bool {
        self.bus.tape.save(&mut self.cpu, &self.bus.memory)
    }

    /// Power-on reset. RAM contents and the inserted tape survive; the
    /// paging lock, the CPU and the audio position do not.
    pub fn reset(&mut self) {
        self.bus.reset();
        self.cpu.reset();
        info!("Spectrum {} reset", self.config.model);
    }

    /// Replace the configuration and reset.
    pub fn reconfigure(&mut self, config: SpectrumConfig) -> Result<(), ConfigError> {
        self.bus.reconfigure(&config)?;
        self.cpu.reset();
        debug!("Reconfigured as {}", config.model);
        self.config = config;
        Ok(())
    }

    /// Switch model, keeping the other settings and ROM images.
    pub fn set_model(&mut self, model: SpectrumModel) -> Result<(), ConfigError> {
        let config = SpectrumConfig {
            model,
            ..self.config.clone()
        };
        self.reconfigure(config)
    }

    /// Send each finished audio frame to `producer` instead of keeping it.
    pub fn attach_audio(&mut self, producer: AudioProducer) {
        self.audio_out = Some(producer);
    }

    /// Block at the start of every frame until `vsync` is notified.
    pub fn set_vsync(&mut self, vsync: Option<Arc<VsyncSignal>>) {
        self.vsync = vsync;
    }

    /// Samples of the last frame (empty when an audio consumer is attached).
    #[must_use]
    pub fn audio_frame(&self) -> &[u8] {
        &self.audio_frame
    }

    #[must_use]
    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    #[must_use]
    pub fn model(&self) -> SpectrumModel {
        self.config.model
    }

    /// Completed frame counter.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// T-states since power-on.
    #[must_use]
    pub fn global_tstates(&self) -> u64 {
        self.bus.timing.now()
    }

    #[must_use]
    pub fn cpu(&self) -> &E {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut E {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &SpectrumBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SpectrumBus {
        &mut self.bus
    }

    #[must_use]
    pub fn tape(&self) -> &TapeDeck {
        &self.bus.tape
    }

    pub fn tape_mut(&mut self) -> &mut TapeDeck {
        &mut self.bus.tape
    }

    /// Start or resume the tape at the current T-state.
    pub fn play_tape(&mut self) {
        let now = self.bus.timing.now();
        self.bus.tape.play(now);
    }

    pub fn stop_tape(&mut self) {
        self.bus.tape.stop();
    }
}
