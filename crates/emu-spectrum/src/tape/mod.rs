//! Tape deck: the open image, the block cursor and real-time playback.
//!
//! The deck moves between three states:
//!
//! - **Stopped**: nothing happens; the EAR level stays latched.
//! - **Loading**: each port $FE read polls the signal generator, which
//!   toggles the EAR level as pulses run out.
//! - **Paused**: like stopped, but `play()` resumes mid-pulse.
//!
//! Failed operations never reach the scheduler. They are logged and queued
//! as [`Notice`]s for the host to display.

mod container;
mod flash;
pub mod signal;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use format_spectrum_tap::BlockInfo;
use log::{debug, info, warn};

pub use container::{TapeFormat, TapeSource};
pub use signal::TapeTiming;

use crate::TapeError;
use container::Container;
use signal::{Playback, PollEvent};

/// Playback status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapeStatus {
    Stopped,
    Loading,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient message for the host UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Virtual tape deck.
pub struct TapeDeck {
    container: Option<Container>,
    /// Block that plays (or flash loads) next.
    current_block: usize,
    status: TapeStatus,
    playback: Option<Playback>,
    ear: bool,
    paused_at: u64,
    timing: TapeTiming,
    save_path: Option<PathBuf>,
    notices: Vec<Notice>,
}

impl TapeDeck {
    /// Create an empty tape deck (no tape inserted).
    #[must_use]
    pub fn new(timing: TapeTiming) -> Self {
        Self {
            container: None,
            current_block: 0,
            status: TapeStatus::Stopped,
            playback: None,
            ear: false,
            paused_at: 0,
            timing,
            save_path: None,
            notices: Vec::new(),
        }
    }

    /// Open a `.tap` or `.tzx` file. On failure the deck is left empty and an
    /// error notice is queued.
    pub fn open(&mut self, path: &Path) -> Result<(), TapeError> {
        self.close();
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let loaded = TapeFormat::from_path(path)
            .ok_or_else(|| TapeError::UnknownFormat(path.to_path_buf()))
            .and_then(|format| {
                let file = File::open(path)?;
                Container::scan(name.clone(), Box::new(BufReader::new(file)), format)
            });
        self.mount(&name, loaded)
    }

    /// Insert an image from any seekable source.
    pub fn insert(
        &mut self,
        name: &str,
        source: Box<dyn TapeSource>,
        format: TapeFormat,
    ) -> Result<(), TapeError> {
        self.close();
        let loaded = Container::scan(name.to_string(), source, format);
        self.mount(name, loaded)
    }

    fn mount(&mut self, name: &str, loaded: Result<Container, TapeError>) -> Result<(), TapeError> {
        match loaded {
            Ok(container) => {
                info!(
                    "Tape {name}: {:?}, {} blocks, {} bytes",
                    container.format(),
                    container.block_count(),
                    container.file_size()
                );
                self.container = Some(container);
                Ok(())
            }
            Err(err) => {
                self.notify(NoticeLevel::Error, format!("Cannot open {name}: {err}"));
                Err(err)
            }
        }
    }

    /// Stop and return to the empty state.
    pub fn close(&mut self) {
        self.stop();
        if let Some(container) = self.container.take() {
            info!("Tape {} ejected", container.name());
        }
        self.current_block = 0;
    }

    /// Whether a tape is loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.container.is_some()
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.container.as_ref().map(Container::name)
    }

    #[must_use]
    pub fn format(&self) -> Option<TapeFormat> {
        self.container.as_ref().map(Container::format)
    }

    #[must_use]
    pub fn status(&self) -> TapeStatus {
        self.status
    }

    /// Latched EAR level.
    #[must_use]
    pub fn ear_bit(&self) -> bool {
        self.ear
    }

    #[must_use]
    pub fn timing(&self) -> TapeTiming {
        self.timing
    }

    /// Select the pulse profile. Takes effect from the next block.
    pub fn set_timing(&mut self, timing: TapeTiming) {
        self.timing = timing;
    }

    /// TAP file that [`TapeDeck::save`] appends to.
    pub fn set_save_path(&mut self, path: Option<PathBuf>) {
        self.save_path = path;
    }

    // -----------------------------------------------------------------------
    // Browsing
    // -----------------------------------------------------------------------

    /// Block that plays next.
    #[must_use]
    pub fn current_block(&self) -> usize {
        self.current_block
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.container.as_ref().map_or(0, Container::block_count)
    }

    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.container.as_ref().map_or(0, Container::file_size)
    }

    /// Image offset of the byte being played, 0 when stopped.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.playback.as_ref().map_or(0, Playback::position)
    }

    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        let size = self.file_size();
        if size == 0 {
            return 0;
        }
        u8::try_from((self.position() * 100 / size).min(100)).unwrap_or(100)
    }

    /// Stop and move the cursor to `block`.
    pub fn seek(&mut self, block: usize) -> Result<(), TapeError> {
        let container = self.container.as_mut().ok_or(TapeError::NoTape)?;
        container.seek(block)?;
        self.stop();
        self.current_block = block;
        debug!("Tape cursor at block {block}");
        Ok(())
    }

    pub fn describe(&mut self, block: usize) -> Result<BlockInfo, TapeError> {
        self.container
            .as_mut()
            .ok_or(TapeError::NoTape)?
            .describe(block)
    }

    /// Describe every block, for a tape browser.
    pub fn listing(&mut self) -> Result<Vec<BlockInfo>, TapeError> {
        (0..self.block_count()).map(|block| self.describe(block)).collect()
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    /// Start playback from the current block, or resume after a pause.
    pub fn play(&mut self, now: u64) {
        match self.status {
            TapeStatus::Loading => {}
            TapeStatus::Paused => {
                if let Some(playback) = &mut self.playback {
                    playback.delay(now.saturating_sub(self.paused_at));
                }
                self.status = TapeStatus::Loading;
                info!("Tape resumed at block {}", self.current_block);
            }
            TapeStatus::Stopped => {
                let Some(container) = &mut self.container else {
                    self.notify(NoticeLevel::Error, TapeError::NoTape.to_string());
                    return;
                };
                match container.signal_from(self.current_block, self.timing.profile()) {
                    Ok(Some((block, signal))) => {
                        self.current_block = block;
                        self.playback = Some(Playback::new(signal, now));
                        self.ear = true;
                        self.status = TapeStatus::Loading;
                        info!("Tape playing from block {block}");
                    }
                    Ok(None) => {
                        self.current_block = 0;
                        self.notify(NoticeLevel::Info, "End of tape".to_string());
                    }
                    Err(err) => {
                        self.notify(NoticeLevel::Error, format!("Tape error: {err}"));
                    }
                }
            }
        }
    }

    /// Stop playback. Idempotent.
    pub fn stop(&mut self) {
        if self.status == TapeStatus::Stopped {
            return;
        }
        self.status = TapeStatus::Stopped;
        self.playback = None;
        info!("Tape stopped at block {}", self.current_block);
    }

    /// Freeze playback mid-pulse.
    pub fn pause(&mut self, now: u64) {
        if self.status == TapeStatus::Loading {
            self.status = TapeStatus::Paused;
            self.paused_at = now;
            info!("Tape paused at block {}", self.current_block);
        }
    }

    /// Single play/stop key.
    pub fn toggle(&mut self, now: u64) {
        match self.status {
            TapeStatus::Loading => self.stop(),
            TapeStatus::Stopped | TapeStatus::Paused => self.play(now),
        }
    }

    /// Advance playback to `now` and return the EAR level. Called once per
    /// port $FE read while loading; otherwise returns the latched level.
    pub fn poll(&mut self, now: u64) -> bool {
        if self.status != TapeStatus::Loading {
            return self.ear;
        }
        let Some(playback) = &mut self.playback else {
            return self.ear;
        };
        match playback.poll(now, &mut self.ear) {
            PollEvent::None => {}
            PollEvent::BlockDone => {
                debug!("Tape block {} done", self.current_block);
                self.current_block += 1;
                if self.current_block >= self.block_count() {
                    self.current_block = 0;
                    self.stop();
                }
            }
            PollEvent::PauseDone => self.next_block(now),
        }
        self.ear
    }

    fn next_block(&mut self, now: u64) {
        let Some(container) = &mut self.container else {
            self.stop();
            return;
        };
        match container.signal_from(self.current_block, self.timing.profile()) {
            Ok(Some((block, signal))) => {
                self.current_block = block;
                self.playback = Some(Playback::new(signal, now));
            }
            Ok(None) => {
                self.current_block = 0;
                self.stop();
            }
            Err(err) => {
                self.notify(NoticeLevel::Error, format!("Tape error: {err}"));
                self.stop();
            }
        }
    }

    // -----------------------------------------------------------------------
    // Notices
    // -----------------------------------------------------------------------

    fn notify(&mut self, level: NoticeLevel, message: String) {
        match level {
            NoticeLevel::Info => info!("{message}"),
            NoticeLevel::Error => warn!("{message}"),
        }
        self.notices.push(Notice { level, message });
    }

    /// Take the queued notices.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

impl Default for TapeDeck {
    fn default() -> Self {
        Self::new(TapeTiming::Standard)
    }
}
