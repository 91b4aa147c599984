//! Spectrum model configuration.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use sinclair_ula::UlaVariant;

use crate::ConfigError;
use crate::tape::TapeTiming;

/// Size of a ROM image or RAM bank.
pub const BANK_SIZE: usize = 0x4000;

/// Supported Spectrum models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SpectrumModel {
    #[default]
    #[serde(rename = "48k")]
    Spectrum48K,
    #[serde(rename = "128k")]
    Spectrum128K,
    #[serde(rename = "pentagon")]
    Pentagon,
}

impl SpectrumModel {
    /// CPU T-states per video frame.
    #[must_use]
    pub const fn frame_tstates(self) -> u32 {
        match self {
            Self::Spectrum48K => 69_888,
            Self::Spectrum128K => 70_908,
            Self::Pentagon => 71_680,
        }
    }

    /// Interrupt window `[start, end)` before late-timing adjustment.
    #[must_use]
    pub const fn int_window(self) -> (u32, u32) {
        match self {
            Self::Spectrum48K => (0, 32),
            Self::Spectrum128K | Self::Pentagon => (0, 36),
        }
    }

    #[must_use]
    pub const fn ula(self) -> UlaVariant {
        match self {
            Self::Spectrum48K => UlaVariant::Ferranti48,
            Self::Spectrum128K => UlaVariant::Amstrad128,
            Self::Pentagon => UlaVariant::Pentagon,
        }
    }

    /// Whether port $7FFD bank switching exists.
    #[must_use]
    pub const fn has_paging(self) -> bool {
        !matches!(self, Self::Spectrum48K)
    }

    /// Whether an unanswered read of the paging port also writes it.
    #[must_use]
    pub const fn read_repages(self) -> bool {
        matches!(self, Self::Spectrum128K)
    }

    /// Whether odd RAM banks are contended.
    #[must_use]
    pub const fn has_contention(self) -> bool {
        !matches!(self, Self::Pentagon)
    }

    #[must_use]
    pub const fn rom_count(self) -> usize {
        match self {
            Self::Spectrum48K => 1,
            Self::Spectrum128K | Self::Pentagon => 2,
        }
    }

    /// ROM holding the BASIC tape routines.
    #[must_use]
    pub const fn basic_rom(self) -> usize {
        self.rom_count() - 1
    }

    /// T-states per beeper oversample.
    #[must_use]
    pub const fn beeper_divisor(self) -> u32 {
        match self {
            Self::Spectrum48K | Self::Pentagon => 16,
            Self::Spectrum128K => 19,
        }
    }

    /// Beeper oversamples averaged into one output sample.
    #[must_use]
    pub const fn beeper_group(self) -> usize {
        match self {
            Self::Spectrum48K | Self::Pentagon => 7,
            Self::Spectrum128K => 6,
        }
    }

    /// T-states per output (and AY) sample.
    #[must_use]
    pub const fn sample_divisor(self) -> u32 {
        match self {
            Self::Spectrum48K | Self::Pentagon => 112,
            Self::Spectrum128K => 114,
        }
    }

    /// Output samples per frame.
    #[must_use]
    pub const fn samples_per_frame(self) -> usize {
        (self.frame_tstates() / self.sample_divisor()) as usize
    }
}

impl fmt::Display for SpectrumModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Spectrum48K => "48K",
            Self::Spectrum128K => "128K",
            Self::Pentagon => "Pentagon",
        })
    }
}

impl FromStr for SpectrumModel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "48k" | "48" => Ok(Self::Spectrum48K),
            "128k" | "128" => Ok(Self::Spectrum128K),
            "pentagon" => Ok(Self::Pentagon),
            _ => Err(ConfigError::UnknownModel(s.to_string())),
        }
    }
}

/// Configuration for creating a Spectrum instance.
#[derive(Debug, Clone)]
pub struct SpectrumConfig {
    pub model: SpectrumModel,
    /// ROM images, 16,384 bytes each: one for 48K, two for 128K/Pentagon
    /// (editor ROM first, BASIC ROM second).
    pub roms: Vec<Vec<u8>>,
    /// Shift the interrupt window one T-state later ("late" ULA timings).
    pub late_timing: bool,
    pub ay: bool,
    pub kempston: bool,
    /// Load tape blocks instantly when the ROM loader is entered.
    pub flash_load: bool,
    pub tape_timing: TapeTiming,
    /// TAP file that saved blocks are appended to.
    pub save_path: Option<PathBuf>,
}

impl SpectrumConfig {
    /// Defaults for `model`: AY on for the 128K machines, Kempston and flash
    /// loading on, standard tape timing.
    #[must_use]
    pub fn new(model: SpectrumModel, roms: Vec<Vec<u8>>) -> Self {
        Self {
            model,
            roms,
            late_timing: false,
            ay: model.has_paging(),
            kempston: true,
            flash_load: true,
            tape_timing: TapeTiming::Standard,
            save_path: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let expected = self.model.rom_count();
        if self.roms.len() < expected {
            return Err(ConfigError::RomCount {
                model: self.model,
                expected,
                found: self.roms.len(),
            });
        }
        for (index, rom) in self.roms.iter().take(expected).enumerate() {
            if rom.len() != BANK_SIZE {
                return Err(ConfigError::RomSize {
                    index,
                    len: rom.len(),
                });
            }
        }
        Ok(())
    }
}

/// On-disk JSON form of [`SpectrumConfig`]. ROMs are referenced by path,
/// relative to the configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub model: SpectrumModel,
    pub roms: Vec<PathBuf>,
    pub late_timing: bool,
    /// Defaults to on for machines with an AY.
    pub ay: Option<bool>,
    pub kempston: bool,
    pub flash_load: bool,
    pub tape_timing: TapeTiming,
    pub save_path: Option<PathBuf>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            model: SpectrumModel::default(),
            roms: Vec::new(),
            late_timing: false,
            ay: None,
            kempston: true,
            flash_load: true,
            tape_timing: TapeTiming::Standard,
            save_path: None,
        }
    }
}

impl ConfigFile {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Read the ROM images and build a validated [`SpectrumConfig`].
    pub fn into_config(self, base_dir: &Path) -> Result<SpectrumConfig, ConfigError> {
        let mut roms = Vec::with_capacity(self.roms.len());
        for rom in &self.roms {
            let path = base_dir.join(rom);
            let data = fs::read(&path).map_err(|source| ConfigError::Io { path, source })?;
            roms.push(data);
        }

        let config = SpectrumConfig {
            model: self.model,
            roms,
            late_timing: self.late_timing,
            ay: self.ay.unwrap_or(self.model.has_paging()),
            kempston: self.kempston,
            flash_load: self.flash_load,
            tape_timing: self.tape_timing,
            save_path: self.save_path.map(|p| base_dir.join(p)),
        };
        config.validate()?;
        Ok(config)
    }
}
