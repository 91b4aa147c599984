//! Open tape image: the file handle plus its block index.

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use format_spectrum_tap::{BlockInfo, TapIndex, read_u16_le};
use format_tzx::{DataSpan, TzxBlock, TzxIndex};

use super::signal::{BlockSignal, PulseTiming, TimingProfile};
use crate::TapeError;

/// Anything a tape image can be read from.
pub trait TapeSource: Read + Seek + Send {}

impl<T: Read + Seek + Send> TapeSource for T {}

/// Tape image format, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapeFormat {
    Tap,
    Tzx,
}

impl TapeFormat {
    /// `.tap` or `.tzx`, case-insensitive.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "tap" => Some(Self::Tap),
            "tzx" => Some(Self::Tzx),
            _ => None,
        }
    }
}

/// Block index, tagged by image format.
enum Index {
    Tap(TapIndex),
    Tzx(TzxIndex),
}

/// An indexed tape image and the handle it is read through.
pub(super) struct Container {
    name: String,
    reader: Box<dyn TapeSource>,
    index: Index,
}

impl Container {
    pub(super) fn scan(
        name: String,
        mut reader: Box<dyn TapeSource>,
        format: TapeFormat,
    ) -> Result<Self, TapeError> {
        let index = match format {
            TapeFormat::Tap => Index::Tap(TapIndex::scan(&mut reader)?),
            TapeFormat::Tzx => Index::Tzx(TzxIndex::scan(&mut reader)?),
        };
        Ok(Self {
            name,
            reader,
            index,
        })
    }

    pub(super) fn name(&self) -> &str {
        &self.name
    }

    pub(super) fn format(&self) -> TapeFormat {
        match self.index {
            Index::Tap(_) => TapeFormat::Tap,
            Index::Tzx(_) => TapeFormat::Tzx,
        }
    }

    pub(super) fn block_count(&self) -> usize {
        match &self.index {
            Index::Tap(index) => index.block_count(),
            Index::Tzx(index) => index.block_count(),
        }
    }

    pub(super) fn file_size(&self) -> u64 {
        match &self.index {
            Index::Tap(index) => index.file_size(),
            Index::Tzx(index) => index.file_size(),
        }
    }

    /// Validate `block` and leave the handle at its start.
    pub(super) fn seek(&mut self, block: usize) -> Result<u64, TapeError> {
        Ok(match &self.index {
            Index::Tap(index) => index.seek(&mut self.reader, block)?,
            Index::Tzx(index) => {
                let offset = index.offset(block)?;
                self.reader.seek(SeekFrom::Start(offset))?
            }
        })
    }

    pub(super) fn describe(&mut self, block: usize) -> Result<BlockInfo, TapeError> {
        Ok(match &self.index {
            Index::Tap(index) => index.describe(&mut self.reader, block)?,
            Index::Tzx(index) => index.describe(&mut self.reader, block)?,
        })
    }

    /// Signal for the first playable block at or after `from`, with its
    /// index. `None` once the image has no more data blocks.
    pub(super) fn signal_from(
        &mut self,
        from: usize,
        profile: &TimingProfile,
    ) -> Result<Option<(usize, BlockSignal)>, TapeError> {
        for block in from..self.block_count() {
            if let Some(signal) = self.signal(block, profile)? {
                return Ok(Some((block, signal)));
            }
        }
        Ok(None)
    }

    /// Buffer `block`'s payload. `None` for blocks that carry no pulses.
    pub(super) fn signal(
        &mut self,
        block: usize,
        profile: &TimingProfile,
    ) -> Result<Option<BlockSignal>, TapeError> {
        match &self.index {
            Index::Tap(index) => {
                let offset = index.seek(&mut self.reader, block)?;
                let len = u64::from(read_u16_le(&mut self.reader)?);
                // The last block may be cut short.
                let available = index.file_size().saturating_sub(offset + 2).min(len);
                let data = read_span(&mut self.reader, offset + 2, available)?;
                let flag = data.first().copied().unwrap_or(0xFF);
                Ok(Some(BlockSignal {
                    timing: PulseTiming::for_flag(profile, flag),
                    data,
                    used_bits: 8,
                    offset: offset + 2,
                }))
            }
            Index::Tzx(index) => match index.block(&mut self.reader, block)? {
                TzxBlock::StandardSpeed { pause_ms, data } => {
                    let bytes = read_tzx_span(&mut self.reader, data)?;
                    let flag = bytes.first().copied().unwrap_or(0xFF);
                    Ok(Some(BlockSignal {
                        timing: PulseTiming::for_flag(profile, flag).with_pause_ms(pause_ms),
                        data: bytes,
                        used_bits: 8,
                        offset: data.offset,
                    }))
                }
                TzxBlock::TurboSpeed(turbo) => {
                    let timing = PulseTiming {
                        pilot: u32::from(turbo.pilot_pulse),
                        pilot_pulses: u32::from(turbo.pilot_count),
                        sync1: u32::from(turbo.sync1_pulse),
                        sync2: u32::from(turbo.sync2_pulse),
                        bit0: u32::from(turbo.zero_pulse),
                        bit1: u32::from(turbo.one_pulse),
                        pause: 0,
                    }
                    .with_pause_ms(turbo.pause_ms);
                    Ok(Some(BlockSignal {
                        timing,
                        data: read_tzx_span(&mut self.reader, turbo.data)?,
                        used_bits: turbo.used_bits,
                        offset: turbo.data.offset,
                    }))
                }
                TzxBlock::TextDescription(_) => Ok(None),
            },
        }
    }
}

fn read_tzx_span(reader: &mut dyn TapeSource, span: DataSpan) -> Result<Vec<u8>, TapeError> {
    read_span(reader, span.offset, u64::from(span.len))
}

fn read_span<R: Read + Seek + ?Sized>(
    reader: &mut R,
    offset: u64,
    len: u64,
) -> Result<Vec<u8>, TapeError> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut data = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
    (&mut *reader).take(len).read_to_end(&mut data)?;
    Ok(data)
}
