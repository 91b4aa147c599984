//! Sparse block index over an open TAP image.

use std::io::{Read, Seek, SeekFrom};

use log::{debug, warn};

use crate::{BlockInfo, TapError, read_u8, read_u16_le};

/// One offset is kept per this many blocks.
pub const LISTING_DIV: usize = 16;

/// Block index of a TAP image.
///
/// Only every [`LISTING_DIV`]th block offset is stored; [`TapIndex::seek`]
/// walks the length prefixes from the nearest stored offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapIndex {
    file_size: u64,
    block_count: usize,
    listing: Vec<u64>,
}

impl TapIndex {
    /// Scan the whole image once.
    ///
    /// A final block whose declared length runs past the end of the file is
    /// kept (playback simply stops early); a dangling single byte where a
    /// length prefix should be is an error.
    pub fn scan<R: Read + Seek>(reader: &mut R) -> Result<Self, TapError> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        if file_size == 0 {
            return Err(TapError::Empty);
        }

        let mut listing = Vec::new();
        let mut block_count = 0;
        let mut pos = 0u64;

        while pos < file_size {
            if pos + 2 > file_size {
                return Err(TapError::Truncated { offset: pos });
            }
            reader.seek(SeekFrom::Start(pos))?;
            let len = read_u16_le(reader)?;

            if block_count % LISTING_DIV == 0 {
                listing.push(pos);
            }
            block_count += 1;

            let end = pos + 2 + u64::from(len);
            if end > file_size {
                warn!(
                    "TAP block {} at offset {pos} declares {len} bytes, only {} remain",
                    block_count - 1,
                    file_size - pos - 2
                );
            }
            pos = end;
        }

        debug!("TAP image: {block_count} blocks, {file_size} bytes");
        Ok(Self {
            file_size,
            block_count,
            listing,
        })
    }

    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Position `reader` at the length prefix of `block` and return its offset.
    pub fn seek<R: Read + Seek>(&self, reader: &mut R, block: usize) -> Result<u64, TapError> {
        let out_of_range = TapError::BlockOutOfRange {
            block,
            count: self.block_count,
        };
        if block >= self.block_count {
            return Err(out_of_range);
        }
        let mut pos = *self.listing.get(block / LISTING_DIV).ok_or(out_of_range)?;
        for _ in 0..block % LISTING_DIV {
            reader.seek(SeekFrom::Start(pos))?;
            pos += u64::from(read_u16_le(reader)?) + 2;
        }
        reader.seek(SeekFrom::Start(pos))?;
        Ok(pos)
    }

    /// Classify `block` for a listing.
    pub fn describe<R: Read + Seek>(&self, reader: &mut R, block: usize) -> Result<BlockInfo, TapError> {
        let offset = self.seek(reader, block)?;
        let length = usize::from(read_u16_le(reader)?);

        // A fragment at the very end may have no flag byte.
        let available = self.file_size.saturating_sub(offset + 2);
        let want = available.min(12).min(length as u64) as usize;
        let mut head = vec![0u8; want];
        for byte in &mut head {
            *byte = read_u8(reader)?;
        }
        Ok(BlockInfo::classify(length, &head))
    }
}
