//! Block index over an open TZX image.

use std::io::{Read, Seek, SeekFrom};

use format_spectrum_tap::{BlockInfo, BlockKind, read_u8, read_u16_le};
use log::debug;

use crate::{DataSpan, TurboSpeed, TzxBlock, TzxError};

/// File signature.
pub const MAGIC: &[u8; 8] = b"ZXTape!\x1A";

/// Signature plus major and minor version.
pub const HEADER_LEN: u64 = 10;

const STANDARD_HEADER: u64 = 4;
const TURBO_HEADER: u64 = 18;

/// Block index of a TZX image: the offset of every block's ID byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TzxIndex {
    version: (u8, u8),
    file_size: u64,
    offsets: Vec<u64>,
}

impl TzxIndex {
    /// Verify the header and walk every block.
    pub fn scan<R: Read + Seek>(reader: &mut R) -> Result<Self, TzxError> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        if file_size == 0 {
            return Err(TzxError::Empty);
        }
        if file_size < HEADER_LEN {
            return Err(TzxError::BadSignature);
        }

        reader.seek(SeekFrom::Start(0))?;
        let mut header = [0u8; HEADER_LEN as usize];
        reader.read_exact(&mut header)?;
        if &header[0..8] != MAGIC {
            return Err(TzxError::BadSignature);
        }
        let version = (header[8], header[9]);

        let mut offsets = Vec::new();
        let mut pos = HEADER_LEN;
        while pos < file_size {
            reader.seek(SeekFrom::Start(pos))?;
            let tag = read_u8(reader)?;
            let need = |n: u64| {
                if pos + 1 + n > file_size {
                    Err(TzxError::Truncated { offset: pos })
                } else {
                    Ok(())
                }
            };

            let body = match tag {
                0x10 => {
                    need(STANDARD_HEADER)?;
                    let _pause = read_u16_le(reader)?;
                    STANDARD_HEADER + u64::from(read_u16_le(reader)?)
                }
                0x11 => {
                    need(TURBO_HEADER)?;
                    let mut fields = [0u8; TURBO_HEADER as usize];
                    reader.read_exact(&mut fields)?;
                    TURBO_HEADER + u64::from(read_u24_le(&fields, 15))
                }
                0x30 => {
                    need(1)?;
                    1 + u64::from(read_u8(reader)?)
                }
                other => return Err(TzxError::UnsupportedTag { tag: other, offset: pos }),
            };
            need(body)?;

            debug!("TZX block {} ${tag:02X} at offset {pos}", offsets.len());
            offsets.push(pos);
            pos += 1 + body;
        }

        debug!(
            "TZX image v{}.{:02}: {} blocks, {file_size} bytes",
            version.0,
            version.1,
            offsets.len()
        );
        Ok(Self {
            version,
            file_size,
            offsets,
        })
    }

    /// Major and minor format version.
    #[must_use]
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.offsets.len()
    }

    /// Offset of `block`'s ID byte.
    pub fn offset(&self, block: usize) -> Result<u64, TzxError> {
        self.offsets
            .get(block)
            .copied()
            .ok_or(TzxError::BlockOutOfRange {
                block,
                count: self.offsets.len(),
            })
    }

    /// Decode `block`'s header fields. Leaves `reader` at the start of the
    /// block's data (or after the text, for descriptions).
    pub fn block<R: Read + Seek>(&self, reader: &mut R, block: usize) -> Result<TzxBlock, TzxError> {
        let offset = self.offset(block)?;
        reader.seek(SeekFrom::Start(offset))?;
        let tag = read_u8(reader)?;
        match tag {
            0x10 => {
                let pause_ms = read_u16_le(reader)?;
                let len = u32::from(read_u16_le(reader)?);
                Ok(TzxBlock::StandardSpeed {
                    pause_ms,
                    data: DataSpan {
                        offset: offset + 1 + STANDARD_HEADER,
                        len,
                    },
                })
            }
            0x11 => {
                let mut f = [0u8; TURBO_HEADER as usize];
                reader.read_exact(&mut f)?;
                let word = |i: usize| u16::from_le_bytes([f[i], f[i + 1]]);
                Ok(TzxBlock::TurboSpeed(TurboSpeed {
                    pilot_pulse: word(0),
                    sync1_pulse: word(2),
                    sync2_pulse: word(4),
                    zero_pulse: word(6),
                    one_pulse: word(8),
                    pilot_count: word(10),
                    used_bits: f[12],
                    pause_ms: word(13),
                    data: DataSpan {
                        offset: offset + 1 + TURBO_HEADER,
                        len: read_u24_le(&f, 15),
                    },
                }))
            }
            0x30 => {
                let len = usize::from(read_u8(reader)?);
                let mut text = vec![0u8; len];
                reader.read_exact(&mut text)?;
                Ok(TzxBlock::TextDescription(
                    text.iter().map(|&b| char::from(b)).collect(),
                ))
            }
            other => Err(TzxError::UnsupportedTag { tag: other, offset }),
        }
    }

    /// Classify `block` for a listing.
    pub fn describe<R: Read + Seek>(&self, reader: &mut R, block: usize) -> Result<BlockInfo, TzxError> {
        let data = match self.block(reader, block)? {
            TzxBlock::TextDescription(text) => {
                return Ok(BlockInfo {
                    kind: BlockKind::Info,
                    header: false,
                    length: text.len(),
                    name: Some(text),
                });
            }
            TzxBlock::StandardSpeed { data, .. } => data,
            TzxBlock::TurboSpeed(turbo) => turbo.data,
        };

        let mut head = vec![0u8; data.len.min(12) as usize];
        reader.seek(SeekFrom::Start(data.offset))?;
        reader.read_exact(&mut head)?;
        Ok(BlockInfo::classify(data.len as usize, &head))
    }
}

fn read_u24_le(data: &[u8], pos: usize) -> u32 {
    u32::from(data[pos]) | (u32::from(data[pos + 1]) << 8) | (u32::from(data[pos + 2]) << 16)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn tzx_header() -> Vec<u8> {
        let mut h = MAGIC.to_vec();
        h.push(1); // major
        h.push(20); // minor
        h
    }

    fn standard_block(pause_ms: u16, payload: &[u8]) -> Vec<u8> {
        let mut b = vec![0x10];
        b.extend_from_slice(&pause_ms.to_le_bytes());
        b.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        b.extend_from_slice(payload);
        b
    }

    fn turbo_block(payload: &[u8]) -> Vec<u8> {
        let mut b = vec![0x11];
        for word in [2168u16, 667, 735, 855, 1710, 3223] {
            b.extend_from_slice(&word.to_le_bytes());
        }
        b.push(6); // used bits
        b.extend_from_slice(&500u16.to_le_bytes());
        let len = payload.len() as u32;
        b.extend_from_slice(&len.to_le_bytes()[..3]);
        b.extend_from_slice(payload);
        b
    }

    fn text_block(text: &str) -> Vec<u8> {
        let mut b = vec![0x30, text.len() as u8];
        b.extend_from_slice(text.as_bytes());
        b
    }

    fn header_payload() -> Vec<u8> {
        let mut p = vec![0x00, 0x00];
        p.extend_from_slice(b"LOADER    ");
        p.extend_from_slice(&[0; 6]);
        p.push(0); // checksum (unchecked here)
        p
    }

    #[test]
    fn indexes_every_supported_block() {
        let mut image = tzx_header();
        image.extend(text_block("Side A"));
        image.extend(standard_block(1000, &header_payload()));
        image.extend(turbo_block(&[0xFF, 1, 2, 3]));
        let mut reader = Cursor::new(image);

        let index = TzxIndex::scan(&mut reader).expect("valid image");
        assert_eq!(index.version(), (1, 20));
        assert_eq!(index.block_count(), 3);
        assert_eq!(index.offset(0).expect("block 0"), 10);
        assert_eq!(index.offset(1).expect("block 1"), 10 + 8);
        assert_eq!(index.offset(2).expect("block 2"), 10 + 8 + 24);
    }

    #[test]
    fn decodes_turbo_timing() {
        let mut image = tzx_header();
        image.extend(turbo_block(&[0xFF, 0xAA]));
        let mut reader = Cursor::new(image);
        let index = TzxIndex::scan(&mut reader).expect("valid image");

        let TzxBlock::TurboSpeed(turbo) = index.block(&mut reader, 0).expect("block") else {
            panic!("expected turbo block");
        };
        assert_eq!(turbo.pilot_pulse, 2168);
        assert_eq!(turbo.one_pulse, 1710);
        assert_eq!(turbo.pilot_count, 3223);
        assert_eq!(turbo.used_bits, 6);
        assert_eq!(turbo.pause_ms, 500);
        assert_eq!(turbo.data, DataSpan { offset: 29, len: 2 });
    }

    #[test]
    fn describes_standard_header_and_text() {
        let mut image = tzx_header();
        image.extend(text_block("Side A"));
        image.extend(standard_block(1000, &header_payload()));
        let mut reader = Cursor::new(image);
        let index = TzxIndex::scan(&mut reader).expect("valid image");

        let text = index.describe(&mut reader, 0).expect("text");
        assert_eq!(text.kind, BlockKind::Info);
        assert_eq!(text.name.as_deref(), Some("Side A"));

        let header = index.describe(&mut reader, 1).expect("header");
        assert_eq!(header.kind, BlockKind::Program);
        assert_eq!(header.name.as_deref(), Some("LOADER    "));
        assert_eq!(header.length, 19);
    }

    #[test]
    fn unknown_block_aborts_scan() {
        let mut image = tzx_header();
        image.extend(standard_block(1000, &[0xFF, 1, 2]));
        image.extend_from_slice(&[0x20, 0xE8, 0x03]);
        let mut reader = Cursor::new(image);
        assert!(matches!(
            TzxIndex::scan(&mut reader),
            Err(TzxError::UnsupportedTag { tag: 0x20, offset: 18 })
        ));
    }

    #[test]
    fn bad_signature_is_rejected() {
        let mut image = b"ZXTape?\x1A\x01\x14".to_vec();
        image.extend(text_block("x"));
        let mut reader = Cursor::new(image);
        assert!(matches!(
            TzxIndex::scan(&mut reader),
            Err(TzxError::BadSignature)
        ));
    }

    #[test]
    fn short_payload_is_truncated() {
        let mut image = tzx_header();
        let mut block = standard_block(0, &[0xFF, 1, 2, 3]);
        block.truncate(block.len() - 2);
        image.extend(block);
        let mut reader = Cursor::new(image);
        assert!(matches!(
            TzxIndex::scan(&mut reader),
            Err(TzxError::Truncated { offset: 10 })
        ));
    }

    #[test]
    fn header_only_image_has_no_blocks() {
        let mut reader = Cursor::new(tzx_header());
        let index = TzxIndex::scan(&mut reader).expect("valid image");
        assert_eq!(index.block_count(), 0);
        assert!(index.offset(0).is_err());
    }
}
