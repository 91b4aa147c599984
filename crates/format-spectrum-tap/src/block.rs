//! Block classification for tape listings.

use std::fmt;

/// Declared length of a standard header block: flag, type, 10-byte name,
/// two parameter words and checksum.
pub const HEADER_LENGTH: usize = 19;

/// What a block holds, as shown in a tape listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Program,
    NumberArray,
    CharacterArray,
    Code,
    /// Header type 4, or any block that is not a standard header.
    Data,
    Info,
    Unassigned,
}

impl BlockKind {
    /// Map a header's type byte.
    #[must_use]
    pub fn from_header_type(value: u8) -> Self {
        match value {
            0 => Self::Program,
            1 => Self::NumberArray,
            2 => Self::CharacterArray,
            3 => Self::Code,
            4 => Self::Data,
            5 => Self::Info,
            _ => Self::Unassigned,
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Program => "Program",
            Self::NumberArray => "Number array",
            Self::CharacterArray => "Char array",
            Self::Code => "Code",
            Self::Data => "Data block",
            Self::Info => "Info",
            Self::Unassigned => "Unassigned",
        };
        f.write_str(label)
    }
}

/// Listing entry for one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub kind: BlockKind,
    /// True when the block is a standard 19-byte header.
    pub header: bool,
    /// The 10-character filename, padding included, for header types 0-5.
    pub name: Option<String>,
    /// Declared on-disk length of the block (flag and checksum included).
    pub length: usize,
}

impl BlockInfo {
    /// Classify a block from its declared length and the first bytes of its
    /// payload (flag, type, filename). `head` may be shorter than 12 bytes
    /// for truncated blocks.
    ///
    /// A block is a header only when both the flag is $00 and the length is
    /// 19; headerless loaders often write flag $00 on data blocks.
    #[must_use]
    pub fn classify(length: usize, head: &[u8]) -> Self {
        let flag = head.first().copied().unwrap_or(0xFF);
        if flag != 0 || length != HEADER_LENGTH {
            return Self {
                kind: BlockKind::Data,
                header: false,
                name: None,
                length,
            };
        }

        let Some(&type_byte) = head.get(1) else {
            return Self {
                kind: BlockKind::Data,
                header: false,
                name: None,
                length,
            };
        };
        let name = if type_byte <= 5 {
            head.get(2..12)
                .map(|bytes| bytes.iter().map(|&b| char::from(b)).collect())
        } else {
            None
        };

        Self {
            kind: BlockKind::from_header_type(type_byte),
            header: true,
            name,
            length,
        }
    }
}
