use std::io;

use thiserror::Error;

/// Errors raised while indexing or reading a TZX image.
#[derive(Debug, Error)]
pub enum TzxError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("tape image is empty")]
    Empty,

    #[error("invalid TZX signature")]
    BadSignature,

    #[error("unsupported TZX block ${tag:02X} at offset {offset}")]
    UnsupportedTag { tag: u8, offset: u64 },

    #[error("truncated TZX block at offset {offset}")]
    Truncated { offset: u64 },

    #[error("block {block} out of range ({count} blocks)")]
    BlockOutOfRange { block: usize, count: usize },
}
