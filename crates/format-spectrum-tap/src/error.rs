use std::io;

use thiserror::Error;

/// Errors raised while indexing or seeking a TAP image.
#[derive(Debug, Error)]
pub enum TapError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("tape image is empty")]
    Empty,

    #[error("truncated length prefix at offset {offset}")]
    Truncated { offset: u64 },

    #[error("block {block} out of range ({count} blocks)")]
    BlockOutOfRange { block: usize, count: usize },
}
