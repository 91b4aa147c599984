use std::io;
use std::path::PathBuf;

use format_spectrum_tap::TapError;
use format_tzx::TzxError;
use thiserror::Error;

use crate::SpectrumModel;

/// Invalid machine configuration. Fatal for the caller that built it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown machine model {0:?} (expected 48k, 128k or pentagon)")]
    UnknownModel(String),

    #[error("{model} needs {expected} ROM image(s), got {found}")]
    RomCount {
        model: SpectrumModel,
        expected: usize,
        found: usize,
    },

    #[error("ROM image {index} is {len} bytes, expected 16384")]
    RomSize { index: usize, len: usize },

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failed tape operation. Reported to the user, never to the scheduler.
#[derive(Debug, Error)]
pub enum TapeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Tap(#[from] TapError),

    #[error(transparent)]
    Tzx(#[from] TzxError),

    #[error("unrecognised tape image {0} (expected .tap or .tzx)")]
    UnknownFormat(PathBuf),

    #[error("no tape inserted")]
    NoTape,

    #[error("no save file configured")]
    NoSavePath,
}
