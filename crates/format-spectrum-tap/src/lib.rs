//! ZX Spectrum TAP tape images.
//!
//! TAP is the simplest Spectrum tape format: sequential blocks of data, each
//! preceded by a 2-byte little-endian length word. Each block contains a flag
//! byte, data bytes, and a checksum byte (XOR of flag + data).
//!
//! A typical program consists of two blocks:
//!   1. Header block (flag $00, 17 bytes of metadata)
//!   2. Data block (flag $FF, the actual program/data)
//!
//! Images are never loaded whole. [`TapIndex`] scans the file once and keeps
//! the offset of every 16th block; everything else is read on demand from the
//! open handle.

mod block;
mod error;
mod index;
mod io;

pub use block::{BlockInfo, BlockKind, HEADER_LENGTH};
pub use error::TapError;
pub use index::{LISTING_DIV, TapIndex};
pub use io::{read_u8, read_u16_le, write_block};
