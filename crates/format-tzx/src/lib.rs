//! TZX tape images.
//!
//! TZX extends TAP with per-block timing. A 10-byte header ("ZXTape!" + $1A,
//! major and minor version) is followed by chained blocks, each starting with
//! an ID byte. Only the blocks needed for ROM-compatible loaders are
//! understood:
//!
//! - `$10` standard speed data
//! - `$11` turbo speed data
//! - `$30` text description
//!
//! Any other ID aborts the scan. Block bodies vary in size, so every block's
//! offset is indexed.

mod block;
mod error;
mod index;

pub use block::{DataSpan, TurboSpeed, TzxBlock};
pub use error::TzxError;
pub use index::{HEADER_LEN, MAGIC, TzxIndex};
