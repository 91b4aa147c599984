//! Instant loading and saving through the ROM tape routines.
//!
//! `LD-BYTES` ($0556) and `SA-BYTES` ($04C2) are bypassed: the block is
//! copied straight into (or out of) memory and the registers are patched to
//! what the ROM would have left behind. Entry conditions:
//!
//! | Register | LD-BYTES                     | SA-BYTES        |
//! |----------|------------------------------|-----------------|
//! | A'       | expected flag byte           |                 |
//! | A        |                              | flag byte       |
//! | IX       | destination                  | source          |
//! | DE       | byte count                   | byte count      |

use std::fs::OpenOptions;
use std::io::BufWriter;

use emu_core::Z80Registers;
use emu_core::flags::{cp8, xor8};
use format_spectrum_tap::write_block;
use log::debug;

use super::{NoticeLevel, TapeDeck};
use crate::TapeError;
use crate::memory::Memory;

/// F after `LD-BYTES` gives up waiting for an edge: Z set, C clear.
const TIMEOUT_FLAGS: u8 = 0x50;

impl TapeDeck {
    /// Load the current block as `LD-BYTES` would.
    ///
    /// Returns `true` when the registers now hold the routine's result and
    /// the caller should return from it; `false` leaves the ROM to run (no
    /// tape, or a flag mismatch on the last block).
    pub fn flash_load<C: Z80Registers>(&mut self, cpu: &mut C, memory: &mut Memory) -> bool {
        let Some(container) = &mut self.container else {
            return false;
        };
        let block_count = container.block_count();
        let (block, signal) = match container.signal_from(self.current_block, self.timing.profile()) {
            Ok(Some(found)) => found,
            Ok(None) => {
                self.current_block = 0;
                return false;
            }
            Err(err) => {
                self.notify(NoticeLevel::Error, format!("Tape error: {err}"));
                return false;
            }
        };
        let data = signal.data;
        let block_len = data.len();
        let next = block + 1;

        let Some(&flag) = data.first().filter(|&&flag| flag == cpu.a_alt()) else {
            // Wrong block type: the ROM would skip it.
            let flag = data.first().copied().unwrap_or(0xFF);
            debug!("Flash load: block {block} flag {flag:02X}, wanted {:02X}", cpu.a_alt());
            cpu.set_f(0);
            cpu.set_a(cpu.a_alt() ^ flag);
            if next < block_count {
                self.current_block = next;
                return true;
            }
            self.current_block = 0;
            return false;
        };

        let requested = cpu.de();
        let available = block_len.saturating_sub(1);
        let count = usize::from(requested).min(available);
        let payload = &data[1..=count];
        let ix = cpu.ix();
        memory.load(ix, payload);

        // The parity includes the flag byte.
        let mut a = payload.iter().fold(flag, |a, &byte| xor8(a, byte).0);

        let expected = block_len as i64 - 2;
        let f = if i64::from(requested) > expected {
            // Fewer bytes on tape than asked for.
            TIMEOUT_FLAGS
        } else {
            a = xor8(a, data[1 + count]).0;
            cp8(a, 1)
        };
        cpu.set_a(a);
        cpu.set_f(f);

        self.current_block = if next < block_count { next } else { 0 };
        debug!("Flash load: block {block}, {count} bytes at {ix:04X}");

        cpu.set_ix(ix.wrapping_add(count as u16));
        cpu.set_de((i64::from(requested) - expected) as u16);
        true
    }

    /// Append the block `SA-BYTES` would write to the save file.
    ///
    /// Returns `true` when the block was written and the registers reflect a
    /// completed save.
    pub fn save<C: Z80Registers>(&mut self, cpu: &mut C, memory: &Memory) -> bool {
        let flag = cpu.a();
        let start = cpu.ix();
        let len = cpu.de();
        let data: Vec<u8> = (0..len).map(|i| memory.read(start.wrapping_add(i))).collect();

        match self.append_block(flag, &data) {
            Ok(()) => {
                cpu.set_ix(start.wrapping_add(len).wrapping_add(2));
                cpu.set_de(0);
                self.notify(
                    NoticeLevel::Info,
                    format!("Saved {len} bytes (flag {flag:02X})"),
                );
                true
            }
            Err(err) => {
                self.notify(NoticeLevel::Error, format!("Save failed: {err}"));
                false
            }
        }
    }

    fn append_block(&self, flag: u8, data: &[u8]) -> Result<(), TapeError> {
        let path = self.save_path.as_ref().ok_or(TapeError::NoSavePath)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        write_block(&mut writer, flag, data)?;
        writer.into_inner().map_err(|e| e.into_error())?;
        Ok(())
    }
}
