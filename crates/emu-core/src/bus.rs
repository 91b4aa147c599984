//! Memory and I/O bus interface seen by the instruction engine.

/// Memory and I/O bus interface.
///
/// Every method charges T-states against the machine's frame counter. The
/// engine never advances time on its own; an instruction's duration is the sum
/// of the costs of the bus operations it performs.
pub trait Z80Bus {
    /// M1 opcode fetch (4 T-states, plus contention).
    fn fetch_opcode(&mut self, address: u16) -> u8;

    /// Read a byte (3 T-states, plus contention).
    fn peek8(&mut self, address: u16) -> u8;

    /// Write a byte (3 T-states, plus contention). Writes to ROM are dropped.
    fn poke8(&mut self, address: u16, value: u8);

    /// Read a little-endian word.
    fn peek16(&mut self, address: u16) -> u16;

    /// Write a little-endian word.
    fn poke16(&mut self, address: u16, value: u16);

    /// Hold `address` on the bus for `tstates` internal cycles.
    fn address_on_bus(&mut self, address: u16, tstates: u32);

    /// Port read.
    fn input(&mut self, port: u16) -> u8;

    /// Port write.
    fn output(&mut self, port: u16, value: u8);

    /// Whether the INT line is asserted at the current T-state.
    fn is_active_int(&self) -> bool;

    /// Signal that the CPU executed HALT and will idle for the rest of the
    /// frame. The machine catches up refresh and video state at frame end.
    fn halt(&mut self);
}
