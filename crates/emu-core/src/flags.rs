//! Z80 flag register bits and the flag results of the few ALU operations
//! the machine performs on the CPU's behalf.

/// Sign flag (bit 7).
pub const SF: u8 = 0b1000_0000;

/// Zero flag (bit 6).
pub const ZF: u8 = 0b0100_0000;

/// Undocumented flag (bit 5), copy of bit 5 of result.
pub const YF: u8 = 0b0010_0000;

/// Half-carry flag (bit 4).
pub const HF: u8 = 0b0001_0000;

/// Undocumented flag (bit 3), copy of bit 3 of result.
pub const XF: u8 = 0b0000_1000;

/// Parity/Overflow flag (bit 2).
pub const PF: u8 = 0b0000_0100;

/// Add/Subtract flag (bit 1).
pub const NF: u8 = 0b0000_0010;

/// Carry flag (bit 0).
pub const CF: u8 = 0b0000_0001;

/// True if `value` has an even number of set bits.
#[must_use]
pub const fn parity(value: u8) -> bool {
    value.count_ones().is_multiple_of(2)
}

/// S, Z and the undocumented bits for a result.
#[must_use]
pub const fn sz53(value: u8) -> u8 {
    let mut f = 0;
    if value == 0 {
        f |= ZF;
    }
    if value & 0x80 != 0 {
        f |= SF;
    }
    f |= value & (YF | XF);
    f
}

/// S, Z, undocumented bits and parity for a result.
#[must_use]
pub const fn sz53p(value: u8) -> u8 {
    let mut f = sz53(value);
    if parity(value) {
        f |= PF;
    }
    f
}

/// `XOR n`: returns the new accumulator and flags.
#[must_use]
pub const fn xor8(a: u8, value: u8) -> (u8, u8) {
    let result = a ^ value;
    (result, sz53p(result))
}

/// `CP n`: flags only. The undocumented bits come from the operand.
#[must_use]
pub const fn cp8(a: u8, value: u8) -> u8 {
    let result = a.wrapping_sub(value);
    let mut f = NF | (value & (YF | XF));
    if result == 0 {
        f |= ZF;
    }
    if result & 0x80 != 0 {
        f |= SF;
    }
    if (a & 0x0F) < (value & 0x0F) {
        f |= HF;
    }
    if a < value {
        f |= CF;
    }
    // Overflow: operands of different sign and result sign differs from a.
    if ((a ^ value) & (a ^ result) & 0x80) != 0 {
        f |= PF;
    }
    f
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xor_sets_parity_and_zero() {
        let (a, f) = xor8(0x5A, 0x5A);
        assert_eq!(a, 0);
        assert_eq!(f, ZF | PF);

        let (a, f) = xor8(0x00, 0x81);
        assert_eq!(a, 0x81);
        assert_eq!(f, SF | PF);
    }

    #[test]
    fn cp_one_sets_carry_only_for_zero() {
        assert_ne!(cp8(0x00, 0x01) & CF, 0);
        assert_eq!(cp8(0x01, 0x01) & CF, 0);
        assert_ne!(cp8(0x01, 0x01) & ZF, 0);
        assert_eq!(cp8(0x20, 0x01) & CF, 0);
    }

    #[test]
    fn cp_flags_overflow_on_signed_wrap() {
        assert_ne!(cp8(0x80, 0x01) & PF, 0);
        assert_eq!(cp8(0x7F, 0x01) & PF, 0);
    }
}
