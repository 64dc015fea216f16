// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

const SIGN_BITMASK: u8 = 0b10000000;

/// Checks if an unsigned number would be negative if it was signed. This is
/// done by checking if the 7th bit is set.
#[inline(always)]
pub fn is_negative(arg: u8) -> bool {
    arg & SIGN_BITMASK == SIGN_BITMASK
}

/// Adds a relative displacement to an address. This is useful for operations
/// using relative addressing that allow branching forwards or backwards.
#[inline(always)]
pub fn add_relative(base_addr: u16, displacement: i8) -> u16 {
    base_addr.wrapping_add(displacement as i16 as u16)
}

/// Determines if adding two operands produced a signed overflow, i.e. both
/// operands share a sign and the result has the other one. Subtraction is
/// checked by passing the inverted operand.
#[inline(always)]
pub fn signed_overflow(operand1: u8, operand2: u8, result: u8) -> bool {
    (operand1 ^ result) & (operand2 ^ result) & SIGN_BITMASK != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_bit() {
        assert!(is_negative(0x80));
        assert!(is_negative(0xFF));
        assert!(!is_negative(0x7F));
        assert!(!is_negative(0x00));
    }

    #[test]
    fn relative_displacement() {
        assert_eq!(add_relative(0x8012, 5), 0x8017);
        assert_eq!(add_relative(0x8012, -3), 0x800F);
        assert_eq!(add_relative(0x8012, -128), 0x7F92);
        assert_eq!(add_relative(0xFFFE, 4), 0x0002);
    }

    #[test]
    fn overflow_rule() {
        // 0x7F + 0x01 = 0x80: positive + positive = negative.
        assert!(signed_overflow(0x7F, 0x01, 0x80));
        // 0x80 + 0xFF = 0x7F: negative + negative = positive.
        assert!(signed_overflow(0x80, 0xFF, 0x7F));
        assert!(!signed_overflow(0x01, 0x01, 0x02));
        assert!(!signed_overflow(0x7F, 0x80, 0xFF));
    }
}
