// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;

// Flag constants that allow easy bitwise getting and setting of flag values.
pub const CARRY_FLAG       : u8 = 0x1;
pub const ZERO_FLAG        : u8 = 0x2;
pub const INTERRUPT_DISABLE: u8 = 0x4;
pub const DECIMAL_MODE     : u8 = 0x8;
pub const BREAK_COMMAND    : u8 = 0x10;
pub const UNUSED_FLAG      : u8 = 0x20;
pub const OVERFLOW_FLAG    : u8 = 0x40;
pub const NEGATIVE_FLAG    : u8 = 0x80;

/// Names of the bits in the processor status register.
///
/// Carry:
///
/// Set if the last operation caused an overflow from bit 7 of the result or
/// an underflow from bit 0. Subtraction sets it when no borrow was needed.
///
/// Zero:
///
/// Set if the result of the last operation was zero.
///
/// Interrupt Disable:
///
/// While set the processor will not respond to IRQs. NMIs are unaffected.
///
/// Decimal Mode: (UNUSED in 2A03)
///
/// Can be set and cleared, but the 2A03 has no binary-coded decimal unit so
/// arithmetic ignores it.
///
/// Break Command:
///
/// Only exists in the copy of the status register pushed by BRK and PHP.
///
/// Unused:
///
/// Bit 5 is wired high and always reads as one.
///
/// Overflow:
///
/// Set when an addition or subtraction produced an invalid two's complement
/// result (e.g. 64 + 64 => -128).
///
/// Negative:
///
/// Copy of bit 7 of the last result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Carry,
    Zero,
    InterruptDisable,
    Decimal,
    Break,
    Unused,
    Overflow,
    Negative,
}

impl Flag {
    /// Every flag, ordered from bit 0 to bit 7.
    pub const ALL: [Flag; 8] = [
        Flag::Carry,
        Flag::Zero,
        Flag::InterruptDisable,
        Flag::Decimal,
        Flag::Break,
        Flag::Unused,
        Flag::Overflow,
        Flag::Negative,
    ];

    /// Bit mask of the flag within the status byte.
    #[inline(always)]
    pub fn mask(self) -> u8 {
        match self {
            Flag::Carry            => CARRY_FLAG,
            Flag::Zero             => ZERO_FLAG,
            Flag::InterruptDisable => INTERRUPT_DISABLE,
            Flag::Decimal          => DECIMAL_MODE,
            Flag::Break            => BREAK_COMMAND,
            Flag::Unused           => UNUSED_FLAG,
            Flag::Overflow         => OVERFLOW_FLAG,
            Flag::Negative         => NEGATIVE_FLAG,
        }
    }

    /// Single letter used for the flag in `NV-BDIZC` listings.
    pub fn letter(self) -> char {
        match self {
            Flag::Carry            => 'C',
            Flag::Zero             => 'Z',
            Flag::InterruptDisable => 'I',
            Flag::Decimal          => 'D',
            Flag::Break            => 'B',
            Flag::Unused           => '-',
            Flag::Overflow         => 'V',
            Flag::Negative         => 'N',
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            Flag::Carry            => "Carry Flag",
            Flag::Zero             => "Zero Flag",
            Flag::InterruptDisable => "Interrupt Disable",
            Flag::Decimal          => "Decimal Mode",
            Flag::Break            => "Break Command",
            Flag::Unused           => "Unused",
            Flag::Overflow         => "Overflow Flag",
            Flag::Negative         => "Negative Flag",
        };
        f.write_str(name)
    }
}

/// Status byte as written to the stack. BRK and PHP push it with the break
/// bit set, hardware interrupts push it clear.
#[inline(always)]
pub fn pushed_status(p: u8, brk: bool) -> u8 {
    if brk {
        p | UNUSED_FLAG | BREAK_COMMAND
    } else {
        (p | UNUSED_FLAG) & !BREAK_COMMAND
    }
}

/// Status byte as restored from the stack by PLP and RTI. The break bit has
/// no storage in the live register and bit 5 is forced high.
#[inline(always)]
pub fn pulled_status(value: u8) -> u8 {
    (value | UNUSED_FLAG) & !BREAK_COMMAND
}

/// Formats a status byte as an `NV-BDIZC` listing with cleared flags shown
/// in lowercase.
pub fn describe(p: u8) -> String {
    Flag::ALL.iter().rev().map(|flag| {
        if p & flag.mask() != 0 {
            flag.letter()
        } else {
            flag.letter().to_ascii_lowercase()
        }
    }).collect()
}
