// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use nes::cpu::CPU;
use utils::arithmetic;
use utils::paging;

/// The ways an instruction can locate its operand. Every mode except
/// Implied and Accumulator consumes one or two bytes after the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    // No operand at all (CLC, RTS, ...).
    Implied,

    // Operates on the accumulator itself (ASL A).
    Accumulator,

    // #$nn, the byte after the opcode is the operand.
    Immediate,

    // $nn, an address restricted to page zero.
    ZeroPage,

    // $nn,X and $nn,Y. The sum wraps within page zero so no page is ever
    // crossed.
    ZeroPageX,
    ZeroPageY,

    // $nnnn, a full little-endian address.
    Absolute,

    // $nnnn,X and $nnnn,Y. Wraps at 0xFFFF and may cross a page.
    AbsoluteX,
    AbsoluteY,

    // ($nnnn), only used by JMP. Reproduces the page wrap bug when the
    // pointer's low byte is 0xFF.
    Indirect,

    // ($nn,X), the pointer is read from page zero at (operand + X).
    IndirectX,

    // ($nn),Y, the pointer is read from page zero at the operand, then Y is
    // added to it.
    IndirectY,

    // Signed 8-bit displacement used by branches.
    Relative,
}

impl AddressingMode {
    /// Number of operand bytes that follow the opcode.
    pub fn operand_len(self) -> u8 {
        use self::AddressingMode::*;

        match self {
            Implied | Accumulator => 0,
            Immediate | ZeroPage | ZeroPageX | ZeroPageY |
            IndirectX | IndirectY | Relative => 1,
            Absolute | AbsoluteX | AbsoluteY | Indirect => 2,
        }
    }
}

/// Where an instruction finds (or puts) its data once the addressing mode
/// has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    Accumulator,
    Immediate(u8),
    Address(u16),
}

/// Result of resolving an addressing mode. `page_crossed` is only
/// meaningful for the indexed modes and for branch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub operand: Operand,
    pub page_crossed: bool,
}

impl Resolved {
    fn new(operand: Operand) -> Resolved {
        Resolved { operand: operand, page_crossed: false }
    }

    fn indexed(base: u16, addr: u16) -> Resolved {
        Resolved {
            operand: Operand::Address(addr),
            page_crossed: paging::page_cross(base, addr).crossed(),
        }
    }
}

impl CPU {
    /// Consumes the operand bytes of the current instruction and computes
    /// its effective operand. The program counter must already point past
    /// the opcode; it is left pointing at the next instruction.
    pub fn resolve(&mut self, mode: AddressingMode) -> Resolved {
        match mode {
            AddressingMode::Implied => Resolved::new(Operand::None),
            AddressingMode::Accumulator => Resolved::new(Operand::Accumulator),
            AddressingMode::Immediate => {
                let value = self.fetch_u8();
                Resolved::new(Operand::Immediate(value))
            },
            AddressingMode::ZeroPage => {
                let addr = self.fetch_u8() as u16;
                Resolved::new(Operand::Address(addr))
            },
            AddressingMode::ZeroPageX => {
                let addr = self.fetch_u8().wrapping_add(self.x) as u16;
                Resolved::new(Operand::Address(addr))
            },
            AddressingMode::ZeroPageY => {
                let addr = self.fetch_u8().wrapping_add(self.y) as u16;
                Resolved::new(Operand::Address(addr))
            },
            AddressingMode::Absolute => {
                let addr = self.fetch_u16();
                Resolved::new(Operand::Address(addr))
            },
            AddressingMode::AbsoluteX => {
                let base = self.fetch_u16();
                Resolved::indexed(base, base.wrapping_add(self.x as u16))
            },
            AddressingMode::AbsoluteY => {
                let base = self.fetch_u16();
                Resolved::indexed(base, base.wrapping_add(self.y as u16))
            },
            AddressingMode::Indirect => {
                let ptr = self.fetch_u16();
                let addr = self.memory.read_u16_wrapped_msb(ptr);
                Resolved::new(Operand::Address(addr))
            },
            AddressingMode::IndirectX => {
                let ptr = self.fetch_u8().wrapping_add(self.x);
                let addr = self.memory.read_u16_zero_page(ptr);
                Resolved::new(Operand::Address(addr))
            },
            AddressingMode::IndirectY => {
                let ptr = self.fetch_u8();
                let base = self.memory.read_u16_zero_page(ptr);
                Resolved::indexed(base, base.wrapping_add(self.y as u16))
            },
            AddressingMode::Relative => {
                // The displacement is relative to the address of the next
                // instruction, so the page check compares against that too.
                let displacement = self.fetch_u8() as i8;
                let target = arithmetic::add_relative(self.pc, displacement);
                Resolved::indexed(self.pc, target)
            },
        }
    }
}
