// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

// Size of the full CPU address space.
pub const MEMORY_SIZE: usize = 0x10000;

// Semantically distinct regions of the address space. They all live in the
// same flat buffer; the ranges only describe who services the bytes.
pub const ZERO_PAGE_START            : u16 = 0x0000;
pub const ZERO_PAGE_END              : u16 = 0x00FF;
pub const STACK_START                : u16 = 0x0100;
pub const STACK_END                  : u16 = 0x01FF;
pub const PPU_CTRL_REGISTERS_START   : u16 = 0x2000;
pub const PPU_CTRL_REGISTERS_END     : u16 = 0x2007;
pub const MISC_CTRL_REGISTERS_START  : u16 = 0x4000;
pub const MISC_CTRL_REGISTERS_END    : u16 = 0x4017;
pub const VECTORS_START              : u16 = 0xFFFA;
pub const VECTORS_END                : u16 = 0xFFFF;

// Interrupt vectors. Each holds a little-endian address.
pub const NMI_VECTOR  : u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR  : u16 = 0xFFFE;

// Location of the first byte on the bottom of the stack. The stack lives on
// memory page 1 (0x100).
pub const STACK_OFFSET: u16 = STACK_START;

/// Named areas of the memory map. The debugger labels dumped rows with
/// them; the CPU itself never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    ZeroPage,
    Stack,
    PpuRegisters,
    ApuIoRegisters,
    Vectors,
    General,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            Region::ZeroPage => "zero page",
            Region::Stack => "stack",
            Region::PpuRegisters => "PPU registers",
            Region::ApuIoRegisters => "APU/IO registers",
            Region::Vectors => "vectors",
            Region::General => "general",
        };
        write!(f, "{}", name)
    }
}

/// The 64 KiB memory image owned by the CPU. Every 16-bit address maps to
/// exactly one cell so reads and writes are total.
///
/// The image is boxed since 64 KiB is too large to comfortably keep on the
/// stack of the host thread.
pub struct Memory {
    cells: Box<[u8]>,
}

impl Memory {
    pub fn new() -> Memory {
        Memory {
            cells: vec![0; MEMORY_SIZE].into_boxed_slice(),
        }
    }

    /// Reads an unsigned 8-bit byte value located at the given address.
    #[inline(always)]
    pub fn read_u8(&self, addr: u16) -> u8 {
        self.cells[addr as usize]
    }

    /// Writes an unsigned 8-bit byte value to the given address.
    #[inline(always)]
    pub fn write_u8(&mut self, addr: u16, val: u8) {
        self.cells[addr as usize] = val;
    }

    /// Reads an unsigned 16-bit value at the given address (little-endian).
    /// The high byte comes from the next address, wrapping at 0xFFFF.
    #[inline(always)]
    pub fn read_u16(&self, addr: u16) -> u16 {
        let bytes = [self.read_u8(addr), self.read_u8(addr.wrapping_add(1))];
        LittleEndian::read_u16(&bytes)
    }

    /// Reads an unsigned 16-bit value at the given address (little-endian)
    /// where the MSB is read at page start if the LSB is at the end of a page.
    /// This exists to properly emulate a hardware bug in the 2A03 where
    /// indirect jumps cannot fetch addresses outside their own page.
    #[inline(always)]
    pub fn read_u16_wrapped_msb(&self, addr: u16) -> u16 {
        let msb_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
        let bytes = [self.read_u8(addr), self.read_u8(msb_addr)];
        LittleEndian::read_u16(&bytes)
    }

    /// Reads a 16-bit pointer out of zero page. The high byte wraps back to
    /// 0x00 when the pointer sits at 0xFF.
    #[inline(always)]
    pub fn read_u16_zero_page(&self, ptr: u8) -> u16 {
        let bytes = [self.read_u8(ptr as u16), self.read_u8(ptr.wrapping_add(1) as u16)];
        LittleEndian::read_u16(&bytes)
    }

    /// Writes an unsigned 16-bit value to the given address (little-endian).
    #[inline(always)]
    pub fn write_u16(&mut self, addr: u16, val: u16) {
        let mut bytes = [0; 2];
        LittleEndian::write_u16(&mut bytes, val);
        self.write_u8(addr, bytes[0]);
        self.write_u8(addr.wrapping_add(1), bytes[1]);
    }

    /// Copies a slice into memory starting at a given address. Writes past
    /// 0xFFFF wrap around to zero page.
    pub fn memdump(&mut self, addr: u16, buf: &[u8]) {
        for (i, byte) in buf.iter().enumerate() {
            self.write_u8(addr.wrapping_add(i as u16), *byte);
        }
    }

    /// Copies `len` bytes starting at `addr` out of memory, wrapping at the
    /// top of the address space.
    pub fn peek(&self, addr: u16, len: usize) -> Vec<u8> {
        (0..len).map(|i| self.read_u8(addr.wrapping_add(i as u16))).collect()
    }

    /// Zeroes the entire image.
    pub fn clear(&mut self) {
        for cell in self.cells.iter_mut() {
            *cell = 0;
        }
    }

    /// Classifies an address into its memory map region.
    pub fn region(addr: u16) -> Region {
        match addr {
            ZERO_PAGE_START...ZERO_PAGE_END => Region::ZeroPage,
            STACK_START...STACK_END => Region::Stack,
            PPU_CTRL_REGISTERS_START...PPU_CTRL_REGISTERS_END => Region::PpuRegisters,
            MISC_CTRL_REGISTERS_START...MISC_CTRL_REGISTERS_END => Region::ApuIoRegisters,
            VECTORS_START...VECTORS_END => Region::Vectors,
            _ => Region::General,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_address_is_backed() {
        let mut memory = Memory::new();
        memory.write_u8(0xFFFF, 0xAB);
        memory.write_u8(0x0000, 0xCD);
        assert_eq!(memory.read_u8(0xFFFF), 0xAB);
        assert_eq!(memory.read_u8(0x0000), 0xCD);
    }

    #[test]
    fn words_are_little_endian() {
        let mut memory = Memory::new();
        memory.write_u16(0x0300, 0xBEEF);
        assert_eq!(memory.read_u8(0x0300), 0xEF);
        assert_eq!(memory.read_u8(0x0301), 0xBE);
        assert_eq!(memory.read_u16(0x0300), 0xBEEF);
    }

    #[test]
    fn word_read_wraps_at_top_of_memory() {
        let mut memory = Memory::new();
        memory.write_u8(0xFFFF, 0x34);
        memory.write_u8(0x0000, 0x12);
        assert_eq!(memory.read_u16(0xFFFF), 0x1234);
    }

    #[test]
    fn wrapped_msb_stays_within_page() {
        let mut memory = Memory::new();
        memory.write_u8(0x01FF, 0x00);
        memory.write_u8(0x0100, 0x90);
        memory.write_u8(0x0200, 0x80);
        assert_eq!(memory.read_u16_wrapped_msb(0x01FF), 0x9000);
        assert_eq!(memory.read_u16(0x01FF), 0x8000);
    }

    #[test]
    fn zero_page_pointer_wraps() {
        let mut memory = Memory::new();
        memory.write_u8(0x00FF, 0x10);
        memory.write_u8(0x0000, 0x20);
        memory.write_u8(0x0100, 0x30);
        assert_eq!(memory.read_u16_zero_page(0xFF), 0x2010);
    }

    #[test]
    fn memdump_wraps_and_clear_zeroes() {
        let mut memory = Memory::new();
        memory.memdump(0xFFFE, &[1, 2, 3]);
        assert_eq!(memory.peek(0xFFFE, 3), vec![1, 2, 3]);
        memory.clear();
        assert_eq!(memory.peek(0xFFFE, 3), vec![0, 0, 0]);
    }

    #[test]
    fn regions_follow_memory_map() {
        assert_eq!(Memory::region(0x0042), Region::ZeroPage);
        assert_eq!(Memory::region(0x01FD), Region::Stack);
        assert_eq!(Memory::region(0x2007), Region::PpuRegisters);
        assert_eq!(Memory::region(0x2008), Region::General);
        assert_eq!(Memory::region(0x4017), Region::ApuIoRegisters);
        assert_eq!(Memory::region(0xFFFC), Region::Vectors);
        assert_eq!(Memory::region(0x8000), Region::General);
    }

    #[test]
    fn regions_have_readable_names() {
        assert_eq!(Region::PpuRegisters.to_string(), "PPU registers");
        assert_eq!(Region::ZeroPage.to_string(), "zero page");
    }
}
