// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use io::errors::EmulationError;
use nes::flags::{self, Flag, INTERRUPT_DISABLE, UNUSED_FLAG};
use nes::memory::{Memory, IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR, STACK_OFFSET};
use nes::opcode::decode_opcode;
use std::fmt;
use utils::arithmetic;

// Cycles spent pushing state and loading a vector when an interrupt is
// serviced.
const INTERRUPT_CYCLES: u8 = 7;

/// Interrupt lines the outside world can pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    // Non-maskable interrupt, raised by the PPU at the start of vblank.
    Nmi,

    // Maskable interrupt request, ignored while interrupt disable is set.
    Irq,
}

impl Interrupt {
    fn vector(self) -> u16 {
        match self {
            Interrupt::Nmi => NMI_VECTOR,
            Interrupt::Irq => IRQ_VECTOR,
        }
    }
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Interrupt::Nmi => write!(f, "NMI"),
            Interrupt::Irq => write!(f, "IRQ"),
        }
    }
}

/// This is an implementation of 2A03 processor used in the NES. The 2A03 is
/// based off the 6502 processor with some minor changes such as having no
/// binary-coded decimal mode.
///
/// The CPU exclusively owns the 64 KiB memory image. Devices that sit in the
/// PPU and APU register windows observe and inject bytes through `read` and
/// `write`; registers can only be inspected from the outside.
pub struct CPU {
    // The program counter is a 16-bit register which points to the next
    // instruction to be executed. The value of program counter is modified
    // automatically as instructions are executed.
    //
    // The value of the program counter can be modified by executing a jump, a
    // relative branch, a subroutine call to another memory address, by
    // returning from a subroutine, or by an interrupt.
    pub(crate) pc: u16,

    // The processor supports a 256 byte stack located between $0100 and $01FF.
    // The stack pointer is an 8-bit register and holds the next free location
    // on the stack. The location of the stack is fixed and cannot be moved and
    // grows downwards.
    pub(crate) sp: u8,

    // The 8-bit accumulator is used all arithmetic and logical operations (with
    // the exception of increments and decrements). The contents of the
    // accumulator can be stored and retrieved either from memory or the stack.
    pub(crate) a: u8,

    // The 8-bit X register can be used to control information, compare values
    // in memory, and be incremented or decremented. The X register is special
    // as it can be used to get a copy of the stack pointer or change its value.
    pub(crate) x: u8,

    // The 8-bit Y register like X, can be used to manage information and be
    // incremented or decremented; however it doesn't have any special functions
    // like the X register does.
    pub(crate) y: u8,

    // The Processor Status register contains a list of flags that are set and
    // cleared by instructions to record the results of operations. See
    // `nes::flags::Flag` for the meaning of each bit.
    pub(crate) p: u8,

    // The amount of cycles accumulated since the last reset. Advisory only;
    // nothing in the core depends on it.
    pub(crate) cycles: u64,

    pub(crate) memory: Memory,

    // Interrupt requests latched by the bus, serviced before the next fetch.
    nmi_pending: bool,
    irq_pending: bool,
}

impl CPU {
    /// Creates a CPU with a zeroed memory image and runs a reset, leaving
    /// the program counter at 0x0000.
    pub fn new() -> CPU {
        let mut cpu = CPU {
            pc: 0,
            sp: 0,
            a: 0,
            x: 0,
            y: 0,
            p: 0,
            cycles: 0,
            memory: Memory::new(),
            nmi_pending: false,
            irq_pending: false,
        };
        cpu.reset();
        cpu
    }

    /// Reinitializes the processor. Registers are zeroed, the stack pointer
    /// is set to 0xFF, and the program counter is loaded from the reset
    /// vector. The vector is read before the memory image is cleared.
    pub fn reset(&mut self) {
        self.warm_reset();
        self.memory.clear();
    }

    /// Same as `reset` except that memory is left intact. This is what the
    /// RESET line does on a running console and how a host starts a program
    /// it has just placed into memory.
    pub fn warm_reset(&mut self) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFF;
        self.p = UNUSED_FLAG;
        self.pc = self.memory.read_u16(RESET_VECTOR);
        self.cycles = 0;
        self.nmi_pending = false;
        self.irq_pending = false;
    }

    // Register inspection.

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn sp(&self) -> u8 {
        self.sp
    }

    pub fn a(&self) -> u8 {
        self.a
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    /// Raw processor status byte.
    pub fn status(&self) -> u8 {
        self.p
    }

    /// Total cycles executed since the last reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Tests a single flag in the status register.
    #[inline(always)]
    pub fn flag(&self, flag: Flag) -> bool {
        self.p & flag.mask() != 0
    }

    /// Sets or clears a flag in the status register, leaving the others
    /// untouched. The unused bit can't be cleared.
    #[inline(always)]
    pub(crate) fn set_flag(&mut self, flag: Flag, value: bool) {
        if value {
            self.p |= flag.mask();
        } else {
            self.p &= !flag.mask();
        }
        self.p |= UNUSED_FLAG;
    }

    /// Sets the zero and negative flags from a result byte.
    #[inline(always)]
    pub(crate) fn update_zero_and_negative(&mut self, value: u8) {
        self.set_flag(Flag::Zero, value == 0);
        self.set_flag(Flag::Negative, arithmetic::is_negative(value));
    }

    // Memory access.

    /// Reads a byte anywhere in the address space.
    #[inline(always)]
    pub fn read(&self, addr: u16) -> u8 {
        self.memory.read_u8(addr)
    }

    /// Writes a byte anywhere in the address space.
    #[inline(always)]
    pub fn write(&mut self, addr: u16, value: u8) {
        self.memory.write_u8(addr, value);
    }

    /// Places a block of bytes into memory starting at `addr`.
    pub fn load(&mut self, addr: u16, bytes: &[u8]) {
        self.memory.memdump(addr, bytes);
    }

    /// Read-only view of the memory image for tracing and debugging.
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Reads the byte at the program counter and advances it.
    #[inline(always)]
    pub(crate) fn fetch_u8(&mut self) -> u8 {
        let value = self.memory.read_u8(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    /// Reads a little-endian word at the program counter and advances past it.
    #[inline(always)]
    pub(crate) fn fetch_u16(&mut self) -> u16 {
        let value = self.memory.read_u16(self.pc);
        self.pc = self.pc.wrapping_add(2);
        value
    }

    // Utility functions for managing the stack. The stack pointer wraps
    // within page 1 in both directions without complaint.

    /// Pushes an 8-bit number onto the stack.
    pub(crate) fn stack_push_u8(&mut self, value: u8) {
        self.memory.write_u8(STACK_OFFSET + self.sp as u16, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    /// Pops an 8-bit number off the stack.
    pub(crate) fn stack_pop_u8(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.memory.read_u8(STACK_OFFSET + self.sp as u16)
    }

    /// Pushes a 16-bit number (usually an address) onto the stack, high byte
    /// first so it reads back as little-endian.
    pub(crate) fn stack_push_u16(&mut self, value: u16) {
        self.stack_push_u8((value >> 8) as u8);
        self.stack_push_u8(value as u8);
    }

    /// Pops a 16-bit number (usually an address) off the stack.
    pub(crate) fn stack_pop_u16(&mut self) -> u16 {
        let lsb = self.stack_pop_u8() as u16;
        let msb = self.stack_pop_u8() as u16;
        (msb << 8) | lsb
    }

    // Interrupts.

    /// Latches an interrupt request. It is serviced by the next call to
    /// `step` (IRQs wait until interrupt disable is clear).
    pub fn signal(&mut self, interrupt: Interrupt) {
        match interrupt {
            Interrupt::Nmi => self.nmi_pending = true,
            Interrupt::Irq => self.irq_pending = true,
        }
    }

    /// Returns true if a request for the given line is waiting.
    pub fn is_pending(&self, interrupt: Interrupt) -> bool {
        match interrupt {
            Interrupt::Nmi => self.nmi_pending,
            Interrupt::Irq => self.irq_pending,
        }
    }

    /// Pushes the program counter and status then jumps through the vector.
    /// Shared by NMI, IRQ and BRK; only BRK sets the break bit in the
    /// pushed copy.
    pub(crate) fn enter_interrupt(&mut self, vector: u16, brk: bool) {
        let pc = self.pc;
        self.stack_push_u16(pc);
        let status = flags::pushed_status(self.p, brk);
        self.stack_push_u8(status);
        self.p |= INTERRUPT_DISABLE;
        self.pc = self.memory.read_u16(vector);
    }

    /// The interrupt the next `step` will service instead of executing an
    /// instruction, if any. NMI takes priority; an IRQ only counts while
    /// interrupt disable is clear.
    pub fn interrupt_ready(&self) -> Option<Interrupt> {
        if self.nmi_pending {
            Some(Interrupt::Nmi)
        } else if self.irq_pending && !self.flag(Flag::InterruptDisable) {
            Some(Interrupt::Irq)
        } else {
            None
        }
    }

    /// Takes the interrupt that is ready to be serviced, if any.
    fn poll_interrupts(&mut self) -> Option<Interrupt> {
        let interrupt = self.interrupt_ready();
        match interrupt {
            Some(Interrupt::Nmi) => self.nmi_pending = false,
            Some(Interrupt::Irq) => self.irq_pending = false,
            None => {},
        }
        interrupt
    }

    // Execution.

    /// Executes exactly one instruction, or services one pending interrupt,
    /// and returns the number of cycles it took.
    ///
    /// An opcode with no instruction assigned to it is reported as an error
    /// and the program counter is left pointing at it.
    pub fn step(&mut self) -> Result<u8, EmulationError> {
        if let Some(interrupt) = self.poll_interrupts() {
            self.enter_interrupt(interrupt.vector(), false);
            self.cycles += INTERRUPT_CYCLES as u64;
            return Ok(INTERRUPT_CYCLES);
        }

        let opcode_addr = self.pc;
        let raw = self.fetch_u8();
        let opcode = match decode_opcode(raw) {
            Some(opcode) => opcode,
            None => {
                self.pc = opcode_addr;
                return Err(EmulationError::UnimplementedOpcode { opcode: raw, pc: opcode_addr });
            },
        };

        let info = opcode.info();
        let resolved = self.resolve(info.mode);
        let mut cycles = info.cycles;
        if resolved.page_crossed && info.page_penalty() {
            cycles += 1;
        }
        cycles += self.execute(info.mnemonic, resolved);

        self.cycles += cycles as u64;
        Ok(cycles)
    }

    /// Runs instructions for as long as `keep_running` returns true. The
    /// predicate is consulted before every step, which is how a host stops
    /// an otherwise endless loop.
    pub fn run<F>(&mut self, mut keep_running: F) -> Result<(), EmulationError>
        where F: FnMut(&CPU) -> bool
    {
        while keep_running(self) {
            try!(self.step());
        }
        Ok(())
    }

    /// Returns "SET" if the passed boolean is true, otherwise "UNSET". This
    /// function is used to display flags when the CPU crashes.
    fn fmt_flag(flag: bool) -> &'static str {
        if flag { "SET" } else { "UNSET" }
    }
}

impl fmt::Display for CPU {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        try!(writeln!(f, "CPU State:"));
        try!(writeln!(f, "    Program Counter: {:#06X}", self.pc));
        try!(writeln!(f, "    Stack Pointer:   {:#04X}", self.sp));
        try!(writeln!(f, "    Accumulator:     {:#04X}", self.a));
        try!(writeln!(f, "    X Register:      {:#04X}", self.x));
        try!(writeln!(f, "    Y Register:      {:#04X}", self.y));
        try!(writeln!(f, "    Cycles:          {}", self.cycles));
        try!(writeln!(f, ""));
        try!(writeln!(f, "Status Register: {:#04X} ({})", self.p, flags::describe(self.p)));
        for flag in Flag::ALL.iter().filter(|flag| **flag != Flag::Unused) {
            try!(writeln!(f, "    {:<18} {}", format!("{}:", flag), CPU::fmt_flag(self.flag(*flag))));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nes::flags::{BREAK_COMMAND, CARRY_FLAG};

    #[test]
    fn reset_initializes_registers_from_vector() {
        let mut cpu = CPU::new();
        cpu.write(0xFFFC, 0x34);
        cpu.write(0xFFFD, 0x12);
        cpu.write(0x0200, 0x99);
        cpu.a = 1;
        cpu.x = 2;
        cpu.y = 3;
        cpu.sp = 0x10;
        cpu.p = 0xFF;
        cpu.reset();

        assert_eq!(cpu.a(), 0);
        assert_eq!(cpu.x(), 0);
        assert_eq!(cpu.y(), 0);
        assert_eq!(cpu.sp(), 0xFF);
        assert_eq!(cpu.status(), UNUSED_FLAG);
        assert_eq!(cpu.pc(), 0x1234);
        assert_eq!(cpu.read(0x0200), 0);
        assert_eq!(cpu.read(0xFFFC), 0);
    }

    #[test]
    fn warm_reset_keeps_memory() {
        let mut cpu = CPU::new();
        cpu.load(0xFFFC, &[0x00, 0x80]);
        cpu.write(0x8000, 0xEA);
        cpu.warm_reset();
        assert_eq!(cpu.pc(), 0x8000);
        assert_eq!(cpu.read(0x8000), 0xEA);
    }

    #[test]
    fn new_cpu_starts_at_zero() {
        let cpu = CPU::new();
        assert_eq!(cpu.pc(), 0);
        assert_eq!(cpu.sp(), 0xFF);
        assert_eq!(cpu.status(), UNUSED_FLAG);
    }

    #[test]
    fn set_flag_leaves_other_bits() {
        let mut cpu = CPU::new();
        cpu.set_flag(Flag::Carry, true);
        cpu.set_flag(Flag::Negative, true);
        cpu.set_flag(Flag::Carry, false);
        assert_eq!(cpu.status(), UNUSED_FLAG | flags::NEGATIVE_FLAG);
        assert!(cpu.flag(Flag::Negative));
        assert!(!cpu.flag(Flag::Carry));
    }

    #[test]
    fn unused_flag_survives_clearing() {
        let mut cpu = CPU::new();
        cpu.set_flag(Flag::Unused, false);
        assert!(cpu.flag(Flag::Unused));
    }

    #[test]
    fn stack_wraps_without_error() {
        let mut cpu = CPU::new();
        cpu.sp = 0x00;
        cpu.stack_push_u8(0xAB);
        assert_eq!(cpu.sp(), 0xFF);
        assert_eq!(cpu.read(0x0100), 0xAB);
        assert_eq!(cpu.stack_pop_u8(), 0xAB);
        assert_eq!(cpu.sp(), 0x00);
    }

    #[test]
    fn stack_words_push_high_byte_first() {
        let mut cpu = CPU::new();
        cpu.stack_push_u16(0x1234);
        assert_eq!(cpu.read(0x01FF), 0x12);
        assert_eq!(cpu.read(0x01FE), 0x34);
        assert_eq!(cpu.sp(), 0xFD);
        assert_eq!(cpu.stack_pop_u16(), 0x1234);
        assert_eq!(cpu.sp(), 0xFF);
    }

    #[test]
    fn unimplemented_opcode_is_an_error() {
        let mut cpu = CPU::new();
        cpu.load(0x8000, &[0xFF]);
        cpu.pc = 0x8000;
        match cpu.step() {
            Err(EmulationError::UnimplementedOpcode { opcode, pc }) => {
                assert_eq!(opcode, 0xFF);
                assert_eq!(pc, 0x8000);
            },
            other => panic!("expected unimplemented opcode, got {:?}", other),
        }
        assert_eq!(cpu.pc(), 0x8000);
    }

    #[test]
    fn nmi_is_serviced_even_with_interrupts_disabled() {
        let mut cpu = CPU::new();
        cpu.load(0xFFFA, &[0x00, 0x90]);
        cpu.pc = 0x8123;
        cpu.p |= INTERRUPT_DISABLE | CARRY_FLAG;
        cpu.signal(Interrupt::Nmi);

        assert_eq!(cpu.step().unwrap(), 7);
        assert_eq!(cpu.pc(), 0x9000);
        assert_eq!(cpu.sp(), 0xFC);
        assert_eq!(cpu.read(0x01FF), 0x81);
        assert_eq!(cpu.read(0x01FE), 0x23);
        let pushed = cpu.read(0x01FD);
        assert_eq!(pushed & BREAK_COMMAND, 0);
        assert_eq!(pushed & CARRY_FLAG, CARRY_FLAG);
        assert!(!cpu.is_pending(Interrupt::Nmi));
    }

    #[test]
    fn irq_waits_for_interrupt_disable_to_clear() {
        let mut cpu = CPU::new();
        cpu.load(0xFFFE, &[0x00, 0xA0]);
        cpu.load(0x8000, &[0x58, 0xEA]); // CLI; NOP
        cpu.pc = 0x8000;
        cpu.p |= INTERRUPT_DISABLE;
        cpu.signal(Interrupt::Irq);

        // The IRQ is held off until CLI runs.
        cpu.step().unwrap();
        assert_eq!(cpu.pc(), 0x8001);
        assert!(cpu.is_pending(Interrupt::Irq));

        cpu.step().unwrap();
        assert_eq!(cpu.pc(), 0xA000);
        assert!(cpu.flag(Flag::InterruptDisable));
        assert!(!cpu.is_pending(Interrupt::Irq));
    }

    #[test]
    fn interrupt_ready_follows_priority_and_mask() {
        let mut cpu = CPU::new();
        assert_eq!(cpu.interrupt_ready(), None);

        cpu.p |= INTERRUPT_DISABLE;
        cpu.signal(Interrupt::Irq);
        assert_eq!(cpu.interrupt_ready(), None);

        cpu.p &= !INTERRUPT_DISABLE;
        assert_eq!(cpu.interrupt_ready(), Some(Interrupt::Irq));

        cpu.signal(Interrupt::Nmi);
        assert_eq!(cpu.interrupt_ready(), Some(Interrupt::Nmi));
        assert!(cpu.is_pending(Interrupt::Nmi));
    }

    #[test]
    fn run_stops_when_predicate_fails() {
        let mut cpu = CPU::new();
        cpu.load(0x8000, &[0xE8, 0xE8, 0xE8, 0xE8]); // INX x4
        cpu.pc = 0x8000;
        let mut budget = 3;
        cpu.run(|_| {
            budget -= 1;
            budget >= 0
        }).unwrap();
        assert_eq!(cpu.x(), 3);
        assert_eq!(cpu.cycles(), 6);
    }

    #[test]
    fn display_lists_flags() {
        let cpu = CPU::new();
        let dump = format!("{}", cpu);
        assert!(dump.contains("Carry Flag:"));
        assert!(dump.contains("UNSET"));
    }
}
