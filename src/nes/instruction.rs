// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use nes::addressing::AddressingMode;
use nes::cpu::CPU;
use nes::opcode::{decode_opcode, Opcode};
use std::fmt;
use utils::arithmetic;

/// All 6502 instructions are a maximum size of 3 bytes. The first byte is the
/// opcode which is determines the action of the instruction. The following 2
/// bytes are the arguments and are present depending on the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction(u8, u8, u8);

impl Instruction {
    /// Reads the instruction at `pc`. All three bytes are kept regardless of
    /// whether the opcode needs them; reads wrap at the top of memory.
    pub fn fetch(cpu: &CPU, pc: u16) -> Instruction {
        Instruction(cpu.read(pc),
                    cpu.read(pc.wrapping_add(1)),
                    cpu.read(pc.wrapping_add(2)))
    }

    #[inline(always)]
    pub fn opcode(&self) -> Option<Opcode> {
        decode_opcode(self.0)
    }

    /// Length of the instruction in bytes. Unassigned opcodes count as a
    /// single byte.
    pub fn len(&self) -> u8 {
        match self.opcode() {
            Some(opcode) => opcode.info().len(),
            None => 1,
        }
    }

    /// The bytes that actually belong to this instruction.
    pub fn bytes(&self) -> Vec<u8> {
        let all = [self.0, self.1, self.2];
        all[..self.len() as usize].to_vec()
    }

    /// Disassembles the instruction as it would appear at `pc`. Branch
    /// targets are printed as absolute addresses.
    pub fn disassemble(&self, pc: u16) -> String {
        let opcode = match self.opcode() {
            Some(opcode) => opcode,
            None => return format!(".DB ${:02X}", self.0),
        };
        let info = opcode.info();
        let mnemonic = info.mnemonic;
        let word = ((self.2 as u16) << 8) | self.1 as u16;

        match info.mode {
            AddressingMode::Implied => format!("{}", mnemonic),
            AddressingMode::Accumulator => format!("{} A", mnemonic),
            AddressingMode::Immediate => format!("{} #${:02X}", mnemonic, self.1),
            AddressingMode::ZeroPage => format!("{} ${:02X}", mnemonic, self.1),
            AddressingMode::ZeroPageX => format!("{} ${:02X},X", mnemonic, self.1),
            AddressingMode::ZeroPageY => format!("{} ${:02X},Y", mnemonic, self.1),
            AddressingMode::Absolute => format!("{} ${:04X}", mnemonic, word),
            AddressingMode::AbsoluteX => format!("{} ${:04X},X", mnemonic, word),
            AddressingMode::AbsoluteY => format!("{} ${:04X},Y", mnemonic, word),
            AddressingMode::Indirect => format!("{} (${:04X})", mnemonic, word),
            AddressingMode::IndirectX => format!("{} (${:02X},X)", mnemonic, self.1),
            AddressingMode::IndirectY => format!("{} (${:02X}),Y", mnemonic, self.1),
            AddressingMode::Relative => {
                let next = pc.wrapping_add(2);
                let target = arithmetic::add_relative(next, self.1 as i8);
                format!("{} ${:04X}", mnemonic, target)
            },
        }
    }

    /// Produces a Nintendulator style trace line for this instruction using
    /// the CPU state before it executes. Operand bytes that aren't part of
    /// the instruction are left blank.
    pub fn trace(&self, cpu: &CPU) -> String {
        let len = self.len() as usize;
        let raw = [self.0, self.1, self.2];
        let bytes: Vec<String> = (0..3).map(|i| {
            if i < len { format!("{:02X}", raw[i]) } else { String::from("  ") }
        }).collect();

        format!("{:04X}  {}  {:30}  A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
                cpu.pc(), bytes.join(" "), self.disassemble(cpu.pc()), cpu.a(),
                cpu.x(), cpu.y(), cpu.status(), cpu.sp(), cpu.cycles())
    }
}

/// The comparable part of one trace line: where the CPU was, what it was
/// about to execute and its registers. Disassembly and cycle counts are left
/// out since reference logs disagree on how those are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CPUFrame {
    pub pc: u16,
    pub bytes: Vec<u8>,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub p: u8,
    pub sp: u8,
}

impl CPUFrame {
    /// Captures the frame for the instruction the CPU is about to execute.
    pub fn capture(cpu: &CPU) -> CPUFrame {
        let instr = Instruction::fetch(cpu, cpu.pc());
        CPUFrame {
            pc: cpu.pc(),
            bytes: instr.bytes(),
            a: cpu.a(),
            x: cpu.x(),
            y: cpu.y(),
            p: cpu.status(),
            sp: cpu.sp(),
        }
    }

    /// Parses a line of a Nintendulator log such as
    /// `C000  4C F5 C5  JMP $C5F5   A:00 X:00 Y:00 P:24 SP:FD CYC:  0`.
    pub fn parse(line: &str) -> Result<CPUFrame, String> {
        let malformed = || format!("malformed frame \"{}\"", line.trim_end());

        let pc = match line.get(0..4).and_then(|s| u16::from_str_radix(s, 16).ok()) {
            Some(pc) => pc,
            None => return Err(malformed()),
        };

        // Instruction bytes sit in the fixed columns between the program
        // counter and the disassembly.
        let mut bytes = Vec::new();
        let columns = match line.get(6..14) {
            Some(columns) => columns,
            None => return Err(malformed()),
        };
        for byte in columns.split_whitespace() {
            match u8::from_str_radix(byte, 16) {
                Ok(byte) => bytes.push(byte),
                Err(_) => return Err(malformed()),
            }
        }
        if bytes.is_empty() {
            return Err(malformed());
        }

        // Registers follow the disassembly, which may contain anything.
        let registers = match line.find(" A:") {
            Some(index) => &line[index..],
            None => return Err(malformed()),
        };
        let mut values: [Option<u8>; 5] = [None; 5];
        for token in registers.split_whitespace() {
            let (slot, value) = if token.starts_with("A:") {
                (0, &token[2..])
            } else if token.starts_with("X:") {
                (1, &token[2..])
            } else if token.starts_with("Y:") {
                (2, &token[2..])
            } else if token.starts_with("P:") {
                (3, &token[2..])
            } else if token.starts_with("SP:") {
                (4, &token[3..])
            } else {
                continue;
            };
            if values[slot].is_none() {
                values[slot] = u8::from_str_radix(value, 16).ok();
            }
        }

        match values {
            [Some(a), Some(x), Some(y), Some(p), Some(sp)] => Ok(CPUFrame {
                pc: pc,
                bytes: bytes,
                a: a,
                x: x,
                y: y,
                p: p,
                sp: sp,
            }),
            _ => Err(malformed()),
        }
    }
}

impl fmt::Display for CPUFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes: Vec<String> = self.bytes.iter().map(|b| format!("{:02X}", b)).collect();
        write!(f, "{:04X}  {:8}  A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X}",
               self.pc, bytes.join(" "), self.a, self.x, self.y, self.p, self.sp)
    }
}
