// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use debugger::parser;
use io::binutils;
use io::errors::EmulationError;
use io::log;
use nes::instruction::Instruction;
use nes::memory::{Memory, MEMORY_SIZE};
use nes::nes::NES;
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::Duration;

// Bytes shown by `dump` when no length is given, and per output row.
const DEFAULT_DUMP_LEN: usize = 64;
const DUMP_ROW_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Stop,
    Continue,
    Next,
    Regs,
    Dump,
    Break,
    Delete,
    Irq,
    Nmi,
    Reset,
    Quit,
}

struct CommandWithArguments {
    command: Command,
    args: Vec<String>,
}

pub struct Debugger {
    receiver: Receiver<String>,
    stepping: bool,
    breakpoints: BTreeSet<u16>,

    // Instructions left to execute for a `next` issued while stopped.
    pending_steps: u64,

    // Set when execution resumes on a breakpoint so it isn't hit again
    // before the instruction under it runs.
    resuming: bool,

    quitting: bool,
}

impl Debugger {
    pub fn new(receiver: Receiver<String>) -> Self {
        Debugger {
            receiver: receiver,
            stepping: true,
            breakpoints: BTreeSet::new(),
            pending_steps: 0,
            resuming: false,
            quitting: false,
        }
    }

    /// True while the CPU is allowed to run freely.
    pub fn is_stepping(&self) -> bool {
        self.stepping
    }

    /// True once the user asked to leave the emulator.
    pub fn is_quitting(&self) -> bool {
        self.quitting
    }

    /// Handles any pending command and then steps the CPU forward a single
    /// instruction, unless execution is stopped or a breakpoint is hit.
    /// Returns false once the user quits.
    pub fn step(&mut self, nes: &mut NES) -> Result<bool, EmulationError> {
        // Input is received from another thread so the emulator can run without
        // the debugger prompt blocking it.
        match self.receiver.try_recv() {
            Ok(input) => {
                match self.interpret(input) {
                    Some(command) => self.execute_command(command, nes),
                    None => {},
                };
            },
            Err(_) => {}, // Ignore empty and disconnect errors.
        };

        if self.quitting {
            return Ok(false);
        }

        // If the debugger is in stepping mode, continue execution like normal,
        // otherwise the CPU should not update. In the meantime, sleep the host
        // CPU while we wait for input.
        if !self.stepping && self.pending_steps == 0 {
            thread::sleep(Duration::from_millis(16));
            return Ok(true);
        }

        // A step that services an interrupt does not execute the instruction
        // at PC, so breakpoints only apply to real instruction steps.
        let pc = nes.cpu.pc();
        let at_breakpoint = nes.cpu.interrupt_ready().is_none() && self.breakpoints.contains(&pc);
        if at_breakpoint && !self.resuming {
            log::log("debugger", format!("Breakpoint hit at {:#06X}", pc), &nes.runtime_options);
            println!("{}", Instruction::fetch(&nes.cpu, pc).trace(&nes.cpu));
            self.stepping = false;
            self.pending_steps = 0;
            self.resuming = true;
            return Ok(true);
        }
        self.resuming = false;

        try!(nes.step());
        if self.pending_steps > 0 {
            self.pending_steps -= 1;
            if self.pending_steps == 0 {
                let pc = nes.cpu.pc();
                println!("{}", Instruction::fetch(&nes.cpu, pc).trace(&nes.cpu));
            }
        }
        Ok(true)
    }

    /// Parse a raw input string into a list of arguments and a command. This
    /// function also maps command names to their respective enums.
    fn interpret(&self, input: String) -> Option<CommandWithArguments> {
        let mut stderr = io::stderr();
        let args = match parser::input_to_arguments(input) {
            Ok(args) => args,
            Err(e) => {
                let _ = writeln!(stderr, "nes-core: {}", e);
                return None;
            },
        };

        let command = {
            let raw_command = if args.len() > 0 {
                &args[0]
            } else {
                return None; // Blank lines are ignored.
            };

            // Map command strings to the command enum type.
            match raw_command.to_lowercase().as_str() {
                // Full commands.
                "stop"     => Command::Stop,
                "continue" => Command::Continue,
                "next"     => Command::Next,
                "regs"     => Command::Regs,
                "dump"     => Command::Dump,
                "break"    => Command::Break,
                "delete"   => Command::Delete,
                "irq"      => Command::Irq,
                "nmi"      => Command::Nmi,
                "reset"    => Command::Reset,
                "quit"     => Command::Quit,
                // Aliases.
                "s" => Command::Stop,
                "c" => Command::Continue,
                "n" => Command::Next,
                "r" => Command::Regs,
                "d" => Command::Dump,
                "b" => Command::Break,
                "q" => Command::Quit,
                // Unknown command.
                _ => {
                    let _ = writeln!(stderr, "nes-core: unknown command \"{}\"", raw_command);
                    return None;
                },
            }
        };

        Some({
            CommandWithArguments {
                command: command,
                args: args,
            }
        })
    }

    /// Executes the correct debugger command based on the enum passed.
    /// Argument errors are reported and leave the debugger as it was.
    fn execute_command(&mut self, command: CommandWithArguments, nes: &mut NES) {
        let result = match command.command {
            Command::Next => self.execute_next(nes, &command.args),
            Command::Dump => self.execute_dump(nes, &command.args),
            Command::Break => self.execute_break(nes, &command.args),
            Command::Delete => self.execute_delete(nes, &command.args),
            Command::Stop => {
                self.execute_stop(nes);
                Ok(())
            },
            Command::Continue => {
                self.execute_continue(nes);
                Ok(())
            },
            Command::Regs => {
                self.execute_regs(nes);
                Ok(())
            },
            Command::Irq => {
                nes.signal_irq();
                Ok(())
            },
            Command::Nmi => {
                nes.signal_nmi();
                Ok(())
            },
            Command::Reset => {
                self.execute_reset(nes);
                Ok(())
            },
            Command::Quit => {
                self.execute_quit(nes);
                Ok(())
            },
        };

        if let Err(e) = result {
            let _ = writeln!(io::stderr(), "nes-core: {}", e);
        }
    }

    /// Stops execution of the CPU to allow the human some time to debug a
    /// problem or stare at hex codes all day to look like a l33t haxor.
    fn execute_stop(&mut self, nes: &mut NES) {
        log::log("debugger", "Stopping execution now...", &nes.runtime_options);
        self.stepping = false;
        self.pending_steps = 0;
    }

    /// Starts execution if it's stopped.
    fn execute_continue(&mut self, nes: &mut NES) {
        log::log("debugger", "Starting execution now...", &nes.runtime_options);
        self.stepping = true;
    }

    /// Executes a number of instructions (one by default) and stops again.
    fn execute_next(&mut self, nes: &mut NES, args: &[String]) -> Result<(), String> {
        let count = match args.get(1) {
            Some(arg) => try!(binutils::parse_number(arg)),
            None => 1,
        };
        log::log("debugger", format!("Stepping {} instruction(s)", count), &nes.runtime_options);
        self.stepping = false;
        self.pending_steps = count;
        Ok(())
    }

    /// Prints the registers and status flags.
    fn execute_regs(&mut self, nes: &mut NES) {
        print!("{}", nes.cpu);
    }

    /// Allows dumping memory or program code at a specified memory address.
    fn execute_dump(&mut self, nes: &mut NES, args: &[String]) -> Result<(), String> {
        let addr = match args.get(1) {
            Some(arg) => try!(binutils::parse_address(arg)),
            None => return Err(String::from("dump requires an address")),
        };
        let len = match args.get(2) {
            Some(arg) => try!(binutils::parse_number(arg)),
            None => DEFAULT_DUMP_LEN as u64,
        };
        if len > MEMORY_SIZE as u64 {
            return Err(format!("dump length {} exceeds the address space", len));
        }
        let len = len as usize;
        print!("{}", hexdump(addr, &nes.cpu.memory().peek(addr, len)));
        Ok(())
    }

    /// Adds a breakpoint. Execution stops before the instruction at the
    /// address runs.
    fn execute_break(&mut self, nes: &mut NES, args: &[String]) -> Result<(), String> {
        let addr = match args.get(1) {
            Some(arg) => try!(binutils::parse_address(arg)),
            None => return Err(String::from("break requires an address")),
        };
        self.breakpoints.insert(addr);
        log::log("debugger", format!("Breakpoint set at {:#06X}", addr), &nes.runtime_options);
        Ok(())
    }

    /// Removes a breakpoint.
    fn execute_delete(&mut self, nes: &mut NES, args: &[String]) -> Result<(), String> {
        let addr = match args.get(1) {
            Some(arg) => try!(binutils::parse_address(arg)),
            None => return Err(String::from("delete requires an address")),
        };
        if !self.breakpoints.remove(&addr) {
            return Err(format!("no breakpoint at {:#06X}", addr));
        }
        log::log("debugger", format!("Breakpoint removed at {:#06X}", addr), &nes.runtime_options);
        Ok(())
    }

    /// Restarts the program from the reset vector.
    fn execute_reset(&mut self, nes: &mut NES) {
        nes.reset();
        self.resuming = false;
    }

    fn execute_quit(&mut self, nes: &mut NES) {
        log::log("debugger", "Quitting...", &nes.runtime_options);
        self.quitting = true;
    }
}

/// Formats memory as rows of 16 bytes, each prefixed with its address and
/// followed by the memory map region the row starts in.
fn hexdump(addr: u16, bytes: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(DUMP_ROW_LEN).enumerate() {
        let row_addr = addr.wrapping_add((row * DUMP_ROW_LEN) as u16);
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        out.push_str(&format!("{:04X}: {:47}  [{}]\n", row_addr, hex.join(" "),
                              Memory::region(row_addr)));
    }
    out
}
