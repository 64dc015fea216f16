// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use io::errors::EmulationError;
use io::log;
use nes::cpu::{Interrupt, CPU};
use nes::instruction::{CPUFrame, Instruction};
use nes::memory::RESET_VECTOR;
use std::fs::File;
use std::io::{BufRead, BufReader};

/// Default load address of a program image, the start of cartridge space.
pub const DEFAULT_ORIGIN: u16 = 0x8000;

/// User configurable options which are generated by the command line.
#[derive(Debug, Clone)]
pub struct NESRuntimeOptions {
    pub verbose: bool,            // Log what the host is doing.
    pub trace: bool,              // Print a frame for every instruction.
    pub test_log: Option<String>, // Reference log to compare frames against.
    pub origin: u16,              // Where the image is placed in memory.
    pub entry: Option<u16>,       // Overrides the image's reset vector.
    pub steps: u64,               // Step budget for `run`, 0 is unbounded.
    pub debug: bool,              // Run under the debugger.
}

impl Default for NESRuntimeOptions {
    fn default() -> NESRuntimeOptions {
        NESRuntimeOptions {
            verbose: false,
            trace: false,
            test_log: None,
            origin: DEFAULT_ORIGIN,
            entry: None,
            steps: 0,
            debug: false,
        }
    }
}

/// Why `NES::run` returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    // The step budget from the runtime options ran out.
    BudgetExhausted,

    // An instruction left the program counter where it found it (a jump or
    // branch to itself), which programs use to park the processor.
    Trapped(u16),
}

/// The host side of the core: a CPU, the options it was started with, and
/// an optional reference log every executed instruction is checked against.
pub struct NES {
    pub cpu: CPU,
    pub runtime_options: NESRuntimeOptions,
    test_log: Option<Box<BufRead>>,
    frames: u64,
}

impl NES {
    /// Creates a host with a fresh CPU. The reference log named in the
    /// options is opened here so a missing file is reported up front.
    pub fn new(runtime_options: NESRuntimeOptions) -> Result<NES, EmulationError> {
        let test_log: Option<Box<BufRead>> = match runtime_options.test_log {
            Some(ref path) => {
                let file = try!(File::open(path).map_err(|e| {
                    EmulationError::TraceLog(format!("{}: {}", path, e))
                }));
                Some(Box::new(BufReader::new(file)))
            },
            None => None,
        };

        Ok(NES {
            cpu: CPU::new(),
            runtime_options: runtime_options,
            test_log: test_log,
            frames: 0,
        })
    }

    /// Compares executed frames against an in-memory or otherwise already
    /// opened reference log.
    pub fn set_test_log<R: BufRead + 'static>(&mut self, reader: R) {
        self.test_log = Some(Box::new(reader));
    }

    /// Copies an image into memory at `origin` and starts it with a warm
    /// reset. When an entry point is configured it is written into the reset
    /// vector first.
    pub fn load(&mut self, origin: u16, image: &[u8]) {
        self.cpu.load(origin, image);
        log::log("nes", format!("Loaded {} bytes at {:#06X}", image.len(), origin),
                 &self.runtime_options);

        if let Some(entry) = self.runtime_options.entry {
            self.cpu.memory.write_u16(RESET_VECTOR, entry);
            log::log("nes", format!("Entry point set to {:#06X}", entry), &self.runtime_options);
        }
        self.reset();
    }

    /// Restarts the program from the reset vector without touching memory.
    pub fn reset(&mut self) {
        self.cpu.warm_reset();
        log::log("nes", format!("Reset, PC = {:#06X}", self.cpu.pc()), &self.runtime_options);
    }

    /// Number of frames checked against the reference log so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Executes a single instruction. With tracing on, the frame for the
    /// instruction is printed before it runs; with a reference log, the
    /// frame is checked against the next line of the log.
    ///
    /// A step that services an interrupt executes nothing, so it is neither
    /// traced nor checked.
    pub fn step(&mut self) -> Result<u8, EmulationError> {
        if let Some(interrupt) = self.cpu.interrupt_ready() {
            log::log("nes", format!("Servicing {} at {:#06X}", interrupt, self.cpu.pc()),
                     &self.runtime_options);
        } else {
            try!(self.observe());
        }

        match self.cpu.step() {
            Ok(cycles) => Ok(cycles),
            Err(e) => {
                log::log("cpu", format!("{}", e), &self.runtime_options);
                Err(e)
            },
        }
    }

    /// Prints and checks the frame of the instruction about to execute.
    fn observe(&mut self) -> Result<(), EmulationError> {
        if self.runtime_options.trace {
            let instr = Instruction::fetch(&self.cpu, self.cpu.pc());
            println!("{}", instr.trace(&self.cpu));
        }
        if self.test_log.is_some() {
            try!(self.check_frame());
        }
        Ok(())
    }

    /// Steps until the budget runs out, the program traps itself, or an
    /// error occurs.
    pub fn run(&mut self) -> Result<Halt, EmulationError> {
        let budget = self.runtime_options.steps;
        let mut steps: u64 = 0;

        loop {
            if budget != 0 && steps >= budget {
                log::log("nes", format!("Step budget of {} exhausted", budget),
                         &self.runtime_options);
                return Ok(Halt::BudgetExhausted);
            }

            let pc = self.cpu.pc();
            try!(self.step());
            steps += 1;

            if self.cpu.pc() == pc {
                log::log("nes", format!("Trapped at {:#06X}", pc), &self.runtime_options);
                return Ok(Halt::Trapped(pc));
            }
        }
    }

    /// Raises a non-maskable interrupt.
    pub fn signal_nmi(&mut self) {
        log::log("nes", "NMI signalled", &self.runtime_options);
        self.cpu.signal(Interrupt::Nmi);
    }

    /// Raises an interrupt request.
    pub fn signal_irq(&mut self) {
        log::log("nes", "IRQ signalled", &self.runtime_options);
        self.cpu.signal(Interrupt::Irq);
    }

    /// Reads the next frame from the reference log and compares it with the
    /// emulator's current frame. Blank lines are skipped.
    fn check_frame(&mut self) -> Result<(), EmulationError> {
        let expected = {
            let reader = match self.test_log {
                Some(ref mut reader) => reader,
                None => return Ok(()),
            };
            let mut line = String::new();
            loop {
                line.clear();
                let read = try!(reader.read_line(&mut line).map_err(|e| {
                    EmulationError::TraceLog(format!("{}", e))
                }));
                if read == 0 {
                    return Err(EmulationError::TraceLog(
                        format!("log ended after {} frames", self.frames)));
                }
                if !line.trim().is_empty() {
                    break;
                }
            }
            try!(CPUFrame::parse(&line).map_err(EmulationError::TraceLog))
        };

        let actual = CPUFrame::capture(&self.cpu);
        if actual != expected {
            return Err(EmulationError::TraceMismatch {
                expected: format!("{}", expected),
                actual: format!("{}", actual),
            });
        }

        self.frames += 1;
        Ok(())
    }
}
