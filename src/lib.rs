// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Instruction-execution core of the 2A03, the 6502 variant inside the NES.
//!
//! The crate owns a flat 64 KiB memory image, the register file, and the
//! fetch-decode-execute loop. Picture and audio units, cartridges, and
//! controllers are outside of it; they talk to the core through plain memory
//! reads and writes and through the interrupt entry points on `CPU`.

extern crate byteorder;
extern crate chrono;
#[macro_use]
extern crate enum_primitive;
extern crate num;

pub mod debugger;
pub mod io;
pub mod nes;
pub mod utils;

pub use io::errors::EmulationError;
pub use nes::cpu::CPU;
pub use nes::flags::Flag;
