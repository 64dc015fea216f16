// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::error::Error;
use std::fmt;
use std::io;

// Exit codes used throughout the application. These exit codes has specific
// meanings and are used when no OS error codes are available.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1; // Generic error ¯\_(ツ)_/¯.
pub const EXIT_INVALID_IMAGE: i32 = 2; // Image missing or unreadable.
pub const EXIT_TRACE_LOG_NOT_FOUND: i32 = 3;
pub const EXIT_TRACE_MISMATCH: i32 = 4;
pub const EXIT_UNIMPLEMENTED_OPCODE: i32 = 5;
pub const EXIT_RUNTIME_FAILURE: i32 = 101;

/// Everything that can stop emulation. Address-space violations are not
/// listed since a 16-bit address can't leave the 64 KiB image.
#[derive(Debug)]
pub enum EmulationError {
    /// The byte at `pc` has no instruction assigned to it. The program
    /// counter is left pointing at the offending byte.
    UnimplementedOpcode { opcode: u8, pc: u16 },

    /// The emulator produced a different frame than the reference log.
    TraceMismatch { expected: String, actual: String },

    /// The reference log couldn't be read or ran out of frames.
    TraceLog(String),

    /// Reading an image or log from disk failed.
    Io(io::Error),
}

impl EmulationError {
    /// Process exit code reported by the command-line front-end.
    pub fn exit_code(&self) -> i32 {
        match *self {
            EmulationError::UnimplementedOpcode { .. } => EXIT_UNIMPLEMENTED_OPCODE,
            EmulationError::TraceMismatch { .. } => EXIT_TRACE_MISMATCH,
            EmulationError::TraceLog(_) => EXIT_TRACE_LOG_NOT_FOUND,
            EmulationError::Io(_) => EXIT_INVALID_IMAGE,
        }
    }
}

impl fmt::Display for EmulationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            EmulationError::UnimplementedOpcode { opcode, pc } =>
                write!(f, "unimplemented opcode {:02X} at {:04X}", opcode, pc),
            EmulationError::TraceMismatch { ref expected, ref actual } =>
                write!(f, "mismatched CPU frames\n    Emulator Frame: {}\n    Log Frame:      {}",
                       actual, expected),
            EmulationError::TraceLog(ref reason) =>
                write!(f, "unusable trace log: {}", reason),
            EmulationError::Io(ref e) => write!(f, "{}", e),
        }
    }
}

impl Error for EmulationError {
    fn source(&self) -> Option<&(Error + 'static)> {
        match *self {
            EmulationError::Io(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for EmulationError {
    fn from(e: io::Error) -> Self {
        EmulationError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unimplemented_opcode_message() {
        let e = EmulationError::UnimplementedOpcode { opcode: 0xFF, pc: 0x8000 };
        assert_eq!(e.to_string(), "unimplemented opcode FF at 8000");
        assert_eq!(e.exit_code(), EXIT_UNIMPLEMENTED_OPCODE);
    }

    #[test]
    fn io_errors_keep_their_source() {
        let e: EmulationError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(e.source().is_some());
        assert_eq!(e.exit_code(), EXIT_INVALID_IMAGE);
    }
}
