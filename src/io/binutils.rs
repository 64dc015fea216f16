// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs::File;
use std::io::Error;
use std::io::Read;
use std::path::Path;
use std::result::Result;

/// Reads a binary file at a given path and stores it in a vector of bytes.
pub fn read_bin<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, Error> {
    let mut buffer: Vec<u8> = Vec::new();
    let mut file = try!(File::open(path));
    try!(file.read_to_end(&mut buffer));
    Ok(buffer)
}

/// Parses a number given on the command line or in the debugger. Numbers
/// prefixed with "0x" or "$" are hexadecimal, everything else is decimal.
pub fn parse_number(arg: &str) -> Result<u64, String> {
    let arg = arg.trim();
    let (digits, radix) = if arg.starts_with("0x") || arg.starts_with("0X") {
        (&arg[2..], 16)
    } else if arg.starts_with('$') {
        (&arg[1..], 16)
    } else {
        (arg, 10)
    };

    u64::from_str_radix(digits, radix).map_err(|_| format!("invalid number \"{}\"", arg))
}

/// Parses a number that has to fit in the 16-bit address space.
pub fn parse_address(arg: &str) -> Result<u16, String> {
    let value = try!(parse_number(arg));
    if value > 0xFFFF {
        return Err(format!("address \"{}\" is out of range", arg.trim()));
    }
    Ok(value as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal() {
        assert_eq!(parse_number("0x8000"), Ok(0x8000));
        assert_eq!(parse_number("$C000"), Ok(0xC000));
        assert_eq!(parse_number("1024"), Ok(1024));
        assert_eq!(parse_number(" 16 "), Ok(16));
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(parse_number("").is_err());
        assert!(parse_number("0x").is_err());
        assert!(parse_number("12ab").is_err());
        assert!(parse_number("-1").is_err());
    }

    #[test]
    fn addresses_fit_in_sixteen_bits() {
        assert_eq!(parse_address("$FFFF"), Ok(0xFFFF));
        assert!(parse_address("0x10000").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_bin("/nonexistent/image.bin").is_err());
    }
}
