// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

enum ParseState {
    ScanningForArguments,
    ScanningArgument,
    ScanningQuotedArgument,
}

/// Returns true if the character passed is a whitespace character. Both spaces
/// and tabs are considered whitespace characters.
fn is_whitespace(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Returns true if the character passed is a quote.
fn is_quote(c: char) -> bool {
    c == '"'
}

/// Returns true if the character passed starts an escape sequence.
fn is_escape(c: char) -> bool {
    c == '\\'
}

/// Parses raw debugger input into a list of separate arguments. Arguments
/// are separated by whitespace, can be quoted, and can have escaped characters
/// inside of them. A quote in the middle of an argument starts a quoted
/// section of that same argument.
pub fn input_to_arguments<S: AsRef<str>>(input: S) -> Result<Vec<String>, &'static str> {
    let mut state = ParseState::ScanningForArguments;
    let mut args: Vec<String> = Vec::new();
    let mut arg = String::new();
    let mut chars = input.as_ref().trim_end_matches(|c: char| c == '\r' || c == '\n').chars();

    while let Some(c) = chars.next() {
        // Escaped characters are taken literally wherever they appear.
        if is_escape(c) {
            match chars.next() {
                Some(escaped) => arg.push(escaped),
                None => return Err("escape at end of input"),
            }
            if let ParseState::ScanningForArguments = state {
                state = ParseState::ScanningArgument;
            }
            continue;
        }

        match state {
            ParseState::ScanningForArguments => {
                if is_quote(c) {
                    state = ParseState::ScanningQuotedArgument;
                } else if !is_whitespace(c) {
                    state = ParseState::ScanningArgument;
                    arg.push(c);
                }
            },
            ParseState::ScanningArgument => {
                // Switch back to scanning if whitespace is encountered and push
                // the argument currently being parsed to the argument list.
                if is_whitespace(c) {
                    args.push(arg.clone());
                    arg.clear();
                    state = ParseState::ScanningForArguments;
                } else if is_quote(c) {
                    state = ParseState::ScanningQuotedArgument;
                } else {
                    arg.push(c);
                }
            },
            ParseState::ScanningQuotedArgument => {
                if is_quote(c) {
                    state = ParseState::ScanningArgument;
                } else {
                    arg.push(c);
                }
            },
        }
    }

    match state {
        ParseState::ScanningQuotedArgument => Err("quoted arg does not close"),
        ParseState::ScanningArgument => {
            args.push(arg);
            Ok(args)
        },
        ParseState::ScanningForArguments => Ok(args),
    }
}
