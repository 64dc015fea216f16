extern crate getopts;
extern crate nes_core;
extern crate rustyline;

use getopts::Options;
use nes_core::debugger::Debugger;
use nes_core::io::binutils;
use nes_core::io::errors::*;
use nes_core::io::log;
use nes_core::nes::nes::{Halt, NESRuntimeOptions, NES};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::env;
use std::io::{self, Write};
use std::panic;
use std::sync::mpsc::{self, Sender};
use std::thread;

/// Prints usage information for the emulator.
fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options] IMAGE", program);
    print!("{}", opts.usage(&brief));
}

/// Reports an error on stderr in the usual `nes-core: ...` form.
fn report<T: AsRef<str>>(message: T) {
    let _ = writeln!(io::stderr(), "nes-core: {}", message.as_ref());
}

/// Builds runtime options out of parsed command line arguments.
fn parse_runtime_options(matches: &getopts::Matches) -> Result<NESRuntimeOptions, String> {
    let mut options = NESRuntimeOptions::default();
    options.verbose = matches.opt_present("v");
    options.trace = matches.opt_present("t");
    options.debug = matches.opt_present("d");
    options.test_log = matches.opt_str("l");

    if let Some(origin) = matches.opt_str("o") {
        options.origin = try!(binutils::parse_address(&origin));
    }
    if let Some(entry) = matches.opt_str("e") {
        options.entry = Some(try!(binutils::parse_address(&entry)));
    }
    if let Some(steps) = matches.opt_str("s") {
        options.steps = try!(binutils::parse_number(&steps));
    }
    Ok(options)
}

/// Reads debugger commands from a line editor and forwards them to the
/// emulator thread. End of input counts as a request to quit.
fn read_commands(sender: Sender<String>) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            report(format!("debugger prompt unavailable: {}", e));
            let _ = sender.send(String::from("quit"));
            return;
        },
    };

    loop {
        match editor.readline("(nes) ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                if sender.send(line).is_err() {
                    break; // The emulator is gone.
                }
            },
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => {
                let _ = sender.send(String::from("quit"));
                break;
            },
            Err(e) => {
                report(format!("{}", e));
                let _ = sender.send(String::from("quit"));
                break;
            },
        }
    }
}

/// Runs the loaded program under the interactive debugger until the user
/// quits or the CPU fails.
fn run_debugger(nes: &mut NES) -> i32 {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || read_commands(sender));

    let mut debugger = Debugger::new(receiver);
    loop {
        match debugger.step(nes) {
            Ok(true) => {},
            Ok(false) => return EXIT_SUCCESS,
            Err(e) => return fail(nes, e),
        }
    }
}

/// Reports an emulation error along with the CPU state it left behind.
fn fail(nes: &NES, e: EmulationError) -> i32 {
    report(format!("{}", e));
    if let EmulationError::UnimplementedOpcode { .. } = e {
        let _ = write!(io::stderr(), "{}", nes.cpu);
    }
    e.exit_code()
}

/// Name to show in usage text. The OS does not guarantee an argv[0].
fn program_name(args: &[String]) -> String {
    args.get(0).cloned().unwrap_or_else(|| String::from("nes-core"))
}

/// Initializes and starts the emulator. Returns an exit code after which the
/// program unwinds and stops executing.
fn init() -> i32 {
    let args: Vec<String> = env::args().collect();
    let program = program_name(&args);

    let mut opts = Options::new();
    opts.optflag("h", "help", "print this help menu");
    opts.optflag("v", "verbose", "log what the emulator is doing");
    opts.optflag("t", "trace", "print a frame for every executed instruction");
    opts.optopt("l", "test-log", "compare every frame against a Nintendulator log", "FILE");
    opts.optopt("o", "origin", "address the image is loaded at (default 0x8000)", "ADDR");
    opts.optopt("e", "entry", "write ADDR into the reset vector after loading", "ADDR");
    opts.optopt("s", "steps", "stop after N instructions (0 runs until a trap)", "N");
    opts.optflag("d", "debug", "run under the interactive debugger");

    let matches = match opts.parse(args.iter().skip(1)) {
        Ok(m) => m,
        Err(f) => {
            report(f.to_string());
            return EXIT_FAILURE;
        },
    };

    if matches.opt_present("h") {
        print_usage(&program, &opts);
        return EXIT_SUCCESS;
    }

    let runtime_options = match parse_runtime_options(&matches) {
        Ok(options) => options,
        Err(e) => {
            report(e);
            return EXIT_FAILURE;
        },
    };

    let image_path = if matches.free.len() == 1 {
        matches.free[0].clone()
    } else {
        print_usage(&program, &opts);
        return EXIT_FAILURE;
    };

    let image = match binutils::read_bin(&image_path) {
        Ok(image) => image,
        Err(e) => {
            report(format!("{}: {}", image_path, e));
            return EXIT_INVALID_IMAGE;
        },
    };
    if image.is_empty() {
        report(format!("{}: image is empty", image_path));
        return EXIT_INVALID_IMAGE;
    }

    let mut nes = match NES::new(runtime_options.clone()) {
        Ok(nes) => nes,
        Err(e) => {
            report(format!("{}", e));
            return e.exit_code();
        },
    };
    nes.load(runtime_options.origin, &image);

    if runtime_options.debug {
        return run_debugger(&mut nes);
    }

    match nes.run() {
        Ok(Halt::BudgetExhausted) => {
            log::log("main", "Step budget exhausted", &runtime_options);
            EXIT_SUCCESS
        },
        Ok(Halt::Trapped(pc)) => {
            log::log("main", format!("Program trapped at {:#06X}", pc), &runtime_options);
            EXIT_SUCCESS
        },
        Err(e) => fail(&nes, e),
    }
}

/// Runs `f` and turns a panic into the runtime failure code. The panic
/// hook has already reported it by then.
fn exit_code_of<F: FnOnce() -> i32 + panic::UnwindSafe>(f: F) -> i32 {
    match panic::catch_unwind(f) {
        Ok(code) => code,
        Err(_) => EXIT_RUNTIME_FAILURE,
    }
}

/// Entry point of the program and wrapper of init. Takes the exit code returned
/// from init and exits with it.
fn main() {
    let exit_code = exit_code_of(init);
    std::process::exit(exit_code); // Unwinding done, safe to exit.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_name_falls_back_without_argv() {
        assert_eq!(program_name(&[]), "nes-core");
        assert_eq!(program_name(&[String::from("./nes")]), "./nes");
    }

    #[test]
    fn panics_exit_with_runtime_failure() {
        assert_eq!(exit_code_of(|| EXIT_TRACE_MISMATCH), EXIT_TRACE_MISMATCH);
        assert_eq!(exit_code_of(|| -> i32 { panic!("emulator thread died") }),
                   EXIT_RUNTIME_FAILURE);
    }

    #[test]
    fn runtime_options_from_flags() {
        let mut opts = Options::new();
        opts.optopt("o", "origin", "", "ADDR");
        opts.optopt("e", "entry", "", "ADDR");
        opts.optopt("s", "steps", "", "N");
        opts.optopt("l", "test-log", "", "FILE");
        opts.optflag("v", "verbose", "");
        opts.optflag("t", "trace", "");
        opts.optflag("d", "debug", "");

        let matches = opts.parse(&["-o", "$C000", "-s", "10", "-t"]).unwrap();
        let options = parse_runtime_options(&matches).unwrap();
        assert_eq!(options.origin, 0xC000);
        assert_eq!(options.steps, 10);
        assert!(options.trace);
        assert_eq!(options.entry, None);

        let matches = opts.parse(&["-e", "0x10000"]).unwrap();
        assert!(parse_runtime_options(&matches).is_err());
    }
}
