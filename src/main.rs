//! Register-machine emulator CLI.
//!
//! Loads a raw program image at address 0 and runs it to completion,
//! tracing each executed instruction, or drives it interactively through
//! the line-based debugger.
//!
//! # Usage
//! ```text
//! regvm [image.bin] [OPTIONS]
//! ```
//!
//! # Arguments
//! - `image.bin`: raw program image (defaults to the embedded demo image)
//!
//! # Options
//! - `-d, --debug`: interactive debugger (one command per instruction)
//! - `--lenient`: legacy-compatible fault policy instead of strict faults
//! - `--no-trace`: suppress the per-instruction trace
//! - `-q, --quiet`: only log errors

use regvm::emulator::debugger;
use regvm::emulator::errors::FaultPolicy;
use regvm::emulator::machine::{Machine, Outcome};
use regvm::emulator::DEMO_IMAGE;
use regvm::utils::log::{self, Level};
use regvm::{error, info};
use std::env;
use std::fs;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut image_path: Option<&str> = None;
    let mut debug = false;
    let mut trace = true;
    let mut policy = FaultPolicy::Strict;

    for arg in &args[1..] {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            "--debug" | "-d" => debug = true,
            "--lenient" => policy = FaultPolicy::Lenient,
            "--no-trace" => trace = false,
            "--quiet" | "-q" => log::set_min_level(Level::Error),
            other if other.starts_with('-') => {
                eprintln!("Unexpected option: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
            other => {
                if image_path.replace(other).is_some() {
                    eprintln!("Only one image may be given\n");
                    print_usage(&args[0]);
                    process::exit(1);
                }
            }
        }
    }

    let image = match image_path {
        Some(path) => match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to read image '{}': {}", path, e);
                process::exit(1);
            }
        },
        None => DEMO_IMAGE.to_vec(),
    };

    let mut machine = Machine::new(policy);
    if let Err(e) = machine.load_image(&image) {
        error!("{}", e);
        process::exit(1);
    }

    let result = if debug {
        debugger::run(&mut machine, 0)
    } else {
        run_traced(&mut machine, trace)
    };

    if let Err(e) = result {
        error!("Execution fault: {}", e);
        process::exit(1);
    }
    info!("Execution finished");
}

/// Runs from address 0 to the halt outcome, optionally printing one trace
/// line per executed instruction.
fn run_traced(machine: &mut Machine, trace: bool) -> Result<(), regvm::emulator::errors::VmError> {
    let mut ip = 0;
    loop {
        if trace {
            println!("{}", machine.trace_line(ip)?);
        }
        match machine.step(ip)? {
            Outcome::Continue(next) => ip = next,
            Outcome::Halt => return Ok(()),
        }
    }
}

const USAGE: &str = "\
Register-machine emulator

USAGE:
    {program} [image.bin] [OPTIONS]

ARGS:
    <image.bin>    Raw program image loaded at address 0
                   (defaults to the embedded demo image)

OPTIONS:
    -d, --debug    Interactive debugger (s = step, q = quit,
                   p <addr> <size> / p r<N> / r = inspect)
    --lenient      Legacy-compatible fault policy (wrap out-of-range
                   addresses, defined division by zero)
    --no-trace     Suppress the per-instruction trace
    -q, --quiet    Only log errors
    -h, --help     Print this help message

EXAMPLES:
    # Run the embedded demo image with tracing
    {program}

    # Single-step a program interactively
    {program} program.bin -d
";

/// Prints usage information to stderr.
fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}
