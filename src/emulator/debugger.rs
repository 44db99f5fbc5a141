//! Line-oriented debugger front end.
//!
//! Runs the machine cooperatively: one command is consumed per loop
//! iteration, and the machine only advances on an explicit step. The
//! protocol is deliberately small:
//!
//! ```text
//! s                single-step: execute exactly one instruction
//! q                quit immediately
//! p <addr> <size>  hex dump of <size> bytes of memory from <addr>
//! p r<N>           register N as 8-digit hex
//! r                all 16 registers
//! ```
//!
//! An empty line, or anything unrecognized, is a no-op that re-prompts.

use crate::emulator::errors::VmError;
use crate::emulator::machine::{Machine, Outcome, REG_COUNT};
use std::io::{self, BufRead, Write};

/// One parsed debugger command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Execute exactly one instruction.
    Step,
    /// Terminate the session.
    Quit,
    /// Dump `size` bytes of memory starting at `addr`.
    PrintMemory { addr: i32, size: usize },
    /// Print one register.
    PrintRegister(u8),
    /// Print the whole register file.
    PrintRegisters,
    /// Empty or unrecognized input: re-prompt.
    Nop,
}

/// Parses one input line. Anything that does not match the protocol is
/// [`Command::Nop`].
pub fn parse(line: &str) -> Command {
    let mut words = line.split_whitespace();
    let Some(op) = words.next() else {
        return Command::Nop;
    };

    match op {
        "s" => Command::Step,
        "q" => Command::Quit,
        "r" => Command::PrintRegisters,
        "p" => match words.next() {
            Some(arg) if arg.starts_with('r') => match arg[1..].parse::<u8>() {
                Ok(n) if (n as usize) < REG_COUNT => Command::PrintRegister(n),
                _ => Command::Nop,
            },
            Some(arg) => {
                let addr = arg.parse::<i32>();
                let size = words.next().map(str::parse::<usize>);
                match (addr, size) {
                    (Ok(addr), Some(Ok(size))) => Command::PrintMemory { addr, size },
                    _ => Command::Nop,
                }
            }
            None => Command::Nop,
        },
        _ => Command::Nop,
    }
}

/// Renders `size` bytes from `addr` as hex, 16 bytes per line. The size is
/// clamped to the memory capacity: under the lenient policy a larger span
/// would only repeat the wrapped contents.
pub fn hex_dump(machine: &Machine, addr: i32, size: usize) -> Result<String, VmError> {
    let bytes = machine.memory().read_span(addr, size.min(machine.memory().len()))?;
    let mut out = String::new();
    for (i, byte) in bytes.iter().enumerate() {
        out.push_str(&format!("{byte:02x}"));
        out.push(if (i + 1) % 16 == 0 { '\n' } else { ' ' });
    }
    Ok(out.trim_end().to_string())
}

/// Renders the whole register file, one register per line.
pub fn register_dump(machine: &Machine) -> String {
    machine
        .registers()
        .as_array()
        .iter()
        .enumerate()
        .map(|(i, v)| format!("r{i}:\t0x{:08x}", *v as u32))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drives the machine interactively from `start`, reading commands from
/// stdin. Returns when the program halts, the user quits, or a fault
/// surfaces.
pub fn run(machine: &mut Machine, start: i32) -> Result<(), VmError> {
    let stdin = io::stdin();
    let mut ip = start;

    prompt();
    for line in stdin.lock().lines() {
        let line = line.unwrap_or_default();
        match parse(&line) {
            Command::Step => {
                let trace = machine.trace_line(ip)?;
                match machine.step(ip)? {
                    Outcome::Continue(next) => {
                        println!("{trace}");
                        ip = next;
                    }
                    Outcome::Halt => {
                        println!("{trace}");
                        return Ok(());
                    }
                }
            }
            Command::Quit => return Ok(()),
            Command::PrintMemory { addr, size } => match hex_dump(machine, addr, size) {
                Ok(dump) => println!("{dump}"),
                Err(err) => println!("{err}"),
            },
            Command::PrintRegister(n) => {
                println!("0x{:08x}", machine.registers().get(n) as u32);
            }
            Command::PrintRegisters => println!("{}", register_dump(machine)),
            Command::Nop => {}
        }
        prompt();
    }
    Ok(())
}

/// Prints the input prompt without a trailing newline.
fn prompt() {
    print!("Debug>> ");
    let _ = io::stdout().flush();
}
