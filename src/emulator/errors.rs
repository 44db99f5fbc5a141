//! Execution fault types and the fault policy.
//!
//! The reference machine left out-of-range memory access, division by zero,
//! and malformed opcode bytes undefined. This module gives each a named
//! fault, and [`FaultPolicy`] selects between surfacing them and emulating
//! the permissive legacy behavior (see [`memory`](super::memory) and the
//! `divs` handler for what "lenient" means per fault).

use regvm_derive::Error;

/// Errors that can occur while executing a program image.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VmError {
    /// Memory access outside the address space.
    #[error("out-of-bounds access of {len} bytes at address {addr:#x}")]
    OutOfBoundsAccess { addr: i32, len: usize },
    /// `divs` with a zero divisor.
    #[error("division by zero at {addr:#010x}")]
    DivisionByZero { addr: i32 },
    /// Opcode byte with no table entry (high nibble 0xF).
    #[error("invalid opcode {opcode:#04x} at {addr:#010x}")]
    InvalidOpcode { opcode: u8, addr: i32 },
    /// Program image larger than the address space.
    #[error("program image of {len} bytes exceeds memory capacity {capacity}")]
    ImageTooLarge { len: usize, capacity: usize },
}

/// How the machine treats conditions the reference system left undefined.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum FaultPolicy {
    /// Faults abort execution and are reported to the caller.
    #[default]
    Strict,
    /// Legacy-compatible: addresses wrap modulo the memory size and
    /// division by zero produces a defined placeholder result. Invalid
    /// opcodes still fault; the reference behavior for those was a read
    /// past the end of its dispatch table with nothing to preserve.
    Lenient,
}
