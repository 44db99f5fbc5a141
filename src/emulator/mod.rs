//! Byte-code interpreter for a small fixed-width register machine.
//!
//! A fetch-decode-execute engine over a flat 65536-byte memory, sixteen
//! signed 32-bit general-purpose registers, and a 4-bit condition-flag
//! register, executing hand- or tool-assembled binary images.
//!
//! # Architecture
//!
//! - **Instruction format**: Variable-length encoding (1 to 5 bytes) with a
//!   two-tiered opcode space; second-tier opcodes pack one register operand
//!   into the opcode byte's low nibble
//! - **Execution model**: Strictly sequential; every instruction yields the
//!   next instruction pointer or a terminal halt outcome
//! - **Flags**: Only the comparison instruction writes flags, and the
//!   nonzero-indicator bit keeps its historical inverted polarity
//! - **Faults**: Conditions the original hardware model left undefined are
//!   surfaced as [`errors::VmError`] or emulated, per [`errors::FaultPolicy`]
//!
//! # Modules
//!
//! - [`isa`]: Instruction set definition and opcode resolution
//! - [`decode`]: Operand-field extraction per encoding shape
//! - [`flags`]: Condition-flag register
//! - [`memory`]: Flat byte-addressable memory with little-endian cells
//! - [`machine`]: Execution context, dispatch, and per-instruction handlers
//! - [`debugger`]: Line-oriented single-step front end
//! - [`errors`]: Fault taxonomy and fault policy

pub mod debugger;
pub mod decode;
pub mod errors;
pub mod flags;
pub mod isa;
pub mod machine;
pub mod memory;

/// The reference demo image: loads two constants, xors them, counts a loop
/// register down to zero, then multiplies into a 64-bit result and halts.
pub const DEMO_IMAGE: &[u8] = &[
    0x00, // noop
    0x10, 0x12, 0x34, 0x56, 0x78, // movi r0, 0x78563412
    0x11, 0x87, 0x65, 0x43, 0x21, // movi r1, 0x21436587
    0x82, 0x01, // xorl r2, r0, r1
    0x13, 0x04, 0x00, 0x00, 0x00, // movi r3, 0x4
    0x14, 0x00, 0x00, 0x00, 0x00, // movi r4, 0x0
    0x15, 0x01, 0x00, 0x00, 0x00, // movi r5, 0x1
    0x53, 0x35, // subs r3, r3, r5
    0x06, 0x34, // comp r3, r4
    0x0A, 0x1C, 0x00, 0x00, 0x00, // jpgt 0x1c
    0x04, 0x32, 0x10, // muls r3, r2, r1, r0
    0xE0, // halt
];
