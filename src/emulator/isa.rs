//! Instruction Set Architecture (ISA) definitions.
//!
//! Defines the machine's instruction set. The
//! [`for_each_instruction!`](crate::for_each_instruction) macro holds the
//! canonical instruction definitions and invokes a callback macro for code
//! generation, so multiple modules can generate instruction-related code
//! without duplicating the table.
//!
//! This module generates:
//! - The [`Instruction`] enum, one variant per instruction index
//! - `TryFrom<u8>` resolving an opcode byte to an instruction
//! - `mnemonic()` and `shape()` accessors
//!
//! # Opcode resolution
//!
//! The opcode space is two-tiered. For opcode byte `b`:
//! - high nibble zero: instruction index = `b & 0x0F` (indices 0-15)
//! - high nibble nonzero: instruction index = `15 + (b >> 4)` (indices 16-29)
//!
//! The second tier packs one register operand into the opcode byte's low
//! nibble. High nibble `0xF` resolves to index 30, which has no table entry
//! and faults as an invalid opcode.
//!
//! # Encoding shapes
//!
//! Each instruction has a fixed operand layout ([`Shape`]) and byte length:
//! no operand (1), one register (1), two registers (2), three registers (2),
//! four registers (3), register + 32-bit immediate (5), immediate only (5).
//! Immediates are 4 bytes, little-endian, unaligned.

use crate::emulator::errors::VmError;

/// Operand-encoding shape of an instruction, fixing its byte length and
/// the position of its register/immediate fields.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Shape {
    /// Opcode byte only.
    NoReg,
    /// One register in the opcode byte's low nibble.
    MonoReg,
    /// Two registers packed in the byte following the opcode byte.
    DuoReg,
    /// One register in the opcode low nibble, two in the following byte.
    TriReg,
    /// Four registers packed in the two bytes following the opcode byte.
    QuadReg,
    /// Register in the opcode low nibble plus a 32-bit immediate.
    RegImm,
    /// 32-bit immediate only (control-transfer target).
    Imm,
}

impl Shape {
    /// Encoded instruction length in bytes, including the opcode byte.
    pub const fn len(self) -> i32 {
        match self {
            Shape::NoReg | Shape::MonoReg => 1,
            Shape::DuoReg | Shape::TriReg => 2,
            Shape::QuadReg => 3,
            Shape::RegImm | Shape::Imm => 5,
        }
    }
}

/// Invokes a callback macro with the complete instruction definition list.
///
/// Each entry is `Variant = index, "mnemonic", Shape`. The index is the
/// instruction index produced by opcode resolution, not the raw opcode byte.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Tier one: high nibble zero
            // =========================
            /// noop ; no state change
            Noop = 0, "noop", NoReg,
            /// movr rd, rs ; rd = rs
            Movr = 1, "movr", DuoReg,
            /// notl rd, rs ; rd = !rs (bitwise complement)
            Notl = 2, "notl", DuoReg,
            /// nega rd, rs ; rd = -rs
            Nega = 3, "nega", DuoReg,
            /// muls rh, rl, rs, rt ; (rh, rl) = 64-bit signed rs * rt
            Muls = 4, "muls", QuadReg,
            /// divs rd, rr, rs, rt ; rd = rs / rt, rr = rs % rt
            Divs = 5, "divs", QuadReg,
            /// comp rs, rt ; flags from rs - rt, result discarded
            Comp = 6, "comp", DuoReg,
            /// jmpi addr ; ip = addr
            Jmpi = 7, "jmpi", Imm,
            /// cali addr ; declared but not implemented (ip unchanged)
            Cali = 8, "cali", Imm,
            /// retn ; declared but not implemented (ip unchanged)
            Retn = 9, "retn", NoReg,
            /// jpgt addr ; ip = addr iff !sign && nonzero
            Jpgt = 10, "jpgt", Imm,
            /// jpls addr ; ip = addr iff sign && nonzero
            Jpls = 11, "jpls", Imm,
            /// jpge addr ; ip = addr iff !sign || !nonzero
            Jpge = 12, "jpge", Imm,
            /// jple addr ; ip = addr iff sign || !nonzero
            Jple = 13, "jple", Imm,
            /// jpeq addr ; ip = addr iff nonzero (see flags module on polarity)
            Jpeq = 14, "jpeq", Imm,
            /// jpne addr ; ip = addr iff !nonzero
            Jpne = 15, "jpne", Imm,
            // =========================
            // Tier two: register packed in the opcode byte
            // =========================
            /// movi rd, imm ; rd = imm
            Movi = 16, "movi", RegImm,
            /// stor [rb + ro], rs ; 4-byte cell at rb + ro = rs
            Stor = 17, "stor", TriReg,
            /// load rd, [rb + ro] ; rd = 4-byte cell at rb + ro
            Load = 18, "load", TriReg,
            /// adds rd, rs, rt ; rd = rs + rt (wrapping)
            Adds = 19, "adds", TriReg,
            /// subs rd, rs, rt ; rd = rs - rt (wrapping)
            Subs = 20, "subs", TriReg,
            /// andl rd, rs, rt ; rd = rs & rt
            Andl = 21, "andl", TriReg,
            /// orll rd, rs, rt ; rd = rs | rt
            Orll = 22, "orll", TriReg,
            /// xorl rd, rs, rt ; rd = rs ^ rt
            Xorl = 23, "xorl", TriReg,
            /// shll rd, rs, rt ; rd = rs << rt
            Shll = 24, "shll", TriReg,
            /// shrl rd, rs, rt ; rd = rs >> rt (logical, unsigned)
            Shrl = 25, "shrl", TriReg,
            /// shra rd, rs, rt ; rd = rs >> rt (arithmetic, sign-extending)
            Shra = 26, "shra", TriReg,
            /// jmpr rs ; ip = rs
            Jmpr = 27, "jmpr", MonoReg,
            /// calr rs ; declared but not implemented (ip unchanged)
            Calr = 28, "calr", MonoReg,
            /// halt ; terminates execution
            Halt = 29, "halt", NoReg,
        }
    };
}

macro_rules! define_instructions {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $index:literal, $mnemonic:literal, $shape:ident
        ),* $(,)?
    ) => {
        /// One instruction of the ISA, identified by its instruction index.
        #[derive(Copy, Clone, Debug, Eq, PartialEq)]
        pub enum Instruction {
            $(
                $(#[$doc])*
                $name = $index,
            )*
        }

        impl Instruction {
            /// Resolves an instruction index (0-29) to its instruction.
            pub const fn from_index(index: u8) -> Option<Instruction> {
                match index {
                    $( $index => Some(Instruction::$name), )*
                    _ => None,
                }
            }

            /// Returns the assembly mnemonic for this instruction.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Instruction::$name => $mnemonic, )*
                }
            }

            /// Returns the operand-encoding shape of this instruction.
            pub const fn shape(&self) -> Shape {
                match self {
                    $( Instruction::$name => Shape::$shape, )*
                }
            }
        }
    };
}

for_each_instruction!(define_instructions);

impl Instruction {
    /// Instruction index (0-29) of this instruction.
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Encoded length in bytes.
    pub const fn len(self) -> i32 {
        self.shape().len()
    }
}

impl TryFrom<u8> for Instruction {
    type Error = VmError;

    /// Resolves an opcode byte via the two-tier rule. The returned error
    /// carries address 0; the dispatcher fills in the faulting address.
    fn try_from(opcode: u8) -> Result<Self, Self::Error> {
        let index = if opcode & 0xF0 != 0 {
            15 + (opcode >> 4)
        } else {
            opcode & 0x0F
        };
        Instruction::from_index(index).ok_or(VmError::InvalidOpcode { opcode, addr: 0 })
    }
}
