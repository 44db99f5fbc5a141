//! Operand-field extraction.
//!
//! Pure functions that, given an instruction's start address, pull its
//! register indices and/or 32-bit immediate out of memory according to the
//! instruction's encoding shape. Register indices are nibble-masked by
//! construction and therefore always in range; addresses carried in
//! immediates are not validated here.

use crate::emulator::errors::VmError;
use crate::emulator::memory::Memory;

/// High and low nibbles of a byte.
const fn nibbles(byte: u8) -> (u8, u8) {
    (byte >> 4, byte & 0x0F)
}

/// One register, from the opcode byte's low nibble.
pub fn mono_reg(mem: &Memory, addr: i32) -> Result<u8, VmError> {
    Ok(mem.byte(addr)? & 0x0F)
}

/// Two registers, packed in the byte following the opcode byte.
pub fn duo_reg(mem: &Memory, addr: i32) -> Result<(u8, u8), VmError> {
    let (hi, lo) = nibbles(mem.byte(addr.wrapping_add(1))?);
    Ok((hi, lo))
}

/// Three registers: opcode low nibble, then the following byte's nibbles.
pub fn tri_reg(mem: &Memory, addr: i32) -> Result<(u8, u8, u8), VmError> {
    let first = mem.byte(addr)? & 0x0F;
    let (second, third) = nibbles(mem.byte(addr.wrapping_add(1))?);
    Ok((first, second, third))
}

/// Four registers in the two bytes after the opcode byte. The opcode byte's
/// low nibble is unused for this shape.
pub fn quad_reg(mem: &Memory, addr: i32) -> Result<(u8, u8, u8, u8), VmError> {
    let (first, second) = nibbles(mem.byte(addr.wrapping_add(1))?);
    let (third, fourth) = nibbles(mem.byte(addr.wrapping_add(2))?);
    Ok((first, second, third, fourth))
}

/// Register from the opcode low nibble plus the 32-bit immediate that
/// follows.
pub fn reg_imm(mem: &Memory, addr: i32) -> Result<(u8, i32), VmError> {
    Ok((mem.byte(addr)? & 0x0F, imm(mem, addr)?))
}

/// The 32-bit little-endian immediate in the 4 bytes after the opcode byte.
pub fn imm(mem: &Memory, addr: i32) -> Result<i32, VmError> {
    mem.read_cell(addr.wrapping_add(1))
}
