//! Flat byte-addressable memory.
//!
//! The sole storage for code and data: a fixed 65536-byte zero-initialized
//! buffer addressed by signed 32-bit offsets. Multi-byte cells are 4 bytes,
//! little-endian, with no alignment requirement.
//!
//! Bounds behavior follows the machine's [`FaultPolicy`]: strict accesses
//! fault with [`VmError::OutOfBoundsAccess`], lenient accesses wrap each
//! byte's address modulo the memory size (matching what a raw pointer into
//! a power-of-two ring would have read, and giving out-of-range legacy
//! programs a defined meaning).

use crate::emulator::errors::{FaultPolicy, VmError};

/// Address-space size in bytes.
pub const MEM_SIZE: usize = 65536;

/// Fixed-capacity flat memory with policy-driven bounds behavior.
pub struct Memory {
    bytes: Vec<u8>,
    policy: FaultPolicy,
}

impl Memory {
    /// Creates a zeroed memory of [`MEM_SIZE`] bytes.
    pub fn new(policy: FaultPolicy) -> Self {
        Self {
            bytes: vec![0; MEM_SIZE],
            policy,
        }
    }

    /// Copies a program image to address 0.
    ///
    /// Returns [`VmError::ImageTooLarge`] if the image does not fit.
    pub fn load_image(&mut self, image: &[u8]) -> Result<(), VmError> {
        if image.len() > self.bytes.len() {
            return Err(VmError::ImageTooLarge {
                len: image.len(),
                capacity: self.bytes.len(),
            });
        }
        self.bytes[..image.len()].copy_from_slice(image);
        Ok(())
    }

    /// Memory capacity in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Maps an address to a buffer offset, or faults under the strict policy.
    fn offset(&self, addr: i32) -> Result<usize, VmError> {
        match self.policy {
            FaultPolicy::Strict => {
                if addr < 0 || addr as usize >= self.bytes.len() {
                    Err(VmError::OutOfBoundsAccess { addr, len: 1 })
                } else {
                    Ok(addr as usize)
                }
            }
            FaultPolicy::Lenient => {
                Ok((addr as i64).rem_euclid(self.bytes.len() as i64) as usize)
            }
        }
    }

    /// Reads one byte.
    pub fn byte(&self, addr: i32) -> Result<u8, VmError> {
        Ok(self.bytes[self.offset(addr)?])
    }

    /// Reads a 4-byte little-endian cell as a signed 32-bit value.
    pub fn read_cell(&self, addr: i32) -> Result<i32, VmError> {
        let mut cell = [0u8; 4];
        for (i, slot) in cell.iter_mut().enumerate() {
            *slot = self
                .byte(addr.wrapping_add(i as i32))
                .map_err(|_| VmError::OutOfBoundsAccess { addr, len: 4 })?;
        }
        Ok(i32::from_le_bytes(cell))
    }

    /// Writes a signed 32-bit value as a 4-byte little-endian cell.
    pub fn write_cell(&mut self, addr: i32, value: i32) -> Result<(), VmError> {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            let offset = self
                .offset(addr.wrapping_add(i as i32))
                .map_err(|_| VmError::OutOfBoundsAccess { addr, len: 4 })?;
            self.bytes[offset] = byte;
        }
        Ok(())
    }

    /// Reads `len` consecutive bytes starting at `addr`.
    pub fn read_span(&self, addr: i32, len: usize) -> Result<Vec<u8>, VmError> {
        (0..len)
            .map(|i| {
                self.byte(addr.wrapping_add(i as i32))
                    .map_err(|_| VmError::OutOfBoundsAccess { addr, len })
            })
            .collect()
    }
}
