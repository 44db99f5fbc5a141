//! regvm library.
//!
//! Provides the register-machine emulation core and shared utilities.

pub mod emulator;
pub mod utils;
