//! Condition-flag register.
//!
//! Four independent bits: Sign, Zero, Carry, Overflow. Only the comparison
//! instruction writes flags, and only Sign and Zero; Carry and Overflow are
//! reserved placeholders that stay clear.
//!
//! The Zero flag keeps the reference machine's inverted polarity: it is set
//! when a comparison result is **nonzero**, despite what its conventional
//! name suggests. The conditional-branch formulas are defined over this
//! literal polarity, so it must not be "corrected" here.

/// One condition bit.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Flag {
    Sign = 1 << 0,
    /// Nonzero indicator; see the module docs on polarity.
    Zero = 1 << 1,
    Carry = 1 << 2,
    Overflow = 1 << 3,
}

/// The 4-bit flag register, all clear at start-up.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Flags {
    bits: u8,
}

impl Flags {
    /// Sets or clears one flag.
    pub fn set(&mut self, flag: Flag, value: bool) {
        self.bits &= !(flag as u8);
        if value {
            self.bits |= flag as u8;
        }
    }

    /// Reads one flag.
    pub fn query(&self, flag: Flag) -> bool {
        self.bits & flag as u8 != 0
    }

    /// Records a comparison result: Sign from bit 31, Zero when the result
    /// is nonzero. Carry and Overflow are left untouched.
    pub fn record_compare(&mut self, result: i32) {
        self.set(Flag::Sign, result & i32::MIN != 0);
        self.set(Flag::Zero, result != 0);
    }

    /// Sign flag.
    pub fn sign(&self) -> bool {
        self.query(Flag::Sign)
    }

    /// Nonzero-indicator flag.
    pub fn nonzero(&self) -> bool {
        self.query(Flag::Zero)
    }
}
