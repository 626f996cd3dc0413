//! Packed candidate codes.
//!
//! Layout of a code:
//!
//! | bits     | field                                              |
//! |----------|----------------------------------------------------|
//! | `0..8`   | byte value emitted                                 |
//! | `8..16`  | minimum number of bytes already emitted            |
//! | `16..32` | registers written by the instruction (one bit each)|

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::x86::RegisterMask;

const MIN_PREFIX_SHIFT: u32 = 8;

/// One legal successor byte together with its preconditions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateCode(u32);

impl CandidateCode {
    pub const fn new(byte: u8, min_prefix: u8, clobbers: RegisterMask) -> Self {
        CandidateCode(byte as u32 | (min_prefix as u32) << MIN_PREFIX_SHIFT | clobbers.code_field())
    }

    pub const fn from_raw(raw: u32) -> Self {
        CandidateCode(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn byte(self) -> u8 {
        self.0 as u8
    }

    /// Bytes that must already precede this one before it may be chosen.
    pub const fn min_prefix(self) -> usize {
        ((self.0 >> MIN_PREFIX_SHIFT) & 0xff) as usize
    }

    pub const fn clobbers(self) -> RegisterMask {
        RegisterMask::from_bits((self.0 >> RegisterMask::CODE_SHIFT) as u16)
    }

    /// True when the instruction writes any register in `protected`.
    pub const fn writes_any(self, protected: RegisterMask) -> bool {
        self.0 & protected.code_field() != 0
    }
}

impl fmt::Debug for CandidateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CandidateCode(0x{:02x}, min_prefix={}, clobbers={})",
            self.byte(),
            self.min_prefix(),
            self.clobbers()
        )
    }
}
